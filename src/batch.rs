/*!
# Batch Driver

Per-directory iteration over script files, one pipeline stage at a time
(decompress, compress, extract, inject, import-to-image), plus the `all`
composite. This is the "external collaborator" the core codec modules
never see directly — it owns directory walking, the `MissingTxt` skip
policy, parallelism across files, and the diagnostics summary
([`BatchReport`]) that downstream tooling inspects.

Per-file work runs in parallel via `rayon`; the image-writer stage is
excluded from that parallel section and driven single-threaded
afterward, since at most one writer may touch a given image file at a
time.
*/

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::container::{self, DecompressedContainer};
use crate::image::ImageWriter;
use crate::inject;
use crate::{extract, translator};

/// Which side of the translation a `decompress`/`compress` pass operates
/// on: the original Japanese scripts, or the rebuilt English ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Japanese,
    English,
}

/// Aggregate outcome of one batch pass over a directory of files.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchReport {
    pub succeeded: usize,
    pub partial: usize,
    pub failed: usize,
    /// Sum of [`crate::inject::InjectOutcome::overflow_bytes`] across all
    /// partial injections in this pass.
    pub overflow_bytes: u64,
    /// Sum of skipped records (oversize + budget) across all partial
    /// injections in this pass.
    pub skipped_records: usize,
}

impl BatchReport {
    pub fn is_full_success(&self) -> bool {
        self.failed == 0
    }

    fn merge(&mut self, other: FileOutcome) {
        match other {
            FileOutcome::Success => self.succeeded += 1,
            FileOutcome::Partial {
                overflow_bytes,
                skipped_records,
            } => {
                self.partial += 1;
                self.overflow_bytes += overflow_bytes;
                self.skipped_records += skipped_records;
            }
            FileOutcome::Failed => self.failed += 1,
        }
    }
}

enum FileOutcome {
    Success,
    Partial {
        overflow_bytes: u64,
        skipped_records: usize,
    },
    Failed,
}

fn cc_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = crate::common::utils::collect_files(dir, false)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?;
    files.retain(|p| {
        p.extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("cc"))
    });
    Ok(files)
}

/// The final path component of `path`, as an owned `OsString`.
fn file_name_of(path: &Path) -> Result<std::ffi::OsString> {
    path.file_name()
        .map(|n| n.to_os_string())
        .with_context(|| format!("path has no file name: {}", path.display()))
}

fn run_batch(files: Vec<PathBuf>, f: impl Fn(&Path) -> FileOutcome + Sync) -> BatchReport {
    let outcomes: Vec<FileOutcome> = files.par_iter().map(|path| f(path)).collect();
    let mut report = BatchReport::default();
    for outcome in outcomes {
        report.merge(outcome);
    }
    report
}

/// Unpack every `.CC` file under `src_dir` (the side's compressed-script
/// directory) into the matching decompressed-intermediate directory.
pub fn decompress(config: &Config, side: Side) -> Result<BatchReport> {
    let (src_dir, dst_dir) = match side {
        Side::Japanese => (&config.jp_cc, &config.decompress_jp_cc),
        Side::English => (&config.en_cc, &config.decompress_en_cc),
    };
    let files = cc_files(src_dir)?;
    std::fs::create_dir_all(dst_dir)?;

    Ok(run_batch(files, |path| {
        let _span = tracing::info_span!("decompress", file = %path.display()).entered();
        let result = (|| -> Result<()> {
            let raw = std::fs::read(path).context("read")?;
            let container = container::unframe(&raw)?;
            let out_path = dst_dir.join(file_name_of(path)?);
            std::fs::write(&out_path, container.as_combined()).context("write")?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                info!("decompressed");
                FileOutcome::Success
            }
            Err(e) => {
                error!(error = %e, "decompression failed");
                FileOutcome::Failed
            }
        }
    }))
}

/// Recompress every decompressed-intermediate file under the side's
/// directory back into its on-disk `.CC` layout.
pub fn compress(config: &Config, side: Side) -> Result<BatchReport> {
    let (src_dir, dst_dir) = match side {
        Side::Japanese => (&config.decompress_jp_cc, &config.jp_cc),
        Side::English => (&config.decompress_en_cc, &config.en_cc),
    };
    let files = cc_files(src_dir)?;
    std::fs::create_dir_all(dst_dir)?;

    Ok(run_batch(files, |path| {
        let _span = tracing::info_span!("compress", file = %path.display()).entered();
        let result = (|| -> Result<()> {
            let raw = std::fs::read(path).context("read")?;
            let container = DecompressedContainer::from_combined(&raw)?;
            let framed = container::frame(&container)?;
            let out_path = dst_dir.join(file_name_of(path)?);
            std::fs::write(&out_path, framed).context("write")?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                info!("compressed");
                FileOutcome::Success
            }
            Err(e) => {
                error!(error = %e, "compression failed");
                FileOutcome::Failed
            }
        }
    }))
}

/// Extract translator text from every Japanese decompressed-intermediate
/// file into the Japanese translator-text directory.
pub fn extract_all(config: &Config) -> Result<BatchReport> {
    let files = cc_files(&config.decompress_jp_cc)?;
    std::fs::create_dir_all(&config.jp_txt)?;

    Ok(run_batch(files, |path| {
        let _span = tracing::info_span!("extract", file = %path.display()).entered();
        let result = (|| -> Result<()> {
            let raw = std::fs::read(path).context("read")?;
            let container = DecompressedContainer::from_combined(&raw)?;
            let text = extract::extract(&container);
            let out_path = config.jp_txt.join(file_name_of(&path.with_extension("txt"))?);
            std::fs::write(&out_path, text).context("write")?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                info!("extracted");
                FileOutcome::Success
            }
            Err(e) => {
                error!(error = %e, "extraction failed");
                FileOutcome::Failed
            }
        }
    }))
}

/// Inject each Japanese decompressed-intermediate script with its
/// matching English translator text file, writing the rebuilt
/// decompressed-intermediate script. Files with no matching translator
/// text are skipped silently (`MissingTxt`, logged at `debug!`).
pub fn inject_all(config: &Config) -> Result<BatchReport> {
    let files = cc_files(&config.decompress_jp_cc)?;
    std::fs::create_dir_all(&config.decompress_en_cc)?;

    let with_txt: Vec<PathBuf> = files
        .into_iter()
        .filter(|path| {
            let txt_name = match file_name_of(&path.with_extension("txt")) {
                Ok(name) => name,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping");
                    return false;
                }
            };
            let txt_path = config.en_txt.join(txt_name);
            let exists = txt_path.exists();
            if !exists {
                debug!(file = %path.display(), "no matching translator file, skipping");
            }
            exists
        })
        .collect();

    Ok(run_batch(with_txt, |path| {
        let _span = tracing::info_span!("inject", file = %path.display()).entered();

        let result = (|| -> Result<(inject::InjectOutcome, PathBuf)> {
            let txt_path = config.en_txt.join(file_name_of(&path.with_extension("txt"))?);
            let raw = std::fs::read(path)?;
            let container = DecompressedContainer::from_combined(&raw)?;
            let text = std::fs::read_to_string(&txt_path)?;
            let replacements = translator::parse(&text);
            let outcome = inject::inject(&container, &replacements)?;
            let out_path = config.decompress_en_cc.join(file_name_of(path)?);
            Ok((outcome, out_path))
        })();

        match result {
            Ok((outcome, out_path)) => {
                if std::fs::write(&out_path, outcome.container.as_combined()).is_err() {
                    error!("failed to write injected output");
                    return FileOutcome::Failed;
                }
                if outcome.is_partial() {
                    warn!(
                        skipped_oversize = outcome.skipped_oversize,
                        skipped_budget = outcome.skipped_budget,
                        overflow_bytes = outcome.overflow_bytes,
                        "injected with skipped records"
                    );
                    FileOutcome::Partial {
                        overflow_bytes: outcome.overflow_bytes,
                        skipped_records: outcome.skipped_oversize + outcome.skipped_budget,
                    }
                } else {
                    info!("injected");
                    FileOutcome::Success
                }
            }
            Err(e) => {
                error!(error = %e, "injection failed");
                FileOutcome::Failed
            }
        }
    }))
}

/// Write every rebuilt `.CC` file into the disk image, serialized through
/// a single writer handle, since at most one writer may hold a given
/// image open at a time.
pub fn import_to_image<W: ImageWriter>(config: &Config) -> Result<BatchReport> {
    let files = cc_files(&config.en_cc)?;
    let mut writer = W::open(&config.hdi_file)?;
    let mut report = BatchReport::default();

    for path in files {
        let _span = tracing::info_span!("import-to-image", file = %path.display()).entered();

        let outcome = (|| -> Result<()> {
            let filename = file_name_of(&path)?;
            let image_path = config.image_path(&filename.to_string_lossy());
            let bytes = std::fs::read(&path).context("read")?;
            writer.replace_file(&image_path, &bytes)?;
            Ok(())
        })();

        match outcome {
            Ok(()) => {
                info!("imported");
                report.merge(FileOutcome::Success);
            }
            Err(e) => {
                error!(error = %e, "import failed");
                report.merge(FileOutcome::Failed);
            }
        }
    }

    writer.close()?;
    Ok(report)
}

/// The composite operation: inject, then compress the English side, then
/// import the result into the disk image.
pub fn all<W: ImageWriter>(config: &Config) -> Result<BatchReport> {
    let inject_report = inject_all(config)?;
    let compress_report = compress(config, Side::English)?;
    let import_report = import_to_image::<W>(config)?;

    Ok(BatchReport {
        succeeded: import_report.succeeded,
        partial: inject_report.partial,
        failed: inject_report.failed + compress_report.failed + import_report.failed,
        overflow_bytes: inject_report.overflow_bytes,
        skipped_records: inject_report.skipped_records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::NullImage;

    fn write_sample_cc(path: &Path) {
        let mut header = [0u8; container::HEADER_LEN];
        let body = vec![0xFD, 0x03, 0x41, 0x42, 0x43, 0x00];
        header[0x14..0x16].copy_from_slice(&(body.len() as u16).to_le_bytes());
        let compressed = crate::lzss::compress(&body);
        let mut raw = Vec::new();
        raw.extend_from_slice(&header[..0x14]);
        raw.extend_from_slice(&compressed);
        std::fs::write(path, raw).unwrap();
    }

    #[test]
    fn decompress_then_compress_round_trips_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            jp_cc: dir.path().join("jpCC"),
            en_cc: dir.path().join("enCC"),
            decompress_jp_cc: dir.path().join("decompressJPCC"),
            decompress_en_cc: dir.path().join("decompressENCC"),
            jp_txt: dir.path().join("jpTXT"),
            en_txt: dir.path().join("enTXT"),
            hdi_file: dir.path().join("game.hdi"),
        };
        std::fs::create_dir_all(&config.jp_cc).unwrap();
        write_sample_cc(&config.jp_cc.join("A001.CC"));

        let report = decompress(&config, Side::Japanese).unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 0);
        assert!(config.decompress_jp_cc.join("A001.CC").exists());

        let extract_report = extract_all(&config).unwrap();
        assert_eq!(extract_report.succeeded, 1);
        let text = std::fs::read_to_string(config.jp_txt.join("A001.txt")).unwrap();
        assert_eq!(text, "ABC\n");
    }

    #[test]
    fn inject_skips_files_with_no_matching_translator_text() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            jp_cc: dir.path().join("jpCC"),
            en_cc: dir.path().join("enCC"),
            decompress_jp_cc: dir.path().join("decompressJPCC"),
            decompress_en_cc: dir.path().join("decompressENCC"),
            jp_txt: dir.path().join("jpTXT"),
            en_txt: dir.path().join("enTXT"),
            hdi_file: dir.path().join("game.hdi"),
        };
        std::fs::create_dir_all(&config.decompress_jp_cc).unwrap();
        std::fs::create_dir_all(&config.en_txt).unwrap();

        let mut header = [0u8; container::HEADER_LEN];
        let body = vec![0xFD, 0x03, 0x41, 0x42, 0x43, 0x00];
        header[0x14..0x16].copy_from_slice(&(body.len() as u16).to_le_bytes());
        let mut combined = header.to_vec();
        combined.extend_from_slice(&body);
        std::fs::write(config.decompress_jp_cc.join("A001.CC"), &combined).unwrap();

        let report = inject_all(&config).unwrap();
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed, 0);
        assert_eq!(report.partial, 0);
    }

    #[test]
    fn import_to_image_uses_fixed_directory_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            jp_cc: dir.path().join("jpCC"),
            en_cc: dir.path().join("enCC"),
            decompress_jp_cc: dir.path().join("decompressJPCC"),
            decompress_en_cc: dir.path().join("decompressENCC"),
            jp_txt: dir.path().join("jpTXT"),
            en_txt: dir.path().join("enTXT"),
            hdi_file: dir.path().join("game.hdi"),
        };
        std::fs::create_dir_all(&config.en_cc).unwrap();
        std::fs::write(config.en_cc.join("A001.CC"), b"fake compressed bytes").unwrap();

        let report = import_to_image::<NullImage>(&config).unwrap();
        assert_eq!(report.succeeded, 1);
    }
}
