/*!
# Configuration

A small typed record of directory paths, loaded once per process invocation
and passed by reference into the batch driver. The core pipeline modules
never read it directly.
*/

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Recognised on-disk layout: original/rebuilt compressed scripts,
/// decompressed intermediates, translator text files, and the disk image
/// the rebuilt scripts are eventually written into.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory of original compressed scripts.
    pub jp_cc: PathBuf,
    /// Directory of rebuilt compressed scripts.
    pub en_cc: PathBuf,
    /// Decompressed-intermediate directory for the Japanese scripts.
    pub decompress_jp_cc: PathBuf,
    /// Decompressed-intermediate directory for the rebuilt scripts.
    pub decompress_en_cc: PathBuf,
    /// Translator text files for the Japanese scripts.
    pub jp_txt: PathBuf,
    /// Translator text files holding the translated lines.
    pub en_txt: PathBuf,
    /// Path to the FAT-formatted disk image the rebuilt scripts are
    /// written into.
    pub hdi_file: PathBuf,
}

impl Config {
    /// The fixed in-image directory scripts live under.
    pub const IMAGE_SCRIPT_DIR: &'static str = "/EVE/";

    /// Load and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// The in-image absolute path a given script filename maps to.
    pub fn image_path(&self, filename: &str) -> String {
        format!("{}{}", Self::IMAGE_SCRIPT_DIR, filename)
    }

    /// A config with every path set to a distinct placeholder, for tests
    /// that exercise the driver without a TOML file on disk.
    #[cfg(test)]
    pub fn default_paths() -> Self {
        Self {
            jp_cc: PathBuf::from("jpCC"),
            en_cc: PathBuf::from("enCC"),
            decompress_jp_cc: PathBuf::from("decompressJPCC"),
            decompress_en_cc: PathBuf::from("decompressENCC"),
            jp_txt: PathBuf::from("jpTXT"),
            en_txt: PathBuf::from("enTXT"),
            hdi_file: PathBuf::from("game.hdi"),
        }
    }
}
