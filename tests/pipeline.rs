//! Full pipeline round trip: a compressed script on disk goes through
//! decompress, extract, inject (with an edited translator text file),
//! compress, and import-to-image, and the shape of each stage's output
//! is checked against what the previous stage produced.

use evecc::batch::{self, Side};
use evecc::config::Config;
use evecc::image::NullImage;
use evecc::{container, lzss};

fn sample_body() -> Vec<u8> {
    // Two plain text records: "HI" and "BYE".
    let mut body = Vec::new();
    body.extend_from_slice(&[0xFD, 0x02, b'H', b'I', 0x00]);
    body.extend_from_slice(&[0xFD, 0x03, b'B', b'Y', b'E', 0x00]);
    body
}

fn write_sample_cc(path: &std::path::Path, body: &[u8]) {
    let mut header = [0u8; container::HEADER_LEN];
    header[0x14..0x16].copy_from_slice(&(body.len() as u16).to_le_bytes());
    let compressed = lzss::compress(body);
    let mut raw = Vec::new();
    raw.extend_from_slice(&header[..0x14]);
    raw.extend_from_slice(&compressed);
    std::fs::write(path, raw).unwrap();
}

fn test_config(root: &std::path::Path) -> Config {
    Config {
        jp_cc: root.join("jpCC"),
        en_cc: root.join("enCC"),
        decompress_jp_cc: root.join("decompressJPCC"),
        decompress_en_cc: root.join("decompressENCC"),
        jp_txt: root.join("jpTXT"),
        en_txt: root.join("enTXT"),
        hdi_file: root.join("game.hdi"),
    }
}

#[test]
fn decompress_extract_inject_compress_round_trips_unchanged_text() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    std::fs::create_dir_all(&config.jp_cc).unwrap();
    write_sample_cc(&config.jp_cc.join("A001.CC"), &sample_body());

    let decompress_report = batch::decompress(&config, Side::Japanese).unwrap();
    assert_eq!(decompress_report.succeeded, 1);
    assert_eq!(decompress_report.failed, 0);

    let extract_report = batch::extract_all(&config).unwrap();
    assert_eq!(extract_report.succeeded, 1);
    let extracted = std::fs::read_to_string(config.jp_txt.join("A001.txt")).unwrap();
    assert_eq!(extracted, "HI\nBYE\n");

    // Translator edits one line, leaves the other untouched.
    std::fs::create_dir_all(&config.en_txt).unwrap();
    std::fs::write(config.en_txt.join("A001.txt"), "HELLO\nBYE\n").unwrap();

    let inject_report = batch::inject_all(&config).unwrap();
    assert_eq!(inject_report.succeeded, 1);
    assert_eq!(inject_report.failed, 0);
    assert_eq!(inject_report.partial, 0);

    let compress_report = batch::compress(&config, Side::English).unwrap();
    assert_eq!(compress_report.succeeded, 1);
    assert!(config.en_cc.join("A001.CC").exists());

    // The recompressed file decompresses back to the edited text.
    let raw = std::fs::read(config.en_cc.join("A001.CC")).unwrap();
    let rebuilt = container::unframe(&raw).unwrap();
    let rebuilt_text = evecc::extract::extract(&rebuilt);
    assert_eq!(rebuilt_text, "HELLO\nBYE\n");
}

#[test]
fn inject_skips_files_with_no_translator_text_and_import_records_writes() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    std::fs::create_dir_all(&config.jp_cc).unwrap();
    write_sample_cc(&config.jp_cc.join("A002.CC"), &sample_body());
    batch::decompress(&config, Side::Japanese).unwrap();

    // No matching translator text file is ever written for A002.
    let inject_report = batch::inject_all(&config).unwrap();
    assert_eq!(inject_report.succeeded, 0);
    assert_eq!(inject_report.failed, 0);
    assert!(!config.decompress_en_cc.join("A002.CC").exists());

    // import-to-image still runs cleanly over whatever did make it to enCC.
    std::fs::create_dir_all(&config.en_cc).unwrap();
    write_sample_cc(&config.en_cc.join("A003.CC"), &sample_body());
    let import_report = batch::import_to_image::<NullImage>(&config).unwrap();
    assert_eq!(import_report.succeeded, 1);
}

#[test]
fn all_composite_runs_inject_compress_and_import_in_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    std::fs::create_dir_all(&config.jp_cc).unwrap();
    write_sample_cc(&config.jp_cc.join("A004.CC"), &sample_body());
    batch::decompress(&config, Side::Japanese).unwrap();

    std::fs::create_dir_all(&config.en_txt).unwrap();
    std::fs::write(config.en_txt.join("A004.txt"), "HI\nBYE\n").unwrap();

    let report = batch::all::<NullImage>(&config).unwrap();
    assert!(report.is_full_success());
    assert_eq!(report.succeeded, 1);
    assert!(config.en_cc.join("A004.CC").exists());
}
