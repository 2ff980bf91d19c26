/*!
# evecc

A translation-patching toolchain for a legacy adventure game's scenario
scripts: decompress the shipped LZSS-compressed `.CC` files, extract their
dialogue into plain translator text files, inject a translator's rewritten
lines back into the decompressed scripts, recompress them, and write the
result into the game's FAT-formatted disk image.
*/

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[cfg(target_os = "linux")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use evecc::batch::{self, BatchReport, Side};
use evecc::config::Config;
use evecc::image::fat::FatImage;

#[derive(Parser)]
#[command(name = "evecc")]
#[command(author = "evecc contributors")]
#[command(version = "0.1.0")]
#[command(about = "Translation-patching toolchain for Eve Burst Error CC scenario scripts")]
struct Cli {
    /// Path to the TOML config file describing the project's directory layout.
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliSide {
    Jp,
    En,
}

impl From<CliSide> for Side {
    fn from(side: CliSide) -> Self {
        match side {
            CliSide::Jp => Side::Japanese,
            CliSide::En => Side::English,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Unpack compressed `.CC` scripts into decompressed intermediates.
    Decompress {
        #[arg(long, value_enum, default_value = "jp")]
        side: CliSide,
    },

    /// Recompress decompressed intermediates back into `.CC` scripts.
    Compress {
        #[arg(long, value_enum, default_value = "en")]
        side: CliSide,
    },

    /// Extract translator text from the Japanese decompressed scripts.
    Extract,

    /// Apply translator text files onto the Japanese decompressed
    /// scripts, producing rebuilt English decompressed scripts.
    Inject,

    /// Write rebuilt `.CC` scripts into the game's disk image.
    ImportToImage,

    /// Run inject, compress (English side), then import-to-image.
    All,
}

fn report_and_exit(label: &str, report: BatchReport) -> Result<()> {
    tracing::info!(
        succeeded = report.succeeded,
        partial = report.partial,
        failed = report.failed,
        overflow_bytes = report.overflow_bytes,
        skipped_records = report.skipped_records,
        "{label} complete"
    );

    if !report.is_full_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Decompress { side } => {
            let report = batch::decompress(&config, side.into())?;
            report_and_exit("decompress", report)?;
        }
        Commands::Compress { side } => {
            let report = batch::compress(&config, side.into())?;
            report_and_exit("compress", report)?;
        }
        Commands::Extract => {
            let report = batch::extract_all(&config)?;
            report_and_exit("extract", report)?;
        }
        Commands::Inject => {
            let report = batch::inject_all(&config)?;
            report_and_exit("inject", report)?;
        }
        Commands::ImportToImage => {
            let report = batch::import_to_image::<FatImage>(&config)?;
            report_and_exit("import-to-image", report)?;
        }
        Commands::All => {
            let report = batch::all::<FatImage>(&config)?;
            report_and_exit("all", report)?;
        }
    }

    Ok(())
}
