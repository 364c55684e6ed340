//! CLI parser and command dispatch.

mod check;
mod extract;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use docsift::{Config, PipelineOptions};

pub use extract::ExtractArgs;

#[derive(Parser)]
#[command(name = "docsift")]
#[command(about = "Batch PDF text extraction with digital/scanned detection and OCR")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text from PDF files or directories of PDFs
    Extract(ExtractArgs),

    /// Check that the external PDF and OCR tools are installed
    Check,
}

/// Load the config file, explicit or discovered, and overlay it on defaults.
async fn load_options(config_path: Option<PathBuf>) -> anyhow::Result<PipelineOptions> {
    let config = match config_path {
        Some(path) => Config::load_from_path(&path)
            .await
            .map_err(anyhow::Error::msg)?,
        None => Config::load().await,
    };

    let base_dir = match config.base_dir() {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let mut options = PipelineOptions::default();
    config.apply_to_options(&mut options, &base_dir);
    Ok(options)
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract(args) => {
            let options = load_options(cli.config).await?;
            extract::cmd_extract(args, options).await
        }
        Commands::Check => check::cmd_check().await,
    }
}
