//! The `extract` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use docsift::config::mib_to_bytes;
use docsift::{BatchEvent, BatchProcessor, PageStatus, PipelineOptions, PopplerEngine};

use crate::cli::helpers::{collect_pdf_paths, print_summary};

#[derive(Args)]
pub struct ExtractArgs {
    /// PDF files or directories to search for PDFs
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Pages to process per document
    #[arg(short, long, env = "DOCSIFT_PAGES")]
    pages: Option<u32>,

    /// Render resolution for OCR
    #[arg(long, env = "DOCSIFT_DPI")]
    dpi: Option<u32>,

    /// Write a .txt file per document
    #[arg(short, long)]
    save: bool,

    /// Directory for .txt files
    #[arg(short, long, env = "DOCSIFT_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Normalise text (lowercase, stop words removed)
    #[arg(short, long)]
    normalise: bool,

    /// Largest accepted file in megabytes
    #[arg(long, env = "DOCSIFT_MAX_FILE_SIZE_MB")]
    max_file_size_mb: Option<u64>,

    /// Documents processed at once
    #[arg(long, env = "DOCSIFT_FILE_WORKERS")]
    file_workers: Option<usize>,

    /// OCR engine calls allowed at once across all documents
    #[arg(long, env = "DOCSIFT_OCR_WORKERS")]
    ocr_workers: Option<usize>,

    /// Seconds before an OCR page task is abandoned
    #[arg(long, env = "DOCSIFT_TASK_TIMEOUT")]
    timeout: Option<u64>,

    /// Pages sampled when classifying
    #[arg(long)]
    sample_size: Option<u32>,

    /// Milliseconds to pause between OCR dispatch rounds
    #[arg(long)]
    batch_pause_ms: Option<u64>,

    /// Tesseract language
    #[arg(short, long, env = "DOCSIFT_LANGUAGE")]
    language: Option<String>,

    /// Keep preprocessed page images in this directory
    #[arg(long)]
    save_images: Option<PathBuf>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

impl ExtractArgs {
    fn apply(&self, options: &mut PipelineOptions) {
        if let Some(pages) = self.pages {
            options.pages = pages;
        }
        if let Some(dpi) = self.dpi {
            options.dpi = dpi;
        }
        if self.save {
            options.save_as_text_file = true;
        }
        if let Some(ref dir) = self.output_dir {
            options.output_dir = dir.clone();
        }
        if self.normalise {
            options.normalise = true;
        }
        if let Some(mb) = self.max_file_size_mb {
            options.max_file_size_bytes = mib_to_bytes(mb);
        }
        if let Some(workers) = self.file_workers {
            options.max_file_workers = workers;
        }
        if let Some(workers) = self.ocr_workers {
            options.max_ocr_workers = workers;
        }
        if let Some(secs) = self.timeout {
            options.task_timeout = Duration::from_secs(secs);
        }
        if let Some(sample) = self.sample_size {
            options.sample_size = sample;
        }
        if let Some(ms) = self.batch_pause_ms {
            options.batch_pause = Duration::from_millis(ms);
        }
        if let Some(ref lang) = self.language {
            options.language = lang.clone();
        }
        if let Some(ref dir) = self.save_images {
            options.save_images_dir = Some(dir.clone());
        }
    }
}

/// Extract text from every PDF named on the command line.
pub async fn cmd_extract(args: ExtractArgs, mut options: PipelineOptions) -> anyhow::Result<()> {
    args.apply(&mut options);

    let paths = collect_pdf_paths(&args.paths)?;
    if paths.is_empty() {
        println!("{} No PDF files found", style("!").yellow());
        return Ok(());
    }

    // Let a stuck tool outlive its task slightly, then kill it
    let engine = PopplerEngine::new()
        .with_language(&options.language)
        .with_command_timeout(options.task_timeout + Duration::from_secs(5));

    let (event_tx, mut event_rx) = mpsc::channel::<BatchEvent>(100);
    let processor = BatchProcessor::new(Arc::new(engine), options).with_events(event_tx);

    let progress = ProgressBar::new(paths.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) {msg}",
            )?
            .progress_chars("█▓░"),
    );
    progress.enable_steady_tick(Duration::from_millis(120));

    let pb = progress.clone();
    let event_handler = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                BatchEvent::FileStarted { path } => {
                    if let Some(name) = path.file_name() {
                        pb.set_message(name.to_string_lossy().into_owned());
                    }
                }
                BatchEvent::PageOcrCompleted {
                    path,
                    page,
                    status: PageStatus::TimedOut,
                } => {
                    pb.suspend(|| {
                        eprintln!(
                            "  {} Page {} of {} timed out",
                            style("!").yellow(),
                            page + 1,
                            path.display()
                        );
                    });
                }
                BatchEvent::FileCompleted { .. } => pb.inc(1),
                BatchEvent::FileFailed { path, error, .. } => {
                    pb.suspend(|| {
                        eprintln!("  {} {}: {}", style("✗").red(), path.display(), error);
                    });
                    pb.inc(1);
                }
                BatchEvent::BatchCompleted { .. } => pb.finish_and_clear(),
                _ => {}
            }
        }
    });

    let report = processor.run(&paths).await;
    drop(processor);
    let _ = event_handler.await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}
