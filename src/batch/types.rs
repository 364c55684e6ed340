//! Batch events.

use std::path::PathBuf;

use crate::error::ErrorKind;
use crate::models::{DocumentKind, ExtractionMethod, PageStatus};

/// Events emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// Batch accepted its input
    BatchStarted { total_files: usize },
    /// A file worker picked up a path
    FileStarted { path: PathBuf },
    /// Classifier decided how to extract
    FileClassified { path: PathBuf, kind: DocumentKind },
    /// An OCR page task finished, timed out or failed
    PageOcrCompleted {
        path: PathBuf,
        page: u32,
        status: PageStatus,
    },
    /// A file produced text
    FileCompleted {
        path: PathBuf,
        method: ExtractionMethod,
        chars: usize,
    },
    /// A file failed, before or after opening
    FileFailed {
        path: PathBuf,
        kind: ErrorKind,
        error: String,
    },
    BatchCompleted {
        succeeded: usize,
        failed: usize,
        peak_ocr_tasks: usize,
    },
}
