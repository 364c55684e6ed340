//! Error types for the extraction pipeline.
//!
//! Two layers: `EngineError` for anything the external document/OCR engine
//! reports (page-level, contained in page status), and `ExtractError` for
//! file-level failures that end up in the batch report.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by the engine adapter.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Corrupt document: {0}")]
    CorruptDocument(String),

    #[error("Page {page} extraction failed: {reason}")]
    PageExtraction { page: u32, reason: String },

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("{tool} exceeded its {secs}s deadline")]
    Timeout { tool: String, secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(String),
}

impl EngineError {
    pub fn page(page: u32, reason: impl Into<String>) -> Self {
        EngineError::PageExtraction {
            page,
            reason: reason.into(),
        }
    }

    /// Kind recorded against a page that failed with this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Ocr(_) => ErrorKind::OcrError,
            EngineError::Timeout { .. } => ErrorKind::TaskTimedOut,
            EngineError::ToolNotFound(_) => ErrorKind::EngineUnavailable,
            EngineError::CorruptDocument(_)
            | EngineError::PageExtraction { .. }
            | EngineError::Io(_)
            | EngineError::Image(_) => ErrorKind::PageExtractionError,
        }
    }
}

impl From<image::ImageError> for EngineError {
    fn from(e: image::ImageError) -> Self {
        EngineError::Image(e.to_string())
    }
}

/// File-level failures. A file with one of these never produced text.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("File too large: {size} bytes exceeds limit of {limit} bytes")]
    OversizedFile { size: u64, limit: u64 },

    #[error("Cannot open document: {0}")]
    CorruptDocument(String),

    #[error("Document has no pages")]
    EmptyDocument,

    #[error("No text or page graphics found, even after OCR fallback")]
    UnknownDocumentType,

    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Worker failed: {0}")]
    WorkerFailed(String),
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::FileNotFound(_) => ErrorKind::FileNotFound,
            ExtractError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            ExtractError::OversizedFile { .. } => ErrorKind::OversizedFile,
            ExtractError::CorruptDocument(_) => ErrorKind::CorruptDocument,
            ExtractError::EmptyDocument => ErrorKind::EmptyDocument,
            ExtractError::UnknownDocumentType => ErrorKind::UnknownDocumentType,
            ExtractError::EngineUnavailable(_) => ErrorKind::EngineUnavailable,
            ExtractError::WorkerFailed(_) => ErrorKind::WorkerFailed,
        }
    }

    /// Map a failure from `Engine::open` onto the file-level taxonomy.
    pub fn from_open(err: EngineError) -> Self {
        match err {
            EngineError::ToolNotFound(tool) => ExtractError::EngineUnavailable(tool),
            EngineError::CorruptDocument(reason) => ExtractError::CorruptDocument(reason),
            other => ExtractError::CorruptDocument(other.to_string()),
        }
    }
}

/// Flat discriminant of every failure the pipeline records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FileNotFound,
    PermissionDenied,
    OversizedFile,
    CorruptDocument,
    EmptyDocument,
    PageExtractionError,
    OcrError,
    TaskTimedOut,
    UnknownDocumentType,
    EngineUnavailable,
    WorkerFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::FileNotFound => "file_not_found",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::OversizedFile => "oversized_file",
            ErrorKind::CorruptDocument => "corrupt_document",
            ErrorKind::EmptyDocument => "empty_document",
            ErrorKind::PageExtractionError => "page_extraction_error",
            ErrorKind::OcrError => "ocr_error",
            ErrorKind::TaskTimedOut => "task_timed_out",
            ErrorKind::UnknownDocumentType => "unknown_document_type",
            ErrorKind::EngineUnavailable => "engine_unavailable",
            ErrorKind::WorkerFailed => "worker_failed",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Serializable record of a file-level failure, as stored in reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileError {
    pub path: PathBuf,
    pub kind: ErrorKind,
    pub message: String,
}

impl FileError {
    pub fn new(path: impl Into<PathBuf>, err: &ExtractError) -> Self {
        Self {
            path: path.into(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
