//! Document models.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How the classifier decided a document should be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Embedded text found on a sampled page.
    Digital,
    /// No embedded text, but sampled pages carry images or drawings.
    Scanned,
    /// No signal either way.
    Indeterminate,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Digital => "digital",
            Self::Scanned => "scanned",
            Self::Indeterminate => "indeterminate",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classifier outcome together with the evidence it was based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub kind: DocumentKind,
    pub digital_count: u32,
    pub scanned_count: u32,
    /// Pages actually inspected.
    pub sampled: u32,
}

/// Strategy that produced a document's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Embedded text via the engine's text layer.
    Digital,
    /// Rendered page images through OCR.
    Ocr,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Digital => "digital",
            Self::Ocr => "ocr",
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of a document's outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Nesting depth, 1 for top-level entries.
    pub level: u32,
    pub title: String,
    /// Page index (0-indexed) the entry points at.
    pub page: u32,
}

/// One source file being processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub path: PathBuf,
    pub byte_size: u64,
    /// Total pages reported by the engine (0 until opened).
    pub page_count: u32,
    /// Maximum number of pages to process.
    pub requested_pages: u32,
    pub classification: Option<Classification>,
    /// Outline entries, empty when the document has none.
    pub bookmarks: Vec<Bookmark>,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, byte_size: u64, requested_pages: u32) -> Self {
        Self {
            path: path.into(),
            byte_size,
            page_count: 0,
            requested_pages,
            classification: None,
            bookmarks: Vec::new(),
        }
    }

    /// Number of pages the extractors should walk.
    pub fn pages_to_process(&self) -> u32 {
        self.requested_pages.min(self.page_count)
    }

    /// Source file name, for log and progress output.
    pub fn file_name(&self) -> String {
        file_name(&self.path)
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Name of the folder a source sits in, used as its training label.
pub(crate) fn folder_label(path: &Path) -> Option<String> {
    path.parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
}
