//! Per-document results and the batch report.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::document::{
    folder_label, Bookmark, Classification, Document, DocumentKind, ExtractionMethod,
};
use super::page::{PageStatus, PageSummary};
use crate::error::FileError;

/// Outcome of processing one opened document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub path: PathBuf,
    pub byte_size: u64,
    pub page_count: u32,
    pub classification: Option<Classification>,
    pub method: Option<ExtractionMethod>,
    /// Concatenated text, `None` when the document failed.
    pub text: Option<String>,
    /// Normalised form of `text`, present when normalisation was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_text: Option<String>,
    pub pages: Vec<PageSummary>,
    /// Outline entries of the source, when it has any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bookmarks: Vec<Bookmark>,
    pub error: Option<FileError>,
    pub elapsed_ms: u64,
    /// Where the text artifact was written, if anywhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,
}

impl ProcessingResult {
    pub fn success(
        document: &Document,
        method: ExtractionMethod,
        text: String,
        pages: Vec<PageSummary>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            path: document.path.clone(),
            byte_size: document.byte_size,
            page_count: document.page_count,
            classification: document.classification,
            method: Some(method),
            text: Some(text),
            normalized_text: None,
            pages,
            bookmarks: document.bookmarks.clone(),
            error: None,
            elapsed_ms,
            artifact: None,
        }
    }

    pub fn failure(
        document: &Document,
        method: Option<ExtractionMethod>,
        pages: Vec<PageSummary>,
        error: FileError,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            path: document.path.clone(),
            byte_size: document.byte_size,
            page_count: document.page_count,
            classification: document.classification,
            method,
            text: None,
            normalized_text: None,
            pages,
            bookmarks: document.bookmarks.clone(),
            error: Some(error),
            elapsed_ms,
            artifact: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn kind(&self) -> Option<DocumentKind> {
        self.classification.map(|c| c.kind)
    }

    /// Text handed downstream: the normalised form when present.
    pub fn output_text(&self) -> Option<&str> {
        self.normalized_text.as_deref().or(self.text.as_deref())
    }

    pub fn count_pages(&self, status: PageStatus) -> usize {
        self.pages.iter().filter(|p| p.status == status).count()
    }
}

/// Everything a batch run produced, in input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<ProcessingResult>,
    /// Files that were never opened.
    pub errors: Vec<FileError>,
    /// Highest number of OCR engine calls observed running at once.
    pub peak_ocr_tasks: usize,
    pub elapsed_ms: u64,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.results.len() + self.errors.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// Path and text for every document that produced non-empty text.
    pub fn corpus(&self) -> Vec<(&Path, &str)> {
        self.results
            .iter()
            .filter_map(|r| {
                r.output_text()
                    .filter(|t| !t.trim().is_empty())
                    .map(|t| (r.path.as_path(), t))
            })
            .collect()
    }

    /// Enclosing folder name paired with text, for label-per-folder training sets.
    pub fn labelled_corpus(&self) -> Vec<(String, &str)> {
        self.corpus()
            .into_iter()
            .map(|(path, text)| (folder_label(path).unwrap_or_default(), text))
            .collect()
    }
}
