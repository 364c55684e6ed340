//! Page models for per-page text extraction.

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Extraction status for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Text was extracted (possibly empty).
    Success,
    /// Page was not processed.
    Skipped,
    /// OCR task exceeded its timeout and was abandoned.
    TimedOut,
    /// Extraction or recognition failed for this page.
    Failed,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Skipped => "skipped",
            Self::TimedOut => "timed_out",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for PageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "skipped" => Ok(Self::Skipped),
            "timed_out" => Ok(Self::TimedOut),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown page status: {}", s)),
        }
    }
}

/// A single page of a document with its extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Page index (0-indexed).
    pub index: u32,
    /// Extracted text, empty unless `status` is `Success`.
    pub text: String,
    pub status: PageStatus,
    /// Why the page has no text, for non-success statuses.
    pub error: Option<ErrorKind>,
}

impl Page {
    pub fn success(index: u32, text: String) -> Self {
        Self {
            index,
            text,
            status: PageStatus::Success,
            error: None,
        }
    }

    pub fn failed(index: u32, error: ErrorKind) -> Self {
        Self {
            index,
            text: String::new(),
            status: PageStatus::Failed,
            error: Some(error),
        }
    }

    pub fn timed_out(index: u32) -> Self {
        Self {
            index,
            text: String::new(),
            status: PageStatus::TimedOut,
            error: Some(ErrorKind::TaskTimedOut),
        }
    }

    /// Number of non-whitespace characters in the page text.
    pub fn char_count(&self) -> usize {
        self.text.chars().filter(|c| !c.is_whitespace()).count()
    }

    /// Status-only summary kept in the processing result.
    pub fn summary(&self) -> PageSummary {
        PageSummary {
            index: self.index,
            status: self.status,
            chars: self.char_count(),
            error: self.error,
        }
    }
}

/// Per-page entry of a `ProcessingResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub index: u32,
    pub status: PageStatus,
    pub chars: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

/// Concatenate page texts in ascending index order.
///
/// Pages are sorted first so the caller's ordering never leaks into the text.
pub fn join_pages(pages: &[Page]) -> String {
    let mut ordered: Vec<&Page> = pages.iter().collect();
    ordered.sort_by_key(|p| p.index);
    ordered.iter().map(|p| p.text.as_str()).collect()
}
