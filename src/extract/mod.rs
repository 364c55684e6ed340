//! Text extraction strategies.

pub mod digital;
pub mod ocr;

use crate::error::EngineError;
use crate::models::{join_pages, Page, PageSummary};

pub use digital::extract_digital;
pub use ocr::{extract_ocr, OcrJob, PageResultMap};

/// Pages produced by one strategy, plus their joined text.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub pages: Vec<Page>,
    pub text: String,
}

impl Extraction {
    pub fn from_pages(mut pages: Vec<Page>) -> Self {
        pages.sort_by_key(|p| p.index);
        let text = join_pages(&pages);
        Self { pages, text }
    }

    /// True when nothing but whitespace was extracted.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn summaries(&self) -> Vec<PageSummary> {
        self.pages.iter().map(Page::summary).collect()
    }
}

/// Page record for a failed engine call.
pub(crate) fn page_from_error(index: u32, err: &EngineError) -> Page {
    match err {
        EngineError::Timeout { .. } => Page::timed_out(index),
        other => Page::failed(index, other.kind()),
    }
}
