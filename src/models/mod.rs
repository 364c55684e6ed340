//! Data models for docsift.

mod document;
mod page;
mod report;

pub(crate) use document::folder_label;
pub use document::{Bookmark, Classification, Document, DocumentKind, ExtractionMethod};
pub use page::{join_pages, Page, PageStatus, PageSummary};
pub use report::{BatchReport, ProcessingResult};
