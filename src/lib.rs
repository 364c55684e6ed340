//! docsift - batch PDF text extraction.
//!
//! Each document is classified as digital or scanned by sampling its first
//! pages, then read either from its embedded text layer or by OCR of rendered
//! pages. OCR calls from all documents share one bounded permit pool.

pub mod batch;
pub mod classify;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod extract;
pub mod models;
pub mod normalize;
pub mod preprocess;
pub mod storage;

pub use batch::{BatchEvent, BatchProcessor};
pub use config::{Config, PipelineOptions};
pub use engine::{DocumentHandle, Engine, PopplerEngine};
pub use error::{EngineError, ErrorKind, ExtractError, FileError};
pub use models::{
    BatchReport, Bookmark, DocumentKind, ExtractionMethod, PageStatus, ProcessingResult,
};
