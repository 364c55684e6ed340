//! Engine adapter: the only way the pipeline touches PDF rendering, embedded
//! text and character recognition.
//!
//! Handles are opened per worker and never shared. Page indexes are 0-based
//! throughout; adapters translate to whatever numbering their backend uses.

mod poppler;
mod tesseract;
pub mod tools;

use std::path::Path;

use image::{DynamicImage, GrayImage};

use crate::error::EngineError;
use crate::models::Bookmark;

pub use poppler::{PopplerDocument, PopplerEngine};

/// An open document. Dropping the handle releases its resources.
pub trait DocumentHandle: Send {
    /// Total pages in the document.
    fn page_count(&self) -> u32;

    /// Embedded text of one page.
    fn extract_text(&mut self, page: u32) -> Result<String, EngineError>;

    /// Whether the page carries embedded images or vector drawings.
    fn has_graphics(&mut self, page: u32) -> Result<bool, EngineError>;

    /// Rasterize one page at the given resolution.
    fn render_image(&mut self, page: u32, dpi: u32) -> Result<DynamicImage, EngineError>;

    /// Outline entries in document order. Backends that cannot read
    /// outlines report none.
    fn bookmarks(&mut self) -> Result<Vec<Bookmark>, EngineError> {
        Ok(Vec::new())
    }

    /// Close the handle explicitly.
    fn close(self)
    where
        Self: Sized,
    {
        drop(self)
    }
}

/// Factory for document handles plus the OCR entry point.
pub trait Engine: Send + Sync + 'static {
    type Handle: DocumentHandle + 'static;

    /// Open a document, failing with `CorruptDocument` if it cannot be read.
    fn open(&self, path: &Path) -> Result<Self::Handle, EngineError>;

    /// Recognize text in a preprocessed page image.
    fn recognize_text(&self, image: &GrayImage) -> Result<String, EngineError>;
}
