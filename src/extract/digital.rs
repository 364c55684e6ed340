//! Embedded-text extraction for digital-born documents.

use tracing::{debug, warn};

use super::{page_from_error, Extraction};
use crate::engine::DocumentHandle;
use crate::models::Page;

/// Read embedded text from the first `pages` pages.
///
/// A page that fails is recorded as failed and skipped; the rest still run.
pub fn extract_digital<H: DocumentHandle>(handle: &mut H, pages: u32) -> Extraction {
    let limit = pages.min(handle.page_count());
    let mut out = Vec::with_capacity(limit as usize);

    for index in 0..limit {
        match handle.extract_text(index) {
            Ok(text) => {
                debug!("page {}: {} bytes of embedded text", index, text.len());
                out.push(Page::success(index, text));
            }
            Err(e) => {
                warn!("page {} text extraction failed: {}", index, e);
                out.push(page_from_error(index, &e));
            }
        }
    }

    Extraction::from_pages(out)
}
