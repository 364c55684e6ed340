//! Digital versus scanned detection by sampling the first pages.

use tracing::debug;

use crate::engine::DocumentHandle;
use crate::models::{Classification, DocumentKind};

pub const DEFAULT_SAMPLE_SIZE: u32 = 3;
/// Trimmed characters a page needs before it counts as digital text.
pub const DEFAULT_TEXT_THRESHOLD: usize = 25;

/// Sampling policy for the classifier.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    pub sample_size: u32,
    pub text_threshold: usize,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            text_threshold: DEFAULT_TEXT_THRESHOLD,
        }
    }
}

impl Classifier {
    pub fn new(sample_size: u32, text_threshold: usize) -> Self {
        Self {
            sample_size,
            text_threshold,
        }
    }

    /// Classify an open document.
    ///
    /// Stops at the first page with enough embedded text. Only when no page
    /// has text are the sampled pages checked for images or drawings. Page
    /// errors while sampling count as no signal.
    pub fn classify<H: DocumentHandle>(&self, handle: &mut H) -> Classification {
        let sampled = self.sample_size.min(handle.page_count());
        let mut digital_count = 0;

        for page in 0..sampled {
            match handle.extract_text(page) {
                Ok(text) if text.trim().chars().count() > self.text_threshold => {
                    digital_count += 1;
                    debug!("page {} has embedded text", page);
                    break;
                }
                Ok(_) => {}
                Err(e) => debug!("page {} text sample failed: {}", page, e),
            }
        }

        let mut scanned_count = 0;
        if digital_count == 0 {
            for page in 0..sampled {
                match handle.has_graphics(page) {
                    Ok(true) => scanned_count += 1,
                    Ok(false) => {}
                    Err(e) => debug!("page {} graphics check failed: {}", page, e),
                }
            }
        }

        let kind = if digital_count > 0 {
            DocumentKind::Digital
        } else if scanned_count > 0 {
            DocumentKind::Scanned
        } else {
            DocumentKind::Indeterminate
        };

        Classification {
            kind,
            digital_count,
            scanned_count,
            sampled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use image::DynamicImage;

    /// Per-page script: text result and graphics flag.
    struct Scripted {
        pages: Vec<(Result<&'static str, ()>, bool)>,
        text_calls: u32,
        graphics_calls: u32,
    }

    impl Scripted {
        fn new(pages: Vec<(Result<&'static str, ()>, bool)>) -> Self {
            Self {
                pages,
                text_calls: 0,
                graphics_calls: 0,
            }
        }
    }

    impl DocumentHandle for Scripted {
        fn page_count(&self) -> u32 {
            self.pages.len() as u32
        }

        fn extract_text(&mut self, page: u32) -> Result<String, EngineError> {
            self.text_calls += 1;
            self.pages[page as usize]
                .0
                .map(str::to_string)
                .map_err(|_| EngineError::page(page, "scripted"))
        }

        fn has_graphics(&mut self, page: u32) -> Result<bool, EngineError> {
            self.graphics_calls += 1;
            Ok(self.pages[page as usize].1)
        }

        fn render_image(&mut self, page: u32, _dpi: u32) -> Result<DynamicImage, EngineError> {
            Err(EngineError::page(page, "not rendered in tests"))
        }
    }

    const LONG: &str = "This paragraph is comfortably longer than the threshold.";

    #[test]
    fn test_first_text_page_exits_early() {
        let mut h = Scripted::new(vec![(Ok(""), true), (Ok(LONG), false), (Ok(LONG), false)]);
        let c = Classifier::default().classify(&mut h);
        assert_eq!(c.kind, DocumentKind::Digital);
        assert_eq!(c.digital_count, 1);
        assert_eq!(h.text_calls, 2);
        assert_eq!(h.graphics_calls, 0);
    }

    #[test]
    fn test_graphics_without_text_is_scanned() {
        let mut h = Scripted::new(vec![(Ok("  "), true), (Err(()), true), (Ok("x"), false)]);
        let c = Classifier::default().classify(&mut h);
        assert_eq!(c.kind, DocumentKind::Scanned);
        assert_eq!(c.scanned_count, 2);
        assert_eq!(c.sampled, 3);
    }

    #[test]
    fn test_no_signal_is_indeterminate() {
        let mut h = Scripted::new(vec![(Ok(""), false), (Err(()), false)]);
        let c = Classifier::default().classify(&mut h);
        assert_eq!(c.kind, DocumentKind::Indeterminate);
        assert_eq!(c.sampled, 2);
    }

    #[test]
    fn test_threshold_is_on_trimmed_length() {
        // 25 visible characters padded with whitespace is not enough
        let mut h = Scripted::new(vec![(Ok("   abcdefghijklmnopqrstuvwxy   "), false)]);
        let c = Classifier::default().classify(&mut h);
        assert_eq!(c.kind, DocumentKind::Indeterminate);
    }

    #[test]
    fn test_sample_size_limits_pages_read() {
        let mut h = Scripted::new(vec![(Ok(""), false); 8]);
        Classifier::new(5, 25).classify(&mut h);
        assert_eq!(h.text_calls, 5);
        assert_eq!(h.graphics_calls, 5);
    }
}
