//! Poppler command-line adapter.
//!
//! `pdfinfo` for page counts, `pdftotext` for embedded text, `pdftoppm` for
//! rendering, and lopdf for inspecting page content streams.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use image::{DynamicImage, GrayImage};
use tempfile::TempDir;

use super::tesseract;
use super::tools::{find_page_image, handle_cmd_output, parse_page_count, run_with_deadline};
use super::{DocumentHandle, Engine};
use crate::error::EngineError;
use crate::models::Bookmark;

/// Content stream operators that put images or painted paths on a page.
const GRAPHICS_OPERATORS: [&str; 11] = ["Do", "BI", "f", "F", "f*", "S", "s", "B", "B*", "b", "b*"];

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Production engine backed by Poppler and Tesseract binaries.
#[derive(Debug, Clone)]
pub struct PopplerEngine {
    language: String,
    command_timeout: Duration,
}

impl Default for PopplerEngine {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

impl PopplerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set Tesseract language.
    pub fn with_language(mut self, lang: &str) -> Self {
        self.language = lang.to_string();
        self
    }

    /// Deadline applied to every external command.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}

impl Engine for PopplerEngine {
    type Handle = PopplerDocument;

    fn open(&self, path: &Path) -> Result<PopplerDocument, EngineError> {
        let mut cmd = Command::new("pdfinfo");
        cmd.arg(path);
        let output = run_with_deadline(cmd, "pdfinfo", self.command_timeout)?;
        let info = handle_cmd_output(output, EngineError::CorruptDocument)?;

        let page_count = parse_page_count(&info).ok_or_else(|| {
            EngineError::CorruptDocument(format!("no page count in pdfinfo output for {}", path.display()))
        })?;

        Ok(PopplerDocument {
            path: path.to_path_buf(),
            page_count,
            scratch: TempDir::new()?,
            pdf: None,
            command_timeout: self.command_timeout,
        })
    }

    fn recognize_text(&self, image: &GrayImage) -> Result<String, EngineError> {
        tesseract::recognize(image, &self.language, self.command_timeout)
    }
}

/// An open PDF. The scratch directory goes away with the handle.
pub struct PopplerDocument {
    path: PathBuf,
    page_count: u32,
    scratch: TempDir,
    /// Parsed lazily, on the first graphics or outline query.
    pdf: Option<lopdf::Document>,
    command_timeout: Duration,
}

impl PopplerDocument {
    fn check_page(&self, page: u32) -> Result<(), EngineError> {
        if page >= self.page_count {
            return Err(EngineError::page(
                page,
                format!("out of range for {} pages", self.page_count),
            ));
        }
        Ok(())
    }

    fn parsed(&mut self) -> Result<&lopdf::Document, lopdf::Error> {
        let doc = match self.pdf.take() {
            Some(doc) => doc,
            None => lopdf::Document::load(&self.path)?,
        };
        Ok(self.pdf.insert(doc))
    }
}

impl DocumentHandle for PopplerDocument {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn extract_text(&mut self, page: u32) -> Result<String, EngineError> {
        self.check_page(page)?;
        let page_str = (page + 1).to_string();

        let mut cmd = Command::new("pdftotext");
        cmd.args(["-layout", "-enc", "UTF-8", "-f", &page_str, "-l", &page_str])
            .arg(&self.path)
            .arg("-");
        let output = run_with_deadline(cmd, "pdftotext", self.command_timeout)?;
        handle_cmd_output(output, |stderr| EngineError::page(page, stderr))
    }

    fn has_graphics(&mut self, page: u32) -> Result<bool, EngineError> {
        self.check_page(page)?;
        let doc = self
            .parsed()
            .map_err(|e| EngineError::page(page, format!("lopdf: {}", e)))?;

        // lopdf numbers pages from 1
        let page_id = *doc
            .get_pages()
            .get(&(page + 1))
            .ok_or_else(|| EngineError::page(page, "page missing from page tree"))?;

        let content = doc
            .get_and_decode_page_content(page_id)
            .map_err(|e| EngineError::page(page, format!("content stream: {}", e)))?;

        Ok(content
            .operations
            .iter()
            .any(|op| GRAPHICS_OPERATORS.contains(&op.operator.as_str())))
    }

    fn render_image(&mut self, page: u32, dpi: u32) -> Result<DynamicImage, EngineError> {
        self.check_page(page)?;
        let page_num = page + 1;
        let page_str = page_num.to_string();
        let dpi_str = dpi.to_string();

        let mut cmd = Command::new("pdftoppm");
        cmd.args(["-png", "-r", &dpi_str, "-f", &page_str, "-l", &page_str])
            .arg(&self.path)
            .arg(self.scratch.path().join("page"));
        let output = run_with_deadline(cmd, "pdftoppm", self.command_timeout)?;
        handle_cmd_output(output, |stderr| EngineError::page(page, stderr))?;

        let image_path = find_page_image(self.scratch.path(), page_num)
            .ok_or_else(|| EngineError::page(page, "no image generated"))?;
        let image = image::open(&image_path)?;
        let _ = std::fs::remove_file(&image_path);
        Ok(image)
    }

    fn bookmarks(&mut self) -> Result<Vec<Bookmark>, EngineError> {
        let doc = self
            .parsed()
            .map_err(|e| EngineError::CorruptDocument(format!("lopdf: {}", e)))?;
        if !doc.catalog().is_ok_and(|catalog| catalog.has(b"Outlines")) {
            return Ok(Vec::new());
        }

        // lopdf panics on outline entries without a title or page reference
        let toc = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| doc.get_toc()))
            .map_err(|_| EngineError::CorruptDocument("malformed outline".to_string()))?;

        match toc {
            Ok(toc) => Ok(toc
                .toc
                .into_iter()
                .map(|entry| Bookmark {
                    level: entry.level as u32,
                    title: entry.title,
                    page: (entry.page as u32).saturating_sub(1),
                })
                .collect()),
            Err(lopdf::Error::NoOutlines) => Ok(Vec::new()),
            Err(e) => Err(EngineError::CorruptDocument(format!("outline: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_file_is_an_error() {
        let engine = PopplerEngine::new().with_command_timeout(Duration::from_secs(5));
        let result = engine.open(Path::new("/nonexistent/docsift/missing.pdf"));
        // Either pdfinfo rejects the file or pdfinfo is not installed
        assert!(matches!(
            result,
            Err(EngineError::CorruptDocument(_)) | Err(EngineError::ToolNotFound(_))
        ));
    }

    /// Two-page PDF, with an outline entry per page when `titles` is non-empty.
    fn write_pdf(path: &Path, titles: &[&str]) {
        use lopdf::{dictionary, Object};

        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_ids: Vec<_> = (0..2)
            .map(|_| {
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![0.into(), 0.into(), 200.into(), 200.into()],
                })
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => page_ids.iter().map(|&id| id.into()).collect::<Vec<Object>>(),
                "Count" => 2,
            }),
        );

        for (title, &page_id) in titles.iter().zip(&page_ids) {
            doc.add_bookmark(
                lopdf::Bookmark::new(title.to_string(), [0.0, 0.0, 0.0], 0, page_id),
                None,
            );
        }
        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        if let Some(outline_id) = doc.build_outline() {
            catalog.set("Outlines", outline_id);
        }
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    fn handle_for(path: &Path) -> PopplerDocument {
        PopplerDocument {
            path: path.to_path_buf(),
            page_count: 2,
            scratch: TempDir::new().unwrap(),
            pdf: None,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    #[test]
    fn test_bookmarks_follow_the_outline() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("outlined.pdf");
        write_pdf(&path, &["Introduction", "Results"]);

        let bookmarks = handle_for(&path).bookmarks().unwrap();
        assert_eq!(
            bookmarks,
            vec![
                Bookmark {
                    level: 1,
                    title: "Introduction".to_string(),
                    page: 0,
                },
                Bookmark {
                    level: 1,
                    title: "Results".to_string(),
                    page: 1,
                },
            ]
        );
    }

    #[test]
    fn test_document_without_outline_has_no_bookmarks() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plain.pdf");
        write_pdf(&path, &[]);

        assert!(handle_for(&path).bookmarks().unwrap().is_empty());
    }

    #[test]
    fn test_graphics_operators_cover_paint_and_images() {
        for op in ["Do", "BI", "f*", "B*"] {
            assert!(GRAPHICS_OPERATORS.contains(&op));
        }
        assert!(!GRAPHICS_OPERATORS.contains(&"Tj"));
    }
}
