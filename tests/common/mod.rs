//! Scripted in-memory engine for driving the pipeline without Poppler.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{DynamicImage, GrayImage, Luma};
use tempfile::TempDir;

use docsift::{Bookmark, DocumentHandle, Engine, EngineError, PipelineOptions};

/// One scripted page.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    /// Embedded text, `None` when extraction fails.
    pub text: Option<String>,
    pub graphics: bool,
    /// What OCR returns, `None` when recognition fails.
    pub ocr_text: Option<String>,
    pub ocr_delay: Duration,
    pub render_fails: bool,
}

impl FakePage {
    /// Page with enough embedded text to count as digital.
    pub fn digital(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ocr_text: Some(format!("ocr:{}", text)),
            ..Default::default()
        }
    }

    /// Image-only page that OCR can read.
    pub fn scanned(ocr_text: &str) -> Self {
        Self {
            text: Some(String::new()),
            graphics: true,
            ocr_text: Some(ocr_text.to_string()),
            ..Default::default()
        }
    }

    /// Page with no text and no graphics.
    pub fn blank() -> Self {
        Self {
            text: Some(String::new()),
            ocr_text: Some(String::new()),
            ..Default::default()
        }
    }

    pub fn with_ocr_delay(mut self, delay: Duration) -> Self {
        self.ocr_delay = delay;
        self
    }
}

/// A scripted document.
#[derive(Debug, Clone, Default)]
pub struct FakeDoc {
    pub pages: Vec<FakePage>,
    pub corrupt: bool,
    /// Panic inside `open`, as a crashing native engine would.
    pub panics_on_open: bool,
    pub bookmarks: Vec<Bookmark>,
}

impl FakeDoc {
    pub fn new(pages: Vec<FakePage>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    pub fn corrupt() -> Self {
        Self {
            corrupt: true,
            ..Default::default()
        }
    }

    pub fn panicking() -> Self {
        Self {
            panics_on_open: true,
            ..Default::default()
        }
    }

    pub fn with_bookmarks(mut self, bookmarks: Vec<Bookmark>) -> Self {
        self.bookmarks = bookmarks;
        self
    }
}

#[derive(Debug, Default)]
pub struct Counters {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub active_ocr: AtomicUsize,
    pub peak_ocr: AtomicUsize,
    /// Paths `recognize_text` ran for.
    pub recognized: Mutex<Vec<PathBuf>>,
    pub opened: Mutex<Vec<PathBuf>>,
}

/// Engine that serves scripted documents.
///
/// Rendered images encode the document and page in their dimensions so
/// `recognize_text` can find its script after preprocessing.
pub struct FakeEngine {
    docs: Vec<(PathBuf, Arc<FakeDoc>)>,
    by_path: HashMap<PathBuf, usize>,
    pub counters: Arc<Counters>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            docs: Vec::new(),
            by_path: HashMap::new(),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn add(&mut self, path: &Path, doc: FakeDoc) {
        self.by_path.insert(path.to_path_buf(), self.docs.len());
        self.docs.push((path.to_path_buf(), Arc::new(doc)));
    }

    pub fn opens(&self) -> usize {
        self.counters.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }

    pub fn peak_ocr(&self) -> usize {
        self.counters.peak_ocr.load(Ordering::SeqCst)
    }

    pub fn was_opened(&self, path: &Path) -> bool {
        self.counters.opened.lock().unwrap().iter().any(|p| p == path)
    }

    pub fn recognize_calls_for(&self, path: &Path) -> usize {
        self.counters
            .recognized
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.as_path() == path)
            .count()
    }
}

pub struct FakeHandle {
    doc_index: usize,
    doc: Arc<FakeDoc>,
    counters: Arc<Counters>,
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}

const BASE_SIZE: u32 = 8;

impl DocumentHandle for FakeHandle {
    fn page_count(&self) -> u32 {
        self.doc.pages.len() as u32
    }

    fn extract_text(&mut self, page: u32) -> Result<String, EngineError> {
        self.doc.pages[page as usize]
            .text
            .clone()
            .ok_or_else(|| EngineError::page(page, "scripted text failure"))
    }

    fn has_graphics(&mut self, page: u32) -> Result<bool, EngineError> {
        Ok(self.doc.pages[page as usize].graphics)
    }

    fn render_image(&mut self, page: u32, _dpi: u32) -> Result<DynamicImage, EngineError> {
        if self.doc.pages[page as usize].render_fails {
            return Err(EngineError::page(page, "scripted render failure"));
        }
        let image = GrayImage::from_pixel(
            BASE_SIZE + page,
            BASE_SIZE + self.doc_index as u32,
            Luma([255]),
        );
        Ok(DynamicImage::ImageLuma8(image))
    }

    fn bookmarks(&mut self) -> Result<Vec<Bookmark>, EngineError> {
        Ok(self.doc.bookmarks.clone())
    }
}

impl Engine for FakeEngine {
    type Handle = FakeHandle;

    fn open(&self, path: &Path) -> Result<FakeHandle, EngineError> {
        self.counters.opened.lock().unwrap().push(path.to_path_buf());
        let index = *self
            .by_path
            .get(path)
            .ok_or_else(|| EngineError::CorruptDocument(format!("unscripted {}", path.display())))?;
        let doc = self.docs[index].1.clone();
        if doc.corrupt {
            return Err(EngineError::CorruptDocument("scripted corrupt".into()));
        }
        if doc.panics_on_open {
            panic!("scripted engine crash opening {}", path.display());
        }
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(FakeHandle {
            doc_index: index,
            doc,
            counters: self.counters.clone(),
        })
    }

    fn recognize_text(&self, image: &GrayImage) -> Result<String, EngineError> {
        let page = image.width() - BASE_SIZE;
        let doc_index = (image.height() - BASE_SIZE) as usize;
        let (path, doc) = &self.docs[doc_index];
        let script = &doc.pages[page as usize];

        let now = self.counters.active_ocr.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak_ocr.fetch_max(now, Ordering::SeqCst);
        self.counters.recognized.lock().unwrap().push(path.clone());

        std::thread::sleep(script.ocr_delay);
        self.counters.active_ocr.fetch_sub(1, Ordering::SeqCst);

        script
            .ocr_text
            .clone()
            .ok_or_else(|| EngineError::Ocr("scripted recognition failure".into()))
    }
}

/// Create a file of `size` bytes so validation passes; content is never read.
pub fn touch(dir: &TempDir, name: &str, size: u64) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let file = std::fs::File::create(&path).unwrap();
    file.set_len(size).unwrap();
    path
}

/// Options tuned for fast tests.
pub fn test_options(output_dir: &Path) -> PipelineOptions {
    PipelineOptions {
        batch_pause: Duration::ZERO,
        task_timeout: Duration::from_secs(10),
        output_dir: output_dir.to_path_buf(),
        ..PipelineOptions::default()
    }
}

/// Long enough to pass the digital text threshold.
pub fn paragraph(n: u32) -> String {
    format!("Page {} of a born-digital lecture on thermodynamics. ", n)
}
