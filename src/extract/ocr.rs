//! OCR extraction: render, clean up and recognize each page under the
//! coordinator's limits.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use super::{page_from_error, Extraction};
use crate::coordinator::{Coordinator, TaskOutcome};
use crate::engine::{DocumentHandle, Engine};
use crate::error::{EngineError, ErrorKind};
use crate::models::Page;
use crate::preprocess::{preprocess, save_enhanced};

/// Page index to recognized text for one OCR run.
pub type PageResultMap = Arc<Mutex<BTreeMap<u32, String>>>;

/// What to OCR and how.
#[derive(Debug, Clone)]
pub struct OcrJob {
    pub path: PathBuf,
    /// Pages to process, counted from the first.
    pub pages: u32,
    pub dpi: u32,
    /// Where to keep preprocessed page images, if anywhere.
    pub save_images_dir: Option<PathBuf>,
}

/// OCR the first `job.pages` pages of a document.
///
/// Every task opens its own handle. Results are collected in a map created
/// for this run only, read exactly once after every task has finished or
/// been abandoned; anything an abandoned task writes later is ignored.
pub async fn extract_ocr<E: Engine>(
    engine: Arc<E>,
    coordinator: &Coordinator,
    job: &OcrJob,
) -> Extraction {
    let results: PageResultMap = Arc::new(Mutex::new(BTreeMap::new()));
    let pages: Vec<u32> = (0..job.pages).collect();

    let work = {
        let results = results.clone();
        let job = job.clone();
        move |page: u32| ocr_page(engine.as_ref(), &job, page, &results)
    };

    let outcomes = coordinator.run_page_tasks(&pages, work).await;

    let mut texts = match results.lock() {
        Ok(mut map) => std::mem::take(&mut *map),
        Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
    };

    let pages = outcomes
        .into_iter()
        .map(|(index, outcome)| match outcome {
            TaskOutcome::Completed => Page::success(index, texts.remove(&index).unwrap_or_default()),
            TaskOutcome::Failed(e) => {
                warn!("{}: OCR of page {} failed: {}", job.path.display(), index, e);
                page_from_error(index, &e)
            }
            TaskOutcome::TimedOut => Page::timed_out(index),
            TaskOutcome::Panicked(_) => Page::failed(index, ErrorKind::OcrError),
        })
        .collect();

    Extraction::from_pages(pages)
}

fn ocr_page<E: Engine>(
    engine: &E,
    job: &OcrJob,
    page: u32,
    results: &PageResultMap,
) -> Result<(), EngineError> {
    let mut handle = engine.open(&job.path)?;
    let rendered = handle.render_image(page, job.dpi)?;
    handle.close();

    let prepared = preprocess(&rendered);
    if let Some(dir) = &job.save_images_dir {
        if let Err(e) = save_enhanced(&prepared, dir, &job.path, page) {
            warn!("Could not save enhanced image for page {}: {}", page, e);
        }
    }

    let text = engine.recognize_text(&prepared)?;
    debug!("page {}: recognized {} chars", page, text.len());

    results
        .lock()
        .map_err(|_| EngineError::Ocr("page result map poisoned".to_string()))?
        .insert(page, text);
    Ok(())
}
