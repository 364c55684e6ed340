//! Processing of a single input file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

use super::types::BatchEvent;
use crate::classify::Classifier;
use crate::config::PipelineOptions;
use crate::coordinator::Coordinator;
use crate::engine::{DocumentHandle, Engine};
use crate::error::{ExtractError, FileError};
use crate::extract::{extract_digital, extract_ocr, Extraction, OcrJob};
use crate::models::{Document, DocumentKind, ExtractionMethod, ProcessingResult};
use crate::normalize::normalize_document;
use crate::storage::{save_text_artifact, ArtifactNames};

/// What a file worker hands back to the batch.
#[derive(Debug)]
pub(crate) enum FileOutcome {
    /// The document was opened; success or not, it has a result.
    Processed(ProcessingResult),
    /// The document was never opened.
    Rejected(FileError),
}

/// Everything a file worker needs, shared across workers.
pub(crate) struct FileContext<E: Engine> {
    pub engine: Arc<E>,
    pub coordinator: Arc<Coordinator>,
    pub options: Arc<PipelineOptions>,
    pub events: Option<mpsc::Sender<BatchEvent>>,
}

impl<E: Engine> FileContext<E> {
    pub async fn emit(&self, event: BatchEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}

enum Opened {
    Empty(Document),
    Ready {
        document: Document,
        digital: Option<Extraction>,
    },
}

/// Validate, open, classify and extract one file.
pub(crate) async fn process_file<E: Engine>(
    ctx: &FileContext<E>,
    names: &ArtifactNames,
    path: PathBuf,
) -> FileOutcome {
    let started = Instant::now();
    ctx.emit(BatchEvent::FileStarted { path: path.clone() }).await;

    let byte_size = match validate(&path, ctx.options.max_file_size_bytes).await {
        Ok(size) => size,
        Err(e) => return reject(ctx, &path, e).await,
    };

    let document = Document::new(path.clone(), byte_size, ctx.options.pages);
    let classifier = Classifier::new(ctx.options.sample_size, ctx.options.digital_text_threshold);
    let engine = ctx.engine.clone();

    let opened = tokio::task::spawn_blocking(move || {
        open_and_classify(engine.as_ref(), document, classifier)
    })
    .await;

    let opened = match opened {
        Ok(Ok(opened)) => opened,
        Ok(Err(e)) => return reject(ctx, &path, e).await,
        Err(e) => {
            tracing::error!("Open worker for {} panicked: {}", path.display(), e);
            return reject(ctx, &path, ExtractError::WorkerFailed(e.to_string())).await;
        }
    };

    let (document, digital) = match opened {
        Opened::Empty(document) => {
            let error = FileError::new(&path, &ExtractError::EmptyDocument);
            let result =
                ProcessingResult::failure(&document, None, Vec::new(), error, elapsed_ms(started));
            return finish(ctx, result).await;
        }
        Opened::Ready { document, digital } => (document, digital),
    };

    let kind = document
        .classification
        .map(|c| c.kind)
        .unwrap_or(DocumentKind::Indeterminate);
    tracing::info!("{}: classified as {}", document.file_name(), kind);
    ctx.emit(BatchEvent::FileClassified {
        path: path.clone(),
        kind,
    })
    .await;

    // Digital text wins whenever it is there; only Digital documents keep
    // blank text without trying OCR.
    let (method, extraction) = match digital {
        Some(d) if kind == DocumentKind::Digital || !d.is_blank() => (ExtractionMethod::Digital, d),
        _ => {
            if kind == DocumentKind::Indeterminate {
                tracing::info!(
                    "{}: no embedded text, falling back to OCR",
                    document.file_name()
                );
            }
            (ExtractionMethod::Ocr, run_ocr(ctx, &document).await)
        }
    };

    let result = if kind == DocumentKind::Indeterminate && extraction.is_blank() {
        let error = FileError::new(&path, &ExtractError::UnknownDocumentType);
        ProcessingResult::failure(
            &document,
            Some(method),
            extraction.summaries(),
            error,
            elapsed_ms(started),
        )
    } else {
        let summaries = extraction.summaries();
        let mut result = ProcessingResult::success(
            &document,
            method,
            extraction.text,
            summaries,
            elapsed_ms(started),
        );
        if ctx.options.normalise {
            result.normalized_text = result.text.as_deref().map(normalize_document);
        }
        if ctx.options.save_as_text_file {
            result.artifact = persist(names, &ctx.options.output_dir, &result).await;
        }
        result
    };

    finish(ctx, result).await
}

/// Fail fast on anything that makes opening pointless.
async fn validate(path: &Path, max_size: u64) -> Result<u64, ExtractError> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ExtractError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => {
            tracing::debug!("stat {} failed: {}", path.display(), e);
            return Err(ExtractError::PermissionDenied(path.to_path_buf()));
        }
    };
    if !metadata.is_file() {
        return Err(ExtractError::FileNotFound(path.to_path_buf()));
    }

    if tokio::fs::File::open(path).await.is_err() {
        return Err(ExtractError::PermissionDenied(path.to_path_buf()));
    }

    let size = metadata.len();
    if size > max_size {
        return Err(ExtractError::OversizedFile {
            size,
            limit: max_size,
        });
    }
    Ok(size)
}

fn open_and_classify<E: Engine>(
    engine: &E,
    mut document: Document,
    classifier: Classifier,
) -> Result<Opened, ExtractError> {
    let mut handle = engine.open(&document.path).map_err(ExtractError::from_open)?;
    document.page_count = handle.page_count();
    if document.page_count == 0 {
        handle.close();
        return Ok(Opened::Empty(document));
    }

    document.bookmarks = match handle.bookmarks() {
        Ok(bookmarks) => bookmarks,
        Err(e) => {
            tracing::warn!("{}: outline unreadable: {}", document.file_name(), e);
            Vec::new()
        }
    };

    let classification = classifier.classify(&mut handle);
    document.classification = Some(classification);

    let digital = match classification.kind {
        DocumentKind::Scanned => None,
        DocumentKind::Digital | DocumentKind::Indeterminate => {
            Some(extract_digital(&mut handle, document.pages_to_process()))
        }
    };

    // OCR workers open their own handles
    handle.close();
    Ok(Opened::Ready { document, digital })
}

async fn run_ocr<E: Engine>(ctx: &FileContext<E>, document: &Document) -> Extraction {
    let job = OcrJob {
        path: document.path.clone(),
        pages: document.pages_to_process(),
        dpi: ctx.options.dpi,
        save_images_dir: ctx.options.save_images_dir.clone(),
    };
    let extraction = extract_ocr(ctx.engine.clone(), &ctx.coordinator, &job).await;

    for page in &extraction.pages {
        ctx.emit(BatchEvent::PageOcrCompleted {
            path: document.path.clone(),
            page: page.index,
            status: page.status,
        })
        .await;
    }
    extraction
}

async fn persist(
    names: &ArtifactNames,
    output_dir: &Path,
    result: &ProcessingResult,
) -> Option<PathBuf> {
    let text = result.output_text()?;
    match save_text_artifact(names, output_dir, &result.path, text).await {
        Ok(saved) => saved,
        Err(e) => {
            tracing::warn!("Failed to save text for {}: {}", result.path.display(), e);
            None
        }
    }
}

async fn reject<E: Engine>(ctx: &FileContext<E>, path: &Path, err: ExtractError) -> FileOutcome {
    tracing::warn!("{}: {}", path.display(), err);
    let error = FileError::new(path, &err);
    ctx.emit(BatchEvent::FileFailed {
        path: path.to_path_buf(),
        kind: error.kind,
        error: error.message.clone(),
    })
    .await;
    FileOutcome::Rejected(error)
}

async fn finish<E: Engine>(ctx: &FileContext<E>, result: ProcessingResult) -> FileOutcome {
    let event = if let Some(error) = &result.error {
        tracing::warn!("{}: {}", result.path.display(), error.message);
        BatchEvent::FileFailed {
            path: result.path.clone(),
            kind: error.kind,
            error: error.message.clone(),
        }
    } else {
        let method = result.method.unwrap_or(ExtractionMethod::Digital);
        let chars = result.text.as_deref().map(|t| t.chars().count()).unwrap_or(0);
        tracing::info!(
            "{}: {} chars via {} in {}ms",
            result.path.display(),
            chars,
            method,
            result.elapsed_ms
        );
        BatchEvent::FileCompleted {
            path: result.path.clone(),
            method,
            chars,
        }
    };
    ctx.emit(event).await;
    FileOutcome::Processed(result)
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
