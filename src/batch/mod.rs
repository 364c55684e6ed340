//! Batch orchestration.
//!
//! Files are handed to a bounded pool of workers; OCR work from all of them
//! shares the coordinator's permit pool. Results come back in input order and
//! every input path ends up either in `results` or in `errors`.

mod processing;
mod types;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::PipelineOptions;
use crate::coordinator::{Coordinator, CoordinatorState};
use crate::engine::Engine;
use crate::error::{ExtractError, FileError};
use crate::models::BatchReport;
use crate::storage::ArtifactNames;

use processing::{process_file, FileContext, FileOutcome};
pub use types::BatchEvent;

/// Runs batches of documents through one engine.
pub struct BatchProcessor<E: Engine> {
    ctx: Arc<FileContext<E>>,
}

impl<E: Engine> BatchProcessor<E> {
    pub fn new(engine: Arc<E>, options: PipelineOptions) -> Self {
        let coordinator = Arc::new(Coordinator::new(&options));
        Self {
            ctx: Arc::new(FileContext {
                engine,
                coordinator,
                options: Arc::new(options),
                events: None,
            }),
        }
    }

    /// Emit progress events on `tx`.
    ///
    /// Events are sent with backpressure: once the channel is full the batch
    /// waits for the receiver. Drain it concurrently with [`run`](Self::run),
    /// or give it room for every event, or the run will stall.
    pub fn with_events(self, tx: mpsc::Sender<BatchEvent>) -> Self {
        let ctx = &self.ctx;
        Self {
            ctx: Arc::new(FileContext {
                engine: ctx.engine.clone(),
                coordinator: ctx.coordinator.clone(),
                options: ctx.options.clone(),
                events: Some(tx),
            }),
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.ctx.options
    }

    /// Watch the coordinator move through Idle, Running, Draining, Done.
    pub fn subscribe_state(&self) -> watch::Receiver<CoordinatorState> {
        self.ctx.coordinator.subscribe()
    }

    /// Process every path and report on each of them, in input order.
    pub async fn run(&self, paths: &[PathBuf]) -> BatchReport {
        let started = Instant::now();
        let coordinator = &self.ctx.coordinator;
        coordinator.reset_peak();
        coordinator.transition(CoordinatorState::Running);
        self.ctx
            .emit(BatchEvent::BatchStarted {
                total_files: paths.len(),
            })
            .await;

        let names = Arc::new(ArtifactNames::new());
        let mut workers: Vec<(PathBuf, Option<JoinHandle<FileOutcome>>)> =
            Vec::with_capacity(paths.len());

        for path in paths {
            let slot = match coordinator.acquire_file_slot().await {
                Ok(slot) => slot,
                Err(e) => {
                    tracing::error!("No file slot for {}: {}", path.display(), e);
                    workers.push((path.clone(), None));
                    continue;
                }
            };

            let ctx = self.ctx.clone();
            let names = names.clone();
            let task_path = path.clone();
            let handle = tokio::spawn(async move {
                let _slot = slot;
                process_file(&ctx, &names, task_path).await
            });
            workers.push((path.clone(), Some(handle)));
        }

        coordinator.transition(CoordinatorState::Draining);

        let mut report = BatchReport::default();
        for (path, handle) in workers {
            let outcome = match handle {
                Some(handle) => handle.await,
                None => {
                    let err = ExtractError::WorkerFailed("no worker slot available".to_string());
                    report.errors.push(FileError::new(&path, &err));
                    continue;
                }
            };

            match outcome {
                Ok(FileOutcome::Processed(result)) => report.results.push(result),
                Ok(FileOutcome::Rejected(error)) => report.errors.push(error),
                Err(e) => {
                    tracing::error!("File worker for {} panicked: {}", path.display(), e);
                    let err = ExtractError::WorkerFailed(e.to_string());
                    let error = FileError::new(&path, &err);
                    self.ctx
                        .emit(BatchEvent::FileFailed {
                            path: path.clone(),
                            kind: error.kind,
                            error: error.message.clone(),
                        })
                        .await;
                    report.errors.push(error);
                }
            }
        }

        report.peak_ocr_tasks = coordinator.peak_ocr();
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        coordinator.transition(CoordinatorState::Done);

        tracing::info!(
            "Batch complete: {} succeeded, {} failed, peak OCR {}",
            report.succeeded(),
            report.failed(),
            report.peak_ocr_tasks
        );
        self.ctx
            .emit(BatchEvent::BatchCompleted {
                succeeded: report.succeeded(),
                failed: report.failed(),
                peak_ocr_tasks: report.peak_ocr_tasks,
            })
            .await;

        report
    }
}
