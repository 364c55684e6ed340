//! Bounded concurrency for file workers and OCR engine calls.
//!
//! Two limits apply: a pool of file slots, and one semaphore of OCR permits
//! shared by every page task of every document. An OCR permit is moved into
//! the blocking task that uses the engine, so it is released only when that
//! call returns, even when the task that spawned it has been abandoned.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, AcquireError, OwnedSemaphorePermit, Semaphore};

use crate::config::PipelineOptions;
use crate::error::EngineError;

/// Lifecycle of one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    /// Accepting and dispatching work.
    Running,
    /// No new files; waiting for in-flight work.
    Draining,
    Done,
}

impl CoordinatorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Done => "done",
        }
    }
}

/// How a single page task ended.
#[derive(Debug)]
pub enum TaskOutcome {
    Completed,
    Failed(EngineError),
    TimedOut,
    Panicked(String),
}

/// Shared limits for a batch.
pub struct Coordinator {
    file_slots: Arc<Semaphore>,
    ocr_permits: Arc<Semaphore>,
    ocr_batch_size: usize,
    batch_pause: Duration,
    task_timeout: Duration,
    active_ocr: Arc<AtomicUsize>,
    peak_ocr: Arc<AtomicUsize>,
    state: watch::Sender<CoordinatorState>,
}

impl Coordinator {
    pub fn new(options: &PipelineOptions) -> Self {
        let max_ocr = options.max_ocr_workers.max(1);
        let (state, _) = watch::channel(CoordinatorState::Idle);
        Self {
            file_slots: Arc::new(Semaphore::new(options.max_file_workers.max(1))),
            ocr_permits: Arc::new(Semaphore::new(max_ocr)),
            ocr_batch_size: options.effective_ocr_batch_size(),
            batch_pause: options.batch_pause,
            task_timeout: options.task_timeout,
            active_ocr: Arc::new(AtomicUsize::new(0)),
            peak_ocr: Arc::new(AtomicUsize::new(0)),
            state,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.state.subscribe()
    }

    pub(crate) fn transition(&self, next: CoordinatorState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            tracing::info!("Coordinator {} -> {}", prev.as_str(), next.as_str());
        }
    }

    /// Wait for a free file worker slot.
    pub async fn acquire_file_slot(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        self.file_slots.clone().acquire_owned().await
    }

    /// OCR engine calls currently running.
    pub fn active_ocr(&self) -> usize {
        self.active_ocr.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent OCR engine calls seen so far.
    pub fn peak_ocr(&self) -> usize {
        self.peak_ocr.load(Ordering::SeqCst)
    }

    pub(crate) fn reset_peak(&self) {
        self.peak_ocr
            .store(self.active_ocr.load(Ordering::SeqCst), Ordering::SeqCst);
    }

    /// Run `work` for every page, in batches, under the OCR permit limit.
    ///
    /// The `task_timeout` clock starts once a task holds its permit, so it
    /// bounds the engine call and not the wait behind other documents. A
    /// call past its deadline is abandoned and reported as timed out; the
    /// next batch does not wait for it. Outcomes come back in `pages` order.
    pub async fn run_page_tasks<F>(&self, pages: &[u32], work: F) -> Vec<(u32, TaskOutcome)>
    where
        F: Fn(u32) -> Result<(), EngineError> + Send + Sync + 'static,
    {
        let work = Arc::new(work);
        let mut outcomes = Vec::with_capacity(pages.len());

        for (batch_no, batch) in pages.chunks(self.ocr_batch_size).enumerate() {
            if batch_no > 0 && !self.batch_pause.is_zero() {
                tokio::time::sleep(self.batch_pause).await;
            }

            let handles: Vec<_> = batch
                .iter()
                .map(|&page| (page, tokio::spawn(self.page_task(page, work.clone()))))
                .collect();

            for (page, handle) in handles {
                let outcome = match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::error!("OCR task for page {} panicked: {}", page, e);
                        TaskOutcome::Panicked(e.to_string())
                    }
                };
                outcomes.push((page, outcome));
            }
        }

        outcomes
    }

    fn page_task<F>(&self, page: u32, work: Arc<F>) -> impl Future<Output = TaskOutcome> + Send
    where
        F: Fn(u32) -> Result<(), EngineError> + Send + Sync + 'static,
    {
        let permits = self.ocr_permits.clone();
        let active = self.active_ocr.clone();
        let peak = self.peak_ocr.clone();
        let task_timeout = self.task_timeout;

        async move {
            let permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return TaskOutcome::Panicked("OCR semaphore closed".to_string()),
            };

            let call = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let _active = ActiveGuard::enter(active, &peak);
                work(page)
            });

            // A blocking call cannot be cancelled; on timeout it runs on
            // holding its permit and whatever it produces is ignored.
            match tokio::time::timeout(task_timeout, call).await {
                Ok(Ok(Ok(()))) => TaskOutcome::Completed,
                Ok(Ok(Err(e))) => TaskOutcome::Failed(e),
                Ok(Err(e)) => {
                    tracing::error!("OCR worker for page {} panicked: {}", page, e);
                    TaskOutcome::Panicked(e.to_string())
                }
                Err(_) => {
                    tracing::warn!("OCR task for page {} timed out after {:?}", page, task_timeout);
                    TaskOutcome::TimedOut
                }
            }
        }
    }
}

/// Counts a running engine call for as long as it is alive, panics included.
struct ActiveGuard {
    active: Arc<AtomicUsize>,
}

impl ActiveGuard {
    fn enter(active: Arc<AtomicUsize>, peak: &AtomicUsize) -> Self {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { active }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn options(max_ocr: usize, timeout_ms: u64) -> PipelineOptions {
        PipelineOptions {
            max_ocr_workers: max_ocr,
            task_timeout: Duration::from_millis(timeout_ms),
            batch_pause: Duration::ZERO,
            ..PipelineOptions::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_outcomes_follow_page_order() {
        let coordinator = Coordinator::new(&options(2, 5_000));
        let pages: Vec<u32> = (0..6).collect();

        let outcomes = coordinator
            .run_page_tasks(&pages, |page| {
                // Later pages finish first within a batch
                std::thread::sleep(Duration::from_millis(30 - (page as u64 % 2) * 20));
                Ok(())
            })
            .await;

        let order: Vec<u32> = outcomes.iter().map(|(p, _)| *p).collect();
        assert_eq!(order, pages);
        assert!(outcomes
            .iter()
            .all(|(_, o)| matches!(o, TaskOutcome::Completed)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_peak_never_exceeds_permits() {
        let coordinator = Coordinator::new(&PipelineOptions {
            ocr_batch_size: Some(2),
            ..options(2, 5_000)
        });
        let pages: Vec<u32> = (0..8).collect();

        coordinator
            .run_page_tasks(&pages, |_| {
                std::thread::sleep(Duration::from_millis(20));
                Ok(())
            })
            .await;

        assert!(coordinator.peak_ocr() <= 2);
        assert!(coordinator.peak_ocr() >= 1);
        assert_eq!(coordinator.active_ocr(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_slow_task_times_out_without_blocking_others() {
        let coordinator = Coordinator::new(&PipelineOptions {
            ocr_batch_size: Some(2),
            ..options(3, 200)
        });
        let finished = Arc::new(Mutex::new(Vec::new()));
        let log = finished.clone();

        let outcomes = coordinator
            .run_page_tasks(&[0, 1, 2, 3], move |page| {
                if page == 0 {
                    std::thread::sleep(Duration::from_millis(600));
                }
                log.lock().unwrap().push(page);
                Ok(())
            })
            .await;

        assert!(matches!(outcomes[0].1, TaskOutcome::TimedOut));
        for (_, outcome) in &outcomes[1..] {
            assert!(matches!(outcome, TaskOutcome::Completed));
        }
        let done = finished.lock().unwrap().clone();
        assert!(done.contains(&3));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_waiting_for_a_permit_does_not_count_against_the_timeout() {
        // One permit shared by two documents: every call waits behind the
        // others for longer than the timeout, but each call alone fits in it.
        let coordinator = Coordinator::new(&options(1, 250));
        let work = |_page: u32| {
            std::thread::sleep(Duration::from_millis(120));
            Ok(())
        };

        let (first, second) = tokio::join!(
            coordinator.run_page_tasks(&[0, 1], work),
            coordinator.run_page_tasks(&[0, 1], work),
        );

        for (_, outcome) in first.iter().chain(second.iter()) {
            assert!(matches!(outcome, TaskOutcome::Completed), "{:?}", outcome);
        }
        assert_eq!(coordinator.peak_ocr(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_errors_and_panics_are_contained() {
        let coordinator = Coordinator::new(&options(2, 5_000));
        let outcomes = coordinator
            .run_page_tasks(&[0, 1, 2], |page| match page {
                0 => Err(EngineError::Ocr("garbled".into())),
                1 => panic!("engine crashed"),
                _ => Ok(()),
            })
            .await;

        assert!(matches!(outcomes[0].1, TaskOutcome::Failed(EngineError::Ocr(_))));
        assert!(matches!(outcomes[1].1, TaskOutcome::Panicked(_)));
        assert!(matches!(outcomes[2].1, TaskOutcome::Completed));
        assert_eq!(coordinator.active_ocr(), 0);
    }

    #[tokio::test]
    async fn test_state_transitions_are_observable() {
        let coordinator = Coordinator::new(&PipelineOptions::default());
        let rx = coordinator.subscribe();
        assert_eq!(*rx.borrow(), CoordinatorState::Idle);

        coordinator.transition(CoordinatorState::Running);
        coordinator.transition(CoordinatorState::Draining);
        coordinator.transition(CoordinatorState::Done);
        assert_eq!(*rx.borrow(), CoordinatorState::Done);
        assert_eq!(coordinator.state(), CoordinatorState::Done);
    }
}
