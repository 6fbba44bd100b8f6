/*!
 * In-process background job queue.
 *
 * Jobs travel over a bounded tokio channel to a dispatcher task which runs
 * them on a `JoinSet`, limited by a semaphore to `concurrent_jobs` at a time.
 * `shutdown` closes the channel and waits for every accepted job.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info};
use parking_lot::Mutex;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};

use crate::errors::TranslationError;

use super::dispatcher::{DispatchStatus, JobQueue, TranslationJob};
use super::worker::TranslationWorker;

/// Counters of a background queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub enqueued: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl std::fmt::Display for QueueStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} enqueued, {} completed, {} skipped, {} failed",
            self.enqueued, self.completed, self.skipped, self.failed
        )
    }
}

#[derive(Debug, Default)]
struct QueueCounters {
    enqueued: AtomicUsize,
    completed: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl QueueCounters {
    fn snapshot(&self) -> QueueStats {
        QueueStats {
            enqueued: self.enqueued.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

#[derive(Debug)]
pub struct BackgroundQueue {
    sender: Mutex<Option<mpsc::Sender<TranslationJob>>>,
    runner: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<QueueCounters>,
}

impl BackgroundQueue {
    /// Start the queue on the current tokio runtime
    pub fn start(worker: TranslationWorker, concurrent_jobs: usize, capacity: usize) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let counters = Arc::new(QueueCounters::default());
        let runner = tokio::spawn(Self::run(
            Arc::new(worker),
            receiver,
            concurrent_jobs.max(1),
            counters.clone(),
        ));

        info!(
            "Background translation queue started ({} concurrent job(s), capacity {})",
            concurrent_jobs.max(1),
            capacity.max(1)
        );
        Arc::new(Self {
            sender: Mutex::new(Some(sender)),
            runner: Mutex::new(Some(runner)),
            counters,
        })
    }

    async fn run(
        worker: Arc<TranslationWorker>,
        mut receiver: mpsc::Receiver<TranslationJob>,
        concurrent_jobs: usize,
        counters: Arc<QueueCounters>,
    ) {
        let semaphore = Arc::new(Semaphore::new(concurrent_jobs));
        let mut tasks = JoinSet::new();

        while let Some(job) = receiver.recv().await {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let worker = worker.clone();
            let counters = counters.clone();

            tasks.spawn(async move {
                let _permit = permit;
                match worker.perform(&job).await {
                    Ok(DispatchStatus::Pinned) | Ok(DispatchStatus::Unchanged) => {
                        counters.skipped.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(_) => {
                        counters.completed.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => {
                        error!(
                            "Background job {} for {} failed: {}",
                            job.request(),
                            job.key(),
                            e
                        );
                        counters.failed.fetch_add(1, Ordering::SeqCst);
                    }
                }
            });

            while let Some(finished) = tasks.try_join_next() {
                if let Err(e) = finished {
                    error!("Background job task panicked: {}", e);
                }
            }
        }

        while let Some(finished) = tasks.join_next().await {
            if let Err(e) = finished {
                error!("Background job task panicked: {}", e);
            }
        }
        debug!("Background queue drained");
    }

    pub fn stats(&self) -> QueueStats {
        self.counters.snapshot()
    }

    /// Wait until every accepted job has finished; the queue keeps running
    pub async fn wait_idle(&self) -> QueueStats {
        loop {
            let stats = self.stats();
            if stats.completed + stats.skipped + stats.failed >= stats.enqueued {
                return stats;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Stop accepting jobs and wait for the accepted ones to finish
    pub async fn shutdown(&self) -> QueueStats {
        let sender = self.sender.lock().take();
        drop(sender);

        let runner = self.runner.lock().take();
        if let Some(runner) = runner {
            if let Err(e) = runner.await {
                error!("Background queue runner failed: {}", e);
            }
        }

        let stats = self.stats();
        info!("Background translation queue stopped: {}", stats);
        stats
    }
}

#[async_trait]
impl JobQueue for BackgroundQueue {
    async fn enqueue(&self, job: TranslationJob) -> Result<(), TranslationError> {
        let sender = self
            .sender
            .lock()
            .clone()
            .ok_or_else(|| TranslationError::Queue("queue is shut down".to_string()))?;

        debug!("Enqueueing {} for {}", job.request(), job.key());
        sender
            .send(job)
            .await
            .map_err(|_| TranslationError::Queue("queue runner has stopped".to_string()))?;
        self.counters.enqueued.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
