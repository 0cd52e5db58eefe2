//! Bounded-concurrency worker pool.
//!
//! `concurrency` long-lived Tokio tasks each loop: claim a delivery, run
//! the job pipeline, settle the delivery. An idle worker waits
//! `poll_interval` before polling again. Cancellation stops new claims;
//! a job already in progress runs to completion first.

use std::sync::Arc;
use std::time::Duration;

use flightlab_pipeline::queue::{Delivery, JobQueue, NackOutcome};
use flightlab_pipeline::{JobProcessor, ProcessOutcome};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub struct WorkerPool {
    processor: Arc<JobProcessor>,
    queue: Arc<dyn JobQueue>,
    concurrency: usize,
    poll_interval: Duration,
}

impl WorkerPool {
    pub fn new(
        processor: Arc<JobProcessor>,
        queue: Arc<dyn JobQueue>,
        concurrency: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            processor,
            queue,
            concurrency: concurrency.max(1),
            poll_interval,
        }
    }

    /// Run all workers until `cancel` fires and every in-flight job has
    /// been settled.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            concurrency = self.concurrency,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Worker pool started",
        );

        let mut workers = JoinSet::new();
        for worker in 0..self.concurrency {
            let worker = Worker {
                id: worker,
                processor: Arc::clone(&self.processor),
                queue: Arc::clone(&self.queue),
                poll_interval: self.poll_interval,
            };
            workers.spawn(worker.run(cancel.clone()));
        }

        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Worker task aborted");
            }
        }

        tracing::info!("Worker pool stopped");
    }
}

struct Worker {
    id: usize,
    processor: Arc<JobProcessor>,
    queue: Arc<dyn JobQueue>,
    poll_interval: Duration,
}

impl Worker {
    async fn run(self, cancel: CancellationToken) {
        while !cancel.is_cancelled() {
            match self.queue.claim().await {
                Ok(Some(delivery)) => self.handle(delivery).await,
                Ok(None) => self.idle(&cancel).await,
                Err(e) => {
                    tracing::error!(worker = self.id, error = %e, "Queue claim failed");
                    self.idle(&cancel).await;
                }
            }
        }
        tracing::debug!(worker = self.id, "Worker stopping");
    }

    async fn idle(&self, cancel: &CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(self.poll_interval) => {}
        }
    }

    async fn handle(&self, delivery: Delivery) {
        tracing::debug!(
            worker = self.id,
            entry_id = delivery.entry_id,
            job_id = %delivery.job_id,
            attempt = delivery.attempt,
            max_attempts = delivery.max_attempts,
            "Entry claimed",
        );

        match self.processor.process(delivery.job_id).await {
            Ok(outcome) => {
                if let Err(e) = self.queue.ack(&delivery).await {
                    tracing::error!(
                        entry_id = delivery.entry_id,
                        job_id = %delivery.job_id,
                        error = %e,
                        "Failed to acknowledge entry",
                    );
                    return;
                }
                if let ProcessOutcome::Completed { .. } = outcome {
                    tracing::debug!(
                        entry_id = delivery.entry_id,
                        job_id = %delivery.job_id,
                        "Entry completed",
                    );
                }
            }
            Err(job_err) => match self.queue.nack(&delivery, &job_err.to_string()).await {
                Ok(NackOutcome::Retry { delay }) => tracing::warn!(
                    entry_id = delivery.entry_id,
                    job_id = %delivery.job_id,
                    attempt = delivery.attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retry scheduled",
                ),
                Ok(NackOutcome::Dead) => tracing::error!(
                    entry_id = delivery.entry_id,
                    job_id = %delivery.job_id,
                    attempts = delivery.attempt,
                    error = %job_err,
                    "Entry dead-lettered",
                ),
                Ok(NackOutcome::Stale) => tracing::warn!(
                    entry_id = delivery.entry_id,
                    job_id = %delivery.job_id,
                    "Entry lease lost before failure was recorded",
                ),
                Err(e) => tracing::error!(
                    entry_id = delivery.entry_id,
                    job_id = %delivery.job_id,
                    error = %e,
                    "Failed to record delivery failure",
                ),
            },
        }
    }
}
