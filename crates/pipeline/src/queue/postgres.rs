//! [`JobQueue`] over the `queue_entries` table.

use std::time::Duration;

use async_trait::async_trait;
use flightlab_core::queue::{QueueState, RetryPolicy};
use flightlab_core::types::{DbId, JobId};
use flightlab_db::models::queue_entry::QueueEntry;
use flightlab_db::repositories::QueueRepo;
use flightlab_db::DbPool;

use super::{Delivery, JobQueue, NackOutcome};
use crate::store::StoreError;

#[derive(Debug, Clone)]
pub struct PgJobQueue {
    pool: DbPool,
    name: String,
    policy: RetryPolicy,
    lease: Duration,
}

impl PgJobQueue {
    /// `lease` must comfortably exceed the longest job, otherwise a slow
    /// but healthy run is redelivered to another worker.
    pub fn new(
        pool: DbPool,
        name: impl Into<String>,
        policy: RetryPolicy,
        lease: Duration,
    ) -> Self {
        Self {
            pool,
            name: name.into(),
            policy,
            lease,
        }
    }
}

fn to_delivery(entry: &QueueEntry) -> Delivery {
    Delivery {
        entry_id: entry.id,
        job_id: entry.job_id,
        attempt: u32::try_from(entry.attempts_made).unwrap_or(0),
        max_attempts: u32::try_from(entry.max_attempts).unwrap_or(1),
    }
}

/// Out-of-range attempt numbers match no row and settle as stale.
fn attempt_no(delivery: &Delivery) -> i32 {
    i32::try_from(delivery.attempt).unwrap_or(i32::MAX)
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(&self, job_id: JobId) -> Result<DbId, StoreError> {
        let entry = QueueRepo::enqueue(&self.pool, &self.name, job_id, &self.policy).await?;
        Ok(entry.id)
    }

    async fn claim(&self) -> Result<Option<Delivery>, StoreError> {
        let entry = QueueRepo::claim_next(&self.pool, &self.name, self.lease).await?;
        Ok(entry.as_ref().map(to_delivery))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), StoreError> {
        if !QueueRepo::complete(&self.pool, delivery.entry_id, attempt_no(delivery)).await? {
            tracing::warn!(
                entry_id = delivery.entry_id,
                job_id = %delivery.job_id,
                attempt = delivery.attempt,
                "Acknowledged delivery no longer holds the entry",
            );
        }
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery, error: &str) -> Result<NackOutcome, StoreError> {
        let attempt = attempt_no(delivery);
        let Some(entry) = QueueRepo::fail(&self.pool, delivery.entry_id, attempt, error).await?
        else {
            return Ok(NackOutcome::Stale);
        };

        Ok(match entry.state() {
            Some(QueueState::Waiting) => {
                let delay = (entry.available_at - chrono::Utc::now())
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                NackOutcome::Retry { delay }
            }
            _ => NackOutcome::Dead,
        })
    }
}
