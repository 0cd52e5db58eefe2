//! Job queue: at-least-once delivery of job ids to the worker pool.
//!
//! A claimed [`Delivery`] must be settled with [`JobQueue::ack`] or
//! [`JobQueue::nack`]. An unsettled delivery is redelivered once its lease
//! runs out. Failed deliveries are retried with exponential backoff until
//! the entry's attempts are used up, after which it is dead.

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use flightlab_core::types::{DbId, JobId};

use crate::store::StoreError;

pub use memory::MemoryJobQueue;
pub use postgres::PgJobQueue;

/// Queue name the analysis worker consumes.
pub const ANALYSIS_QUEUE: &str = "flight-analysis";

/// One claimed queue entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub entry_id: DbId,
    pub job_id: JobId,
    /// 1-based number of this delivery.
    pub attempt: u32,
    pub max_attempts: u32,
}

impl Delivery {
    pub fn is_final_attempt(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

/// Fate of a negatively acknowledged delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NackOutcome {
    /// Redelivered after `delay`.
    Retry { delay: Duration },
    /// Attempts exhausted.
    Dead,
    /// The entry was no longer leased to this worker; nothing changed.
    Stale,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Push a job id; returns the queue entry id.
    async fn enqueue(&self, job_id: JobId) -> Result<DbId, StoreError>;

    /// Claim the next due entry, if any.
    async fn claim(&self) -> Result<Option<Delivery>, StoreError>;

    /// Settle a delivery as handled. Never redelivered afterwards.
    async fn ack(&self, delivery: &Delivery) -> Result<(), StoreError>;

    /// Settle a delivery as failed with `error`.
    async fn nack(&self, delivery: &Delivery, error: &str) -> Result<NackOutcome, StoreError>;
}
