//! In-process [`JobQueue`] with the same lease, retry and dead-letter
//! semantics as the PostgreSQL queue.
//!
//! Uses `tokio::time::Instant` so tests can drive backoff with a paused
//! clock.

use std::time::Duration;

use async_trait::async_trait;
use flightlab_core::queue::{QueueState, RetryDecision, RetryPolicy};
use flightlab_core::types::{DbId, JobId};
use flightlab_db::repositories::queue_repo::LEASE_EXPIRED_ERROR;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{Delivery, JobQueue, NackOutcome};
use crate::store::StoreError;

/// Default lease for in-memory deliveries.
const DEFAULT_LEASE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct Entry {
    id: DbId,
    job_id: JobId,
    state: QueueState,
    attempts_made: u32,
    available_at: Instant,
    leased_until: Option<Instant>,
    last_error: Option<String>,
}

impl Entry {
    fn lease_expired(&self, now: Instant) -> bool {
        self.state == QueueState::Active && self.leased_until.is_some_and(|t| t < now)
    }

    /// Whether `delivery` is the claim currently holding this entry.
    fn holds(&self, delivery: &Delivery) -> bool {
        self.id == delivery.entry_id
            && self.state == QueueState::Active
            && self.attempts_made == delivery.attempt
    }
}

/// Snapshot of an entry for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySnapshot {
    pub job_id: JobId,
    pub state: QueueState,
    pub attempts_made: u32,
    pub last_error: Option<String>,
}

pub struct MemoryJobQueue {
    policy: RetryPolicy,
    lease: Duration,
    entries: Mutex<Vec<Entry>>,
}

impl MemoryJobQueue {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_lease(policy, DEFAULT_LEASE)
    }

    pub fn with_lease(policy: RetryPolicy, lease: Duration) -> Self {
        Self {
            policy,
            lease,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub async fn entry(&self, entry_id: DbId) -> Option<EntrySnapshot> {
        self.entries
            .lock()
            .await
            .iter()
            .find(|e| e.id == entry_id)
            .map(|e| EntrySnapshot {
                job_id: e.job_id,
                state: e.state,
                attempts_made: e.attempts_made,
                last_error: e.last_error.clone(),
            })
    }

    /// Number of entries in `state`.
    pub async fn count(&self, state: QueueState) -> usize {
        self.entries
            .lock()
            .await
            .iter()
            .filter(|e| e.state == state)
            .count()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job_id: JobId) -> Result<DbId, StoreError> {
        let mut entries = self.entries.lock().await;
        let id = DbId::try_from(entries.len()).unwrap_or(DbId::MAX) + 1;
        entries.push(Entry {
            id,
            job_id,
            state: QueueState::Waiting,
            attempts_made: 0,
            available_at: Instant::now(),
            leased_until: None,
            last_error: None,
        });
        Ok(id)
    }

    async fn claim(&self) -> Result<Option<Delivery>, StoreError> {
        let now = Instant::now();
        let max_attempts = self.policy.max_attempts();
        let mut entries = self.entries.lock().await;

        for entry in entries.iter_mut() {
            if entry.lease_expired(now) && entry.attempts_made >= max_attempts {
                entry.state = QueueState::Dead;
                entry.leased_until = None;
                entry
                    .last_error
                    .get_or_insert_with(|| LEASE_EXPIRED_ERROR.to_string());
            }
        }

        let next = entries
            .iter_mut()
            .filter(|e| {
                (e.state == QueueState::Waiting && e.available_at <= now) || e.lease_expired(now)
            })
            .min_by_key(|e| (e.available_at, e.id));

        Ok(next.map(|entry| {
            entry.state = QueueState::Active;
            entry.attempts_made += 1;
            entry.leased_until = Some(now + self.lease);
            Delivery {
                entry_id: entry.id,
                job_id: entry.job_id,
                attempt: entry.attempts_made,
                max_attempts,
            }
        }))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries
            .iter_mut()
            .find(|e| e.holds(delivery))
        {
            entry.state = QueueState::Completed;
            entry.leased_until = None;
        }
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery, error: &str) -> Result<NackOutcome, StoreError> {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries
            .iter_mut()
            .find(|e| e.holds(delivery))
        else {
            return Ok(NackOutcome::Stale);
        };

        entry.last_error = Some(error.to_string());
        entry.leased_until = None;
        Ok(match self.policy.decide(entry.attempts_made) {
            RetryDecision::Retry { delay } => {
                entry.state = QueueState::Waiting;
                entry.available_at = Instant::now() + delay;
                NackOutcome::Retry { delay }
            }
            RetryDecision::Exhausted => {
                entry.state = QueueState::Dead;
                NackOutcome::Dead
            }
        })
    }
}
