//! Durable delivery queue rows.

use flightlab_core::queue::QueueState;
use flightlab_core::types::{DbId, JobId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `queue_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueueEntry {
    pub id: DbId,
    pub queue_name: String,
    pub job_id: JobId,
    pub state: String,
    /// Deliveries started so far, including the current one while active.
    pub attempts_made: i32,
    pub max_attempts: i32,
    pub backoff_ms: i64,
    pub available_at: Timestamp,
    pub leased_until: Option<Timestamp>,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl QueueEntry {
    pub fn state(&self) -> Option<QueueState> {
        QueueState::from_str(&self.state)
    }
}
