//! Repository for `queue_entries`: durable at-least-once delivery.
//!
//! An entry is claimed with `FOR UPDATE SKIP LOCKED` so concurrent workers
//! never receive the same delivery. Claiming bumps `attempts_made` and sets
//! a lease; a worker that dies mid-job lets the lease lapse and the entry
//! becomes claimable again until its attempts run out.

use std::time::Duration;

use sqlx::PgPool;
use flightlab_core::queue::{QueueState, RetryDecision, RetryPolicy};
use flightlab_core::types::{DbId, JobId};

use crate::models::queue_entry::QueueEntry;

/// Column list for `queue_entries` queries.
const COLUMNS: &str = "\
    id, queue_name, job_id, state, attempts_made, max_attempts, backoff_ms, \
    available_at, leased_until, last_error, created_at, updated_at";

/// Error recorded on an entry whose lease ran out on its final attempt.
pub const LEASE_EXPIRED_ERROR: &str = "lease expired before the delivery was acknowledged";

fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// Provides enqueue, claim and acknowledgement for queue entries.
pub struct QueueRepo;

impl QueueRepo {
    /// Add a delivery for `job_id`, immediately available.
    pub async fn enqueue(
        pool: &PgPool,
        queue_name: &str,
        job_id: JobId,
        policy: &RetryPolicy,
    ) -> Result<QueueEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO queue_entries (queue_name, job_id, state, max_attempts, backoff_ms) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueueEntry>(&query)
            .bind(queue_name)
            .bind(job_id)
            .bind(QueueState::Waiting.as_str())
            .bind(i32::try_from(policy.max_attempts()).unwrap_or(i32::MAX))
            .bind(duration_ms(policy.backoff_base()))
            .fetch_one(pool)
            .await
    }

    /// Find an entry by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<QueueEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM queue_entries WHERE id = $1");
        sqlx::query_as::<_, QueueEntry>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All deliveries ever made for a job, oldest first.
    pub async fn list_by_job(pool: &PgPool, job_id: JobId) -> Result<Vec<QueueEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM queue_entries WHERE job_id = $1 ORDER BY id");
        sqlx::query_as::<_, QueueEntry>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }

    /// Claim the oldest deliverable entry and lease it for `lease`.
    ///
    /// Deliverable means waiting and due, or active with a lapsed lease and
    /// attempts remaining. Lapsed leases with no attempts left are moved to
    /// `dead` first.
    pub async fn claim_next(
        pool: &PgPool,
        queue_name: &str,
        lease: Duration,
    ) -> Result<Option<QueueEntry>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let dead = sqlx::query(
            "UPDATE queue_entries \
             SET state = $2, leased_until = NULL, last_error = COALESCE(last_error, $3) \
             WHERE queue_name = $1 AND state = $4 \
               AND leased_until < NOW() AND attempts_made >= max_attempts",
        )
        .bind(queue_name)
        .bind(QueueState::Dead.as_str())
        .bind(LEASE_EXPIRED_ERROR)
        .bind(QueueState::Active.as_str())
        .execute(&mut *tx)
        .await?;
        if dead.rows_affected() > 0 {
            tracing::warn!(
                queue = queue_name,
                count = dead.rows_affected(),
                "Dead-lettered entries with expired leases",
            );
        }

        let query = format!(
            "UPDATE queue_entries \
             SET state = $2, attempts_made = attempts_made + 1, \
                 leased_until = NOW() + ($3::BIGINT * INTERVAL '1 millisecond') \
             WHERE id = ( \
                 SELECT id FROM queue_entries \
                 WHERE queue_name = $1 \
                   AND ((state = $4 AND available_at <= NOW()) \
                     OR (state = $2 AND leased_until < NOW() AND attempts_made < max_attempts)) \
                 ORDER BY available_at, id \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        let claimed = sqlx::query_as::<_, QueueEntry>(&query)
            .bind(queue_name)
            .bind(QueueState::Active.as_str())
            .bind(duration_ms(lease))
            .bind(QueueState::Waiting.as_str())
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(claimed)
    }

    /// Acknowledge delivery number `attempt` of an entry. Returns `false` if
    /// that delivery no longer holds the entry (already settled,
    /// dead-lettered, or re-claimed after its lease lapsed).
    pub async fn complete(pool: &PgPool, id: DbId, attempt: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE queue_entries SET state = $2, leased_until = NULL \
             WHERE id = $1 AND state = $3 AND attempts_made = $4",
        )
        .bind(id)
        .bind(QueueState::Completed.as_str())
        .bind(QueueState::Active.as_str())
        .bind(attempt)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record that delivery number `attempt` failed. The entry goes back to
    /// `waiting` after its backoff delay, or to `dead` once attempts are
    /// exhausted.
    ///
    /// Returns the updated entry, or `None` if that delivery no longer holds
    /// the entry.
    pub async fn fail(
        pool: &PgPool,
        id: DbId,
        attempt: i32,
        error: &str,
    ) -> Result<Option<QueueEntry>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "SELECT {COLUMNS} FROM queue_entries \
             WHERE id = $1 AND state = $2 AND attempts_made = $3 \
             FOR UPDATE"
        );
        let Some(entry) = sqlx::query_as::<_, QueueEntry>(&query)
            .bind(id)
            .bind(QueueState::Active.as_str())
            .bind(attempt)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let policy = RetryPolicy::new(
            u32::try_from(entry.max_attempts).unwrap_or(1),
            Duration::from_millis(u64::try_from(entry.backoff_ms).unwrap_or(0)),
        )
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let attempts_made = u32::try_from(entry.attempts_made).unwrap_or(0);

        let (state, delay_ms) = match policy.decide(attempts_made) {
            RetryDecision::Retry { delay } => (QueueState::Waiting, duration_ms(delay)),
            RetryDecision::Exhausted => (QueueState::Dead, 0),
        };

        let query = format!(
            "UPDATE queue_entries \
             SET state = $2, last_error = $3, leased_until = NULL, \
                 available_at = NOW() + ($4::BIGINT * INTERVAL '1 millisecond') \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, QueueEntry>(&query)
            .bind(id)
            .bind(state.as_str())
            .bind(error)
            .bind(delay_ms)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }
}
