//! Job store: the lifecycle record of a job, its artifacts and its
//! imported session.
//!
//! Every method is atomic on its own. Status changes are refused unless
//! the current status allows them (see `JobStatus::sources_for`).

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use flightlab_core::types::JobId;
use flightlab_db::models::anomaly::CreateAnomaly;
use flightlab_db::models::artifact::{CreateArtifact, UpsertOutcome};
use flightlab_db::models::flight_session::{CreateFlightSession, FlightSession};
use flightlab_db::models::job::{CreateJob, Job};
use flightlab_db::models::status::JobStatus;

pub use memory::MemoryJobStore;
pub use postgres::PgJobStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("job {0} not found")]
    NotFound(JobId),

    #[error("job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("record rejected: {0}")]
    Rejected(String),

    #[error("job {job_id} has unknown status id {status_id}")]
    UnknownStatus { job_id: JobId, status_id: i16 },
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Record a new job in `QUEUED` status.
    async fn create_job(&self, input: &CreateJob) -> Result<Job, StoreError>;

    async fn load(&self, job_id: JobId) -> Result<Option<Job>, StoreError>;

    /// `RUNNING`, `started_at = now`, previous outcome cleared.
    async fn mark_running(&self, job_id: JobId) -> Result<Job, StoreError>;

    /// `COMPLETED`, `finished_at = now`, exit code and log set, error cleared.
    async fn mark_completed(
        &self,
        job_id: JobId,
        exit_code: i32,
        log: &str,
    ) -> Result<Job, StoreError>;

    /// `FAILED`, `finished_at = now`, error recorded.
    async fn mark_failed(
        &self,
        job_id: JobId,
        error: &str,
        exit_code: Option<i32>,
    ) -> Result<Job, StoreError>;

    /// Replace the job's session and anomalies in one transaction.
    async fn replace_session(
        &self,
        session: &CreateFlightSession,
        anomalies: &[CreateAnomaly],
    ) -> Result<FlightSession, StoreError>;

    /// Upsert keyed by `(job_id, kind, file_name)`.
    async fn upsert_artifact(&self, artifact: &CreateArtifact)
        -> Result<UpsertOutcome, StoreError>;
}

/// Status of `job`, or `StoreError::UnknownStatus` for a corrupt row.
pub(crate) fn status_of(job: &Job) -> Result<JobStatus, StoreError> {
    JobStatus::from_id(job.status_id).ok_or(StoreError::UnknownStatus {
        job_id: job.id,
        status_id: job.status_id,
    })
}
