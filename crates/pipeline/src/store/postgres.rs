//! [`JobStore`] backed by the `flightlab-db` repositories.

use async_trait::async_trait;
use flightlab_core::types::JobId;
use flightlab_db::models::anomaly::CreateAnomaly;
use flightlab_db::models::artifact::{CreateArtifact, UpsertOutcome};
use flightlab_db::models::flight_session::{CreateFlightSession, FlightSession};
use flightlab_db::models::job::{CreateJob, Job};
use flightlab_db::models::status::JobStatus;
use flightlab_db::repositories::{ArtifactRepo, FlightSessionRepo, JobRepo};
use flightlab_db::DbPool;

use super::{status_of, JobStore, StoreError};

#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: DbPool,
}

impl PgJobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Explain why a guarded update matched no row.
    async fn refused(&self, job_id: JobId, to: JobStatus) -> StoreError {
        match JobRepo::find_by_id(&self.pool, job_id).await {
            Ok(Some(job)) => match status_of(&job) {
                Ok(from) => StoreError::InvalidTransition { job_id, from, to },
                Err(e) => e,
            },
            Ok(None) => StoreError::NotFound(job_id),
            Err(e) => StoreError::Database(e),
        }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create_job(&self, input: &CreateJob) -> Result<Job, StoreError> {
        Ok(JobRepo::create(&self.pool, input).await?)
    }

    async fn load(&self, job_id: JobId) -> Result<Option<Job>, StoreError> {
        Ok(JobRepo::find_by_id(&self.pool, job_id).await?)
    }

    async fn mark_running(&self, job_id: JobId) -> Result<Job, StoreError> {
        match JobRepo::mark_running(&self.pool, job_id).await? {
            Some(job) => Ok(job),
            None => Err(self.refused(job_id, JobStatus::Running).await),
        }
    }

    async fn mark_completed(
        &self,
        job_id: JobId,
        exit_code: i32,
        log: &str,
    ) -> Result<Job, StoreError> {
        match JobRepo::mark_completed(&self.pool, job_id, exit_code, log).await? {
            Some(job) => Ok(job),
            None => Err(self.refused(job_id, JobStatus::Completed).await),
        }
    }

    async fn mark_failed(
        &self,
        job_id: JobId,
        error: &str,
        exit_code: Option<i32>,
    ) -> Result<Job, StoreError> {
        match JobRepo::mark_failed(&self.pool, job_id, error, exit_code).await? {
            Some(job) => Ok(job),
            None => Err(self.refused(job_id, JobStatus::Failed).await),
        }
    }

    async fn replace_session(
        &self,
        session: &CreateFlightSession,
        anomalies: &[CreateAnomaly],
    ) -> Result<FlightSession, StoreError> {
        Ok(FlightSessionRepo::replace_for_job(&self.pool, session, anomalies).await?)
    }

    async fn upsert_artifact(
        &self,
        artifact: &CreateArtifact,
    ) -> Result<UpsertOutcome, StoreError> {
        Ok(ArtifactRepo::upsert(&self.pool, artifact).await?)
    }
}
