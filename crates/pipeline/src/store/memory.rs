//! In-process [`JobStore`] holding everything in a mutex-guarded map.
//!
//! Mirrors the PostgreSQL store's constraints (status transitions, one
//! session per job, unique artifact key) so pipeline behaviour can be
//! exercised without a database server.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use flightlab_core::types::{DbId, JobId};
use flightlab_db::models::anomaly::{Anomaly, CreateAnomaly};
use flightlab_db::models::artifact::{Artifact, CreateArtifact, UpsertOutcome};
use flightlab_db::models::flight_session::{CreateFlightSession, FlightSession};
use flightlab_db::models::job::{CreateJob, Job};
use flightlab_db::models::status::JobStatus;
use tokio::sync::Mutex;

use super::{status_of, JobStore, StoreError};

#[derive(Default)]
struct Inner {
    jobs: HashMap<JobId, Job>,
    sessions: HashMap<JobId, FlightSession>,
    anomalies: HashMap<DbId, Vec<Anomaly>>,
    artifacts: Vec<Artifact>,
    next_session_id: DbId,
    next_anomaly_id: DbId,
    next_artifact_id: DbId,
}

impl Inner {
    fn transition(&mut self, job_id: JobId, to: JobStatus) -> Result<&mut Job, StoreError> {
        let job = self.jobs.get_mut(&job_id).ok_or(StoreError::NotFound(job_id))?;
        let from = status_of(job)?;
        if !from.can_transition_to(to) {
            return Err(StoreError::InvalidTransition { job_id, from, to });
        }
        job.status_id = to.id();
        job.updated_at = Utc::now();
        Ok(job)
    }
}

#[derive(Default)]
pub struct MemoryJobStore {
    inner: Mutex<Inner>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn session_for(&self, job_id: JobId) -> Option<FlightSession> {
        self.inner.lock().await.sessions.get(&job_id).cloned()
    }

    /// Anomalies of the job's current session, in insertion order.
    pub async fn anomalies_for(&self, job_id: JobId) -> Vec<Anomaly> {
        let inner = self.inner.lock().await;
        inner
            .sessions
            .get(&job_id)
            .and_then(|s| inner.anomalies.get(&s.id))
            .cloned()
            .unwrap_or_default()
    }

    /// Total anomaly rows across all sessions.
    pub async fn anomaly_count(&self) -> usize {
        self.inner.lock().await.anomalies.values().map(Vec::len).sum()
    }

    pub async fn artifacts_for(&self, job_id: JobId) -> Vec<Artifact> {
        let mut rows: Vec<Artifact> = self
            .inner
            .lock()
            .await
            .artifacts
            .iter()
            .filter(|a| a.job_id == job_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (&a.kind, &a.file_name).cmp(&(&b.kind, &b.file_name)));
        rows
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_job(&self, input: &CreateJob) -> Result<Job, StoreError> {
        if input.mode.requires_input() && input.input_file_path.is_none() {
            return Err(StoreError::Rejected(format!(
                "{} job requires an input file path",
                input.mode
            )));
        }

        let mut inner = self.inner.lock().await;
        if inner.jobs.contains_key(&input.id) {
            return Err(StoreError::Rejected(format!("job {} already exists", input.id)));
        }
        if inner.jobs.values().any(|j| j.output_dir == input.output_dir) {
            return Err(StoreError::Rejected(format!(
                "output directory {} already assigned",
                input.output_dir
            )));
        }

        let now = Utc::now();
        let job = Job {
            id: input.id,
            mode: input.mode.as_str().to_string(),
            status_id: JobStatus::Queued.id(),
            mission_id: input.mission_id.clone(),
            aircraft: input.aircraft.clone(),
            input_filename: input.input_filename.clone(),
            input_file_path: input.input_file_path.clone(),
            should_generate_pdf: input.should_generate_pdf,
            output_dir: input.output_dir.clone(),
            started_at: None,
            finished_at: None,
            exit_code: None,
            log: None,
            error: None,
            created_at: now,
            updated_at: now,
        };
        inner.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn load(&self, job_id: JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.inner.lock().await.jobs.get(&job_id).cloned())
    }

    async fn mark_running(&self, job_id: JobId) -> Result<Job, StoreError> {
        let mut inner = self.inner.lock().await;
        let job = inner.transition(job_id, JobStatus::Running)?;
        job.started_at = Some(Utc::now());
        job.finished_at = None;
        job.exit_code = None;
        job.log = None;
        job.error = None;
        Ok(job.clone())
    }

    async fn mark_completed(
        &self,
        job_id: JobId,
        exit_code: i32,
        log: &str,
    ) -> Result<Job, StoreError> {
        let mut inner = self.inner.lock().await;
        let job = inner.transition(job_id, JobStatus::Completed)?;
        job.finished_at = Some(Utc::now());
        job.exit_code = Some(exit_code);
        job.log = Some(log.to_string());
        job.error = None;
        Ok(job.clone())
    }

    async fn mark_failed(
        &self,
        job_id: JobId,
        error: &str,
        exit_code: Option<i32>,
    ) -> Result<Job, StoreError> {
        let mut inner = self.inner.lock().await;
        let job = inner.transition(job_id, JobStatus::Failed)?;
        job.finished_at = Some(Utc::now());
        job.error = Some(error.to_string());
        job.exit_code = exit_code;
        Ok(job.clone())
    }

    async fn replace_session(
        &self,
        session: &CreateFlightSession,
        anomalies: &[CreateAnomaly],
    ) -> Result<FlightSession, StoreError> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if !inner.jobs.contains_key(&session.job_id) {
            return Err(StoreError::NotFound(session.job_id));
        }

        if let Some(old) = inner.sessions.remove(&session.job_id) {
            inner.anomalies.remove(&old.id);
        }

        inner.next_session_id += 1;
        let created = FlightSession {
            id: inner.next_session_id,
            job_id: session.job_id,
            source_session_id: session.source_session_id,
            mission_id: session.mission_id.clone(),
            aircraft_type: session.aircraft_type.clone(),
            start_time: session.start_time,
            end_time: session.end_time,
            stability_index: session.stability_index,
            sensor_reliability: session.sensor_reliability,
            mission_compliance: session.mission_compliance,
            risk_classification: session.risk_classification.as_str().to_string(),
            created_at: Utc::now(),
        };

        let mut rows = Vec::with_capacity(anomalies.len());
        for anomaly in anomalies {
            inner.next_anomaly_id += 1;
            rows.push(Anomaly {
                id: inner.next_anomaly_id,
                session_id: created.id,
                timestamp: anomaly.timestamp,
                anomaly_type: anomaly.anomaly_type.clone(),
                param_affected: anomaly.param_affected.clone(),
                severity: anomaly.severity.as_str().to_string(),
                details: anomaly.details.clone(),
            });
        }
        if !rows.is_empty() {
            inner.anomalies.insert(created.id, rows);
        }
        inner.sessions.insert(session.job_id, created.clone());
        Ok(created)
    }

    async fn upsert_artifact(
        &self,
        artifact: &CreateArtifact,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if !inner.jobs.contains_key(&artifact.job_id) {
            return Err(StoreError::NotFound(artifact.job_id));
        }

        let kind = artifact.kind.as_str();
        let existing = inner.artifacts.iter_mut().find(|a| {
            a.job_id == artifact.job_id && a.kind == kind && a.file_name == artifact.file_name
        });

        match existing {
            Some(row)
                if row.size_bytes == artifact.size_bytes
                    && row.relative_path == artifact.relative_path =>
            {
                Ok(UpsertOutcome::Unchanged)
            }
            Some(row) => {
                row.size_bytes = artifact.size_bytes;
                row.relative_path = artifact.relative_path.clone();
                row.updated_at = Utc::now();
                Ok(UpsertOutcome::Updated)
            }
            None => {
                inner.next_artifact_id += 1;
                let now = Utc::now();
                let row = Artifact {
                    id: inner.next_artifact_id,
                    job_id: artifact.job_id,
                    kind: kind.to_string(),
                    file_name: artifact.file_name.clone(),
                    relative_path: artifact.relative_path.clone(),
                    size_bytes: artifact.size_bytes,
                    created_at: now,
                    updated_at: now,
                };
                inner.artifacts.push(row);
                Ok(UpsertOutcome::Created)
            }
        }
    }
}
