//! Per-job state machine run by each worker.
//!
//! `QUEUED -> RUNNING -> {COMPLETED, FAILED}`. A redelivered job re-enters
//! `RUNNING` from `RUNNING` or `FAILED` and re-runs engine, import and sync
//! from scratch. A job that already reached `COMPLETED` is left alone.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use flightlab_core::engine::{EngineJobSpec, EngineOutput, EngineSupervisor};
use flightlab_core::run_log::merge_logs;
use flightlab_core::types::JobId;
use flightlab_db::models::job::Job;

use crate::artifact_sync::{sync_artifacts, SyncReport};
use crate::error::PipelineError;
use crate::importer::{import_results, ImportReport};
use crate::store::JobStore;

/// What processing a delivered job id amounted to. Every variant means the
/// delivery should be acknowledged.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Completed {
        exit_code: i32,
        import: ImportReport,
        artifacts: SyncReport,
    },
    /// The job had already completed on an earlier delivery.
    AlreadyCompleted,
    /// No such job; the delivery is dropped.
    Missing,
}

/// Runs the analysis pipeline for one job at a time per call. Shared by
/// all workers of a pool.
pub struct JobProcessor {
    store: Arc<dyn JobStore>,
    supervisor: EngineSupervisor,
    artifacts_root: PathBuf,
}

impl JobProcessor {
    pub fn new(
        store: Arc<dyn JobStore>,
        supervisor: EngineSupervisor,
        artifacts_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            supervisor,
            artifacts_root: artifacts_root.into(),
        }
    }

    /// Process one delivery of `job_id`.
    ///
    /// On failure the job is marked `FAILED` with the error text and the
    /// error is returned so the queue can schedule a retry.
    pub async fn process(&self, job_id: JobId) -> Result<ProcessOutcome, PipelineError> {
        let Some(job) = self.store.load(job_id).await? else {
            tracing::warn!(job_id = %job_id, "Job not found, dropping delivery");
            return Ok(ProcessOutcome::Missing);
        };

        if job.status()?.is_terminal() {
            tracing::info!(job_id = %job_id, "Job already completed, skipping redelivery");
            return Ok(ProcessOutcome::AlreadyCompleted);
        }

        let job = self.store.mark_running(job_id).await?;
        tracing::info!(job_id = %job_id, mode = %job.mode, "Job running");

        let start = Instant::now();
        match self.execute(&job).await {
            Ok((output, import, artifacts)) => {
                let log = merge_logs(&output.stdout, &output.stderr, start.elapsed());
                self.store
                    .mark_completed(job_id, output.exit_code, &log)
                    .await?;
                tracing::info!(
                    job_id = %job_id,
                    exit_code = output.exit_code,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    risk = %import.risk,
                    anomalies = import.anomaly_count,
                    artifacts = artifacts.total(),
                    "Job completed",
                );
                Ok(ProcessOutcome::Completed {
                    exit_code: output.exit_code,
                    import,
                    artifacts,
                })
            }
            Err(e) => {
                let message = e.to_string();
                let configuration =
                    matches!(&e, PipelineError::Engine(engine) if engine.is_configuration());
                tracing::error!(
                    job_id = %job_id,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    configuration,
                    error = %message,
                    "Job failed",
                );
                if let Err(store_err) = self
                    .store
                    .mark_failed(job_id, &message, e.exit_code())
                    .await
                {
                    tracing::error!(
                        job_id = %job_id,
                        error = %store_err,
                        "Failed to record job failure",
                    );
                }
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        job: &Job,
    ) -> Result<(EngineOutput, ImportReport, SyncReport), PipelineError> {
        let mode = job.mode()?;
        let output_dir = job.output_dir();

        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|source| PipelineError::OutputDir {
                path: output_dir.to_path_buf(),
                source,
            })?;

        let spec = EngineJobSpec {
            mode,
            input_path: job.input_path(),
            mission_id: &job.mission_id,
            aircraft: &job.aircraft,
            generate_pdf: job.should_generate_pdf,
            output_dir,
        };
        let output = self.supervisor.run(&spec).await?;

        let import = import_results(self.store.as_ref(), job).await?;
        let artifacts =
            sync_artifacts(self.store.as_ref(), job.id, output_dir, &self.artifacts_root).await?;

        Ok((output, import, artifacts))
    }
}
