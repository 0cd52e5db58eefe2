//! Job intake: records a new analysis job and queues it.
//!
//! The output directory `<artifacts_root>/<job_id>` is created up front.
//! An uploaded file is written to `<output_dir>/input.csv` and recorded as
//! the job's `INPUT` artifact before the job is queued.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use flightlab_core::artifact::{ArtifactKind, INPUT_FILE_NAME};
use flightlab_core::job::{JobMode, DEFAULT_AIRCRAFT, DEFAULT_MISSION_ID};
use flightlab_core::types::DbId;
use flightlab_db::models::artifact::CreateArtifact;
use flightlab_db::models::job::{CreateJob, Job};
use uuid::Uuid;

use crate::artifact_sync::relative_artifact_path;
use crate::queue::JobQueue;
use crate::store::{JobStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("{mode} jobs require an uploaded input file")]
    MissingUpload { mode: JobMode },

    #[error("failed to prepare {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// An uploaded flight data file.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Name the client gave the file.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// A request to analyze flight data. Blank mission and aircraft fall back
/// to `TEST-001` and `UNKNOWN`.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub mode: JobMode,
    pub mission_id: Option<String>,
    pub aircraft: Option<String>,
    pub generate_pdf: bool,
    pub upload: Option<Upload>,
}

/// A created and queued job.
#[derive(Debug, Clone)]
pub struct Submitted {
    pub job: Job,
    pub entry_id: DbId,
}

pub struct JobIntake {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn JobQueue>,
    artifacts_root: PathBuf,
}

impl JobIntake {
    pub fn new(
        store: Arc<dyn JobStore>,
        queue: Arc<dyn JobQueue>,
        artifacts_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            queue,
            artifacts_root: artifacts_root.into(),
        }
    }

    pub async fn submit(&self, request: JobRequest) -> Result<Submitted, IntakeError> {
        if request.mode.requires_input() && request.upload.is_none() {
            return Err(IntakeError::MissingUpload { mode: request.mode });
        }

        let id = Uuid::new_v4();
        let output_dir = self.artifacts_root.join(id.to_string());
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|source| IntakeError::Io {
                path: output_dir.clone(),
                source,
            })?;

        // Simulation jobs ignore any upload.
        let upload = request.upload.filter(|_| request.mode.requires_input());
        let input_path = match &upload {
            Some(upload) => Some(write_input(&output_dir, &upload.bytes).await?),
            None => None,
        };

        let job = self
            .store
            .create_job(&CreateJob {
                id,
                mode: request.mode,
                mission_id: or_default(request.mission_id, DEFAULT_MISSION_ID),
                aircraft: or_default(request.aircraft, DEFAULT_AIRCRAFT),
                input_filename: upload.as_ref().map(|u| u.file_name.clone()),
                input_file_path: input_path.as_ref().map(|p| p.to_string_lossy().into_owned()),
                should_generate_pdf: request.generate_pdf,
                output_dir: output_dir.to_string_lossy().into_owned(),
            })
            .await?;

        if let (Some(path), Some(upload)) = (&input_path, &upload) {
            self.store
                .upsert_artifact(&CreateArtifact {
                    job_id: id,
                    kind: ArtifactKind::Input,
                    file_name: INPUT_FILE_NAME.to_string(),
                    relative_path: relative_artifact_path(&self.artifacts_root, path),
                    size_bytes: i64::try_from(upload.bytes.len()).unwrap_or(i64::MAX),
                })
                .await?;
        }

        let entry_id = self.queue.enqueue(id).await?;
        tracing::info!(job_id = %id, entry_id, mode = %request.mode, "Job queued");

        Ok(Submitted { job, entry_id })
    }
}

async fn write_input(output_dir: &Path, bytes: &[u8]) -> Result<PathBuf, IntakeError> {
    let path = output_dir.join(INPUT_FILE_NAME);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|source| IntakeError::Io {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
