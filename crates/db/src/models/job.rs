//! Analysis job entity and intake DTO.

use std::path::Path;

use flightlab_core::error::CoreError;
use flightlab_core::job::JobMode;
use flightlab_core::types::{JobId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::{JobStatus, StatusId};

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: JobId,
    pub mode: String,
    pub status_id: StatusId,
    pub mission_id: String,
    pub aircraft: String,
    pub input_filename: Option<String>,
    pub input_file_path: Option<String>,
    pub should_generate_pdf: bool,
    pub output_dir: String,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    pub exit_code: Option<i32>,
    pub log: Option<String>,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Job {
    pub fn mode(&self) -> Result<JobMode, CoreError> {
        JobMode::parse(&self.mode)
    }

    pub fn status(&self) -> Result<JobStatus, CoreError> {
        JobStatus::from_id(self.status_id).ok_or_else(|| CoreError::UnknownVariant {
            kind: "job status",
            value: self.status_id.to_string(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        Path::new(&self.output_dir)
    }

    pub fn input_path(&self) -> Option<&Path> {
        self.input_file_path.as_deref().map(Path::new)
    }
}

/// DTO intake uses to record a new job. The output directory must already
/// exist and be unique to this job.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateJob {
    pub id: JobId,
    pub mode: JobMode,
    pub mission_id: String,
    pub aircraft: String,
    pub input_filename: Option<String>,
    pub input_file_path: Option<String>,
    pub should_generate_pdf: bool,
    pub output_dir: String,
}
