//! Tracked output files of a job.

use flightlab_core::artifact::ArtifactKind;
use flightlab_core::types::{DbId, JobId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `artifacts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Artifact {
    pub id: DbId,
    pub job_id: JobId,
    pub kind: String,
    pub file_name: String,
    pub relative_path: String,
    pub size_bytes: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for recording an artifact. Also the key + payload of an upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateArtifact {
    pub job_id: JobId,
    pub kind: ArtifactKind,
    pub file_name: String,
    pub relative_path: String,
    pub size_bytes: i64,
}

/// What an upsert did to the `(job_id, kind, file_name)` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    /// Size or relative path changed.
    Updated,
    /// Row already matched; nothing was written.
    Unchanged,
}
