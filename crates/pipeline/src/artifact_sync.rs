//! Artifact synchronizer: reconciles a job's output directory with its
//! artifact rows.
//!
//! Only top-level files named in `ARTIFACT_ALLOWLIST` are tracked. Running
//! the sync twice over an unchanged directory writes nothing.

use std::path::{Path, PathBuf};

use flightlab_core::artifact::ArtifactKind;
use flightlab_core::types::JobId;
use flightlab_db::models::artifact::{CreateArtifact, UpsertOutcome};

use crate::store::{JobStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to list output directory {}: {}", .path.display(), .source)]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to stat artifact {}: {}", .path.display(), .source)]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to record artifact: {0}")]
    Store(#[from] StoreError),
}

/// Counts of what one sync did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.unchanged
    }

    fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created => self.created += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

/// Path stored on the artifact row: relative to `artifacts_root` when the
/// file lives under it, absolute otherwise.
pub fn relative_artifact_path(artifacts_root: &Path, path: &Path) -> String {
    path.strip_prefix(artifacts_root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

/// Scan `output_dir` (non-recursively) and upsert an artifact row for
/// every allowlisted file in it.
pub async fn sync_artifacts(
    store: &dyn JobStore,
    job_id: JobId,
    output_dir: &Path,
    artifacts_root: &Path,
) -> Result<SyncReport, SyncError> {
    let read_dir_err = |source| SyncError::ReadDir {
        path: output_dir.to_path_buf(),
        source,
    };

    let mut dir = tokio::fs::read_dir(output_dir).await.map_err(read_dir_err)?;
    let mut candidates: Vec<(String, ArtifactKind)> = Vec::new();
    while let Some(entry) = dir.next_entry().await.map_err(read_dir_err)? {
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if let Some(kind) = ArtifactKind::for_file_name(&name) {
            candidates.push((name, kind));
        }
    }
    candidates.sort_by(|a, b| a.0.cmp(&b.0));

    let mut report = SyncReport::default();
    for (file_name, kind) in candidates {
        let path = output_dir.join(&file_name);
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|source| SyncError::Stat {
                path: path.clone(),
                source,
            })?;
        if !metadata.is_file() {
            continue;
        }

        let artifact = CreateArtifact {
            job_id,
            kind,
            file_name,
            relative_path: relative_artifact_path(artifacts_root, &path),
            size_bytes: i64::try_from(metadata.len()).unwrap_or(i64::MAX),
        };
        let outcome = store.upsert_artifact(&artifact).await?;
        tracing::trace!(
            job_id = %job_id,
            file_name = %artifact.file_name,
            ?outcome,
            "Artifact synced",
        );
        report.record(outcome);
    }

    Ok(report)
}
