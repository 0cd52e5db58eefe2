use std::path::PathBuf;

use flightlab_core::engine::EngineError;
use flightlab_core::error::CoreError;

use crate::artifact_sync::SyncError;
use crate::importer::ImportError;
use crate::store::StoreError;

/// Any failure that ends a job's pipeline run.
///
/// The `Display` text is what gets recorded in the job's `error` column,
/// so engine and import messages are passed through unwrapped.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("job store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid job record: {0}")]
    InvalidJob(#[from] CoreError),

    #[error("failed to create output directory {}: {}", .path.display(), .source)]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Engine exit code, when the failure was a non-zero exit.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Engine(e) => e.exit_code(),
            _ => None,
        }
    }
}
