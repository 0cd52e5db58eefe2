//! Engine failure taxonomy.
//!
//! Configuration problems (missing input, missing executable) are detected
//! before anything is spawned. Execution problems carry whatever the engine
//! produced so the job record is diagnosable. A timeout is its own variant
//! and never reports an exit code.

use std::path::PathBuf;
use std::time::Duration;

use crate::job::JobMode;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("input file path is required for {mode} mode")]
    MissingInputPath { mode: JobMode },

    #[error("input file does not exist: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("engine executable not found: {}", .0.display())]
    ExecutableNotFound(PathBuf),

    #[error("failed to spawn engine {}: {}", .path.display(), .source)]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("engine timed out after {}ms", .timeout.as_millis())]
    TimedOut { timeout: Duration },

    #[error("engine exited with code {exit_code}\nstdout:\n{stdout}\nstderr:\n{stderr}")]
    NonZeroExit {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("I/O error while waiting for engine: {0}")]
    Io(#[source] std::io::Error),
}

impl EngineError {
    /// Exit code reported by the engine, if it ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::NonZeroExit { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }

    /// Whether this failure was raised before the engine was spawned.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingInputPath { .. } | Self::InputNotFound(_) | Self::ExecutableNotFound(_)
        )
    }
}
