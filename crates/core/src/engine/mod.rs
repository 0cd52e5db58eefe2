//! External analysis engine: argument contract and supervised execution.
//!
//! The engine is an opaque program. This module knows how to call it
//! ([`command`]), how to run it under a hard timeout ([`supervisor`]), and
//! how its failures are classified ([`error`]). Nothing here touches the
//! job store.

pub mod command;
pub mod error;
pub mod supervisor;

use std::path::PathBuf;
use std::time::Duration;

pub use command::{build_engine_args, engine_db_path, EngineJobSpec};
pub use error::EngineError;
pub use supervisor::{EngineOutput, EngineSupervisor};

/// Default wall-clock limit for one engine run (15 minutes).
pub const DEFAULT_ENGINE_TIMEOUT: Duration = Duration::from_millis(900_000);

/// Deployment-wide engine configuration, fixed for the lifetime of a
/// supervisor.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Path to the engine executable.
    pub executable: PathBuf,
    /// Working directory the engine is started in.
    pub workdir: PathBuf,
    /// Hard wall-clock timeout per run.
    pub timeout: Duration,
    /// Deployment kill-switch for PDF generation. When `false`, per-job
    /// PDF requests are ignored.
    pub pdf_enabled: bool,
}
