//! Job orchestration pipeline.
//!
//! Takes a queued job through supervised engine execution, result import
//! and artifact reconciliation. Persistence and delivery sit behind the
//! [`store::JobStore`] and [`queue::JobQueue`] traits so the same
//! orchestrator runs against PostgreSQL in production and in-memory
//! implementations in tests.

pub mod artifact_sync;
pub mod error;
pub mod importer;
pub mod intake;
pub mod orchestrator;
pub mod queue;
pub mod store;

pub use error::PipelineError;
pub use orchestrator::{JobProcessor, ProcessOutcome};
