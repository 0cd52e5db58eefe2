//! Domain types and pure logic for the flight-analysis job pipeline.
//!
//! Nothing in this crate talks to the database. The engine supervisor is
//! the only part with side effects (it spawns the external engine).

pub mod artifact;
pub mod engine;
pub mod error;
pub mod job;
pub mod queue;
pub mod risk;
pub mod run_log;
pub mod types;
