//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A create DTO for inserts

pub mod anomaly;
pub mod artifact;
pub mod flight_session;
pub mod job;
pub mod queue_entry;
pub mod status;
