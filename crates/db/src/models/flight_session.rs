//! Imported summary of one engine run. At most one per job.

use flightlab_core::risk::RiskClass;
use flightlab_core::types::{DbId, JobId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `flight_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FlightSession {
    pub id: DbId,
    pub job_id: JobId,
    pub source_session_id: i64,
    pub mission_id: String,
    pub aircraft_type: String,
    pub start_time: f64,
    pub end_time: f64,
    pub stability_index: f64,
    pub sensor_reliability: f64,
    pub mission_compliance: f64,
    pub risk_classification: String,
    pub created_at: Timestamp,
}

/// DTO for inserting a session during import.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateFlightSession {
    pub job_id: JobId,
    pub source_session_id: i64,
    pub mission_id: String,
    pub aircraft_type: String,
    pub start_time: f64,
    pub end_time: f64,
    pub stability_index: f64,
    pub sensor_reliability: f64,
    pub mission_compliance: f64,
    pub risk_classification: RiskClass,
}
