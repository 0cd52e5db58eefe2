//! Irregularities detected within an imported session.

use flightlab_core::risk::RiskClass;
use flightlab_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `anomalies` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Anomaly {
    pub id: DbId,
    pub session_id: DbId,
    /// Seconds relative to the engine's session clock.
    pub timestamp: f64,
    pub anomaly_type: String,
    pub param_affected: Option<String>,
    pub severity: String,
    pub details: Option<String>,
}

/// DTO for bulk-inserting anomalies. The owning session is supplied by the
/// import transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateAnomaly {
    pub timestamp: f64,
    pub anomaly_type: String,
    pub param_affected: Option<String>,
    pub severity: RiskClass,
    pub details: Option<String>,
}
