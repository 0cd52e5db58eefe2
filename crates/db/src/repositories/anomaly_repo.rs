//! Repository for the `anomalies` table.

use sqlx::PgPool;
use flightlab_core::types::DbId;

use crate::models::anomaly::Anomaly;

/// Column list for `anomalies` queries.
const COLUMNS: &str = "id, session_id, timestamp, anomaly_type, param_affected, severity, details";

/// Read access to imported anomalies. Writes go through
/// `FlightSessionRepo::replace_for_job`.
pub struct AnomalyRepo;

impl AnomalyRepo {
    /// A session's anomalies in timestamp order.
    pub async fn list_by_session(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<Anomaly>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM anomalies WHERE session_id = $1 ORDER BY timestamp, id"
        );
        sqlx::query_as::<_, Anomaly>(&query)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    pub async fn count_by_session(pool: &PgPool, session_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM anomalies WHERE session_id = $1")
            .bind(session_id)
            .fetch_one(pool)
            .await
    }
}
