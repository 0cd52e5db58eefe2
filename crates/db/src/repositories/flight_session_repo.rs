//! Repository for `flight_sessions` and the replace-on-import transaction.

use sqlx::PgPool;
use flightlab_core::types::JobId;

use crate::models::anomaly::CreateAnomaly;
use crate::models::flight_session::{CreateFlightSession, FlightSession};

/// Column list for `flight_sessions` queries.
const COLUMNS: &str = "\
    id, job_id, source_session_id, mission_id, aircraft_type, \
    start_time, end_time, stability_index, sensor_reliability, mission_compliance, \
    risk_classification, created_at";

/// Provides access to imported flight sessions.
pub struct FlightSessionRepo;

impl FlightSessionRepo {
    /// The session imported for a job, if any.
    pub async fn find_by_job(
        pool: &PgPool,
        job_id: JobId,
    ) -> Result<Option<FlightSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM flight_sessions WHERE job_id = $1");
        sqlx::query_as::<_, FlightSession>(&query)
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }

    /// Replace whatever was previously imported for the job with `session`
    /// and its anomalies, in a single transaction.
    ///
    /// The old session's anomalies go with it via `ON DELETE CASCADE`.
    pub async fn replace_for_job(
        pool: &PgPool,
        session: &CreateFlightSession,
        anomalies: &[CreateAnomaly],
    ) -> Result<FlightSession, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM flight_sessions WHERE job_id = $1")
            .bind(session.job_id)
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "INSERT INTO flight_sessions \
                 (job_id, source_session_id, mission_id, aircraft_type, start_time, end_time, \
                  stability_index, sensor_reliability, mission_compliance, risk_classification) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        let created = sqlx::query_as::<_, FlightSession>(&query)
            .bind(session.job_id)
            .bind(session.source_session_id)
            .bind(&session.mission_id)
            .bind(&session.aircraft_type)
            .bind(session.start_time)
            .bind(session.end_time)
            .bind(session.stability_index)
            .bind(session.sensor_reliability)
            .bind(session.mission_compliance)
            .bind(session.risk_classification.as_str())
            .fetch_one(&mut *tx)
            .await?;

        if !anomalies.is_empty() {
            let timestamps: Vec<f64> = anomalies.iter().map(|a| a.timestamp).collect();
            let types: Vec<String> = anomalies.iter().map(|a| a.anomaly_type.clone()).collect();
            let params: Vec<Option<String>> =
                anomalies.iter().map(|a| a.param_affected.clone()).collect();
            let severities: Vec<String> = anomalies
                .iter()
                .map(|a| a.severity.as_str().to_string())
                .collect();
            let details: Vec<Option<String>> =
                anomalies.iter().map(|a| a.details.clone()).collect();

            sqlx::query(
                "INSERT INTO anomalies \
                     (session_id, timestamp, anomaly_type, param_affected, severity, details) \
                 SELECT $1, * FROM UNNEST($2::float8[], $3::text[], $4::text[], $5::text[], $6::text[])",
            )
            .bind(created.id)
            .bind(&timestamps)
            .bind(&types)
            .bind(&params)
            .bind(&severities)
            .bind(&details)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(created)
    }
}
