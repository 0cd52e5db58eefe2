//! Result importer: copies the engine's per-job SQLite output into the job
//! store.
//!
//! Engine tables read (all in `<output_dir>/test.db`):
//!
//! | Table             | Columns used                                                  |
//! |-------------------|---------------------------------------------------------------|
//! | `flight_sessions` | `id`, `mission_id`, `start_time`, `end_time`, `aircraft_type` |
//! | `session_metrics` | three scores and `risk_classification`, all nullable          |
//! | `anomalies`       | `timestamp`, `type`, `param_affected`, `severity`, `details`  |
//!
//! Only the highest-id session is imported. Missing metrics default to
//! zero scores and `OBSERVATION`.

use std::path::{Path, PathBuf};

use flightlab_core::engine::engine_db_path;
use flightlab_core::risk::RiskClass;
use flightlab_core::types::DbId;
use flightlab_db::models::anomaly::CreateAnomaly;
use flightlab_db::models::flight_session::CreateFlightSession;
use flightlab_db::models::job::Job;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection, FromRow};

use crate::store::{JobStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("engine output database not found: {}", .0.display())]
    MissingDatabase(PathBuf),

    #[error("engine output database {} contains no flight session", .0.display())]
    NoSession(PathBuf),

    #[error("failed to read engine output database: {0}")]
    Read(#[from] sqlx::Error),

    #[error("failed to store imported session: {0}")]
    Store(#[from] StoreError),
}

/// Summary of one import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    pub session_id: DbId,
    pub source_session_id: i64,
    pub risk: RiskClass,
    pub anomaly_count: usize,
}

#[derive(Debug, FromRow)]
struct EngineSession {
    id: i64,
    mission_id: Option<String>,
    start_time: Option<f64>,
    end_time: Option<f64>,
    aircraft_type: Option<String>,
}

#[derive(Debug, Default, FromRow)]
struct EngineMetrics {
    stability_index: Option<f64>,
    sensor_reliability: Option<f64>,
    mission_compliance: Option<f64>,
    risk_classification: Option<String>,
}

#[derive(Debug, FromRow)]
struct EngineAnomaly {
    timestamp: Option<f64>,
    anomaly_type: String,
    param_affected: Option<String>,
    severity: Option<String>,
    details: Option<String>,
}

/// Session, metrics and anomalies as read from one engine database.
#[derive(Debug)]
struct EngineResults {
    session: EngineSession,
    metrics: EngineMetrics,
    anomalies: Vec<EngineAnomaly>,
}

/// Import `<job.output_dir>/test.db`, replacing anything previously
/// imported for the job.
pub async fn import_results(store: &dyn JobStore, job: &Job) -> Result<ImportReport, ImportError> {
    let db_path = engine_db_path(job.output_dir());
    if !tokio::fs::try_exists(&db_path).await.unwrap_or(false) {
        return Err(ImportError::MissingDatabase(db_path));
    }

    let results = read_engine_db(&db_path).await?;
    let (session, anomalies) = to_records(job, results);

    let created = store.replace_session(&session, &anomalies).await?;

    tracing::debug!(
        job_id = %job.id,
        session_id = created.id,
        source_session_id = session.source_session_id,
        anomalies = anomalies.len(),
        "Imported engine results",
    );

    Ok(ImportReport {
        session_id: created.id,
        source_session_id: session.source_session_id,
        risk: session.risk_classification,
        anomaly_count: anomalies.len(),
    })
}

async fn read_engine_db(path: &Path) -> Result<EngineResults, ImportError> {
    let mut conn: SqliteConnection = SqliteConnectOptions::new()
        .filename(path)
        .read_only(true)
        .connect()
        .await?;

    let session = sqlx::query_as::<_, EngineSession>(
        "SELECT id, mission_id, CAST(start_time AS REAL) AS start_time, \
                CAST(end_time AS REAL) AS end_time, aircraft_type \
         FROM flight_sessions ORDER BY id DESC LIMIT 1",
    )
    .fetch_optional(&mut conn)
    .await?
    .ok_or_else(|| ImportError::NoSession(path.to_path_buf()))?;

    let metrics = sqlx::query_as::<_, EngineMetrics>(
        "SELECT CAST(stability_index AS REAL) AS stability_index, \
                CAST(sensor_reliability AS REAL) AS sensor_reliability, \
                CAST(mission_compliance AS REAL) AS mission_compliance, \
                risk_classification \
         FROM session_metrics WHERE session_id = ? LIMIT 1",
    )
    .bind(session.id)
    .fetch_optional(&mut conn)
    .await?
    .unwrap_or_default();

    let anomalies = sqlx::query_as::<_, EngineAnomaly>(
        "SELECT CAST(timestamp AS REAL) AS timestamp, type AS anomaly_type, \
                param_affected, severity, details \
         FROM anomalies WHERE session_id = ? ORDER BY timestamp ASC",
    )
    .bind(session.id)
    .fetch_all(&mut conn)
    .await?;

    conn.close().await?;

    Ok(EngineResults {
        session,
        metrics,
        anomalies,
    })
}

/// Map engine rows to store records, filling gaps from the job itself.
fn to_records(job: &Job, results: EngineResults) -> (CreateFlightSession, Vec<CreateAnomaly>) {
    let EngineResults {
        session,
        metrics,
        anomalies,
    } = results;

    let start_time = session.start_time.unwrap_or(0.0);
    let record = CreateFlightSession {
        job_id: job.id,
        source_session_id: session.id,
        mission_id: non_empty(session.mission_id).unwrap_or_else(|| job.mission_id.clone()),
        aircraft_type: non_empty(session.aircraft_type).unwrap_or_else(|| job.aircraft.clone()),
        start_time,
        end_time: session.end_time.unwrap_or(start_time),
        stability_index: metrics.stability_index.unwrap_or(0.0),
        sensor_reliability: metrics.sensor_reliability.unwrap_or(0.0),
        mission_compliance: metrics.mission_compliance.unwrap_or(0.0),
        risk_classification: RiskClass::classify(metrics.risk_classification.as_deref()),
    };

    let anomalies = anomalies
        .into_iter()
        .map(|a| CreateAnomaly {
            timestamp: a.timestamp.unwrap_or(0.0),
            anomaly_type: a.anomaly_type,
            param_affected: a.param_affected,
            severity: RiskClass::classify(a.severity.as_deref()),
            details: a.details,
        })
        .collect();

    (record, anomalies)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
