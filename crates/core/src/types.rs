/// Surrogate primary keys for artifacts, sessions, anomalies and queue
/// entries are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Jobs are addressed by an opaque UUID assigned at intake.
pub type JobId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
