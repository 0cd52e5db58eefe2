//! Zero-sized repository structs, one per table, each taking `&PgPool`.

pub mod anomaly_repo;
pub mod artifact_repo;
pub mod flight_session_repo;
pub mod job_repo;
pub mod queue_repo;

pub use anomaly_repo::AnomalyRepo;
pub use artifact_repo::ArtifactRepo;
pub use flight_session_repo::FlightSessionRepo;
pub use job_repo::JobRepo;
pub use queue_repo::QueueRepo;
