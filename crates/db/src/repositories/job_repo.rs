//! Repository for the `jobs` table.
//!
//! Every status change is a guarded UPDATE: the row only moves when its
//! current status is one of `JobStatus::sources_for(target)`. A `None`
//! return means the job is missing or the transition was refused.

use sqlx::PgPool;
use flightlab_core::types::JobId;

use crate::models::job::{CreateJob, Job};
use crate::models::status::{JobStatus, StatusId};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, mode, status_id, mission_id, aircraft, \
    input_filename, input_file_path, should_generate_pdf, output_dir, \
    started_at, finished_at, exit_code, log, error, \
    created_at, updated_at";

/// Status IDs a job may hold before moving to `target`.
fn source_ids(target: JobStatus) -> Vec<StatusId> {
    JobStatus::sources_for(target)
        .iter()
        .map(|s| s.id())
        .collect()
}

/// Provides persistence and status transitions for analysis jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new job in `QUEUED` status.
    pub async fn create(pool: &PgPool, input: &CreateJob) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs \
                 (id, mode, status_id, mission_id, aircraft, input_filename, \
                  input_file_path, should_generate_pdf, output_dir) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(input.id)
            .bind(input.mode.as_str())
            .bind(JobStatus::Queued.id())
            .bind(&input.mission_id)
            .bind(&input.aircraft)
            .bind(&input.input_filename)
            .bind(&input.input_file_path)
            .bind(input.should_generate_pdf)
            .bind(&input.output_dir)
            .fetch_one(pool)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: JobId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Move a job to `RUNNING`, stamping `started_at` and clearing the
    /// outcome of any previous attempt.
    pub async fn mark_running(pool: &PgPool, id: JobId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status_id = $2, started_at = NOW(), finished_at = NULL, \
                 exit_code = NULL, log = NULL, error = NULL \
             WHERE id = $1 AND status_id = ANY($3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(JobStatus::Running.id())
            .bind(source_ids(JobStatus::Running))
            .fetch_optional(pool)
            .await
    }

    /// Move a running job to `COMPLETED` with the engine's exit code and
    /// merged log.
    pub async fn mark_completed(
        pool: &PgPool,
        id: JobId,
        exit_code: i32,
        log: &str,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status_id = $2, finished_at = NOW(), exit_code = $3, log = $4, error = NULL \
             WHERE id = $1 AND status_id = ANY($5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(JobStatus::Completed.id())
            .bind(exit_code)
            .bind(log)
            .bind(source_ids(JobStatus::Completed))
            .fetch_optional(pool)
            .await
    }

    /// Move a running job to `FAILED` with an error message. `exit_code` is
    /// recorded when the engine actually ran to a non-zero exit.
    pub async fn mark_failed(
        pool: &PgPool,
        id: JobId,
        error: &str,
        exit_code: Option<i32>,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status_id = $2, finished_at = NOW(), error = $3, exit_code = $4 \
             WHERE id = $1 AND status_id = ANY($5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(JobStatus::Failed.id())
            .bind(error)
            .bind(exit_code)
            .bind(source_ids(JobStatus::Failed))
            .fetch_optional(pool)
            .await
    }
}
