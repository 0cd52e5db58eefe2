//! Integration tests for `JobRepo` status transitions against a real
//! database.

use sqlx::PgPool;
use flightlab_core::job::JobMode;
use flightlab_db::models::job::CreateJob;
use flightlab_db::models::status::JobStatus;
use flightlab_db::repositories::JobRepo;
use uuid::Uuid;

fn new_job(mode: JobMode) -> CreateJob {
    let id = Uuid::new_v4();
    let input = mode.requires_input();
    CreateJob {
        id,
        mode,
        mission_id: "M-1".to_string(),
        aircraft: "A320".to_string(),
        input_filename: input.then(|| "flight.csv".to_string()),
        input_file_path: input.then(|| format!("/data/artifacts/{id}/input.csv")),
        should_generate_pdf: false,
        output_dir: format!("/data/artifacts/{id}"),
    }
}

// ---------------------------------------------------------------------------
// Test: create stores a queued job
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_job_is_queued(pool: PgPool) {
    let input = new_job(JobMode::CsvUpload);
    let job = JobRepo::create(&pool, &input).await.unwrap();

    assert_eq!(job.id, input.id);
    assert_eq!(job.status().unwrap(), JobStatus::Queued);
    assert_eq!(job.mode().unwrap(), JobMode::CsvUpload);
    assert_eq!(job.input_filename.as_deref(), Some("flight.csv"));
    assert!(job.started_at.is_none());
    assert!(job.finished_at.is_none());
}

// ---------------------------------------------------------------------------
// Test: upload job without an input path is rejected by the schema
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_upload_without_input_rejected(pool: PgPool) {
    let mut input = new_job(JobMode::CsvUpload);
    input.input_file_path = None;

    let result = JobRepo::create(&pool, &input).await;
    assert!(result.is_err(), "CHECK constraint should reject the row");
}

// ---------------------------------------------------------------------------
// Test: queued -> running -> completed
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_happy_path_transitions(pool: PgPool) {
    let job = JobRepo::create(&pool, &new_job(JobMode::Simulate)).await.unwrap();

    let running = JobRepo::mark_running(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(running.status().unwrap(), JobStatus::Running);
    assert!(running.started_at.is_some());

    let done = JobRepo::mark_completed(&pool, job.id, 0, "duration_ms=5")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(done.status().unwrap(), JobStatus::Completed);
    assert_eq!(done.exit_code, Some(0));
    assert_eq!(done.log.as_deref(), Some("duration_ms=5"));
    assert!(done.finished_at.is_some());
    assert!(done.error.is_none());
}

// ---------------------------------------------------------------------------
// Test: completed is terminal
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_completed_job_cannot_restart(pool: PgPool) {
    let job = JobRepo::create(&pool, &new_job(JobMode::Simulate)).await.unwrap();
    JobRepo::mark_running(&pool, job.id).await.unwrap().unwrap();
    JobRepo::mark_completed(&pool, job.id, 0, "").await.unwrap().unwrap();

    assert!(JobRepo::mark_running(&pool, job.id).await.unwrap().is_none());
    assert!(JobRepo::mark_failed(&pool, job.id, "late", None).await.unwrap().is_none());

    let reloaded = JobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status().unwrap(), JobStatus::Completed);
}

// ---------------------------------------------------------------------------
// Test: queued job cannot complete or fail without running first
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_queued_job_cannot_finish(pool: PgPool) {
    let job = JobRepo::create(&pool, &new_job(JobMode::Simulate)).await.unwrap();

    assert!(JobRepo::mark_completed(&pool, job.id, 0, "").await.unwrap().is_none());
    assert!(JobRepo::mark_failed(&pool, job.id, "x", None).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Test: failed job is retried and earlier outcome is cleared
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_job_reruns_with_clean_outcome(pool: PgPool) {
    let job = JobRepo::create(&pool, &new_job(JobMode::Simulate)).await.unwrap();
    JobRepo::mark_running(&pool, job.id).await.unwrap().unwrap();

    let failed = JobRepo::mark_failed(&pool, job.id, "engine exited with code 3", Some(3))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failed.status().unwrap(), JobStatus::Failed);
    assert_eq!(failed.exit_code, Some(3));
    assert!(failed.finished_at.is_some());

    let rerun = JobRepo::mark_running(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(rerun.status().unwrap(), JobStatus::Running);
    assert!(rerun.error.is_none());
    assert!(rerun.exit_code.is_none());
    assert!(rerun.finished_at.is_none());
}

// ---------------------------------------------------------------------------
// Test: unknown job id
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_missing_job(pool: PgPool) {
    let id = Uuid::new_v4();
    assert!(JobRepo::find_by_id(&pool, id).await.unwrap().is_none());
    assert!(JobRepo::mark_running(&pool, id).await.unwrap().is_none());
}
