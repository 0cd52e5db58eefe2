//! Job intake: output directory, stored upload and queue entry.

#![cfg(unix)]

use std::sync::Arc;

use assert_matches::assert_matches;
use flightlab_core::job::JobMode;
use flightlab_core::queue::{QueueState, RetryPolicy};
use flightlab_db::models::status::JobStatus;
use flightlab_pipeline::intake::{IntakeError, JobIntake, JobRequest, Upload};
use flightlab_pipeline::queue::{JobQueue, MemoryJobQueue};
use flightlab_pipeline::store::{JobStore, MemoryJobStore};

struct Fixture {
    root: tempfile::TempDir,
    store: Arc<MemoryJobStore>,
    queue: Arc<MemoryJobQueue>,
    intake: JobIntake,
}

fn fixture() -> Fixture {
    let root = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryJobStore::new());
    let queue = Arc::new(MemoryJobQueue::new(RetryPolicy::default()));
    let intake = JobIntake::new(
        store.clone() as Arc<dyn JobStore>,
        queue.clone() as Arc<dyn JobQueue>,
        root.path(),
    );
    Fixture {
        root,
        store,
        queue,
        intake,
    }
}

#[tokio::test]
async fn upload_is_stored_as_input_artifact_and_queued() {
    let f = fixture();
    let submitted = f
        .intake
        .submit(JobRequest {
            mode: JobMode::CsvUpload,
            mission_id: Some("M-42".to_string()),
            aircraft: Some("ATR72".to_string()),
            generate_pdf: true,
            upload: Some(Upload {
                file_name: "flight 42.csv".to_string(),
                bytes: b"t,alt\n0,100\n".to_vec(),
            }),
        })
        .await
        .unwrap();

    let job = &submitted.job;
    assert_eq!(job.status().unwrap(), JobStatus::Queued);
    assert_eq!(job.mission_id, "M-42");
    assert_eq!(job.aircraft, "ATR72");
    assert!(job.should_generate_pdf);
    assert_eq!(job.input_filename.as_deref(), Some("flight 42.csv"));
    assert_eq!(job.output_dir(), f.root.path().join(job.id.to_string()));

    let input = job.input_path().unwrap();
    assert_eq!(input, job.output_dir().join("input.csv"));
    assert_eq!(std::fs::read(input).unwrap(), b"t,alt\n0,100\n");

    let artifacts = f.store.artifacts_for(job.id).await;
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].kind, "INPUT");
    assert_eq!(artifacts[0].size_bytes, 12);
    assert_eq!(artifacts[0].relative_path, format!("{}/input.csv", job.id));

    let entry = f.queue.entry(submitted.entry_id).await.unwrap();
    assert_eq!(entry.job_id, job.id);
    assert_eq!(entry.state, QueueState::Waiting);
}

#[tokio::test]
async fn blank_labels_use_defaults() {
    let f = fixture();
    let submitted = f
        .intake
        .submit(JobRequest {
            mode: JobMode::Simulate,
            mission_id: Some("   ".to_string()),
            aircraft: None,
            generate_pdf: false,
            upload: None,
        })
        .await
        .unwrap();

    assert_eq!(submitted.job.mission_id, "TEST-001");
    assert_eq!(submitted.job.aircraft, "UNKNOWN");
    assert!(submitted.job.output_dir().is_dir());
    assert!(submitted.job.input_path().is_none());
    assert!(f.store.artifacts_for(submitted.job.id).await.is_empty());
}

#[tokio::test]
async fn simulation_ignores_upload() {
    let f = fixture();
    let submitted = f
        .intake
        .submit(JobRequest {
            mode: JobMode::Simulate,
            mission_id: None,
            aircraft: None,
            generate_pdf: false,
            upload: Some(Upload {
                file_name: "x.csv".to_string(),
                bytes: b"x".to_vec(),
            }),
        })
        .await
        .unwrap();

    assert!(submitted.job.input_filename.is_none());
    assert!(!submitted.job.output_dir().join("input.csv").exists());
}

#[tokio::test]
async fn upload_mode_without_file_is_rejected() {
    let f = fixture();
    let err = f
        .intake
        .submit(JobRequest {
            mode: JobMode::CsvUpload,
            mission_id: None,
            aircraft: None,
            generate_pdf: false,
            upload: None,
        })
        .await
        .unwrap_err();

    assert_matches!(err, IntakeError::MissingUpload { mode: JobMode::CsvUpload });
    assert_eq!(f.queue.count(QueueState::Waiting).await, 0);
}
