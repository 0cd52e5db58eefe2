//! Shared fixtures for pipeline integration tests: fake engine scripts,
//! engine output databases and in-memory wiring.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use flightlab_core::engine::{EngineSettings, EngineSupervisor};
use flightlab_core::job::JobMode;
use flightlab_db::models::job::{CreateJob, Job};
use flightlab_pipeline::store::{JobStore, MemoryJobStore};
use flightlab_pipeline::JobProcessor;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};
use tempfile::TempDir;
use uuid::Uuid;

/// Schema of the engine's output database.
pub const ENGINE_SCHEMA: &str = "
    CREATE TABLE flight_sessions (
        id INTEGER PRIMARY KEY,
        mission_id TEXT,
        start_time REAL,
        end_time REAL,
        aircraft_type TEXT
    );
    CREATE TABLE session_metrics (
        session_id INTEGER,
        stability_index REAL,
        sensor_reliability REAL,
        mission_compliance REAL,
        risk_classification TEXT
    );
    CREATE TABLE anomalies (
        session_id INTEGER,
        timestamp REAL,
        type TEXT,
        param_affected TEXT,
        severity TEXT,
        details TEXT
    );
";

/// One session (risk `major`) with two anomalies, out of timestamp order.
pub const ONE_MAJOR_SESSION: &str = "
    INSERT INTO flight_sessions VALUES (1, 'M-7', 0.0, 300.5, 'A320');
    INSERT INTO session_metrics VALUES (1, 0.82, 0.91, 0.77, 'major');
    INSERT INTO anomalies VALUES (1, 120.0, 'ALT_DEVIATION', 'altitude', 'Major', 'descent 400ft');
    INSERT INTO anomalies VALUES (1, 42.5, 'GPS_DROPOUT', NULL, 'minor', NULL);
";

/// Create an engine database at `path` with `rows` inserted.
pub async fn write_engine_db(path: &Path, rows: &str) {
    let mut conn = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .connect()
        .await
        .unwrap();
    sqlx::raw_sql(ENGINE_SCHEMA).execute(&mut conn).await.unwrap();
    sqlx::raw_sql(rows).execute(&mut conn).await.unwrap();
    conn.close().await.unwrap();
}

/// Write an executable `/bin/sh` script.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Script fragment that sets `$out` from `--output-dir` and saves the
/// full argument list to `$out/args.txt`.
const PARSE_ARGS: &str = r#"
all="$*"
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output-dir) out="$2"; shift 2 ;;
    *) shift ;;
  esac
done
echo "$all" > "$out/args.txt"
"#;

/// A fake engine that copies `fixture_db` into the output directory,
/// writes an HTML report and exits 0.
pub fn successful_engine(dir: &Path, fixture_db: &Path) -> PathBuf {
    let body = format!(
        "{PARSE_ARGS}\ncp '{}' \"$out/test.db\"\necho '<html>report</html>' > \"$out/report.html\"\necho 'simulation finished'\necho 'gps drift' >&2\nexit 0",
        fixture_db.display()
    );
    write_script(dir, "engine-ok.sh", &body)
}

/// A fake engine that produces a valid `test.db` but leaves `report.html`
/// as a symlink to a file that does not exist.
pub fn dangling_report_engine(dir: &Path, fixture_db: &Path) -> PathBuf {
    let body = format!(
        "{PARSE_ARGS}\ncp '{}' \"$out/test.db\"\nln -s \"$out/gone.html\" \"$out/report.html\"\nexit 0",
        fixture_db.display()
    );
    write_script(dir, "engine-dangling.sh", &body)
}

/// A fake engine that exits with `code` after writing to both streams.
pub fn failing_engine(dir: &Path, code: i32) -> PathBuf {
    let body = format!("echo 'parsed 10 rows'\necho 'fatal: bad column' >&2\nexit {code}");
    write_script(dir, "engine-fail.sh", &body)
}

/// A fake engine that never finishes on its own.
pub fn hanging_engine(dir: &Path) -> PathBuf {
    write_script(dir, "engine-hang.sh", "exec sleep 60")
}

/// A fake engine that exits 0 without producing any output files.
pub fn silent_engine(dir: &Path) -> PathBuf {
    write_script(dir, "engine-silent.sh", "exit 0")
}

pub struct Harness {
    pub scratch: TempDir,
    pub artifacts_root: PathBuf,
    pub store: Arc<MemoryJobStore>,
    pub processor: JobProcessor,
}

impl Harness {
    /// Wire a processor around `engine` with the given timeout and PDF switch.
    pub fn new(scratch: TempDir, engine: PathBuf, timeout: Duration, pdf_enabled: bool) -> Self {
        let artifacts_root = scratch.path().join("artifacts");
        std::fs::create_dir_all(&artifacts_root).unwrap();
        let store = Arc::new(MemoryJobStore::new());
        let supervisor = EngineSupervisor::new(EngineSettings {
            executable: engine,
            workdir: scratch.path().to_path_buf(),
            timeout,
            pdf_enabled,
        });
        let processor = JobProcessor::new(
            store.clone() as Arc<dyn JobStore>,
            supervisor,
            artifacts_root.clone(),
        );
        Self {
            scratch,
            artifacts_root,
            store,
            processor,
        }
    }

    pub fn output_dir(&self, id: Uuid) -> PathBuf {
        self.artifacts_root.join(id.to_string())
    }

    /// Insert a queued job directly into the store.
    pub async fn queued_job(&self, mode: JobMode, input: Option<&Path>, pdf: bool) -> Job {
        let id = Uuid::new_v4();
        self.store
            .create_job(&CreateJob {
                id,
                mode,
                mission_id: "M-7".to_string(),
                aircraft: "A320".to_string(),
                input_filename: input.map(|_| "flight.csv".to_string()),
                input_file_path: input.map(|p| p.to_string_lossy().into_owned()),
                should_generate_pdf: pdf,
                output_dir: self.output_dir(id).to_string_lossy().into_owned(),
            })
            .await
            .unwrap()
    }

    pub async fn reload(&self, job: &Job) -> Job {
        self.store.load(job.id).await.unwrap().unwrap()
    }
}
