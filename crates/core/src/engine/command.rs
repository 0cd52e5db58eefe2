//! Engine argument builder.
//!
//! Pure mapping from job parameters to the engine's command line. The
//! flag/value pairs are the engine's contract:
//!
//! | Flag                 | When                                   |
//! |----------------------|----------------------------------------|
//! | `--simulate`         | SIMULATE mode                          |
//! | `--input <path>`     | CSV_UPLOAD mode                        |
//! | `--mission <id>`     | always                                 |
//! | `--aircraft <label>` | always                                 |
//! | `--output-dir <dir>` | always                                 |
//! | `--db-path <path>`   | always, `<dir>/test.db`                |
//! | `--pdf`              | job requested it AND deployment allows |

use std::path::{Path, PathBuf};

use crate::artifact::ENGINE_DB_FILE_NAME;
use crate::job::JobMode;

use super::error::EngineError;

/// Job parameters the engine command is derived from.
#[derive(Debug, Clone, Copy)]
pub struct EngineJobSpec<'a> {
    pub mode: JobMode,
    pub input_path: Option<&'a Path>,
    pub mission_id: &'a str,
    pub aircraft: &'a str,
    pub generate_pdf: bool,
    pub output_dir: &'a Path,
}

/// Location of the engine database inside an output directory.
pub fn engine_db_path(output_dir: &Path) -> PathBuf {
    output_dir.join(ENGINE_DB_FILE_NAME)
}

/// Build the engine argument list for `spec`.
///
/// `pdf_enabled` is the deployment switch; `--pdf` is only emitted when it
/// and the job's own flag are both set. Fails with
/// [`EngineError::MissingInputPath`] for an upload job without an input.
pub fn build_engine_args(
    spec: &EngineJobSpec<'_>,
    pdf_enabled: bool,
) -> Result<Vec<String>, EngineError> {
    let mut args = Vec::with_capacity(12);

    match spec.mode {
        JobMode::Simulate => args.push("--simulate".to_string()),
        JobMode::CsvUpload => {
            let input = spec
                .input_path
                .ok_or(EngineError::MissingInputPath { mode: spec.mode })?;
            args.push("--input".to_string());
            args.push(path_arg(input));
        }
    }

    args.extend([
        "--mission".to_string(),
        spec.mission_id.to_string(),
        "--aircraft".to_string(),
        spec.aircraft.to_string(),
        "--output-dir".to_string(),
        path_arg(spec.output_dir),
        "--db-path".to_string(),
        path_arg(&engine_db_path(spec.output_dir)),
    ]);

    if spec.generate_pdf && pdf_enabled {
        args.push("--pdf".to_string());
    }

    Ok(args)
}

// Job paths are persisted as TEXT, so they are valid UTF-8 already.
fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn simulate_spec(output_dir: &Path) -> EngineJobSpec<'_> {
        EngineJobSpec {
            mode: JobMode::Simulate,
            input_path: None,
            mission_id: "TEST-001",
            aircraft: "F16",
            generate_pdf: false,
            output_dir,
        }
    }

    #[test]
    fn simulate_arguments() {
        let out = Path::new("/tmp/job-1");
        let args = build_engine_args(&simulate_spec(out), false).unwrap();
        assert_eq!(
            args,
            vec![
                "--simulate",
                "--mission",
                "TEST-001",
                "--aircraft",
                "F16",
                "--output-dir",
                "/tmp/job-1",
                "--db-path",
                "/tmp/job-1/test.db",
            ]
        );
    }

    #[test]
    fn simulate_never_passes_input_even_if_present() {
        let out = Path::new("/tmp/job-1");
        let spec = EngineJobSpec {
            input_path: Some(Path::new("/tmp/stale.csv")),
            ..simulate_spec(out)
        };
        let args = build_engine_args(&spec, true).unwrap();
        assert!(!args.iter().any(|a| a == "--input"));
        assert!(!args.iter().any(|a| a == "/tmp/stale.csv"));
    }

    #[test]
    fn upload_requires_input_path() {
        let spec = EngineJobSpec {
            mode: JobMode::CsvUpload,
            input_path: None,
            mission_id: "REAL-01",
            aircraft: "Gripen",
            generate_pdf: false,
            output_dir: Path::new("/tmp/job-2"),
        };
        assert_matches!(
            build_engine_args(&spec, false),
            Err(EngineError::MissingInputPath {
                mode: JobMode::CsvUpload
            })
        );
    }

    #[test]
    fn upload_passes_input_path() {
        let spec = EngineJobSpec {
            mode: JobMode::CsvUpload,
            input_path: Some(Path::new("/data/job-3/input.csv")),
            mission_id: "REAL-01",
            aircraft: "Gripen",
            generate_pdf: false,
            output_dir: Path::new("/data/job-3"),
        };
        let args = build_engine_args(&spec, false).unwrap();
        assert_eq!(&args[..2], ["--input", "/data/job-3/input.csv"]);
        assert!(!args.iter().any(|a| a == "--simulate"));
    }

    #[test]
    fn pdf_flag_requires_both_switches() {
        let out = Path::new("/tmp/job-4");
        for (job_flag, deployment, expected) in [
            (false, false, false),
            (true, false, false),
            (false, true, false),
            (true, true, true),
        ] {
            let spec = EngineJobSpec {
                generate_pdf: job_flag,
                ..simulate_spec(out)
            };
            let args = build_engine_args(&spec, deployment).unwrap();
            assert_eq!(
                args.iter().any(|a| a == "--pdf"),
                expected,
                "job_flag={job_flag} deployment={deployment}"
            );
        }
    }

    #[test]
    fn identical_input_gives_identical_output() {
        let out = Path::new("/tmp/job-5");
        let spec = EngineJobSpec {
            generate_pdf: true,
            ..simulate_spec(out)
        };
        assert_eq!(
            build_engine_args(&spec, true).unwrap(),
            build_engine_args(&spec, true).unwrap()
        );
    }

    #[test]
    fn db_path_uses_fixed_file_name() {
        assert_eq!(
            engine_db_path(Path::new("/srv/artifacts/abc")),
            PathBuf::from("/srv/artifacts/abc/test.db")
        );
    }
}
