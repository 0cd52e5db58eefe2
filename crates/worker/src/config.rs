use std::path::{Path, PathBuf};
use std::time::Duration;

use flightlab_core::engine::{EngineSettings, DEFAULT_ENGINE_TIMEOUT};
use flightlab_core::queue::{RetryPolicy, DEFAULT_BACKOFF_BASE, DEFAULT_MAX_ATTEMPTS};

/// Default number of jobs processed at once.
const DEFAULT_CONCURRENCY: usize = 2;

/// Default idle wait between queue polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Extra lease time on top of the engine timeout, covering import and sync.
const LEASE_SLACK: Duration = Duration::from_millis(60_000);

/// Log filter used when `RUST_LOG` is unset. Covers every workspace crate
/// so supervisor and queue warnings are not filtered out.
pub const DEFAULT_LOG_FILTER: &str =
    "flightlab_worker=debug,flightlab_pipeline=debug,flightlab_core=debug,flightlab_db=info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} must be {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("failed to resolve current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    /// Jobs processed concurrently (default: `2`).
    pub concurrency: usize,
    pub retry_policy: RetryPolicy,
    /// Idle wait between queue polls (default: `1000` ms).
    pub poll_interval: Duration,
    /// How long a claimed entry stays leased before redelivery.
    pub lease: Duration,
    pub engine: EngineSettings,
    /// Directory holding every job's output directory.
    pub artifacts_root: PathBuf,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                          |
    /// |--------------------------|----------------------------------|
    /// | `DATABASE_URL`           | required                         |
    /// | `QUEUE_CONCURRENCY`      | `2`                              |
    /// | `QUEUE_RETRY_ATTEMPTS`   | `2`                              |
    /// | `QUEUE_BACKOFF_MS`       | `2000`                           |
    /// | `QUEUE_POLL_INTERVAL_MS` | `1000`                           |
    /// | `QUEUE_LEASE_MS`         | engine timeout + `60000`         |
    /// | `ENGINE_BINARY_PATH`     | `<ENGINE_WORKDIR>/build/flight-engine` |
    /// | `ENGINE_WORKDIR`         | current directory                |
    /// | `ENGINE_TIMEOUT_MS`      | `900000`                         |
    /// | `ARTIFACTS_ROOT`         | `<cwd>/data/artifacts`           |
    /// | `ENABLE_PDF`             | `false` (`1`/`true`/`yes`/`on`)  |
    pub fn from_env() -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
        Self::from_lookup(&cwd, |key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, resolving relative defaults
    /// against `cwd`.
    pub fn from_lookup(
        cwd: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let concurrency = parse_positive(&get, "QUEUE_CONCURRENCY", DEFAULT_CONCURRENCY as u64)?;
        let attempts = parse_positive(&get, "QUEUE_RETRY_ATTEMPTS", DEFAULT_MAX_ATTEMPTS.into())?;
        let backoff = parse_millis(&get, "QUEUE_BACKOFF_MS", DEFAULT_BACKOFF_BASE)?;
        let poll_interval = parse_millis(&get, "QUEUE_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL)?;
        let timeout = parse_millis(&get, "ENGINE_TIMEOUT_MS", DEFAULT_ENGINE_TIMEOUT)?;
        let lease = parse_millis(&get, "QUEUE_LEASE_MS", timeout.saturating_add(LEASE_SLACK))?;

        let attempts = u32::try_from(attempts).map_err(|_| ConfigError::Invalid {
            key: "QUEUE_RETRY_ATTEMPTS",
            expected: "a positive 32-bit integer",
            value: attempts.to_string(),
        })?;
        let retry_policy = RetryPolicy::new(attempts, backoff).map_err(|_| ConfigError::Invalid {
            key: "QUEUE_RETRY_ATTEMPTS",
            expected: "at least 1",
            value: attempts.to_string(),
        })?;

        let workdir = get("ENGINE_WORKDIR")
            .map(|v| cwd.join(v))
            .unwrap_or_else(|| cwd.to_path_buf());
        let executable = get("ENGINE_BINARY_PATH")
            .map(|v| workdir.join(v))
            .unwrap_or_else(|| workdir.join("build").join("flight-engine"));
        let artifacts_root = get("ARTIFACTS_ROOT")
            .map(|v| cwd.join(v))
            .unwrap_or_else(|| cwd.join("data").join("artifacts"));
        let pdf_enabled = get("ENABLE_PDF").is_some_and(|v| parse_bool(&v));

        Ok(Self {
            database_url,
            concurrency: concurrency as usize,
            retry_policy,
            poll_interval,
            lease,
            engine: EngineSettings {
                executable,
                workdir,
                timeout,
                pdf_enabled,
            },
            artifacts_root,
        })
    }
}

/// `1`, `true`, `yes` and `on` (any case) are true; anything else is false.
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_u64(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            expected: "a non-negative integer",
            value: raw,
        }),
    }
}

fn parse_positive(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match parse_u64(get, key, default)? {
        0 => Err(ConfigError::Invalid {
            key,
            expected: "at least 1",
            value: "0".to_string(),
        }),
        n => Ok(n),
    }
}

fn parse_millis(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parse_u64(get, key, default_ms).map(Duration::from_millis)
}
