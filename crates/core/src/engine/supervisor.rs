//! Supervised engine execution.
//!
//! [`EngineSupervisor::run`] checks the preconditions of a job, spawns the
//! engine with the argument list from [`build_engine_args`], captures
//! stdout/stderr while it runs, and enforces the wall-clock timeout from
//! [`EngineSettings`]. From the caller's side the whole thing is a single
//! awaitable call.

use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use super::command::{build_engine_args, EngineJobSpec};
use super::error::EngineError;
use super::EngineSettings;

/// Maximum stdout or stderr size kept per stream (10 MiB). Output beyond
/// this is still drained so the engine never blocks on a full pipe.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Read buffer size for stream capture.
const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Time a timed-out engine gets to exit after SIGTERM before SIGKILL.
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// Upper bound on reaping the child after SIGKILL.
const KILL_WAIT: Duration = Duration::from_secs(5);

/// Upper bound on draining the output pipes once the engine has exited.
/// A grandchild that inherited the pipes can otherwise hold them open;
/// output read up to that point is kept.
const STREAM_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Captured result of a successful engine run.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    /// Always `0`; non-zero exits are reported as errors.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Wall-clock time from spawn to exit.
    pub elapsed: Duration,
}

/// Runs the engine for one job at a time per call; holds no per-job state
/// and can be shared across workers.
#[derive(Debug, Clone)]
pub struct EngineSupervisor {
    settings: EngineSettings,
}

impl EngineSupervisor {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    /// Run the engine for `spec`.
    ///
    /// Preconditions are checked immediately before spawning: an upload
    /// job's input file must exist, and so must the executable.
    pub async fn run(&self, spec: &EngineJobSpec<'_>) -> Result<EngineOutput, EngineError> {
        let args = build_engine_args(spec, self.settings.pdf_enabled)?;

        if spec.mode.requires_input() {
            let input = spec
                .input_path
                .ok_or(EngineError::MissingInputPath { mode: spec.mode })?;
            if !path_exists(input).await {
                return Err(EngineError::InputNotFound(input.to_path_buf()));
            }
        }

        if !path_exists(&self.settings.executable).await {
            return Err(EngineError::ExecutableNotFound(
                self.settings.executable.clone(),
            ));
        }

        tracing::debug!(
            executable = %self.settings.executable.display(),
            workdir = %self.settings.workdir.display(),
            ?args,
            "Spawning engine",
        );

        run_command(
            &self.settings.executable,
            &args,
            &self.settings.workdir,
            self.settings.timeout,
        )
        .await
    }
}

/// Spawn `program` with `args` in `workdir`, capture both output streams,
/// and wait for it to exit within `timeout`.
///
/// - Spawn failures return [`EngineError::Spawn`] straight away.
/// - On timeout the child is terminated and [`EngineError::TimedOut`] is
///   returned; partial output is discarded.
/// - A non-zero exit (or death by signal, reported as `-1`) returns
///   [`EngineError::NonZeroExit`] with both captured streams.
pub async fn run_command(
    program: &Path,
    args: &[String],
    workdir: &Path,
    timeout: Duration,
) -> Result<EngineOutput, EngineError> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();

    let mut child = cmd.spawn().map_err(|source| EngineError::Spawn {
        path: program.to_path_buf(),
        source,
    })?;

    let stdout_capture = StreamCapture::spawn(child.stdout.take());
    let stderr_capture = StreamCapture::spawn(child.stderr.take());

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => {
            let elapsed = start.elapsed();
            let (stdout, stderr) =
                tokio::join!(stdout_capture.collect(), stderr_capture.collect());
            let exit_code = status.code().unwrap_or(-1);

            tracing::debug!(
                exit_code,
                elapsed_ms = elapsed.as_millis() as u64,
                stdout_bytes = stdout.len(),
                stderr_bytes = stderr.len(),
                "Engine exited",
            );

            if exit_code != 0 {
                return Err(EngineError::NonZeroExit {
                    exit_code,
                    stdout,
                    stderr,
                });
            }

            Ok(EngineOutput {
                exit_code,
                stdout,
                stderr,
                elapsed,
            })
        }
        Ok(Err(e)) => {
            stdout_capture.abort();
            stderr_capture.abort();
            Err(EngineError::Io(e))
        }
        Err(_elapsed) => {
            tracing::warn!(
                timeout_ms = timeout.as_millis() as u64,
                pid = ?child.id(),
                "Engine timed out, terminating",
            );
            terminate(&mut child).await;
            stdout_capture.abort();
            stderr_capture.abort();
            Err(EngineError::TimedOut { timeout })
        }
    }
}

/// SIGTERM the child, give it [`TERMINATE_GRACE`] to exit, then SIGKILL.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: `pid` is our own child and has not been reaped yet
        // (`Child::id` returns `None` once it has).
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
        if tokio::time::timeout(TERMINATE_GRACE, child.wait())
            .await
            .is_ok()
        {
            return;
        }
    }

    if let Err(e) = child.start_kill() {
        tracing::warn!(error = %e, "Failed to kill engine process");
        return;
    }
    if tokio::time::timeout(KILL_WAIT, child.wait()).await.is_err() {
        tracing::error!("Engine process did not exit after SIGKILL");
    }
}

/// Output of one child stream, filled by a background reader task.
///
/// The buffer is shared with the task so whatever was read survives the
/// task being aborted.
struct StreamCapture {
    buf: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl StreamCapture {
    fn spawn<R: AsyncRead + Unpin + Send + 'static>(handle: Option<R>) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let task = tokio::spawn(read_stream(handle, Arc::clone(&buf)));
        Self { buf, task }
    }

    fn abort(&self) {
        self.task.abort();
    }

    /// Wait up to [`STREAM_DRAIN_GRACE`] for EOF, then return what was read.
    async fn collect(mut self) -> String {
        match tokio::time::timeout(STREAM_DRAIN_GRACE, &mut self.task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Engine output reader failed");
            }
            Err(_) => {
                self.task.abort();
                tracing::warn!(
                    "Engine output pipe still open after exit; keeping partial output"
                );
            }
        }
        let bytes = std::mem::take(&mut *lock(&self.buf));
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

fn lock(buf: &Mutex<Vec<u8>>) -> MutexGuard<'_, Vec<u8>> {
    buf.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read a stream to EOF in chunks, keeping at most [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>, buf: Arc<Mutex<Vec<u8>>>) {
    let Some(mut reader) = handle else {
        return;
    };
    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    let mut truncated = false;
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let mut kept = lock(&buf);
                let room = MAX_OUTPUT_BYTES - kept.len();
                if n <= room {
                    kept.extend_from_slice(&chunk[..n]);
                } else {
                    kept.extend_from_slice(&chunk[..room]);
                    truncated = true;
                }
            }
        }
    }
    if truncated {
        tracing::warn!(limit_bytes = MAX_OUTPUT_BYTES, "Engine output truncated");
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
