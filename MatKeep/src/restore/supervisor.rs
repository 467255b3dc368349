//! Stage runners.
//!
//! [`SubprocessRunner`] is the production runner: one fresh worker process
//! per stage, killed when it exceeds its budget. [`InProcessRunner`] runs
//! the same task inline and exists for embedding and tests.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::host::AuthoringHost;

use super::config::RestoreConfig;
use super::worker::{self, Sentinel, StageResult, StageTask};

/// How often a running worker is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Lines of worker stderr kept for crash reports.
const STDERR_TAIL_LINES: usize = 20;

/// Executes one stage task.
pub trait StageRunner {
    fn run(&self, task: &StageTask) -> Result<StageResult>;
}

/// Runs tasks in the calling process.
#[derive(Debug, Clone, Default)]
pub struct InProcessRunner<H> {
    host: H,
}

impl<H: AuthoringHost> InProcessRunner<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }
}

impl<H: AuthoringHost> StageRunner for InProcessRunner<H> {
    fn run(&self, task: &StageTask) -> Result<StageResult> {
        worker::run_task(&self.host, task)
    }
}

/// Runs every task in a fresh worker process.
#[derive(Debug, Clone)]
pub struct SubprocessRunner {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl SubprocessRunner {
    /// Runner invoking `program [args] worker --task <file>`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: Duration::from_secs(600),
        }
    }

    /// Runner invoking the currently running executable.
    pub fn current_exe() -> Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    /// Runner for the `[worker]` section of `config`, falling back to the
    /// running executable.
    pub fn from_config(config: &RestoreConfig) -> Result<Self> {
        let runner = match &config.worker.program {
            Some(program) => Self::new(program),
            None => Self::current_exe()?,
        };
        Ok(runner
            .with_args(config.worker.args.clone())
            .with_timeout(config.stage_timeout()))
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn spawn(&self, task_path: &Path) -> Result<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .arg("worker")
            .arg("--task")
            .arg(task_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::WorkerSpawnFailed {
                program: self.program.clone(),
                message: e.to_string(),
            })
    }

    /// Poll `child` until it exits or the budget runs out. A budget too
    /// large to represent as an instant never expires.
    fn wait(&self, child: &mut Child) -> Result<Option<ExitStatus>> {
        let deadline = Instant::now().checked_add(self.timeout);
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                // The process may exit between the check and the kill.
                let _ = child.kill();
                child.wait()?;
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl StageRunner for SubprocessRunner {
    fn run(&self, task: &StageTask) -> Result<StageResult> {
        let stage = task.stage();
        let task_path = task
            .result_path
            .with_file_name(format!("{stage}-task.json"));
        worker::write_task(task, &task_path)?;
        // A stale result must never be mistaken for this run's output.
        if task.result_path.exists() {
            std::fs::remove_file(&task.result_path)?;
        }

        tracing::debug!("Spawning {} for stage {stage}", self.program.display());
        let mut child = self.spawn(&task_path)?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait(&mut child)?;
        let stdout = join(stdout);
        let stderr = join(stderr);

        let Some(status) = status else {
            tracing::warn!("Stage {stage} timed out after {}s", self.timeout.as_secs());
            return Err(Error::HostTimeout {
                stage: stage.to_string(),
                timeout_secs: self.timeout.as_secs(),
            });
        };

        match worker::parse_sentinel(&stdout) {
            Some(Sentinel::Failed { message, .. }) => Err(Error::StageFailed {
                stage: stage.to_string(),
                message,
            }),
            _ if !status.success() => Err(Error::HostCrash {
                stage: stage.to_string(),
                status: status.to_string(),
                detail: tail(&stderr, STDERR_TAIL_LINES),
            }),
            Some(Sentinel::Ok(reported)) if reported == stage.as_str() => {
                let result = worker::read_result(&task.result_path).map_err(|e| Error::StageProtocol {
                    stage: stage.to_string(),
                    message: format!("unreadable result file: {e}"),
                })?;
                if result.stage() != stage {
                    return Err(Error::StageProtocol {
                        stage: stage.to_string(),
                        message: format!("worker returned a {} result", result.stage()),
                    });
                }
                Ok(result)
            }
            Some(Sentinel::Ok(reported)) => Err(Error::StageProtocol {
                stage: stage.to_string(),
                message: format!("worker reported stage '{reported}'"),
            }),
            None => Err(Error::StageProtocol {
                stage: stage.to_string(),
                message: "worker exited without a sentinel".to_string(),
            }),
        }
    }
}

/// Read a pipe to the end on a helper thread so the child never blocks on
/// a full pipe buffer.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut bytes = Vec::new();
            let _ = pipe.read_to_end(&mut bytes);
            String::from_utf8_lossy(&bytes).into_owned()
        })
    })
}

fn join(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Last `lines` lines of `text`.
fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::HostVersion;
    use crate::restore::worker::StageRequest;
    use tempfile::TempDir;

    fn inspect_task(dir: &Path) -> StageTask {
        StageTask {
            host_version: HostVersion::DEFAULT,
            result_path: dir.join("inspect-result.json"),
            request: StageRequest::Inspect {
                target: dir.join("target.glb"),
            },
        }
    }

    fn shell(script: &str) -> SubprocessRunner {
        SubprocessRunner::new("sh").with_args(vec!["-c".to_string(), script.to_string()])
    }

    #[test]
    fn test_tail() {
        assert_eq!(tail("a\nb\nc", 2), "b\nc");
        assert_eq!(tail("a", 5), "a");
        assert_eq!(tail("", 5), "");
    }

    #[test]
    fn test_spawn_failure() {
        let temp = TempDir::new().unwrap();
        let runner = SubprocessRunner::new(temp.path().join("no-such-worker"));
        let err = runner.run(&inspect_task(temp.path())).unwrap_err();
        assert!(matches!(err, Error::WorkerSpawnFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_crash_keeps_stderr_tail() {
        let temp = TempDir::new().unwrap();
        let err = shell("echo 'segfault in host' >&2; exit 3")
            .run(&inspect_task(temp.path()))
            .unwrap_err();
        match err {
            Error::HostCrash { stage, detail, .. } => {
                assert_eq!(stage, "inspect");
                assert!(detail.contains("segfault in host"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_sentinel() {
        let temp = TempDir::new().unwrap();
        let err = shell("echo 'MATKEEP_STAGE_FAILED inspect: cannot parse asset'; exit 1")
            .run(&inspect_task(temp.path()))
            .unwrap_err();
        assert!(matches!(err, Error::StageFailed { ref message, .. } if message == "cannot parse asset"));
    }

    #[cfg(unix)]
    #[test]
    fn test_clean_exit_without_result_is_a_protocol_error() {
        let temp = TempDir::new().unwrap();
        let err = shell("echo 'MATKEEP_STAGE_OK inspect'")
            .run(&inspect_task(temp.path()))
            .unwrap_err();
        assert!(matches!(err, Error::StageProtocol { .. }));

        let err = shell("exit 0").run(&inspect_task(temp.path())).unwrap_err();
        assert!(matches!(err, Error::StageProtocol { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_worker() {
        let temp = TempDir::new().unwrap();
        let started = Instant::now();
        let err = shell("exec sleep 5")
            .with_timeout(Duration::from_millis(300))
            .run(&inspect_task(temp.path()))
            .unwrap_err();
        assert!(matches!(err, Error::HostTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_unbounded_timeout_waits_for_exit() {
        let temp = TempDir::new().unwrap();
        let err = shell("exit 3")
            .with_timeout(Duration::from_secs(u64::MAX))
            .run(&inspect_task(temp.path()))
            .unwrap_err();
        assert!(matches!(err, Error::HostCrash { .. }));
    }
}
