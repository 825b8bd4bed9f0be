use async_trait::async_trait;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

use crate::config::EXECUTION_TIMEOUT;
use crate::engine::validate::ResolvedCommand;
use crate::engine::ExecutionResult;
use crate::error::{ExecutionError, Result};
#[cfg(unix)]
use crate::metrics::kill_process_group;
use crate::metrics::{kill_descendants, InvocationMetrics, MemoryTracker};

const MEMORY_SAMPLE_INTERVAL: Duration = Duration::from_millis(20);

/// Time between SIGTERM and SIGKILL when tearing down a process group.
const KILL_GRACE: Duration = Duration::from_secs(1);

/// Runs a validated command and reports its output.
///
/// The HTTP layer only sees this trait, so tests can swap in a recording
/// implementation.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &ResolvedCommand) -> Result<ExecutionResult>;
}

/// Spawns commands as real child processes with a wall-clock timeout.
///
/// No shell is involved: the program is exec'd directly with each argument
/// as a separate token. stdin is closed, stdout and stderr are buffered in
/// full and decoded as lossy UTF-8. On unix the child leads its own process
/// group, so everything it starts can be killed together.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self {
            timeout: EXECUTION_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &ResolvedCommand) -> Result<ExecutionResult> {
        let mut std_cmd = std::process::Command::new(&command.program);
        std_cmd
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            std_cmd.process_group(0);
        }

        let mut cmd = Command::from(std_cmd);
        cmd.kill_on_drop(true);

        let start = Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| ExecutionError::SpawnFailure(e.to_string()))?;

        let pid = child.id();
        let memory = pid.map(|pid| MemoryTracker::start(pid, MEMORY_SAMPLE_INTERVAL));

        tracing::debug!(pid = ?pid, program = %command.program.display(), "child spawned");

        let outcome = tokio::time::timeout(self.timeout, collect_output(&mut child)).await;

        let metrics = InvocationMetrics {
            duration_ms: start.elapsed().as_millis(),
            max_rss_kb: match memory {
                Some(tracker) => tracker.stop_and_take().await,
                None => None,
            },
        };

        match outcome {
            Ok(Ok((status, stdout, stderr))) => {
                let exit_code = exit_code(status);

                tracing::info!(
                    pid = ?pid,
                    exit_code,
                    duration_ms = metrics.duration_ms,
                    max_rss_kb = ?metrics.max_rss_kb,
                    "command finished"
                );

                Ok(ExecutionResult {
                    stdout: String::from_utf8_lossy(&stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                    exit_code,
                })
            }

            Ok(Err(e)) => {
                tracing::error!(pid = ?pid, error = %e, "failed while collecting command output");
                terminate(&mut child, pid).await;
                Err(ExecutionError::SpawnFailure(e.to_string()))
            }

            Err(_) => {
                tracing::warn!(
                    pid = ?pid,
                    timeout_secs = self.timeout.as_secs(),
                    duration_ms = metrics.duration_ms,
                    "command timed out, killing process tree"
                );
                terminate(&mut child, pid).await;
                Err(ExecutionError::Timeout(self.timeout))
            }
        }
    }
}

/// Drain both pipes and wait for exit concurrently, so a chatty child never
/// blocks on a full pipe.
async fn collect_output(child: &mut Child) -> io::Result<(ExitStatus, Vec<u8>, Vec<u8>)> {
    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stdout was not captured"))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stderr was not captured"))?;

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    let (status, _, _) = tokio::try_join!(
        child.wait(),
        stdout_pipe.read_to_end(&mut stdout),
        stderr_pipe.read_to_end(&mut stderr),
    )?;

    Ok((status, stdout, stderr))
}

/// Tear down everything the child started, then reap the child.
///
/// Descendants are walked first while they can still be found through the
/// child; the process group then catches members that were already
/// re-parented because their parent exited.
async fn terminate(child: &mut Child, pid: Option<u32>) {
    if let Some(pid) = pid {
        let killed = kill_descendants(pid);
        if killed > 0 {
            tracing::debug!(pid, killed, "killed descendant processes");
        }

        #[cfg(unix)]
        kill_process_group(pid, KILL_GRACE).await;
    }

    match child.try_wait() {
        Ok(Some(_)) => {}
        _ => {
            if let Err(e) = child.kill().await {
                tracing::warn!(pid = ?pid, error = %e, "failed to kill child process");
            }
        }
    }
}

/// Exit code as the OS reports it; a signal-terminated process reports `-signal`.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    -1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::fs;
    use std::path::PathBuf;

    fn sh(script: &str) -> ResolvedCommand {
        ResolvedCommand {
            program: PathBuf::from("/bin/sh"),
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    #[tokio::test]
    async fn captures_both_streams_and_exit_code() {
        let result = ProcessRunner::new()
            .run(&sh("echo out; echo err >&2; exit 2"))
            .await
            .unwrap();

        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
        assert_eq!(result.exit_code, 2);
    }

    #[tokio::test]
    async fn arguments_are_not_shell_expanded() {
        let mut cmd = sh(r#"for a in "$@"; do echo "[$a]"; done"#);
        cmd.args.push("argv0".into());
        cmd.args
            .extend(["a b", "$HOME", "; rm -rf /", "*"].map(String::from));

        let result = ProcessRunner::new().run(&cmd).await.unwrap();

        assert_eq!(result.stdout, "[a b]\n[$HOME]\n[; rm -rf /]\n[*]\n");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let result = ProcessRunner::new()
            .run(&sh(r"printf 'ok\377'"))
            .await
            .unwrap();

        assert_eq!(result.stdout, "ok\u{FFFD}");
    }

    #[tokio::test]
    async fn large_output_does_not_deadlock() {
        let result = ProcessRunner::with_timeout(Duration::from_secs(10))
            .run(&sh(
                "head -c 300000 /dev/zero | tr '\\0' a; head -c 300000 /dev/zero | tr '\\0' b >&2",
            ))
            .await
            .unwrap();

        assert_eq!(result.stdout.len(), 300_000);
        assert_eq!(result.stderr.len(), 300_000);
    }

    #[tokio::test]
    async fn signal_exit_is_negative() {
        let result = ProcessRunner::new().run(&sh("kill -9 $$")).await.unwrap();

        assert_eq!(result.exit_code, -9);
    }

    #[tokio::test]
    async fn timeout_kills_the_child() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");

        let started = Instant::now();
        let err = ProcessRunner::with_timeout(Duration::from_millis(500))
            .run(&sh(&format!("echo $$ > {}; exec sleep 30", pid_file.display())))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(started.elapsed() < Duration::from_secs(10));

        let pid = fs::read_to_string(&pid_file).unwrap();
        let proc_dir = PathBuf::from(format!("/proc/{}", pid.trim()));
        assert!(!proc_dir.exists(), "child should be killed and reaped");
    }

    #[tokio::test]
    async fn timeout_kills_background_process_of_exited_child() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");

        // `sleep` keeps stdout open after its parent has exited and been reaped
        let err = ProcessRunner::with_timeout(Duration::from_millis(500))
            .run(&sh(&format!(
                "sleep 30 & echo $! > {}; exit 0",
                pid_file.display()
            )))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);

        let pid: u32 = fs::read_to_string(&pid_file).unwrap().trim().parse().unwrap();
        assert!(wait_until_gone(pid).await, "background process {} survived", pid);
    }

    async fn wait_until_gone(pid: u32) -> bool {
        let pid = sysinfo::Pid::from_u32(pid);
        let mut system = sysinfo::System::new();

        for _ in 0..40 {
            let running = system.refresh_process(pid)
                && system
                    .process(pid)
                    .map_or(false, |p| p.status() != sysinfo::ProcessStatus::Zombie);
            if !running {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }

    #[tokio::test]
    async fn spawn_failure_reports_os_error() {
        let dir = tempfile::tempdir().unwrap();
        // validated earlier, removed before spawn
        let cmd = ResolvedCommand {
            program: dir.path().join("vanished"),
            args: Vec::new(),
        };

        let err = ProcessRunner::new().run(&cmd).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SpawnFailure);
        assert!(err.to_string().contains("No such file"), "{}", err);
    }
}
