// src/metrics.rs

//! Child process bookkeeping backed by `sysinfo`.
//!
//! - Peak RSS of a running child, sampled on a tokio interval task.
//! - Discovery and termination of a child's descendants, used when a
//!   command times out.
//!
//! Everything here is best-effort: if the process table cannot be read the
//! functions degrade to `None` / no-op instead of failing the request.

use std::time::Duration;

use sysinfo::{Pid, System};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Metrics collected for a single invocation.
#[derive(Debug, Clone)]
pub struct InvocationMetrics {
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u128,

    /// Peak RSS memory in KB (best-effort).
    pub max_rss_kb: Option<u64>,
}

/// Tracks peak memory usage of a child process while it runs.
///
/// Sampling runs as a task on the current runtime; dropping the tracker
/// aborts it.
pub struct MemoryTracker {
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<u64>>,
}

impl MemoryTracker {
    /// Start sampling `pid_u32` every `sample_every`.
    ///
    /// Sampling ends on its own once the process disappears.
    pub fn start(pid_u32: u32, sample_every: Duration) -> Self {
        let (stop, mut stopped) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let pid = Pid::from_u32(pid_u32);
            let mut system = System::new();
            let mut ticker = tokio::time::interval(sample_every);
            let mut max_kb = 0u64;

            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => {}
                }

                if !system.refresh_process(pid) {
                    break;
                }

                let Some(process) = system.process(pid) else {
                    break;
                };

                // sysinfo reports bytes
                max_kb = max_kb.max(process.memory() / 1024);
            }

            max_kb
        });

        Self {
            stop: Some(stop),
            handle: Some(handle),
        }
    }

    /// Stop tracking and return the peak RSS in KB, `None` if nothing was sampled.
    pub async fn stop_and_take(mut self) -> Option<u64> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }

        let max = match self.handle.take() {
            Some(handle) => handle.await.unwrap_or(0),
            None => 0,
        };

        (max > 0).then_some(max)
    }
}

impl Drop for MemoryTracker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// All live descendants of `root`, parents before children.
pub fn descendants(system: &System, root: u32) -> Vec<Pid> {
    let root = Pid::from_u32(root);
    let mut found: Vec<Pid> = Vec::new();
    let mut frontier = vec![root];

    while let Some(parent) = frontier.pop() {
        for (pid, process) in system.processes() {
            if process.parent() == Some(parent) && *pid != root && !found.contains(pid) {
                found.push(*pid);
                frontier.push(*pid);
            }
        }
    }

    found
}

/// SIGKILL every descendant of `root`. Returns how many signals were delivered.
///
/// Must run while `root` is still alive; once it is reaped its children are
/// re-parented and can no longer be found from it.
pub fn kill_descendants(root: u32) -> usize {
    let mut system = System::new();
    system.refresh_processes();

    descendants(&system, root)
        .into_iter()
        .filter_map(|pid| system.process(pid))
        .filter(|process| process.kill())
        .count()
}

/// Signal every process in the group led by `pgid`: SIGTERM, then SIGKILL
/// after `grace`.
///
/// Catches descendants that were re-parented after their parent exited,
/// which `kill_descendants` can no longer reach. The group must have been
/// created at spawn with `process_group(0)`.
#[cfg(unix)]
pub async fn kill_process_group(pgid: u32, grace: Duration) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid as NixPid;

    let Ok(raw) = i32::try_from(pgid) else {
        return;
    };
    let group = NixPid::from_raw(raw);

    // ESRCH just means the group is already gone
    if killpg(group, Signal::SIGTERM).is_err() {
        return;
    }

    tokio::time::sleep(grace).await;

    let _ = killpg(group, Signal::SIGKILL);
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};
    use std::thread;

    #[test]
    fn finds_and_kills_grandchild() {
        let mut parent = Command::new("/bin/sh")
            .arg("-c")
            .arg("sleep 30 & wait")
            .stdout(Stdio::null())
            .spawn()
            .unwrap();

        // give the shell time to fork
        thread::sleep(Duration::from_millis(300));

        let mut system = System::new();
        system.refresh_processes();
        let found = descendants(&system, parent.id());
        assert!(!found.is_empty(), "sleep should be a descendant of the shell");

        assert!(kill_descendants(parent.id()) >= 1);

        // the shell's `wait` only returns once its child is gone
        parent.wait().unwrap();

        system.refresh_processes();
        for pid in found {
            let alive = system
                .process(pid)
                .map_or(false, |p| p.status() != sysinfo::ProcessStatus::Zombie);
            assert!(!alive, "descendant {} still running", pid);
        }
    }

    #[tokio::test]
    async fn tracker_samples_running_process() {
        let mut child = Command::new("/bin/sh")
            .arg("-c")
            .arg("sleep 1")
            .spawn()
            .unwrap();

        let tracker = MemoryTracker::start(child.id(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(200)).await;
        let peak = tracker.stop_and_take().await;

        child.kill().ok();
        child.wait().unwrap();

        assert!(peak.is_some());
    }

    #[tokio::test]
    async fn group_kill_reaches_orphaned_members() {
        use std::os::unix::process::CommandExt;

        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");

        // the leader exits at once, leaving `sleep` re-parented to init
        let mut leader = Command::new("/bin/sh")
            .arg("-c")
            .arg(format!("sleep 30 & echo $! > {}", pid_file.display()))
            .process_group(0)
            .spawn()
            .unwrap();
        let pgid = leader.id();
        leader.wait().unwrap();

        let orphan: u32 = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        assert!(is_running(orphan));

        kill_process_group(pgid, Duration::from_millis(100)).await;

        assert!(wait_until_gone(orphan).await, "orphan {} still running", orphan);
    }

    fn is_running(pid: u32) -> bool {
        let pid = Pid::from_u32(pid);
        let mut system = System::new();
        system.refresh_process(pid)
            && system
                .process(pid)
                .map_or(false, |p| p.status() != sysinfo::ProcessStatus::Zombie)
    }

    /// Signals are asynchronous; allow the target a moment to die.
    async fn wait_until_gone(pid: u32) -> bool {
        for _ in 0..40 {
            if !is_running(pid) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }
}
