//! Recorder process supervision
//!
//! Spawns the external recording pipeline through the platform shell,
//! health-checks it after a fixed grace period, and tears it down with a
//! bounded graceful-then-forced sequence.

use crate::error::{Error, Result};
use std::fs::File;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// How often a terminating process is polled for exit
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Where the recorder's output goes
#[derive(Debug, Clone)]
pub enum LogDestination {
    /// Append stdout and stderr to a log file
    File(PathBuf),
    /// Let the recorder write to the caller's console
    Inherit,
    /// Discard all output
    Null,
}

impl LogDestination {
    /// Log file path, when file logging was requested
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            LogDestination::File(path) => Some(path),
            _ => None,
        }
    }
}

/// Handle to a spawned recorder process
#[derive(Debug)]
pub struct RecorderProcess {
    child: Child,
    /// Log file the process writes to, when file logging was requested
    pub log_path: Option<PathBuf>,
}

impl RecorderProcess {
    /// OS process id
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Whether the process is still alive. Reaps the child if it has exited.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

/// Spawn/terminate seam between the session manager and the recorder.
///
/// Implemented by [`RecorderSupervisor`]; test code substitutes backends
/// that launch harmless commands.
pub trait RecorderBackend {
    /// Launch the recorder for one session and health-check it
    fn spawn(&self, command: &str, log: &LogDestination) -> Result<RecorderProcess>;

    /// Terminate the recorder, waiting within the configured bounds
    fn terminate(&self, process: &mut RecorderProcess) -> Result<()>;
}

/// Supervision timings and environment
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// How long the recorder gets to come up before the liveness probe
    pub startup_grace: Duration,

    /// How long a graceful interrupt may take before the force-kill
    pub grace_timeout: Duration,

    /// How long the forced kill may take to reap
    pub kill_timeout: Duration,

    /// Extra environment for the recorder, e.g. GStreamer debug verbosity
    pub env: Vec<(String, String)>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            startup_grace: Duration::from_secs(1),
            grace_timeout: Duration::from_secs(5),
            kill_timeout: Duration::from_secs(2),
            env: vec![("GST_DEBUG".to_string(), "3".to_string())],
        }
    }
}

/// Supervises the external recording pipeline for one session at a time
#[derive(Debug, Clone, Default)]
pub struct RecorderSupervisor {
    config: SupervisorConfig,
}

impl RecorderSupervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self { config }
    }

    /// Run a pipeline descriptor through the platform shell.
    ///
    /// The recorder is a single descriptor string (source, parser, muxer,
    /// segmentation), so the shell does the argument splitting.
    fn shell_command(command: &str) -> Command {
        #[cfg(unix)]
        {
            let mut shell = Command::new("sh");
            shell.arg("-c").arg(command);
            shell
        }

        #[cfg(windows)]
        {
            let mut shell = Command::new("cmd");
            shell.arg("/C").arg(command);
            shell
        }
    }

    fn stdio_for(log: &LogDestination) -> Result<(Stdio, Stdio)> {
        match log {
            LogDestination::File(path) => {
                let file = File::create(path)?;
                let stderr = file.try_clone()?;
                Ok((Stdio::from(file), Stdio::from(stderr)))
            }
            LogDestination::Inherit => Ok((Stdio::inherit(), Stdio::inherit())),
            LogDestination::Null => Ok((Stdio::null(), Stdio::null())),
        }
    }

    /// Poll the child until it exits or the timeout elapses
    fn wait_timeout(child: &mut Child, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if child.try_wait()?.is_some() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            thread::sleep(POLL_INTERVAL.min(timeout));
        }
    }
}

impl RecorderBackend for RecorderSupervisor {
    fn spawn(&self, command: &str, log: &LogDestination) -> Result<RecorderProcess> {
        let (stdout, stderr) = Self::stdio_for(log)?;
        if let Some(path) = log.path() {
            tracing::info!(log = %path.display(), "Recorder output goes to log file");
        }

        tracing::info!(command, "Spawning recorder");
        let mut child = Self::shell_command(command)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .envs(self.config.env.iter().map(|(k, v)| (k, v)))
            .spawn()?;

        // The pipeline fails fast on a bad descriptor or unreachable stream;
        // an exit inside the grace period is a launch failure, not a session.
        thread::sleep(self.config.startup_grace);
        if let Some(status) = child.try_wait()? {
            tracing::error!(%status, "Recorder exited during startup");
            return Err(Error::Launch {
                message: format!("recorder exited during startup ({})", status),
                log_path: log.path().cloned(),
            });
        }

        tracing::info!(pid = child.id(), "Recorder running");
        Ok(RecorderProcess {
            child,
            log_path: log.path().cloned(),
        })
    }

    fn terminate(&self, process: &mut RecorderProcess) -> Result<()> {
        let pid = process.child.id();

        if let Some(status) = process.child.try_wait()? {
            tracing::info!(pid, %status, "Recorder already exited");
            return Ok(());
        }

        tracing::info!(pid, "Interrupting recorder");
        request_interrupt(pid);
        if Self::wait_timeout(&mut process.child, self.config.grace_timeout)? {
            tracing::info!(pid, "Recorder exited after interrupt");
            return Ok(());
        }

        tracing::warn!(pid, "Recorder ignored interrupt, force-killing");
        force_kill(&mut process.child);
        if Self::wait_timeout(&mut process.child, self.config.kill_timeout)? {
            tracing::info!(pid, "Recorder reaped after force-kill");
        } else {
            tracing::error!(pid, "Recorder still alive after force-kill");
        }
        Ok(())
    }
}

/// Ask the recorder to shut down cleanly.
///
/// The recorder runs behind a shell and finalizes its container on
/// interrupt, so the request must reach it before any hard kill.
#[cfg(unix)]
fn request_interrupt(pid: u32) {
    // SAFETY: plain signal delivery to a child we hold the handle of
    let rc = unsafe { libc::kill(pid as i32, libc::SIGINT) };
    if rc != 0 {
        tracing::warn!(pid, "Failed to deliver SIGINT");
    }
}

/// Ask the recorder's process tree to shut down cleanly.
///
/// Windows has no SIGINT delivery to another console process; taskkill
/// without /F posts a close request to the whole tree under the shell.
#[cfg(windows)]
fn request_interrupt(pid: u32) {
    let result = Command::new("taskkill")
        .args(["/T", "/PID", &pid.to_string()])
        .output();
    if let Err(e) = result {
        tracing::warn!(pid, error = %e, "taskkill terminate request failed");
    }
}

#[cfg(unix)]
fn force_kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::warn!(pid = child.id(), error = %e, "Force-kill failed");
    }
}

#[cfg(windows)]
fn force_kill(child: &mut Child) {
    let result = Command::new("taskkill")
        .args(["/F", "/T", "/PID", &child.id().to_string()])
        .output();
    if let Err(e) = result {
        tracing::warn!(pid = child.id(), error = %e, "taskkill force-kill failed");
    }
    // Fallback for a tree taskkill could not reach
    let _ = child.kill();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn fast_supervisor() -> RecorderSupervisor {
        RecorderSupervisor::new(SupervisorConfig {
            startup_grace: Duration::from_millis(50),
            grace_timeout: Duration::from_millis(500),
            kill_timeout: Duration::from_secs(2),
            env: vec![],
        })
    }

    #[test]
    fn test_spawn_and_interrupt() {
        let supervisor = fast_supervisor();
        let mut process = supervisor.spawn("sleep 30", &LogDestination::Null).unwrap();
        assert!(process.is_running());

        supervisor.terminate(&mut process).unwrap();
        assert!(!process.is_running());
    }

    #[test]
    fn test_early_exit_is_launch_failure() {
        let supervisor = fast_supervisor();
        match supervisor.spawn("exit 3", &LogDestination::Null) {
            Err(Error::Launch { message, log_path }) => {
                assert!(message.contains("startup"));
                assert!(log_path.is_none());
            }
            other => panic!("expected Launch error, got {:?}", other),
        }
    }

    #[test]
    fn test_launch_failure_reports_log_path() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("recorder.log");
        let supervisor = fast_supervisor();
        match supervisor.spawn("echo boom >&2; exit 1", &LogDestination::File(log.clone())) {
            Err(Error::Launch { log_path, .. }) => {
                assert_eq!(log_path.as_deref(), Some(log.as_path()));
                let contents = std::fs::read_to_string(&log).unwrap();
                assert!(contents.contains("boom"));
            }
            other => panic!("expected Launch error, got {:?}", other),
        }
    }

    #[test]
    fn test_interrupt_resistant_process_is_force_killed() {
        let supervisor = fast_supervisor();
        let mut process = supervisor
            .spawn("trap '' INT; sleep 30", &LogDestination::Null)
            .unwrap();

        let started = Instant::now();
        supervisor.terminate(&mut process).unwrap();
        assert!(!process.is_running());
        // Grace window elapsed, then the forced kill reaped it within bounds.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(500));
        assert!(elapsed < Duration::from_secs(3));
    }

    #[test]
    fn test_terminate_after_exit_is_noop() {
        let supervisor = fast_supervisor();
        let mut process = supervisor.spawn("sleep 30", &LogDestination::Null).unwrap();
        supervisor.terminate(&mut process).unwrap();
        supervisor.terminate(&mut process).unwrap();
    }
}
