//! Subprocess execution with timeout and process-tree termination
//!
//! Every tool that launches a program goes through [`run`]. On Unix the child
//! is made the leader of a new process group, so a timeout can SIGKILL the
//! whole tree (including anything the shell forked) rather than just the
//! direct child. The child is always reaped before `run` returns.

use sdk::errors::EngineError;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// What to launch and how long to wait for it
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    pub timeout: Duration,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: Vec::new(),
            timeout,
        }
    }

    /// Run `command` through the platform shell
    pub fn shell(command: &str, cwd: impl Into<PathBuf>, timeout: Duration) -> Self {
        #[cfg(windows)]
        let spec = Self::new("cmd", cwd, timeout).arg("/C").arg(command);
        #[cfg(not(windows))]
        let spec = Self::new("sh", cwd, timeout).arg("-c").arg(command);
        spec
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// How a process run ended
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// The process exited on its own. `exit_code` is `None` if it was
    /// terminated by a signal.
    Completed {
        stdout: String,
        stderr: String,
        exit_code: Option<i32>,
    },
    /// The timeout elapsed; the process tree was killed and reaped
    TimedOut,
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// Launch the process described by `spec` and wait for it, up to its timeout.
///
/// Only a failure to spawn or wait is an `Err`; a nonzero exit is a
/// `Completed` outcome.
pub async fn run(spec: ProcessSpec) -> Result<ProcessOutcome, EngineError> {
    debug!(
        "Spawning {} {:?} in {} (timeout {}s)",
        spec.program,
        spec.args,
        spec.cwd.display(),
        spec.timeout.as_secs()
    );

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .current_dir(&spec.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in &spec.env {
        cmd.env(key, value);
    }
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(|e| {
        EngineError::ToolSubprocess(format!("Failed to start {}: {}", spec.program, e))
    })?;
    // The group outlives the leader when a descendant keeps running, and
    // `child.id()` is gone once the leader has been reaped.
    let pgid = child.id();

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();

    let waited = tokio::time::timeout(spec.timeout, async {
        tokio::join!(
            child.wait(),
            read_pipe(stdout_pipe),
            read_pipe(stderr_pipe)
        )
    })
    .await;

    match waited {
        Ok((status, stdout, stderr)) => {
            let status = status.map_err(|e| {
                EngineError::ToolSubprocess(format!("Failed to wait for {}: {}", spec.program, e))
            })?;
            let stdout = stdout.unwrap_or_else(|e| {
                warn!("Failed to read stdout of {}: {}", spec.program, e);
                Vec::new()
            });
            let stderr = stderr.unwrap_or_else(|e| {
                warn!("Failed to read stderr of {}: {}", spec.program, e);
                Vec::new()
            });

            Ok(ProcessOutcome::Completed {
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
                exit_code: status.code(),
            })
        }
        Err(_) => {
            warn!(
                "{} exceeded {}s timeout, killing process tree",
                spec.program,
                spec.timeout.as_secs()
            );
            terminate(&mut child, pgid).await;
            Ok(ProcessOutcome::TimedOut)
        }
    }
}

/// Kill the child's whole process group, then reap the child
async fn terminate(child: &mut Child, pgid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pgid {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            debug!("killpg({}) failed: {}", pid, e);
        }
    }
    #[cfg(not(unix))]
    let _ = pgid;

    if let Err(e) = child.start_kill() {
        debug!("start_kill failed (process likely gone): {}", e);
    }
    if let Err(e) = child.wait().await {
        warn!("Failed to reap killed process: {}", e);
    }
}
