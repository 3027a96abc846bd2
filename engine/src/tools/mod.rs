//! Tool registry and executor
//!
//! The set of tools is closed: [`ToolKind`] names every capability the model
//! can call. The executor resolves an invocation to a kind, runs it in the
//! current working directory and folds every failure into a [`ToolResult`].

pub mod git;
pub mod process;
pub mod python;
pub mod shell;

use sdk::errors::EngineError;
use sdk::{ToolInvocation, ToolResult};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use process::ProcessOutcome;

/// Every tool the executor can run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Shell,
    Git,
    Python,
}

impl ToolKind {
    /// Registration order; also the order tools are listed in prompts
    pub const ALL: [ToolKind; 3] = [ToolKind::Shell, ToolKind::Git, ToolKind::Python];

    /// Resolve a tool name. `code` is accepted as an alias for `python`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "shell" => Some(ToolKind::Shell),
            "git" => Some(ToolKind::Git),
            "python" | "code" => Some(ToolKind::Python),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Shell => "shell",
            ToolKind::Git => "git",
            ToolKind::Python => "python",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::Shell => {
                "Execute a shell command. Arguments: command (string), timeout (seconds, optional)"
            }
            ToolKind::Git => {
                "Run a git subcommand in the working directory. Arguments: command (e.g. \"status\"), timeout (optional)"
            }
            ToolKind::Python => {
                "Execute Python code or a script. Arguments: code (string) or script_path (string), timeout (optional)"
            }
        }
    }
}

/// Per-invocation execution context, snapshotted when the invocation starts
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub working_dir: PathBuf,
    pub default_timeout_secs: u64,
    pub python: String,
}

impl ToolContext {
    /// Timeout requested by the invocation, or the default
    pub fn timeout_secs(&self, invocation: &ToolInvocation) -> u64 {
        invocation
            .arg_u64_opt("timeout")
            .filter(|t| *t > 0)
            .unwrap_or(self.default_timeout_secs)
    }
}

/// Convert a finished process into a tool result
pub(crate) fn outcome_to_result(outcome: ProcessOutcome, label: &str, timeout_secs: u64) -> ToolResult {
    match outcome {
        ProcessOutcome::Completed {
            stdout,
            stderr,
            exit_code,
        } => ToolResult::completed(stdout, &stderr, exit_code),
        ProcessOutcome::TimedOut => ToolResult::timed_out(label, timeout_secs),
    }
}

/// Failure result for a missing required argument
pub(crate) fn missing_argument(message: &str) -> ToolResult {
    ToolResult::failure(EngineError::ToolArgumentMissing(message.to_string()).to_string())
}

/// Runs tool invocations against a mutable working directory.
///
/// Clones share the working directory.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    working_dir: Arc<RwLock<PathBuf>>,
    default_timeout_secs: u64,
    python: String,
}

impl ToolExecutor {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Arc::new(RwLock::new(working_dir.into())),
            default_timeout_secs: 60,
            python: "python3".to_string(),
        }
    }

    pub fn with_default_timeout(mut self, secs: u64) -> Self {
        self.default_timeout_secs = secs.max(1);
        self
    }

    pub fn with_python(mut self, interpreter: impl Into<String>) -> Self {
        self.python = interpreter.into();
        self
    }

    pub fn working_directory(&self) -> PathBuf {
        self.working_dir
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Change the directory used by subsequent invocations.
    ///
    /// Invocations already running keep the directory they started with.
    pub fn set_working_directory(&self, path: &Path) -> Result<PathBuf, EngineError> {
        if !path.is_dir() {
            return Err(EngineError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Not a directory: {}", path.display()),
            )));
        }
        let resolved = path.canonicalize()?;

        *self.working_dir.write().unwrap_or_else(|e| e.into_inner()) = resolved.clone();
        info!("Working directory set to {}", resolved.display());
        Ok(resolved)
    }

    /// Tool names and one-line descriptions, in registration order
    pub fn list_tools(&self) -> Vec<(&'static str, &'static str)> {
        ToolKind::ALL
            .iter()
            .map(|kind| (kind.name(), kind.description()))
            .collect()
    }

    fn context(&self) -> ToolContext {
        ToolContext {
            working_dir: self.working_directory(),
            default_timeout_secs: self.default_timeout_secs,
            python: self.python.clone(),
        }
    }

    /// Execute one invocation. Never fails: errors are reported in the result.
    pub async fn execute(&self, invocation: &ToolInvocation) -> ToolResult {
        let start = Instant::now();

        let result = match ToolKind::from_name(&invocation.name) {
            None => {
                warn!("Unknown tool requested: {}", invocation.name);
                ToolResult::failure(EngineError::ToolNotFound(invocation.name.clone()).to_string())
            }
            Some(kind) => {
                let ctx = self.context();
                match kind {
                    ToolKind::Shell => shell::run(invocation, &ctx).await,
                    ToolKind::Git => git::run(invocation, &ctx).await,
                    ToolKind::Python => python::run(invocation, &ctx).await,
                }
            }
        };

        audit(invocation, &result, start.elapsed());
        result
    }
}

/// Structured audit record for one tool execution
fn audit(invocation: &ToolInvocation, result: &ToolResult, elapsed: Duration) {
    let args_preview: String = invocation.arguments_json().chars().take(200).collect();

    info!(
        target: "tool_audit",
        tool = %invocation.name,
        ok = result.success,
        exit_code = ?result.exit_code,
        duration_ms = elapsed.as_millis() as u64,
        args_preview = %args_preview,
        "tool executed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_tool_kind_names() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("code"), Some(ToolKind::Python));
        assert_eq!(ToolKind::from_name("unknown-x"), None);
    }

    #[test]
    fn test_list_tools_is_ordered() {
        let executor = ToolExecutor::new(".");
        let names: Vec<&str> = executor.list_tools().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["shell", "git", "python"]);
    }

    #[test]
    fn test_timeout_argument_falls_back_to_default() {
        let ctx = ToolContext {
            working_dir: PathBuf::from("."),
            default_timeout_secs: 60,
            python: "python3".to_string(),
        };
        let inv = ToolInvocation::new("shell").with_arg("timeout", json!(0));
        assert_eq!(ctx.timeout_secs(&inv), 60);
        let inv = ToolInvocation::new("shell").with_arg("timeout", json!("5"));
        assert_eq!(ctx.timeout_secs(&inv), 5);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let executor = ToolExecutor::new(".");
        let result = executor.execute(&ToolInvocation::new("unknown-x")).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Unknown tool: unknown-x"));
        assert_eq!(result.exit_code, None);
    }

    #[test]
    fn test_set_working_directory() {
        let dir = TempDir::new().unwrap();
        let executor = ToolExecutor::new(".");
        let shared = executor.clone();

        let resolved = executor.set_working_directory(dir.path()).unwrap();
        assert_eq!(shared.working_directory(), resolved);

        let missing = dir.path().join("missing");
        assert!(executor.set_working_directory(&missing).is_err());
        assert_eq!(executor.working_directory(), resolved);
    }
}
