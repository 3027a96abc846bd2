//! Python tool
//!
//! Runs inline code (`-c`) or a script file with the configured interpreter.
//! `PYTHONPATH` points at the working directory so local modules import.

use sdk::{ToolInvocation, ToolResult};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use super::process::{self, ProcessSpec};
use super::{missing_argument, outcome_to_result, ToolContext};

enum Source {
    Code(String),
    Script(PathBuf),
}

pub async fn run(invocation: &ToolInvocation, ctx: &ToolContext) -> ToolResult {
    let source = match (
        invocation.arg_str_opt("code"),
        invocation.arg_str_opt("script_path"),
    ) {
        (None, None) => return missing_argument("No code or script path provided"),
        (Some(_), Some(_)) => {
            return ToolResult::failure("Provide either code or script_path, not both")
        }
        (Some(code), None) => Source::Code(code),
        (None, Some(path)) => {
            let resolved = if PathBuf::from(&path).is_absolute() {
                PathBuf::from(&path)
            } else {
                ctx.working_dir.join(&path)
            };
            if !resolved.is_file() {
                return ToolResult::failure(format!("Script file not found: {}", path));
            }
            Source::Script(resolved)
        }
    };

    let timeout = ctx.timeout_secs(invocation);
    let spec = ProcessSpec::new(&ctx.python, &ctx.working_dir, Duration::from_secs(timeout))
        .env("PYTHONPATH", ctx.working_dir.to_string_lossy());
    let spec = match source {
        Source::Code(code) => {
            info!("Executing inline Python ({} chars)", code.len());
            spec.arg("-c").arg(code)
        }
        Source::Script(path) => {
            info!("Executing Python script {}", path.display());
            spec.arg(path.to_string_lossy())
        }
    };

    match process::run(spec).await {
        Ok(outcome) => outcome_to_result(outcome, "Python execution", timeout),
        Err(e) => ToolResult::failure(e.to_string()),
    }
}
