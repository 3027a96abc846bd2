//! Git tool
//!
//! Verifies the working directory is inside a repository, then runs
//! `git {command}` through the shell path.

use sdk::{ToolInvocation, ToolResult};
use std::time::Duration;
use tracing::debug;

use super::process::{self, ProcessOutcome, ProcessSpec};
use super::{missing_argument, shell, ToolContext};

const REPO_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run(invocation: &ToolInvocation, ctx: &ToolContext) -> ToolResult {
    let Ok(command) = invocation.arg_str("command") else {
        return missing_argument("No git command provided");
    };

    if !in_repository(ctx).await {
        return ToolResult::failure("Not in a git repository");
    }

    // Models sometimes repeat the program name
    let command = command.trim();
    let command = command.strip_prefix("git ").unwrap_or(command).trim_start();

    let timeout = ctx.timeout_secs(invocation);
    shell::run_command(&format!("git {}", command), ctx, timeout).await
}

async fn in_repository(ctx: &ToolContext) -> bool {
    let spec = ProcessSpec::new("git", &ctx.working_dir, REPO_CHECK_TIMEOUT)
        .arg("rev-parse")
        .arg("--git-dir");

    match process::run(spec).await {
        Ok(ProcessOutcome::Completed {
            exit_code: Some(0), ..
        }) => true,
        other => {
            debug!("Repository check failed: {:?}", other);
            false
        }
    }
}
