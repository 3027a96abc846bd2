//! Shell tool
//!
//! Runs a command line through the platform shell in the working directory.
//! A nonzero exit status is still a successful execution; the exit code is
//! reported for the model to interpret.

use sdk::{ToolInvocation, ToolResult};
use std::time::Duration;
use tracing::info;

use super::process::{self, ProcessSpec};
use super::{missing_argument, outcome_to_result, ToolContext};

pub async fn run(invocation: &ToolInvocation, ctx: &ToolContext) -> ToolResult {
    let Ok(command) = invocation.arg_str("command") else {
        return missing_argument("No command provided");
    };

    let timeout = ctx.timeout_secs(invocation);
    run_command(&command, ctx, timeout).await
}

/// Run `command` through the shell with the standard timeout message
pub(crate) async fn run_command(command: &str, ctx: &ToolContext, timeout_secs: u64) -> ToolResult {
    info!("Executing shell command: {}", command);

    let spec = ProcessSpec::shell(command, &ctx.working_dir, Duration::from_secs(timeout_secs));
    match process::run(spec).await {
        Ok(outcome) => outcome_to_result(outcome, "Command", timeout_secs),
        Err(e) => ToolResult::failure(e.to_string()),
    }
}
