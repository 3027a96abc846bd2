//! Tool invocation, tool result and agent response types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::EngineError;

/// A single structured request to run one named tool.
///
/// Produced by the tool-call parser from model output. Never persisted
/// directly; only the outcome of executing it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolInvocation {
    /// Create a new invocation with no arguments
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Map::new(),
        }
    }

    /// Add an argument
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Get a required, non-blank string argument
    pub fn arg_str(&self, key: &str) -> Result<String, ToolArgumentError> {
        match self.arguments.get(key) {
            None | Some(Value::Null) => Err(ToolArgumentError::Missing(key.to_string())),
            Some(Value::String(s)) if s.trim().is_empty() => {
                Err(ToolArgumentError::Missing(key.to_string()))
            }
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(ToolArgumentError::Invalid(key.to_string())),
        }
    }

    /// Get an optional string argument; blank strings count as absent
    pub fn arg_str_opt(&self, key: &str) -> Option<String> {
        self.arguments
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(String::from)
    }

    /// Get an optional unsigned integer argument.
    ///
    /// Models frequently quote numbers, so `"30"` is accepted as well as `30`.
    pub fn arg_u64_opt(&self, key: &str) -> Option<u64> {
        match self.arguments.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Render the arguments as compact JSON for logs and memory entries
    pub fn arguments_json(&self) -> String {
        Value::Object(self.arguments.clone()).to_string()
    }
}

/// Argument accessor errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ToolArgumentError {
    #[error("Missing parameter: {0}")]
    Missing(String),

    #[error("Invalid parameter: {0}")]
    Invalid(String),
}

/// Outcome of executing one tool invocation.
///
/// `exit_code` is only present when a subprocess actually ran to completion.
/// A nonzero exit code is still a successful execution; interpreting it is
/// left to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl ToolResult {
    /// A subprocess that ran to completion. Non-empty stderr is surfaced as `error`.
    pub fn completed(stdout: impl Into<String>, stderr: &str, exit_code: Option<i32>) -> Self {
        Self {
            success: true,
            output: stdout.into(),
            error: (!stderr.is_empty()).then(|| stderr.to_string()),
            exit_code,
        }
    }

    /// A failure before or instead of completion
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
            exit_code: None,
        }
    }

    /// A subprocess that was killed after exceeding its timeout
    pub fn timed_out(label: &str, secs: u64) -> Self {
        Self::failure(
            EngineError::ToolTimeout {
                label: label.to_string(),
                secs,
            }
            .to_string(),
        )
    }

    /// Text used when the result is recorded or shown: output, or error on failure
    pub fn summary(&self) -> &str {
        if self.success || self.error.is_none() {
            &self.output
        } else {
            self.error.as_deref().unwrap_or_default()
        }
    }
}

/// Per-invocation entry in an aggregated agent response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallOutcome {
    pub tool: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ToolResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolCallOutcome {
    /// Build the outcome entry for an executed invocation
    pub fn from_result(tool: impl Into<String>, result: ToolResult) -> Self {
        let error = if result.success {
            None
        } else {
            result.error.clone()
        };
        Self {
            tool: tool.into(),
            success: result.success,
            result: Some(result),
            error,
        }
    }
}

/// Terminal output of one query cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallOutcome>>,
}

impl AgentResponse {
    /// A plain answer from the model
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            success: true,
            message: "Query processed successfully".to_string(),
            result: Some(Value::String(text.into())),
            error: None,
            tool_calls: None,
        }
    }

    /// Aggregate of executed tool calls, in execution order.
    ///
    /// `success` is the conjunction of the individual outcomes; per-tool
    /// failures are reported here, never escalated into `error`.
    pub fn tools(outcomes: Vec<ToolCallOutcome>) -> Self {
        let success = outcomes.iter().all(|o| o.success);
        let results: Vec<Value> = outcomes
            .iter()
            .filter_map(|o| o.result.as_ref())
            .filter_map(|r| serde_json::to_value(r).ok())
            .collect();
        Self {
            success,
            message: "Tool execution completed".to_string(),
            result: Some(Value::Array(results)),
            error: None,
            tool_calls: Some(outcomes),
        }
    }

    /// A cycle that could not complete
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: "Error processing query".to_string(),
            result: None,
            error: Some(error.into()),
            tool_calls: None,
        }
    }

    /// The plain-answer text, if this response carries one
    pub fn answer_text(&self) -> Option<&str> {
        self.result.as_ref().and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_arg_str_success() {
        let inv = ToolInvocation::new("shell").with_arg("command", json!("echo hi"));
        assert_eq!(inv.arg_str("command").unwrap(), "echo hi");
    }

    #[test]
    fn test_arg_str_missing_and_blank() {
        let inv = ToolInvocation::new("shell").with_arg("command", json!("   "));
        assert_eq!(
            inv.arg_str("command"),
            Err(ToolArgumentError::Missing("command".to_string()))
        );
        assert_eq!(
            inv.arg_str("other"),
            Err(ToolArgumentError::Missing("other".to_string()))
        );
    }

    #[test]
    fn test_arg_str_wrong_type() {
        let inv = ToolInvocation::new("shell").with_arg("command", json!(["ls"]));
        assert_eq!(
            inv.arg_str("command"),
            Err(ToolArgumentError::Invalid("command".to_string()))
        );
    }

    #[test]
    fn test_arg_u64_accepts_quoted_numbers() {
        let inv = ToolInvocation::new("shell")
            .with_arg("a", json!(5))
            .with_arg("b", json!("7"))
            .with_arg("c", json!(-1))
            .with_arg("d", json!(true));
        assert_eq!(inv.arg_u64_opt("a"), Some(5));
        assert_eq!(inv.arg_u64_opt("b"), Some(7));
        assert_eq!(inv.arg_u64_opt("c"), None);
        assert_eq!(inv.arg_u64_opt("d"), None);
        assert_eq!(inv.arg_u64_opt("missing"), None);
    }

    #[test]
    fn test_invocation_deserializes_without_arguments() {
        let inv: ToolInvocation = serde_json::from_str(r#"{"name":"git"}"#).unwrap();
        assert_eq!(inv.name, "git");
        assert!(inv.arguments.is_empty());
    }

    #[test]
    fn test_completed_keeps_nonzero_exit_as_success() {
        let result = ToolResult::completed("", "boom", Some(2));
        assert!(result.success);
        assert_eq!(result.exit_code, Some(2));
        assert_eq!(result.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_timed_out_has_no_exit_code() {
        let result = ToolResult::timed_out("Command", 1);
        assert!(!result.success);
        assert_eq!(result.exit_code, None);
        assert_eq!(
            result.error.as_deref(),
            Some("Command timed out after 1 seconds")
        );
    }

    #[test]
    fn test_exit_code_omitted_when_absent() {
        let json = serde_json::to_string(&ToolResult::failure("nope")).unwrap();
        assert!(!json.contains("exit_code"));
        let json = serde_json::to_string(&ToolResult::completed("ok", "", Some(0))).unwrap();
        assert!(json.contains(r#""exit_code":0"#));
    }

    #[test]
    fn test_answer_has_no_tool_calls() {
        let response = AgentResponse::answer("42");
        assert!(response.success);
        assert!(response.tool_calls.is_none());
        assert_eq!(response.answer_text(), Some("42"));
    }

    #[test]
    fn test_tools_aggregates_with_and() {
        let ok = ToolCallOutcome::from_result("shell", ToolResult::completed("a", "", Some(0)));
        let bad = ToolCallOutcome::from_result("git", ToolResult::failure("Not in a git repository"));
        assert_eq!(bad.error.as_deref(), Some("Not in a git repository"));

        let response = AgentResponse::tools(vec![ok.clone()]);
        assert!(response.success);

        let response = AgentResponse::tools(vec![ok, bad]);
        assert!(!response.success);
        assert!(response.error.is_none());
        assert_eq!(response.tool_calls.as_ref().map(Vec::len), Some(2));
        assert_eq!(response.result.unwrap().as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_failure_response() {
        let response = AgentResponse::failure("Generation failed: backend down");
        assert!(!response.success);
        assert_eq!(response.message, "Error processing query");
        assert!(response.result.is_none());
    }
}
