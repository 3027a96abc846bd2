//! Local Agent SDK
//!
//! Shared data model for the local agent engine and the front ends that host it.
//! Front ends only need this crate to interpret what the engine returns.

/// Error types and handling
pub mod errors;

/// Tool invocation, tool result and agent response types
pub mod types;

// Re-export commonly used types
pub use errors::{AgentErrorExt, EngineError};
pub use types::{AgentResponse, ToolArgumentError, ToolCallOutcome, ToolInvocation, ToolResult};
