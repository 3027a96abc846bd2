//! Error types and handling
//!
//! This module provides the error taxonomy used throughout the local agent.
//! All errors implement the `AgentErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Propagation
//!
//! Only a handful of these abort a query cycle. Retrieval and memory-write
//! problems are degraded to warnings, and every tool error is reported inside
//! the tool's own result rather than escalated.

use thiserror::Error;

/// Trait for agent error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait AgentErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is a static string and never echoes the raw error payload.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be resubmitted by the caller. The engine itself
    /// never retries.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or unreadable configuration
/// - **Database**: SQLite operation failures
/// - **Memory**: Degraded context retrieval or memory writes (non-fatal)
/// - **Generation**: Completion backend failures (fatal to the cycle)
/// - **Tool**: Per-invocation failures (captured, never abort siblings)
///
/// # Examples
///
/// ```
/// use sdk::errors::{AgentErrorExt, EngineError};
///
/// let error = EngineError::ToolTimeout {
///     label: "Command".to_string(),
///     secs: 5,
/// };
/// assert_eq!(error.to_string(), "Command timed out after 5 seconds");
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::Config("bad port".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    // Memory errors
    #[error("Context retrieval degraded: {0}")]
    ContextRetrievalDegraded(String),

    #[error("Memory write degraded: {0}")]
    MemoryWriteDegraded(String),

    // Completion errors
    #[error("Generation failed: {0}")]
    GenerationFailure(String),

    // Tool errors
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    #[error("{0}")]
    ToolArgumentMissing(String),

    #[error("{label} timed out after {secs} seconds")]
    ToolTimeout { label: String, secs: u64 },

    #[error("Subprocess error: {0}")]
    ToolSubprocess(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file and environment overrides",
            Self::Database(_) => "Memory database operation failed. Check the database path",

            Self::ContextRetrievalDegraded(_) => "Memory context was unavailable for this query",
            Self::MemoryWriteDegraded(_) => "The result was not saved to memory",

            Self::GenerationFailure(_) => {
                "The model backend failed to respond. Check that it is running"
            }

            Self::ToolNotFound(_) => "The requested tool is not available",
            Self::ToolArgumentMissing(_) => "The tool call was missing a required argument",
            Self::ToolTimeout { .. } => "The command took too long. Raise its timeout",
            Self::ToolSubprocess(_) => "The command could not be started",

            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}
