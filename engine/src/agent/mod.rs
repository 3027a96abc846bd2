//! Agent orchestration
//!
//! This module implements the query cycle that turns a user query into either
//! a direct answer or a sequence of executed tool actions. The orchestrator
//! maintains conversation history, tracks its lifecycle state, and
//! coordinates the completion service, tool executor and memory store.

pub mod core;
pub mod history;
pub mod parser;
pub mod prompt;
pub mod state;

pub use core::{Orchestrator, OrchestratorSettings};
pub use history::ConversationHistory;
pub use parser::parse_tool_calls;
pub use state::AgentState;
