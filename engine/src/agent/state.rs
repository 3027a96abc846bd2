//! Orchestrator lifecycle state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the orchestrator is within a query cycle.
///
/// Within one cycle the state only moves forward:
/// `Idle -> Thinking -> [Executing] -> Completed | Failed`.
/// A new cycle may start from any resting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    #[default]
    Idle,
    Thinking,
    Executing,
    Completed,
    Failed,
}

impl AgentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentState::Idle => "idle",
            AgentState::Thinking => "thinking",
            AgentState::Executing => "executing",
            AgentState::Completed => "completed",
            AgentState::Failed => "failed",
        }
    }

    /// True when no cycle is in progress
    pub fn is_resting(&self) -> bool {
        matches!(
            self,
            AgentState::Idle | AgentState::Completed | AgentState::Failed
        )
    }

    pub fn can_transition_to(&self, next: AgentState) -> bool {
        use AgentState::*;
        match (self, next) {
            (Idle | Completed | Failed, Thinking) => true,
            (Thinking, Executing | Completed | Failed) => true,
            (Executing, Completed | Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
