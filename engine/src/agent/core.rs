//! Agent Core
//!
//! The orchestrator drives one query through a single cycle:
//!
//! 1. Retrieve context from memory (failure degrades to no context)
//! 2. Build the prompt from context, recent history and the tool catalogue
//! 3. Generate a response through the completion service
//! 4. If the response carries tool calls, run them sequentially, recording
//!    each result in memory before the next starts
//! 5. Otherwise record the exchange and return the answer
//!
//! Only a generation failure aborts a cycle. Tool failures are reported in
//! the response; memory problems are logged.
//!
//! An orchestrator is not meant to process two queries at once. Hosts that
//! share one across tasks wrap it in an async mutex.

use sdk::errors::EngineError;
use sdk::{AgentResponse, ToolCallOutcome, ToolInvocation, ToolResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::llm::{CompletionService, GenerationParams};
use crate::memory::{conversation_metadata, tool_execution_metadata, MemoryService};
use crate::tools::ToolExecutor;

use super::history::ConversationHistory;
use super::parser::parse_tool_calls;
use super::prompt::build_prompt;
use super::state::AgentState;

/// Tunables for a cycle
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Context items requested from memory
    pub context_limit: usize,

    /// Recency window for context retrieval
    pub context_window_hours: u64,

    pub params: GenerationParams,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            context_limit: 5,
            context_window_hours: 24,
            params: GenerationParams::default(),
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            context_limit: config.memory.context_limit,
            context_window_hours: config.memory.context_window_hours,
            params: config.generation_params(),
        }
    }
}

/// Single-session agent orchestrator
pub struct Orchestrator {
    completion: CompletionService,
    memory: Arc<dyn MemoryService>,
    tools: ToolExecutor,
    history: ConversationHistory,
    state: AgentState,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        completion: CompletionService,
        memory: Arc<dyn MemoryService>,
        tools: ToolExecutor,
    ) -> Self {
        Self {
            completion,
            memory,
            tools,
            history: ConversationHistory::new(),
            state: AgentState::Idle,
            settings: OrchestratorSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn working_directory(&self) -> PathBuf {
        self.tools.working_directory()
    }

    /// Change where subsequent tool invocations run
    pub fn set_working_directory(&self, path: &Path) -> Result<PathBuf, EngineError> {
        self.tools.set_working_directory(path)
    }

    pub fn tools(&self) -> &ToolExecutor {
        &self.tools
    }

    pub fn memory(&self) -> Arc<dyn MemoryService> {
        Arc::clone(&self.memory)
    }

    pub fn completion(&self) -> &CompletionService {
        &self.completion
    }

    pub fn backend_name(&self) -> &str {
        self.completion.backend_name()
    }

    /// Delete memories older than `days`
    pub async fn clear_memory(&self, days: u64) -> Result<u64, EngineError> {
        self.memory.purge_older_than(days).await
    }

    fn transition(&mut self, next: AgentState) {
        if !self.state.can_transition_to(next) {
            // Only reachable if a previous cycle was cancelled mid-flight
            warn!("Unexpected state transition {} -> {}", self.state, next);
        }
        debug!("State {} -> {}", self.state, next);
        self.state = next;
    }

    /// Run one full cycle for `query`
    pub async fn process_query(&mut self, query: &str) -> AgentResponse {
        let cycle_id = Uuid::new_v4();
        let span = info_span!("cycle", id = %cycle_id);
        self.run_cycle(query).instrument(span).await
    }

    async fn run_cycle(&mut self, query: &str) -> AgentResponse {
        let start = Instant::now();
        self.transition(AgentState::Thinking);
        info!("Processing query ({} chars)", query.len());

        let context = match self
            .memory
            .relevant_context(
                query,
                self.settings.context_limit,
                self.settings.context_window_hours,
            )
            .await
        {
            Ok(context) => context,
            Err(e) => {
                warn!("{}", EngineError::ContextRetrievalDegraded(e.to_string()));
                Vec::new()
            }
        };

        let history = self.history.turns();
        let prompt = build_prompt(query, &context, &history, &self.tools.list_tools());

        let text = match self
            .completion
            .generate(&prompt, &history, &self.settings.params)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                error!("Cycle failed: {}", e);
                self.transition(AgentState::Failed);
                return AgentResponse::failure(e.to_string());
            }
        };

        let response = match parse_tool_calls(&text) {
            Some(calls) => {
                self.transition(AgentState::Executing);
                let outcomes = self.execute_calls(calls).await;
                AgentResponse::tools(outcomes)
            }
            None => {
                self.record_exchange(query, &text).await;
                AgentResponse::answer(text)
            }
        };

        self.transition(AgentState::Completed);
        info!(
            "Cycle completed in {}ms (success: {})",
            start.elapsed().as_millis(),
            response.success
        );
        response
    }

    /// Run invocations one after another, in order
    async fn execute_calls(&self, calls: Vec<ToolInvocation>) -> Vec<ToolCallOutcome> {
        let mut outcomes = Vec::with_capacity(calls.len());

        for call in calls {
            info!("Executing tool {}", call.name);
            let result = self.tools.execute(&call).await;
            self.record_tool_execution(&call, &result).await;
            outcomes.push(ToolCallOutcome::from_result(call.name, result));
        }

        outcomes
    }

    async fn record_tool_execution(&self, call: &ToolInvocation, result: &ToolResult) {
        let details = format!(
            "Arguments: {}\nResult: {}",
            call.arguments_json(),
            result.summary()
        );
        let metadata = tool_execution_metadata(&call.name, details, result.success);

        if let Err(e) = self
            .memory
            .append(&format!("Executed tool: {}", call.name), Some(metadata), None)
            .await
        {
            warn!("{}", EngineError::MemoryWriteDegraded(e.to_string()));
        }
    }

    async fn record_exchange(&mut self, query: &str, answer: &str) {
        self.history.push_exchange(query, answer);

        for (role, content) in [("user", query), ("assistant", answer)] {
            if let Err(e) = self
                .memory
                .append(content, Some(conversation_metadata(role)), None)
                .await
            {
                warn!("{}", EngineError::MemoryWriteDegraded(e.to_string()));
            }
        }
    }
}
