//! Integration tests for the orchestrator
//!
//! Drives full cycles against a real SQLite memory store and real
//! subprocesses, with a scripted completion backend standing in for the model.

use localagent_engine::agent::{AgentState, Orchestrator};
use localagent_engine::db::Database;
use localagent_engine::llm::{CompletionBackend, CompletionService, GenerationParams, LLMError};
use localagent_engine::memory::MemoryService;
use localagent_engine::tools::ToolExecutor;
use std::collections::VecDeque;
use std::sync::Arc;
use tempfile::TempDir;

struct ScriptedBackend {
    responses: VecDeque<String>,
}

impl ScriptedBackend {
    fn new(responses: &[&str]) -> Self {
        Self {
            responses: responses.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CompletionBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn complete(
        &mut self,
        _prompt: &str,
        _params: &GenerationParams,
    ) -> Result<String, LLMError> {
        self.responses
            .pop_front()
            .ok_or_else(|| LLMError::ProviderUnavailable("no more responses".to_string()))
    }
}

struct Harness {
    agent: Orchestrator,
    memory: Arc<dyn MemoryService>,
    workspace: TempDir,
    _data: TempDir,
}

async fn harness(responses: &[&str]) -> Harness {
    let workspace = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    let db = Database::new(&data.path().join("memory.db")).await.unwrap();
    let memory: Arc<dyn MemoryService> = Arc::new(db.memories());

    let agent = Orchestrator::new(
        CompletionService::new(Box::new(ScriptedBackend::new(responses))),
        Arc::clone(&memory),
        ToolExecutor::new(workspace.path()),
    );

    Harness {
        agent,
        memory,
        workspace,
        _data: data,
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_list_files_runs_shell_and_records_execution() {
    let mut h =
        harness(&[r#"{"tool_calls":[{"name":"shell","arguments":{"command":"ls"}}]}"#]).await;
    std::fs::write(h.workspace.path().join("hello.txt"), "hi").unwrap();

    let response = h.agent.process_query("list files").await;

    assert!(response.success);
    assert_eq!(response.message, "Tool execution completed");
    assert!(response.error.is_none());

    let results = response.result.unwrap();
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["success"], true);
    assert!(results[0]["output"].as_str().unwrap().contains("hello.txt"));

    assert_eq!(h.memory.count().await.unwrap(), 1);
    let context = h.memory.relevant_context("anything", 5, 24).await.unwrap();
    assert_eq!(context, vec!["Executed tool: shell".to_string()]);

    assert_eq!(h.agent.state(), AgentState::Completed);
    assert!(h.agent.history().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_second_call_sees_file_from_first() {
    let mut h = harness(&[r#"{"tool_calls":[
            {"name":"shell","arguments":{"command":"sleep 0.2 && echo payload > made.txt"}},
            {"name":"shell","arguments":{"command":"cat made.txt"}}
        ]}"#])
    .await;

    let response = h.agent.process_query("make then read").await;

    assert!(response.success);
    let calls = response.tool_calls.unwrap();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.success));
    assert_eq!(calls[1].result.as_ref().unwrap().output.trim(), "payload");
    assert_eq!(h.memory.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_unknown_tool_does_not_stop_siblings() {
    let mut h = harness(&[r#"{"tool_calls":[
            {"name":"unknown-x","arguments":{}},
            {"name":"shell","arguments":{}}
        ]}"#])
    .await;

    let response = h.agent.process_query("try things").await;

    assert_eq!(h.agent.state(), AgentState::Completed);
    assert!(response.error.is_none());

    let calls = response.tool_calls.unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].error.as_deref(), Some("Unknown tool: unknown-x"));
    assert_eq!(calls[1].error.as_deref(), Some("No command provided"));
    assert_eq!(h.memory.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_answers_are_remembered_as_conversation() {
    let mut h = harness(&["Rust is a systems language.", "You asked about Rust."]).await;

    let first = h.agent.process_query("what is rust?").await;
    assert_eq!(first.answer_text(), Some("Rust is a systems language."));
    assert!(first.tool_calls.is_none());
    assert_eq!(h.agent.history().len(), 2);

    h.agent.process_query("what did I ask?").await;
    assert_eq!(h.agent.history().len(), 4);

    let turns = h.memory.conversation_history(10, 24).await.unwrap();
    assert_eq!(turns.len(), 4);
    // Newest first
    assert_eq!(turns[0].content, "You asked about Rust.");
    assert_eq!(turns[3].content, "what is rust?");
}

#[tokio::test]
async fn test_history_is_bounded_across_many_cycles() {
    let answers: Vec<String> = (0..8).map(|i| format!("answer {}", i)).collect();
    let refs: Vec<&str> = answers.iter().map(String::as_str).collect();
    let mut h = harness(&refs).await;

    for i in 0..8 {
        h.agent.process_query(&format!("question {}", i)).await;
    }

    let turns: Vec<_> = h.agent.history().iter().collect();
    assert_eq!(turns.len(), 10);
    assert_eq!(turns[0].content, "question 3");
    assert_eq!(turns[9].content, "answer 7");
}

#[tokio::test]
async fn test_generation_failure_then_recovery() {
    let mut h = harness(&[]).await;

    let failed = h.agent.process_query("hello").await;
    assert!(!failed.success);
    assert_eq!(failed.message, "Error processing query");
    assert!(failed.error.is_some());
    assert_eq!(h.agent.state(), AgentState::Failed);
    assert_eq!(h.memory.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_working_directory_switch() {
    let h = harness(&[]).await;
    let other = TempDir::new().unwrap();

    let resolved = h.agent.set_working_directory(other.path()).unwrap();
    assert_eq!(resolved, other.path().canonicalize().unwrap());
    assert_eq!(h.agent.working_directory(), resolved);

    assert!(h
        .agent
        .set_working_directory(&other.path().join("missing"))
        .is_err());
    assert_eq!(h.agent.working_directory(), resolved);
}
