//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - ask: Process a single query
//! - chat: Interactive session against one orchestrator
//! - state: Show agent state and memory size
//! - purge: Delete old memories
//! - config: Print the effective configuration
//! - serve: Run the HTTP API

use anyhow::{bail, Context, Result};
use sdk::AgentResponse;
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::agent::{Orchestrator, OrchestratorSettings};
use crate::cli::is_exit_command;
use crate::config::Config;
use crate::db::Database;
use crate::llm::ollama::OllamaBackend;
use crate::llm::CompletionService;
use crate::memory::embedding::HashEmbedder;
use crate::memory::MemoryService;
use crate::server::{self, AppState};
use crate::tools::ToolExecutor;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// An orchestrator wired to its collaborators, plus the database it writes to
pub struct AgentRuntime {
    pub orchestrator: Orchestrator,
    pub database: Database,
}

impl AgentRuntime {
    /// Flush and close the memory database
    pub async fn shutdown(self) -> Result<()> {
        self.database
            .close()
            .await
            .context("Failed to close memory database")
    }
}

/// Open the memory store and build an orchestrator from `config`
pub async fn build_agent(config: &Config) -> Result<AgentRuntime> {
    let db_path = config.memory_db_path();
    let database = Database::new(&db_path)
        .await
        .with_context(|| format!("Failed to open memory database at {}", db_path.display()))?;

    let mut memories = database.memories();
    if config.memory.embeddings {
        memories = memories.with_embedder(Arc::new(HashEmbedder::default()));
    }

    let backend = match config.model.backend.as_str() {
        "ollama" => OllamaBackend::new(
            config.model.base_url.clone(),
            config.model.model.clone(),
            Duration::from_secs(config.model.request_timeout_secs),
        )
        .context("Failed to create Ollama backend")?,
        other => bail!("Unsupported model backend: {}", other),
    };

    let tools = ToolExecutor::new(&config.core.working_dir)
        .with_default_timeout(config.tools.default_timeout_secs)
        .with_python(config.tools.python.clone());

    let orchestrator = Orchestrator::new(
        CompletionService::new(Box::new(backend)),
        Arc::new(memories),
        tools,
    )
    .with_settings(OrchestratorSettings::from_config(config));

    Ok(AgentRuntime {
        orchestrator,
        database,
    })
}

fn apply_working_dir(orchestrator: &Orchestrator, working_dir: Option<&Path>) -> Result<()> {
    if let Some(dir) = working_dir {
        orchestrator
            .set_working_directory(dir)
            .with_context(|| format!("Invalid working directory: {}", dir.display()))?;
    }
    Ok(())
}

/// Process a single query
pub async fn handle_ask(
    query: String,
    working_dir: Option<PathBuf>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let mut runtime = build_agent(config).await?;
    apply_working_dir(&runtime.orchestrator, working_dir.as_deref())?;

    let response = runtime.orchestrator.process_query(&query).await;
    print_response(&response, format)?;
    runtime.shutdown().await?;

    if let Some(error) = response.error {
        bail!("Query failed: {}", error);
    }
    Ok(())
}

/// Interactive session; one orchestrator for the whole session
pub async fn handle_chat(
    working_dir: Option<PathBuf>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let mut runtime = build_agent(config).await?;
    apply_working_dir(&runtime.orchestrator, working_dir.as_deref())?;

    if matches!(format, OutputFormat::Text) {
        println!(
            "LocalAgent chat ({} via {}). Type 'exit', 'quit' or 'bye' to leave.",
            config.model.model,
            runtime.orchestrator.backend_name()
        );
        println!(
            "Working directory: {}",
            runtime.orchestrator.working_directory().display()
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if matches!(format, OutputFormat::Text) {
            print!("> ");
            std::io::stdout().flush().ok();
        }

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if is_exit_command(query) {
            break;
        }

        let response = runtime.orchestrator.process_query(query).await;
        print_response(&response, format)?;
    }

    if matches!(format, OutputFormat::Text) {
        println!("Goodbye.");
    }
    runtime.shutdown().await
}

/// Show agent state, working directory and memory size
pub async fn handle_state(config: &Config, format: OutputFormat) -> Result<()> {
    let runtime = build_agent(config).await?;
    let orchestrator = &runtime.orchestrator;

    let memories = orchestrator
        .memory()
        .count()
        .await
        .context("Failed to count memories")?;

    match format {
        OutputFormat::Text => {
            println!("State:             {}", orchestrator.state());
            println!(
                "Working directory: {}",
                orchestrator.working_directory().display()
            );
            println!(
                "Model:             {} ({})",
                config.model.model,
                orchestrator.backend_name()
            );
            println!("Memory database:   {}", config.memory_db_path().display());
            println!("Stored memories:   {}", memories);
        }
        OutputFormat::Json => {
            let output = json!({
                "state": orchestrator.state(),
                "working_dir": orchestrator.working_directory().display().to_string(),
                "model": config.model.model,
                "backend": orchestrator.backend_name(),
                "memory_db": config.memory_db_path().display().to_string(),
                "memories": memories,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    runtime.shutdown().await
}

/// Delete memories older than `days` (default from config)
pub async fn handle_purge(days: Option<u64>, config: &Config, format: OutputFormat) -> Result<()> {
    let days = days.unwrap_or(config.memory.cleanup_days);
    let runtime = build_agent(config).await?;

    let cleared = runtime
        .orchestrator
        .clear_memory(days)
        .await
        .context("Failed to purge memories")?;

    match format {
        OutputFormat::Text => {
            println!("Cleared {} memories older than {} days", cleared, days);
        }
        OutputFormat::Json => {
            let output = json!({ "cleared": cleared, "days": days });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    runtime.shutdown().await
}

/// Print the effective configuration
pub fn handle_config(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", config.to_toml_string()?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
    }
    Ok(())
}

/// Serve the HTTP API until Ctrl-C
pub async fn handle_serve(host: Option<String>, port: Option<u16>, config: &Config) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    let runtime = build_agent(config).await?;
    let state = AppState::new(
        runtime.orchestrator,
        config.model.model.clone(),
        config.memory.cleanup_days,
    );

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;

    server::serve(listener, state, async {
        tokio::signal::ctrl_c().await.ok();
    })
    .await?;

    runtime
        .database
        .close()
        .await
        .context("Failed to close memory database")
}

/// Render a cycle's response
pub fn print_response(response: &AgentResponse, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(response)?);
        }
        OutputFormat::Text => {
            if let Some(error) = &response.error {
                eprintln!("Error: {}", error);
                return Ok(());
            }

            if let Some(text) = response.answer_text() {
                println!("{}", text);
                return Ok(());
            }

            for outcome in response.tool_calls.iter().flatten() {
                let status = if outcome.success { "ok" } else { "failed" };
                println!("[{}] {}", outcome.tool, status);

                if let Some(result) = &outcome.result {
                    if !result.output.trim().is_empty() {
                        println!("{}", result.output.trim_end());
                    }
                    if let Some(exit_code) = result.exit_code {
                        println!("  exit code: {}", exit_code);
                    }
                }
                if let Some(error) = &outcome.error {
                    println!("  error: {}", error.trim_end());
                }
            }
        }
    }
    Ok(())
}
