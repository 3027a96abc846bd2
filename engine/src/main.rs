// LocalAgent orchestration engine
// Main entry point for the localagent binary

use clap::Parser;
use localagent_engine::cli::{Cli, Command};
use localagent_engine::config::Config;
use localagent_engine::handlers::{
    handle_ask, handle_chat, handle_config, handle_purge, handle_serve, handle_state,
    OutputFormat,
};
use localagent_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let config = Config::load(cli.config.as_deref())?;

    // --log wins over the configured level; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    tracing::debug!(
        "LocalAgent v{} ({} - {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Command::Ask { query, working_dir } => handle_ask(query, working_dir, &config, format).await,
        Command::Chat { working_dir } => handle_chat(working_dir, &config, format).await,
        Command::State => handle_state(&config, format).await,
        Command::Purge { days } => handle_purge(days, &config, format).await,
        Command::Config => handle_config(&config, format),
        Command::Serve { host, port } => {
            tracing::info!("Starting HTTP server...");
            handle_serve(host, port, &config).await
        }
    }
}
