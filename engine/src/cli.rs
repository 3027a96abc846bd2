//! CLI interface for LocalAgent
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags for driving the agent.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// LocalAgent orchestration engine
///
/// A local-first agent that answers queries with a locally served model and
/// runs shell, git and python actions in a working directory.
#[derive(Parser, Debug)]
#[command(name = "localagent")]
#[command(
    version = concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("GIT_COMMIT_HASH"),
        " ",
        env!("BUILD_TIMESTAMP"),
        ")"
    ),
    about,
    long_about = None
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Process a single query and exit
    Ask {
        /// The query to process
        query: String,

        /// Run tools in this directory instead of the configured one
        #[arg(short = 'd', long, value_name = "DIR")]
        working_dir: Option<PathBuf>,
    },

    /// Start an interactive session (exit, quit or bye to leave)
    Chat {
        /// Run tools in this directory instead of the configured one
        #[arg(short = 'd', long, value_name = "DIR")]
        working_dir: Option<PathBuf>,
    },

    /// Show agent state, working directory and memory size
    State,

    /// Delete memories older than the given age
    Purge {
        /// Age threshold in days (default: memory.cleanup_days)
        #[arg(long)]
        days: Option<u64>,
    },

    /// Print the effective configuration
    Config,

    /// Serve the HTTP API
    Serve {
        /// Bind address (default: server.host)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (default: server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// Words that end an interactive session
pub fn is_exit_command(line: &str) -> bool {
    matches!(
        line.trim().to_lowercase().as_str(),
        "exit" | "quit" | "bye"
    )
}
