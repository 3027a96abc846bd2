//! LocalAgent Engine Library
//!
//! This library provides the core functionality of the LocalAgent engine.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Database persistence module
pub mod db;

/// Memory service abstraction
pub mod memory;

/// Completion backends and the serialised completion service
pub mod llm;

/// Built-in tools and the tool executor
pub mod tools;

/// Agent orchestration module
pub mod agent;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;

/// HTTP front end
pub mod server;
