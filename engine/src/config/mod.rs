//! Configuration management
//!
//! This module handles loading, validation, and management of the agent
//! configuration. Configuration is stored in TOML format at
//! ~/.localagent/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Working directory, log level, data directory
//! - **model**: Completion backend settings and generation parameters
//! - **memory**: Memory database location, context retrieval and cleanup
//! - **tools**: Tool timeouts and interpreter
//! - **server**: HTTP bind address
//!
//! Every field has a default, so a partial file (or no file at all) is a
//! valid configuration.
//!
//! # Environment Overrides
//!
//! After the file is read, these variables replace the matching fields:
//! `MODEL_NAME`, `OLLAMA_URL`, `MAX_TOKENS`, `TEMPERATURE`, `TOP_P`,
//! `MEMORY_DB_PATH`, `MEMORY_CLEANUP_DAYS`, `WORKING_DIR`, `API_HOST`,
//! `API_PORT`.
//!
//! # Path Expansion
//!
//! The configuration system automatically:
//! - Expands ~ to the user's home directory
//! - Canonicalizes the working directory, creating it if needed
//!
//! # Examples
//!
//! ```no_run
//! use localagent_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration from the default location, or defaults
//! let config = Config::load(None)?;
//!
//! println!("Working dir: {:?}", config.core.working_dir);
//! println!("Model: {}", config.model.model);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::llm::GenerationParams;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Core engine settings
    pub core: CoreConfig,

    /// Completion backend configuration
    pub model: ModelConfig,

    /// Memory store configuration
    pub memory: MemoryConfig,

    /// Tool execution settings
    pub tools: ToolsConfig,

    /// HTTP front end settings
    pub server: ServerConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Directory tools run in (supports ~ expansion)
    pub working_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    pub data_dir: PathBuf,
}

/// Completion backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Backend kind. Only "ollama" is currently supported
    pub backend: String,

    /// Base URL for the backend API
    pub base_url: String,

    /// Model name
    pub model: String,

    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,

    /// Per-request timeout for the backend HTTP call
    pub request_timeout_secs: u64,
}

/// Memory store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// SQLite database path. Defaults to `{data_dir}/memory.db`
    pub db_path: Option<PathBuf>,

    /// Number of context items retrieved per query
    pub context_limit: usize,

    /// Recency window for context retrieval
    pub context_window_hours: u64,

    /// Age threshold used by `purge` when no explicit value is given
    pub cleanup_days: u64,

    /// Store and rank by hashed embeddings
    pub embeddings: bool,
}

/// Tool execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Timeout applied when a tool call gives none
    pub default_timeout_secs: u64,

    /// Python interpreter executable
    pub python: String,
}

/// HTTP front end configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.localagent")
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        let params = GenerationParams::default();
        Self {
            backend: "ollama".to_string(),
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            request_timeout_secs: 300,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            context_limit: 5,
            context_window_hours: 24,
            cleanup_days: 30,
            embeddings: false,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: 60,
            python: "python3".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Config {
    /// Load configuration
    ///
    /// An explicit `path` must exist. Without one, `~/.localagent/config.toml`
    /// is read if present, otherwise defaults are used. Environment overrides
    /// are applied, then the result is validated.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - An environment override cannot be parsed
    /// - Validation fails
    pub fn load(path: Option<&Path>) -> Result<Self, EngineError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => {
                let default_path = Self::default_config_path()?;
                if default_path.exists() {
                    Self::load_from_path(&default_path)
                } else {
                    let mut config = Self::default();
                    config.apply_env_overrides()?;
                    config.validate_and_process()?;
                    Ok(config)
                }
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let mut config = Self::from_toml_str(&contents)?;
        config.apply_env_overrides()?;
        config.validate_and_process()?;

        Ok(config)
    }

    /// Parse configuration from TOML text without validating it
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Get the default configuration file path (~/.localagent/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".localagent").join("config.toml"))
    }

    /// Resolved SQLite database path
    pub fn memory_db_path(&self) -> PathBuf {
        self.memory
            .db_path
            .clone()
            .unwrap_or_else(|| self.core.data_dir.join("memory.db"))
    }

    /// Generation parameters for the completion service
    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            max_tokens: self.model.max_tokens,
            temperature: self.model.temperature,
            top_p: self.model.top_p,
        }
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), EngineError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("MODEL_NAME") {
            self.model.model = v;
        }
        if let Some(v) = get("OLLAMA_URL") {
            self.model.base_url = v;
        }
        if let Some(v) = get("MAX_TOKENS") {
            self.model.max_tokens = parse_override("MAX_TOKENS", &v)?;
        }
        if let Some(v) = get("TEMPERATURE") {
            self.model.temperature = parse_override("TEMPERATURE", &v)?;
        }
        if let Some(v) = get("TOP_P") {
            self.model.top_p = parse_override("TOP_P", &v)?;
        }
        if let Some(v) = get("MEMORY_DB_PATH") {
            self.memory.db_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("MEMORY_CLEANUP_DAYS") {
            self.memory.cleanup_days = parse_override("MEMORY_CLEANUP_DAYS", &v)?;
        }
        if let Some(v) = get("WORKING_DIR") {
            self.core.working_dir = PathBuf::from(v);
        }
        if let Some(v) = get("API_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("API_PORT") {
            self.server.port = parse_override("API_PORT", &v)?;
        }

        Ok(())
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates value ranges
    /// - Expands ~ in paths
    /// - Canonicalizes the working directory, creating it if needed
    pub fn validate_and_process(&mut self) -> Result<(), EngineError> {
        // Validate log level
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        // Validate backend
        let valid_backends = ["ollama"];
        if !valid_backends.contains(&self.model.backend.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid model backend '{}'. Must be one of: {}",
                self.model.backend,
                valid_backends.join(", ")
            )));
        }

        // Validate generation parameters
        if self.model.max_tokens == 0 {
            return Err(EngineError::Config(
                "max_tokens must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(EngineError::Config(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
        if self.model.top_p <= 0.0 || self.model.top_p > 1.0 {
            return Err(EngineError::Config(
                "top_p must be greater than 0.0 and at most 1.0".to_string(),
            ));
        }

        if self.tools.default_timeout_secs == 0 {
            return Err(EngineError::Config(
                "default_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.memory.context_limit == 0 {
            return Err(EngineError::Config(
                "context_limit must be greater than 0".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(EngineError::Config(
                "port must be greater than 0".to_string(),
            ));
        }

        // Expand paths
        self.core.data_dir = expand_path(&self.core.data_dir)?;
        if let Some(db_path) = &self.memory.db_path {
            self.memory.db_path = Some(expand_path(db_path)?);
        }

        self.core.working_dir = expand_path(&self.core.working_dir)?;
        self.core.working_dir = canonicalize_or_create(&self.core.working_dir)?;

        // Verify working directory is a directory
        if !self.core.working_dir.is_dir() {
            return Err(EngineError::Config(format!(
                "Working directory is not a directory: {:?}",
                self.core.working_dir
            )));
        }

        Ok(())
    }
}

fn parse_override<T>(key: &str, value: &str) -> Result<T, EngineError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| EngineError::Config(format!("Invalid value for {}: {}", key, e)))
}

/// Expand ~ in path to user's home directory
///
/// # Examples
///
/// ```ignore
/// let path = PathBuf::from("~/projects");
/// let expanded = expand_path(&path)?;
/// // expanded is now /home/user/projects (on Unix)
/// ```
pub fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

/// Canonicalize path, creating it if it doesn't exist
fn canonicalize_or_create(path: &Path) -> Result<PathBuf, EngineError> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| {
            EngineError::Config(format!("Failed to create directory {:?}: {}", path, e))
        })?;
    }

    path.canonicalize()
        .map_err(|e| EngineError::Config(format!("Failed to resolve path {:?}: {}", path, e)))
}
