//! Configuration loading and resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use agentic_zpt::topic::DEFAULT_TOPIC_TEMPLATE;
use agentic_zpt::types::MAX_TOKENS_LIMIT;
use agentic_zpt::EMBEDDING_DIM;

use crate::types::{McpError, McpResult};

pub const DEFAULT_ADDR: &str = "127.0.0.1:3100";
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;
pub const DEFAULT_BODY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_PATH_LENGTH: usize = 2048;
pub const DEFAULT_MAX_HEADERS: usize = 100;
pub const DEFAULT_MAX_SESSIONS: usize = 1024;
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 3600;
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 500;
pub const API_VERSION: &str = "1.0";

/// Complete server configuration. Every field has a default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZptConfig {
    pub server: ServerConfig,
    pub request: RequestConfig,
    pub errors: ErrorConfig,
    pub response: ResponseConfig,
    pub session: SessionConfig,
    pub topic: TopicConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub max_body_size: usize,
    pub body_timeout_secs: u64,
    pub max_path_length: usize,
    pub max_headers: usize,
    /// Missing host/user-agent/content-type and unknown content types become fatal.
    pub strict: bool,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            body_timeout_secs: DEFAULT_BODY_TIMEOUT_SECS,
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
            max_headers: DEFAULT_MAX_HEADERS,
            strict: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorConfig {
    pub enable_recovery: bool,
    pub max_message_length: usize,
    pub include_details: bool,
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self {
            enable_recovery: true,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            include_details: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    pub api_version: String,
    pub include_links: bool,
    pub compress: bool,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            include_links: false,
            compress: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub history_size: usize,
    pub recent_interactions_capacity: usize,
    pub embedding_dim: usize,
    /// Live sessions kept before the least recently used one is dropped.
    pub max_sessions: usize,
    /// Sessions idle longer than this are dropped on the next insert.
    pub idle_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_size: agentic_zpt::session::DEFAULT_HISTORY_SIZE,
            recent_interactions_capacity: agentic_zpt::session::DEFAULT_RECENT_INTERACTIONS,
            embedding_dim: EMBEDDING_DIM,
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_ttl_secs: DEFAULT_SESSION_IDLE_SECS,
        }
    }
}

/// Settings for topic derivation. `None` marks a field as unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    pub recent_count: Option<usize>,
    pub max_chars_per_item: Option<usize>,
    pub prompt_template: Option<String>,
    pub max_tokens: usize,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            recent_count: Some(10),
            max_chars_per_item: Some(500),
            prompt_template: Some(DEFAULT_TOPIC_TEMPLATE.to_string()),
            max_tokens: 200,
            temperature: 0.2,
            timeout_secs: 20,
        }
    }
}

impl ZptConfig {
    /// Load configuration: explicit path, `ZPT_CONFIG`, `.zpt/config.toml`,
    /// `~/.agentic-zpt/config.toml`, then built-in defaults. Environment
    /// overrides are applied last.
    pub fn load(explicit: Option<&str>) -> McpResult<Self> {
        let mut config = match resolve_config_path(explicit) {
            Some(path) => Self::from_file(&path)?,
            None => {
                tracing::debug!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> McpResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            McpError::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml(&text)?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> McpResult<Self> {
        toml::from_str(text).map_err(|e| McpError::Configuration(e.to_string()))
    }

    fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("ZPT_ADDR") {
            self.server.addr = addr;
        }
        if let Ok(token) = std::env::var("AGENTIC_TOKEN") {
            if !token.is_empty() {
                self.server.token = Some(token);
            }
        }
    }

    pub fn validate(&self) -> McpResult<()> {
        if self.request.max_body_size == 0 {
            return Err(McpError::Configuration(
                "request.max_body_size must be positive".to_string(),
            ));
        }
        if self.request.body_timeout_secs == 0 {
            return Err(McpError::Configuration(
                "request.body_timeout_secs must be positive".to_string(),
            ));
        }
        if self.request.max_path_length == 0 {
            return Err(McpError::Configuration(
                "request.max_path_length must be positive".to_string(),
            ));
        }
        if self.errors.max_message_length < 16 {
            return Err(McpError::Configuration(
                "errors.max_message_length must be at least 16".to_string(),
            ));
        }
        if self.session.max_sessions == 0 {
            return Err(McpError::Configuration(
                "session.max_sessions must be positive".to_string(),
            ));
        }
        if self.session.embedding_dim == 0 {
            return Err(McpError::Configuration(
                "session.embedding_dim must be positive".to_string(),
            ));
        }
        if self.topic.max_tokens == 0 || self.topic.max_tokens > MAX_TOKENS_LIMIT {
            return Err(McpError::Configuration(format!(
                "topic.max_tokens must be between 1 and {MAX_TOKENS_LIMIT}"
            )));
        }
        if self.topic.timeout_secs == 0 {
            return Err(McpError::Configuration(
                "topic.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolve the configuration file path, if one exists.
pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }

    if let Ok(env_path) = std::env::var("ZPT_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    let cwd_config = PathBuf::from(".zpt/config.toml");
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    let home_config = default_config_path();
    home_config.exists().then_some(home_config)
}

fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());

    PathBuf::from(format!("{home}/.agentic-zpt/config.toml"))
}
