//! Configuration loader and validator for the image-set mapper service.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub queue: QueueConfig,
}

/// Service identity and HTTP listener.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub system_code: String,
    pub name: String,
    pub port: u16,
}

/// Kafka REST proxy settings for both directions of the relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueConfig {
    pub addresses: Vec<String>,
    pub group: String,
    pub read_topic: String,
    #[serde(default)]
    pub read_queue: String,
    pub write_topic: String,
    #[serde(default)]
    pub write_queue: String,
    #[serde(default)]
    pub authorization: String,
    #[serde(default = "default_offset")]
    pub offset: String,
    pub poll_interval_ms: u64,
    pub backoff_seconds: u64,
}

fn default_offset() -> String {
    "largest".to_string()
}

impl QueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_seconds)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
/// - `Q_AUTHORIZATION`, when set, replaces `queue.authorization`.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    if let Ok(authorization) = std::env::var("Q_AUTHORIZATION") {
        cfg.queue.authorization = authorization;
    }
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.system_code.trim().is_empty() {
        return Err(ConfigError::Invalid("app.system_code must be non-empty"));
    }
    if cfg.app.name.trim().is_empty() {
        return Err(ConfigError::Invalid("app.name must be non-empty"));
    }

    let q = &cfg.queue;
    if q.addresses.is_empty() || q.addresses.iter().any(|a| a.trim().is_empty()) {
        return Err(ConfigError::Invalid("queue.addresses must list at least one address"));
    }
    if q.group.trim().is_empty() {
        return Err(ConfigError::Invalid("queue.group must be non-empty"));
    }
    if q.read_topic.trim().is_empty() {
        return Err(ConfigError::Invalid("queue.read_topic must be non-empty"));
    }
    if q.write_topic.trim().is_empty() {
        return Err(ConfigError::Invalid("queue.write_topic must be non-empty"));
    }
    if q.offset != "smallest" && q.offset != "largest" {
        return Err(ConfigError::Invalid("queue.offset must be smallest or largest"));
    }
    if q.poll_interval_ms == 0 {
        return Err(ConfigError::Invalid("queue.poll_interval_ms must be > 0"));
    }

    Ok(())
}

/// Returns the example YAML shipped as `config.yaml`.
pub fn example() -> &'static str {
    r#"app:
  system_code: "methode-article-image-set-mapper"
  name: "Methode Article Image Set Mapper"
  port: 8080

queue:
  addresses:
    - "http://localhost:8082"
  group: "methodeArticleImageSetMapper"
  read_topic: "NativeCmsPublicationEvents"
  read_queue: "kafka"
  write_topic: "CmsPublicationEvents"
  write_queue: "kafka"
  authorization: ""
  offset: "largest"
  poll_interval_ms: 500
  backoff_seconds: 8
"#
}
