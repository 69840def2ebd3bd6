//! Configuration for the knowledge assistant.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::session::core::errors::{SessionError, SessionResult};

/// Agent identifier used when none is configured.
pub const DEFAULT_AGENT_ID: &str = "68fd263d71c6b27d6c8eb80f";

/// Environment variable overriding the agent base URL.
pub const AGENT_URL_ENV: &str = "KNOWLEDGE_AGENT_URL";
/// Environment variable overriding the agent identifier.
pub const AGENT_ID_ENV: &str = "KNOWLEDGE_AGENT_ID";
/// Environment variable overriding the store backend.
pub const STORE_BACKEND_ENV: &str = "KNOWLEDGE_STORE_BACKEND";
/// Environment variable overriding the store path.
pub const STORE_PATH_ENV: &str = "KNOWLEDGE_STORE_PATH";
/// Environment variable overriding the HTTP port.
pub const PORT_ENV: &str = "KNOWLEDGE_PORT";

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Remote agent settings.
    pub agent: AgentConfig,
    /// Conversation behaviour settings.
    pub session: SessionConfig,
    /// Durable store settings.
    pub storage: StorageConfig,
    /// HTTP surface settings.
    pub server: ServerConfig,
}

impl AssistantConfig {
    /// Defaults overlaid with the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    ///
    /// Unparseable values are ignored and the default is kept.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(AGENT_URL_ENV) {
            config.agent.base_url = url;
        }
        if let Some(agent_id) = lookup(AGENT_ID_ENV) {
            config.agent.agent_id = agent_id;
        }
        if let Some(backend) = lookup(STORE_BACKEND_ENV).and_then(|b| StorageBackend::parse(&b)) {
            config.storage.backend = backend;
        }
        if let Some(path) = lookup(STORE_PATH_ENV) {
            config.storage.path = PathBuf::from(path);
        }
        if let Some(port) = lookup(PORT_ENV).and_then(|p| p.parse().ok()) {
            config.server.port = port;
        }

        config
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> SessionResult<()> {
        Url::parse(&self.agent.base_url)
            .map_err(|e| SessionError::InvalidConfig(format!("agent.base_url: {e}")))?;

        if !self.agent.endpoint_path.starts_with('/') {
            return Err(SessionError::InvalidConfig(
                "agent.endpoint_path must start with '/'".to_string(),
            ));
        }

        if self.agent.request_timeout.is_zero() {
            return Err(SessionError::InvalidConfig(
                "agent.request_timeout must be > 0".to_string(),
            ));
        }

        if self.session.context_window == 0 {
            return Err(SessionError::InvalidConfig(
                "session.context_window must be > 0".to_string(),
            ));
        }

        if self.session.title_max_chars == 0 {
            return Err(SessionError::InvalidConfig(
                "session.title_max_chars must be > 0".to_string(),
            ));
        }

        if self.storage.key.trim().is_empty() {
            return Err(SessionError::InvalidConfig(
                "storage.key must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Remote agent endpoint settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Base URL of the agent service.
    pub base_url: String,
    /// Path of the request endpoint, joined onto `base_url`.
    pub endpoint_path: String,
    /// Agent identifier sent with every request.
    pub agent_id: String,
    /// Whole-request timeout.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// Connection timeout.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            endpoint_path: "/api/agent".to_string(),
            agent_id: DEFAULT_AGENT_ID.to_string(),
            request_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl AgentConfig {
    /// Set the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the agent identifier.
    #[must_use]
    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = agent_id.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Conversation behaviour settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Number of prior messages rendered into the prompt context.
    pub context_window: usize,
    /// Maximum title length in characters.
    pub title_max_chars: usize,
    /// Marker appended to truncated titles.
    pub title_ellipsis: String,
    /// Title given to new conversations.
    pub placeholder_title: String,
    /// Starter prompts offered on an empty conversation.
    pub suggested_prompts: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            context_window: 10,
            title_max_chars: 50,
            title_ellipsis: "...".to_string(),
            placeholder_title: "New Conversation".to_string(),
            suggested_prompts: default_suggested_prompts(),
        }
    }
}

/// Durable store backend.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// `SQLite` key-value table.
    Sqlite,
    /// Single JSON file.
    JsonFile,
    /// Process memory only (nothing survives a restart).
    Memory,
}

impl StorageBackend {
    /// Parse a backend name (`sqlite`, `json_file`/`json`, `memory`).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Some(Self::Sqlite),
            "json" | "json_file" | "file" => Some(Self::JsonFile),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Durable store settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend to use.
    pub backend: StorageBackend,
    /// Database or file path.
    pub path: PathBuf,
    /// Key under which the conversation list is stored.
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            path: PathBuf::from("data/conversations.sqlite"),
            key: "conversations".to_string(),
        }
    }
}

/// HTTP surface settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

fn default_suggested_prompts() -> Vec<String> {
    [
        "What is machine learning?",
        "Explain quantum computing",
        "How does photosynthesis work?",
        "Tell me about the history of AI",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// Serde module for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AssistantConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.context_window, 10);
        assert_eq!(config.session.title_max_chars, 50);
        assert_eq!(config.agent.agent_id, DEFAULT_AGENT_ID);
        assert_eq!(config.session.suggested_prompts.len(), 4);
    }

    #[test]
    fn test_lookup_overrides_defaults() {
        let env: HashMap<&str, &str> = HashMap::from([
            (AGENT_URL_ENV, "https://agents.example.com"),
            (AGENT_ID_ENV, "agent-7"),
            (STORE_BACKEND_ENV, "json"),
            (STORE_PATH_ENV, "/tmp/chat.json"),
            (PORT_ENV, "8080"),
        ]);
        let config = AssistantConfig::from_lookup(|k| env.get(k).map(|v| (*v).to_string()));

        assert_eq!(config.agent.base_url, "https://agents.example.com");
        assert_eq!(config.agent.agent_id, "agent-7");
        assert_eq!(config.storage.backend, StorageBackend::JsonFile);
        assert_eq!(config.storage.path, PathBuf::from("/tmp/chat.json"));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_lookup_ignores_unparseable_values() {
        let config = AssistantConfig::from_lookup(|k| match k {
            PORT_ENV => Some("not-a-port".to_string()),
            STORE_BACKEND_ENV => Some("redis".to_string()),
            _ => None,
        });
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AssistantConfig::default();
        config.agent.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = AssistantConfig::default();
        config.session.context_window = 0;
        assert!(config.validate().is_err());

        let mut config = AssistantConfig::default();
        config.agent.endpoint_path = "api/agent".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_agent_config_builder() {
        let agent = AgentConfig::default()
            .with_base_url("http://localhost:9000")
            .with_agent_id("x")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(agent.base_url, "http://localhost:9000");
        assert_eq!(agent.agent_id, "x");
        assert_eq!(agent.request_timeout, Duration::from_secs(5));
    }
}
