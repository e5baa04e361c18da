use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl ServerConfig {
    fn validated_default() -> Self {
        Self { bind_addr: default_bind_addr() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Required: credential for the external WebRTC room service.
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Required: credential for the language model backend.
    pub api_key: String,
    /// Required: model identifier passed to the backend.
    pub model_id: String,
    #[serde(default = "default_context_turns")]
    pub context_turns: u32,
    #[serde(default = "default_turn_timeout_seconds")]
    pub turn_timeout_seconds: u64,
}

fn default_context_turns() -> u32 {
    12
}

fn default_turn_timeout_seconds() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub endpoint: String,
    #[serde(default = "default_search_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_search_timeout_seconds() -> u64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,
    #[serde(default = "default_idle_timeout_seconds")]
    pub idle_timeout_seconds: u64,
    #[serde(default = "default_transport_grace_seconds")]
    pub transport_grace_seconds: u64,
    #[serde(default = "default_reaper_interval_seconds")]
    pub reaper_interval_seconds: u64,
    /// Reject `PlayClip` calls referencing an unknown `clip_id` instead of
    /// allowing the edge to resolve it (spec §9 Open Question: default is
    /// permissive with a warning, i.e. `false`).
    #[serde(default)]
    pub strict_clip_validation: bool,
}

fn default_connect_timeout_seconds() -> u64 {
    120
}

fn default_idle_timeout_seconds() -> u64 {
    60
}

fn default_transport_grace_seconds() -> u64 {
    15
}

fn default_reaper_interval_seconds() -> u64 {
    10
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: default_connect_timeout_seconds(),
            idle_timeout_seconds: default_idle_timeout_seconds(),
            transport_grace_seconds: default_transport_grace_seconds(),
            reaper_interval_seconds: default_reaper_interval_seconds(),
            strict_clip_validation: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    #[serde(default = "default_retention_entries")]
    pub retention_entries: usize,
}

fn default_retention_entries() -> usize {
    1000
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self { retention_entries: default_retention_entries() }
    }
}

/// Top-level settings tree (spec §6 "Configuration").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "ServerConfig::validated_default")]
    pub server: ServerConfig,
    pub transport: TransportConfig,
    pub llm: LlmConfig,
    pub search: SearchConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub journal: JournalConfig,
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport.api_key.trim().is_empty() {
            return Err(ConfigError::MissingField("transport.api_key".into()));
        }
        if self.llm.api_key.trim().is_empty() {
            return Err(ConfigError::MissingField("llm.api_key".into()));
        }
        if self.llm.model_id.trim().is_empty() {
            return Err(ConfigError::MissingField("llm.model_id".into()));
        }
        if self.search.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingField("search.endpoint".into()));
        }
        if self.llm.context_turns == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.context_turns".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.session.idle_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.idle_timeout_seconds".into(),
                message: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

/// Loads settings from `config/default.{toml,yaml}`, an optional
/// `config/{env}.{toml,yaml}` overlay, then `ORCHESTRATOR__`-prefixed
/// environment variables, and validates the result.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("ORCHESTRATOR")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn minimal_toml() -> &'static str {
        r#"
        [transport]
        api_key = "t-key"

        [llm]
        api_key = "l-key"
        model_id = "gpt-test"

        [search]
        endpoint = "http://localhost:9000"
        "#
    }

    #[test]
    fn defaults_match_spec() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        write!(file, "{}", minimal_toml()).unwrap();

        let config = Config::builder()
            .add_source(File::from(file.path().to_path_buf()))
            .build()
            .unwrap();
        let settings: Settings = config.try_deserialize().unwrap();

        assert_eq!(settings.llm.context_turns, 12);
        assert_eq!(settings.llm.turn_timeout_seconds, 30);
        assert_eq!(settings.search.timeout_seconds, 5);
        assert_eq!(settings.session.connect_timeout_seconds, 120);
        assert_eq!(settings.session.idle_timeout_seconds, 60);
        assert_eq!(settings.session.transport_grace_seconds, 15);
        assert_eq!(settings.journal.retention_entries, 1000);
        assert!(!settings.session.strict_clip_validation);
    }

    #[test]
    fn rejects_missing_required_field() {
        let settings = Settings {
            server: ServerConfig::validated_default(),
            transport: TransportConfig { api_key: "".into() },
            llm: LlmConfig {
                api_key: "k".into(),
                model_id: "m".into(),
                context_turns: 12,
                turn_timeout_seconds: 30,
            },
            search: SearchConfig { endpoint: "http://x".into(), timeout_seconds: 5 },
            session: SessionConfig::default(),
            journal: JournalConfig::default(),
        };

        assert!(matches!(settings.validate(), Err(ConfigError::MissingField(_))));
    }
}
