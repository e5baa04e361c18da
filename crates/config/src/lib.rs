//! Process-wide configuration for the session orchestrator.
//!
//! Settings are loaded once at startup and treated as immutable for the
//! life of the process (spec §5): `config/default.{toml,yaml}`, an optional
//! environment-specific overlay, then `ORCHESTRATOR_` environment variables,
//! in that order.

mod settings;

pub use settings::{
    load_settings, ConfigError, JournalConfig, LlmConfig, SearchConfig, ServerConfig,
    SessionConfig, Settings, TransportConfig,
};
