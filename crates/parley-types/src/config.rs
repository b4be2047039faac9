//! Service configuration types for Parley.
//!
//! `ServiceConfig` represents the top-level `config.toml`. Every field has a
//! default so an empty or missing file yields a runnable configuration;
//! environment variables are layered on top by the infra loader.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration for the Parley service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub sweeper: SweeperConfig,

    #[serde(default)]
    pub ephemeral: EphemeralStoreConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub assistant: AssistantConfig,

    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl ServiceConfig {
    /// Reject values that would make the service misbehave at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweeper.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid("sweeper.sweep_interval_secs must be > 0".into()));
        }
        if self.sweeper.inactivity_threshold_secs == 0 {
            return Err(ConfigError::Invalid(
                "sweeper.inactivity_threshold_secs must be > 0".into(),
            ));
        }
        if self.ephemeral.pool_size == 0 {
            return Err(ConfigError::Invalid("ephemeral.pool_size must be > 0".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be > 0".into()));
        }
        Ok(())
    }
}

/// Inactivity sweep timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    #[serde(default = "default_inactivity_threshold_secs")]
    pub inactivity_threshold_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_inactivity_threshold_secs() -> u64 {
    60 * 60
}

fn default_sweep_interval_secs() -> u64 {
    30
}

impl SweeperConfig {
    pub fn inactivity_threshold(&self) -> Duration {
        Duration::from_secs(self.inactivity_threshold_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            inactivity_threshold_secs: default_inactivity_threshold_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Which ephemeral store backend to run with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EphemeralBackend {
    /// SQLite file next to the durable database; survives restarts.
    #[default]
    Sqlite,
    /// Process-local map; lost on exit.
    Memory,
}

/// Ephemeral store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EphemeralStoreConfig {
    #[serde(default)]
    pub backend: EphemeralBackend,

    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    #[serde(default = "default_max_connection_age_secs")]
    pub max_connection_age_secs: u64,
}

fn default_pool_size() -> u32 {
    10
}

fn default_max_connection_age_secs() -> u64 {
    5 * 60
}

impl EphemeralStoreConfig {
    pub fn max_connection_age(&self) -> Duration {
        Duration::from_secs(self.max_connection_age_secs)
    }
}

impl Default for EphemeralStoreConfig {
    fn default() -> Self {
        Self {
            backend: EphemeralBackend::default(),
            pool_size: default_pool_size(),
            max_connection_age_secs: default_max_connection_age_secs(),
        }
    }
}

/// Durable database connection limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Reader pool size. The writer pool is always a single connection.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    8
}

fn default_busy_timeout_secs() -> u64 {
    5
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

/// Remote assistant service endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// WhatsApp Cloud API delivery settings.
///
/// The access token is never read from the config file; it comes from the
/// environment only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default)]
    pub phone_number_id: Option<String>,
}

fn default_api_version() -> String {
    "v20.0".to_string()
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            phone_number_id: None,
        }
    }
}

/// Per-message workflow settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Sent when the generated reply is empty.
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,

    /// Sender name recorded on outgoing transcript entries.
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,
}

fn default_fallback_reply() -> String {
    "Sorry, I couldn't process your request properly.".to_string()
}

fn default_assistant_name() -> String {
    "assistant".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fallback_reply: default_fallback_reply(),
            assistant_name: default_assistant_name(),
        }
    }
}
