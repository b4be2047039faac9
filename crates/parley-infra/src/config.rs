//! Service configuration loader for Parley.
//!
//! Reads `config.toml` from the data directory (`~/.parley/` by default),
//! then layers `PARLEY_*` environment variables on top. A missing file yields
//! defaults; an unreadable or unparseable file, or a value that fails
//! validation, is a fatal [`ConfigError`].

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use parley_types::config::ServiceConfig;
use parley_types::error::ConfigError;

pub const ENV_DATA_DIR: &str = "PARLEY_DATA_DIR";
pub const ENV_WHATSAPP_ACCESS_TOKEN: &str = "PARLEY_WHATSAPP_ACCESS_TOKEN";

/// The data directory: `PARLEY_DATA_DIR`, falling back to `~/.parley`.
pub fn data_dir() -> PathBuf {
    match std::env::var_os(ENV_DATA_DIR) {
        Some(dir) => PathBuf::from(dir),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".parley"),
    }
}

/// Load `{data_dir}/config.toml` with environment overrides from the process.
pub async fn load_config(data_dir: &Path) -> Result<ServiceConfig, ConfigError> {
    load_config_with(data_dir, |name| std::env::var(name).ok()).await
}

/// Load configuration with an explicit environment lookup.
pub async fn load_config_with<F>(data_dir: &Path, env: F) -> Result<ServiceConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let config_path = data_dir.join("config.toml");

    let mut config = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => toml::from_str::<ServiceConfig>(&content)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", config_path.display())))?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            ServiceConfig::default()
        }
        Err(err) => {
            return Err(ConfigError::Read(format!("{}: {err}", config_path.display())));
        }
    };

    apply_env_overrides(&mut config, env)?;
    config.validate()?;
    Ok(config)
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{name}={value:?} is not a valid number")))
}

/// Override config values from `PARLEY_*` variables.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |name: &str| env(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = lookup("PARLEY_INACTIVITY_THRESHOLD_SECS") {
        config.sweeper.inactivity_threshold_secs = parse_env("PARLEY_INACTIVITY_THRESHOLD_SECS", &v)?;
    }
    if let Some(v) = lookup("PARLEY_SWEEP_INTERVAL_SECS") {
        config.sweeper.sweep_interval_secs = parse_env("PARLEY_SWEEP_INTERVAL_SECS", &v)?;
    }
    if let Some(v) = lookup("PARLEY_EPHEMERAL_POOL_SIZE") {
        config.ephemeral.pool_size = parse_env("PARLEY_EPHEMERAL_POOL_SIZE", &v)?;
    }
    if let Some(v) = lookup("PARLEY_EPHEMERAL_MAX_CONN_AGE_SECS") {
        config.ephemeral.max_connection_age_secs = parse_env("PARLEY_EPHEMERAL_MAX_CONN_AGE_SECS", &v)?;
    }
    if let Some(v) = lookup("PARLEY_DB_MAX_CONNECTIONS") {
        config.database.max_connections = parse_env("PARLEY_DB_MAX_CONNECTIONS", &v)?;
    }
    if let Some(v) = lookup("PARLEY_DB_BUSY_TIMEOUT_SECS") {
        config.database.busy_timeout_secs = parse_env("PARLEY_DB_BUSY_TIMEOUT_SECS", &v)?;
    }
    if let Some(v) = lookup("PARLEY_ASSISTANT_URL") {
        config.assistant.base_url = Some(v.trim().to_string());
    }
    if let Some(v) = lookup("PARLEY_WHATSAPP_PHONE_NUMBER_ID") {
        config.whatsapp.phone_number_id = Some(v.trim().to_string());
    }
    if let Some(v) = lookup("PARLEY_WHATSAPP_API_VERSION") {
        config.whatsapp.api_version = v.trim().to_string();
    }
    Ok(())
}

/// The WhatsApp access token, from the environment only.
pub fn whatsapp_access_token() -> Option<SecretString> {
    std::env::var(ENV_WHATSAPP_ACCESS_TOKEN)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config_with(tmp.path(), env_of(&[])).await.unwrap();
        assert_eq!(config.sweeper.inactivity_threshold_secs, 3600);
        assert_eq!(config.sweeper.sweep_interval_secs, 30);
        assert!(config.assistant.base_url.is_none());
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[sweeper]
inactivity_threshold_secs = 600

[database]
max_connections = 2
"#,
        )
        .await
        .unwrap();

        let config = load_config_with(tmp.path(), env_of(&[])).await.unwrap();
        assert_eq!(config.sweeper.inactivity_threshold_secs, 600);
        assert_eq!(config.sweeper.sweep_interval_secs, 30);
        assert_eq!(config.database.max_connections, 2);
    }

    #[tokio::test]
    async fn load_config_invalid_toml_is_fatal() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let err = load_config_with(tmp.path(), env_of(&[])).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[tokio::test]
    async fn env_overrides_file_values() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            "[sweeper]\nsweep_interval_secs = 60\n",
        )
        .await
        .unwrap();

        let env = env_of(&[
            ("PARLEY_SWEEP_INTERVAL_SECS", "5"),
            ("PARLEY_EPHEMERAL_POOL_SIZE", "3"),
            ("PARLEY_ASSISTANT_URL", " http://assistant:8080 "),
            ("PARLEY_WHATSAPP_PHONE_NUMBER_ID", "10987654321"),
            ("PARLEY_DB_BUSY_TIMEOUT_SECS", ""),
        ]);
        let config = load_config_with(tmp.path(), env).await.unwrap();
        assert_eq!(config.sweeper.sweep_interval_secs, 5);
        assert_eq!(config.ephemeral.pool_size, 3);
        assert_eq!(config.assistant.base_url.as_deref(), Some("http://assistant:8080"));
        assert_eq!(config.whatsapp.phone_number_id.as_deref(), Some("10987654321"));
        assert_eq!(config.database.busy_timeout_secs, 5);
    }

    #[tokio::test]
    async fn non_numeric_env_is_invalid() {
        let tmp = TempDir::new().unwrap();
        let err = load_config_with(tmp.path(), env_of(&[("PARLEY_SWEEP_INTERVAL_SECS", "soon")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("PARLEY_SWEEP_INTERVAL_SECS")));
    }

    #[tokio::test]
    async fn zero_pool_size_fails_validation() {
        let tmp = TempDir::new().unwrap();
        let err = load_config_with(tmp.path(), env_of(&[("PARLEY_EPHEMERAL_POOL_SIZE", "0")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
