//! Configuration management

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use mopidy_mqtt_wire::{TopicError, TopicPrefix, DEFAULT_PREFIX};
use rumqttc::QoS;
use serde::Deserialize;
use thiserror::Error;

use crate::bridge::BridgeSettings;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "MOPIDY_MQTT_CONFIG";

/// Prefix for environment overrides (MOPIDY_MQTT__MQTT__HOST, ...)
const ENV_PREFIX: &str = "MOPIDY_MQTT";

/// Config file looked up in the working directory when no path is given
const DEFAULT_CONFIG_NAME: &str = "mopidy-mqtt";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mqtt: MqttConfig,

    #[serde(default)]
    pub mopidy: MopidyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    #[serde(default)]
    pub qos: u8,
    #[serde(default)]
    pub retain: bool,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_mqtt_port(),
            username: None,
            password: None,
            topic_prefix: default_topic_prefix(),
            client_id: default_client_id(),
            keep_alive_secs: default_keep_alive_secs(),
            qos: 0,
            retain: false,
        }
    }
}

impl MqttConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn qos(&self) -> Result<QoS, ConfigError> {
        match self.qos {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(ConfigError::InvalidQos(other)),
        }
    }

    /// Username and password, only when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some((username.as_str(), password.as_str())),
            _ => None,
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_topic_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_client_id() -> String {
    "mopidy-mqtt".to_string()
}

fn default_keep_alive_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct MopidyConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_mopidy_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for MopidyConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_mopidy_port(),
            username: None,
            password: None,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl MopidyConfig {
    pub fn rpc_url(&self) -> String {
        format!("http://{}:{}/mopidy/rpc", self.host, self.port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_mopidy_port() -> u16 {
    6680
}

fn default_poll_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid mqtt.topic_prefix: {0}")]
    TopicPrefix(#[from] TopicError),

    #[error("invalid mqtt.qos {0}, expected 0, 1 or 2")]
    InvalidQos(u8),

    #[error("mopidy.poll_interval_ms must be greater than zero")]
    ZeroPollInterval,
}

impl Config {
    /// Check values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        TopicPrefix::new(&self.mqtt.topic_prefix)?;
        self.mqtt.qos()?;
        if self.mopidy.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }

    /// Settings handed to the bridge controller.
    pub fn bridge_settings(&self) -> Result<BridgeSettings, ConfigError> {
        Ok(BridgeSettings {
            topic_prefix: TopicPrefix::new(&self.mqtt.topic_prefix)?,
        })
    }
}

/// Load configuration from the file named by `MOPIDY_MQTT_CONFIG` (or
/// `mopidy-mqtt.*` in the working directory) and environment overrides.
pub fn load_config() -> Result<Config> {
    let path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    load_config_from(path.as_deref())
}

/// Load configuration from an explicit file, falling back to the default
/// lookup when `path` is `None`.
pub fn load_config_from(path: Option<&Path>) -> Result<Config> {
    let file = match path {
        Some(path) => ::config::File::from(path).required(true),
        None => ::config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
    };

    let config = ::config::Config::builder()
        // Load from config file if it exists
        .add_source(file)
        // Override with environment variables (MOPIDY_MQTT__MQTT__HOST, etc.)
        .add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config: Config = config.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn write_config(extension: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(extension)
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    #[serial]
    fn test_defaults_and_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        // An explicit path must exist
        assert!(load_config_from(Some(missing.as_path())).is_err());

        let config = Config::default();
        assert_eq!(config.mqtt.host, "localhost");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.topic_prefix, "mopidy");
        assert_eq!(config.mopidy.rpc_url(), "http://localhost:6680/mopidy/rpc");
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_load_toml_file() {
        let file = write_config(
            ".toml",
            r#"
            [mqtt]
            host = "broker.lan"
            port = 8883
            username = "player"
            password = "secret"
            topic_prefix = "house/kitchen/"
            qos = 1

            [mopidy]
            host = "music.lan"
            poll_interval_ms = 250
            "#,
        );

        let config = load_config_from(Some(file.path())).unwrap();

        assert_eq!(config.mqtt.host, "broker.lan");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.credentials(), Some(("player", "secret")));
        assert_eq!(config.mqtt.qos().unwrap(), QoS::AtLeastOnce);
        assert_eq!(config.mqtt.client_id, "mopidy-mqtt");
        assert_eq!(config.mopidy.port, 6680);
        assert_eq!(config.mopidy.poll_interval(), Duration::from_millis(250));
        assert_eq!(
            config.bridge_settings().unwrap().topic_prefix.as_str(),
            "house/kitchen"
        );
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        let file = write_config(".toml", "[mqtt]\nhost = \"from-file\"\n");
        std::env::set_var("MOPIDY_MQTT__MQTT__HOST", "from-env");
        std::env::set_var("MOPIDY_MQTT__MQTT__PORT", "1999");

        let result = load_config_from(Some(file.path()));

        std::env::remove_var("MOPIDY_MQTT__MQTT__HOST");
        std::env::remove_var("MOPIDY_MQTT__MQTT__PORT");

        let config = result.unwrap();
        assert_eq!(config.mqtt.host, "from-env");
        assert_eq!(config.mqtt.port, 1999);
    }

    #[test]
    #[serial]
    fn test_invalid_values_are_rejected() {
        let file = write_config(".toml", "[mqtt]\ntopic_prefix = \"a/#\"\n");
        assert!(load_config_from(Some(file.path())).is_err());

        let file = write_config(".toml", "[mqtt]\nqos = 3\n");
        assert!(load_config_from(Some(file.path())).is_err());

        let file = write_config(".toml", "[mopidy]\npoll_interval_ms = 0\n");
        assert!(load_config_from(Some(file.path())).is_err());
    }

    #[test]
    fn test_credentials_need_both_parts() {
        let config = MqttConfig {
            username: Some("user".to_string()),
            ..MqttConfig::default()
        };
        assert_eq!(config.credentials(), None);
    }
}
