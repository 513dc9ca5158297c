//! Configuration management for relay-keyloader
//!
//! Supports loading configuration from:
//! - Built-in defaults
//! - Config file (`relay-keyloader.{toml,yaml,json}` or `--config <path>`)
//! - Environment variables (KEYLOADER_*, `__` separates nested keys), after
//!   loading a `.env` file from the working directory if there is one

use crate::errors::{KeyLoaderError, Result};
use crate::keystore::KeyringBackend;
use crate::source::{ResourceKind, ResourceRef, SourceKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Load variables from a `.env` file. A missing file is not an error, a
/// file that exists but does not parse is.
pub fn load_dotenv(path: &Path) -> Result<()> {
    match dotenvy::from_path(path) {
        Ok(()) => {
            info!(path = %path.display(), "Loaded environment file");
            Ok(())
        }
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(KeyLoaderError::ConfigError(format!(
            "Failed to load {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Bech32 prefix of account addresses (and so of key names)
    pub address_prefix: String,

    /// Where wallet keys and the relay miner config come from: file or kubernetes
    pub config_source: String,

    /// Keyring configuration
    pub keyring: KeyringConfig,

    /// Wallet keys location
    pub keys: KeysConfig,

    /// Relay miner configuration location and output
    pub relay_miner: RelayMinerSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Keyring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyringConfig {
    /// Backend: memory, test, file, os or pass
    pub backend: String,

    /// Service name of the os backend, and `keyring-<app_name>` prefix of
    /// the pass backend
    pub app_name: String,

    /// Directory holding on-disk keyrings
    pub dir: PathBuf,

    /// Password of the file backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for KeyringConfig {
    fn default() -> Self {
        Self {
            backend: "test".to_string(),
            app_name: "pocket".to_string(),
            dir: PathBuf::from("shannon-keyring-loader"),
            password: None,
        }
    }
}

/// Wallet keys location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    pub namespace: String,
    pub secret_name: String,
    pub secret_key: String,
    pub file_path: PathBuf,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            secret_name: "pocket-keys".to_string(),
            secret_key: "keys.json".to_string(),
            file_path: PathBuf::from("keys.json"),
        }
    }
}

impl KeysConfig {
    pub fn resource(&self) -> ResourceRef {
        ResourceRef {
            kind: ResourceKind::Secret,
            namespace: self.namespace.clone(),
            name: self.secret_name.clone(),
            key: self.secret_key.clone(),
            path: self.file_path.clone(),
        }
    }
}

/// Relay miner configuration location and output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayMinerSettings {
    /// Register imported keys in the relay miner config
    pub generate: bool,

    pub namespace: String,
    pub config_map_name: String,
    pub config_key: String,
    pub file_path: PathBuf,

    /// Where the updated config is written; the input may be read-only
    pub output_path: PathBuf,
}

impl Default for RelayMinerSettings {
    fn default() -> Self {
        Self {
            generate: true,
            namespace: "default".to_string(),
            config_map_name: "pocket-relayminer-config".to_string(),
            config_key: "config.yaml".to_string(),
            file_path: PathBuf::from("config.yaml"),
            output_path: PathBuf::from("generated.config.yaml"),
        }
    }
}

impl RelayMinerSettings {
    pub fn resource(&self) -> ResourceRef {
        ResourceRef {
            kind: ResourceKind::ConfigMap,
            namespace: self.namespace.clone(),
            name: self.config_map_name.clone(),
            key: self.config_key.clone(),
            path: self.file_path.clone(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty)
    pub format: String,

    /// Colorize pretty output
    pub color: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            color: true,
        }
    }
}

impl Config {
    /// Load configuration from defaults, file and environment
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Start with defaults
        builder = builder.add_source(config::Config::try_from(&Config::defaults())?);

        // Load from file if specified
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        } else {
            builder = builder.add_source(config::File::with_name("relay-keyloader").required(false));
        }

        // Load from environment (KEYLOADER_KEYRING__BACKEND, etc.)
        builder = builder.add_source(
            config::Environment::with_prefix("KEYLOADER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    fn defaults() -> Self {
        Self {
            address_prefix: "pokt".to_string(),
            config_source: "file".to_string(),
            ..Default::default()
        }
    }

    /// Validate the configuration and resolve relative paths
    pub fn validate(&mut self) -> Result<()> {
        debug!("Validating application configuration");

        let backend = KeyringBackend::from_str(&self.keyring.backend)?;
        if backend == KeyringBackend::File
            && self.keyring.password.as_deref().map_or(true, str::is_empty)
        {
            return Err(KeyLoaderError::ConfigError(
                "keyring.password is required for the file backend".to_string(),
            ));
        }

        if matches!(backend, KeyringBackend::Os | KeyringBackend::Pass)
            && self.keyring.app_name.trim().is_empty()
        {
            return Err(KeyLoaderError::ConfigError(format!(
                "keyring.app_name is required for the {} backend",
                backend.as_str()
            )));
        }

        self.source_kind()?;

        if self.address_prefix.is_empty() {
            return Err(KeyLoaderError::ConfigError(
                "address_prefix must not be empty".to_string(),
            ));
        }

        if self.relay_miner.generate && self.relay_miner.output_path.as_os_str().is_empty() {
            return Err(KeyLoaderError::ConfigError(
                "relay_miner.output_path must not be empty".to_string(),
            ));
        }

        if self.keyring.dir.is_relative() {
            self.keyring.dir = std::env::current_dir()?.join(&self.keyring.dir);
        }

        debug!("Configuration validation successful");
        Ok(())
    }

    pub fn source_kind(&self) -> Result<SourceKind> {
        SourceKind::from_str(&self.config_source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::defaults();
        assert_eq!(config.address_prefix, "pokt");
        assert_eq!(config.keyring.backend, "test");
        assert_eq!(config.source_kind().unwrap(), SourceKind::File);
        assert!(config.relay_miner.generate);
        assert_eq!(config.keys.resource().kind, ResourceKind::Secret);
        assert_eq!(config.relay_miner.resource().name, "pocket-relayminer-config");
    }

    #[test]
    fn test_default_output_does_not_overwrite_input() {
        let settings = RelayMinerSettings::default();
        assert_ne!(settings.output_path, settings.file_path);
        assert_eq!(settings.output_path, PathBuf::from("generated.config.yaml"));
    }

    #[test]
    fn test_validate_resolves_keyring_dir() {
        let mut config = Config::defaults();
        config.validate().unwrap();
        assert!(config.keyring.dir.is_absolute());
        assert!(config.keyring.dir.ends_with("shannon-keyring-loader"));
    }

    #[test]
    fn test_validate_rejects_unknown_backend() {
        let mut config = Config::defaults();
        config.keyring.backend = "kwallet".to_string();
        assert!(matches!(
            config.validate(),
            Err(KeyLoaderError::ConfigError(_))
        ));
    }

    #[test]
    fn test_validate_file_backend_needs_password() {
        let mut config = Config::defaults();
        config.keyring.backend = "file".to_string();
        assert!(config.validate().is_err());

        config.keyring.password = Some("secret".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_os_backends_need_app_name() {
        let mut config = Config::defaults();
        assert_eq!(config.keyring.app_name, "pocket");

        for backend in ["os", "pass"] {
            config.keyring.backend = backend.to_string();
            config.keyring.app_name = "pocket".to_string();
            assert!(config.validate().is_ok());

            config.keyring.app_name = String::new();
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn test_validate_rejects_unknown_source() {
        let mut config = Config::defaults();
        config.config_source = "consul".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_dotenv_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_dotenv(&dir.path().join(".env")).is_ok());
    }

    #[test]
    fn test_malformed_dotenv_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "this is not valid\n").unwrap();

        assert!(matches!(
            load_dotenv(&path),
            Err(KeyLoaderError::ConfigError(msg)) if msg.contains(".env")
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyloader.toml");
        std::fs::write(
            &path,
            r#"
address_prefix = "cosmos"

[keyring]
backend = "memory"

[relay_miner]
generate = false
"#,
        )
        .unwrap();

        let config = Config::load(path.to_str()).unwrap();
        assert_eq!(config.address_prefix, "cosmos");
        assert_eq!(config.keyring.backend, "memory");
        assert!(!config.relay_miner.generate);
        // untouched sections keep their defaults
        assert_eq!(config.keys.secret_name, "pocket-keys");
        assert_eq!(config.config_source, "file");
    }
}
