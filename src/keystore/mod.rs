//! Keyring storage
//!
//! This module provides:
//! - The [`Keyring`] contract used by the importer
//! - An ephemeral in-memory keyring
//! - On-disk keyrings, plaintext (`test`) or encrypted (`file`)
//! - Keyrings in the OS credential store (`os`) or in `pass` (`pass`)
//! - The importer that computes canonical names and imports keys once

pub mod credential;
pub mod encrypted;
pub mod importer;
pub mod memory;

pub use credential::{CredentialKeyring, OsStore, PassStore};
pub use encrypted::{FileKeyring, Protection};
pub use importer::KeyringImporter;
pub use memory::MemoryKeyring;

use crate::config::KeyringConfig;
use crate::crypto::{AccountAddress, KeyAlgorithm};
use crate::errors::{KeyLoaderError, Result};
use crate::security::SecureString;
use thiserror::Error;
use tracing::info;

/// Errors reported by a keyring backend
#[derive(Error, Debug)]
pub enum KeyringError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Key already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid key name: {0}")]
    InvalidName(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Wrong keyring password")]
    WrongPassword,

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for KeyringError {
    fn from(err: std::io::Error) -> Self {
        KeyringError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for KeyringError {
    fn from(err: serde_json::Error) -> Self {
        KeyringError::Storage(format!("JSON error: {}", err))
    }
}

pub type KeyringResult<T> = std::result::Result<T, KeyringError>;

/// Public metadata of a keyring entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub name: String,
    pub algorithm: KeyAlgorithm,
    pub public_key: Vec<u8>,
    pub address: AccountAddress,
}

/// A store of named private keys, queryable by account address
pub trait Keyring {
    /// Find the entry holding `address`. Fails with [`KeyringError::NotFound`]
    /// when no entry does.
    fn key_by_address(&self, address: &AccountAddress) -> KeyringResult<KeyRecord>;

    /// Store `private_key` under `name`
    fn import_raw_key(
        &mut self,
        name: &str,
        private_key: &[u8],
        algorithm: KeyAlgorithm,
    ) -> KeyringResult<KeyRecord>;

    /// All entries, in no particular order
    fn list(&self) -> KeyringResult<Vec<KeyRecord>>;
}

/// Supported keyring backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyringBackend {
    /// Ephemeral, lost at exit
    Memory,
    /// Plaintext files on disk
    Test,
    /// Password-encrypted files on disk
    File,
    /// Platform credential store
    Os,
    /// The `pass` password manager
    Pass,
}

impl KeyringBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyringBackend::Memory => "memory",
            KeyringBackend::Test => "test",
            KeyringBackend::File => "file",
            KeyringBackend::Os => "os",
            KeyringBackend::Pass => "pass",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(KeyringBackend::Memory),
            "test" => Ok(KeyringBackend::Test),
            "file" => Ok(KeyringBackend::File),
            "os" => Ok(KeyringBackend::Os),
            "pass" => Ok(KeyringBackend::Pass),
            _ => Err(KeyLoaderError::ConfigError(format!(
                "Unsupported keyring backend: {}",
                s
            ))),
        }
    }
}

/// Open the keyring selected by configuration
pub fn open(config: &KeyringConfig) -> Result<Box<dyn Keyring>> {
    let backend = KeyringBackend::from_str(&config.backend)?;

    info!(
        backend = backend.as_str(),
        app_name = %config.app_name,
        dir = %config.dir.display(),
        "Opening keyring"
    );

    let keyring: Box<dyn Keyring> = match backend {
        KeyringBackend::Memory => Box::new(MemoryKeyring::new()),
        KeyringBackend::Test => {
            let dir = config.dir.join("keyring-test");
            Box::new(FileKeyring::open(dir, Protection::Plaintext).map_err(storage_error)?)
        }
        KeyringBackend::File => {
            let password = config.password.clone().ok_or_else(|| {
                KeyLoaderError::ConfigError("The file keyring requires a password".to_string())
            })?;
            let dir = config.dir.join("keyring-file");
            let protection = Protection::Password(SecureString::new(password));
            Box::new(FileKeyring::open(dir, protection).map_err(storage_error)?)
        }
        KeyringBackend::Os => Box::new(CredentialKeyring::new(OsStore::new(&config.app_name))),
        KeyringBackend::Pass => Box::new(CredentialKeyring::new(PassStore::new(format!(
            "keyring-{}",
            config.app_name
        )))),
    };

    Ok(keyring)
}

fn storage_error(err: KeyringError) -> KeyLoaderError {
    KeyLoaderError::StorageError(format!("Failed to open keyring: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn keyring_config(backend: &str, dir: &std::path::Path) -> KeyringConfig {
        KeyringConfig {
            backend: backend.to_string(),
            app_name: "pocket".to_string(),
            dir: dir.to_path_buf(),
            password: None,
        }
    }

    #[test]
    fn test_backend_names() {
        for backend in [
            KeyringBackend::Memory,
            KeyringBackend::Test,
            KeyringBackend::File,
            KeyringBackend::Os,
            KeyringBackend::Pass,
        ] {
            assert_eq!(KeyringBackend::from_str(backend.as_str()).unwrap(), backend);
        }
        assert!(KeyringBackend::from_str("kwallet").is_err());
    }

    #[test]
    fn test_open_test_backend_creates_dir() {
        let dir = tempdir().unwrap();
        let keyring = open(&keyring_config("test", dir.path())).unwrap();

        assert!(dir.path().join("keyring-test").is_dir());
        assert!(keyring.list().unwrap().is_empty());
    }

    #[test]
    fn test_file_backend_requires_password() {
        let dir = tempdir().unwrap();
        let result = open(&keyring_config("file", dir.path()));
        assert!(matches!(result, Err(KeyLoaderError::ConfigError(_))));

        let mut config = keyring_config("file", dir.path());
        config.password = Some("correct horse".to_string());
        assert!(open(&config).is_ok());
    }
}
