//! Error types for relay-keyloader

use crate::keystore::KeyringError;
use thiserror::Error;

/// Main error type for relay-keyloader operations
#[derive(Error, Debug)]
pub enum KeyLoaderError {
    // Input errors
    #[error("Wallet key entry {entry} must set exactly one of `mnemonic` or `hex`")]
    MalformedEntry { entry: usize },

    #[error("Invalid mnemonic at entry {entry}")]
    InvalidMnemonic { entry: usize },

    #[error("Invalid hex private key at entry {entry}: {source}")]
    InvalidHexEncoding {
        entry: usize,
        #[source]
        source: hex::FromHexError,
    },

    // Derivation errors
    #[error("Failed to derive key at entry {entry}, index {index}: {reason}")]
    DerivationFailure {
        entry: usize,
        index: u32,
        reason: String,
    },

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    // Keyring errors
    #[error("Keyring lookup failed for {address}: {source}")]
    KeyringLookupFailure {
        address: String,
        #[source]
        source: KeyringError,
    },

    #[error("Failed to import key {name}: {source}")]
    KeyringImportFailure {
        name: String,
        #[source]
        source: KeyringError,
    },

    // Relay miner configuration errors
    #[error("Service id {service_id} not found in relay miner config suppliers")]
    UnknownServiceGroup { service_id: String },

    // Source / storage errors
    #[error("Failed to fetch {resource}: {reason}")]
    SourceError { resource: String, reason: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for KeyLoaderError {
    fn from(err: std::io::Error) -> Self {
        KeyLoaderError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for KeyLoaderError {
    fn from(err: serde_json::Error) -> Self {
        KeyLoaderError::ParseError(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for KeyLoaderError {
    fn from(err: serde_yaml::Error) -> Self {
        KeyLoaderError::ParseError(format!("YAML error: {}", err))
    }
}

impl From<config::ConfigError> for KeyLoaderError {
    fn from(err: config::ConfigError) -> Self {
        KeyLoaderError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, KeyLoaderError>;
