//! Relay miner configuration
//!
//! This module provides:
//! - The configuration document, loaded from and written back to YAML
//! - Registration of signing key names against suppliers

pub mod document;
pub mod registrar;

pub use document::{RelayMinerConfig, SupplierConfig};
pub use registrar::register;
