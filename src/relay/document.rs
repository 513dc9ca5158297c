//! Relay miner configuration document
//!
//! Only the fields this tool appends to are modelled. Everything else in the
//! document, at the top level and inside each supplier, is carried through
//! untouched.

use crate::errors::Result;
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;
use std::fs;
use std::path::Path;
use tracing::info;

/// Relay miner configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayMinerConfig {
    /// Keys used by suppliers that do not list their own
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_signing_key_names: Vec<String>,

    /// Supplier sections
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suppliers: Vec<SupplierConfig>,

    #[serde(flatten)]
    pub extra: Mapping,
}

/// One supplier section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplierConfig {
    pub service_id: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signing_key_names: Vec<String>,

    #[serde(flatten)]
    pub extra: Mapping,
}

impl RelayMinerConfig {
    /// Parse a YAML document. An empty document yields the default config.
    pub fn from_yaml(data: &[u8]) -> Result<Self> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_slice(data)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Write the document to `path`, optionally applying `permissions`
    pub fn write_to(&self, path: &Path, permissions: Option<fs::Permissions>) -> Result<()> {
        let content = self.to_yaml()?;
        fs::write(path, content)?;

        if let Some(permissions) = permissions {
            fs::set_permissions(path, permissions)?;
        }

        info!(path = %path.display(), "Relay miner configuration file updated successfully");
        Ok(())
    }
}
