//! Raw configuration sources
//!
//! Wallet keys and the relay miner configuration are fetched as bytes from
//! either the local filesystem or the Kubernetes API. Callers only see the
//! [`ConfigSource`] trait.

pub mod cluster;
pub mod file;

pub use cluster::ClusterSource;
pub use file::FileSource;

use crate::errors::{KeyLoaderError, Result};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

/// Kind of cluster object holding a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    ConfigMap,
    Secret,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::ConfigMap => "configmap",
            ResourceKind::Secret => "secret",
        }
    }
}

/// Where a document lives, for every source kind
#[derive(Debug, Clone)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
    pub key: String,
    pub path: PathBuf,
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{} key {} (file {})",
            self.kind.as_str(),
            self.namespace,
            self.name,
            self.key,
            self.path.display()
        )
    }
}

/// Fetches raw document bytes
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn fetch(&self, resource: &ResourceRef) -> Result<Vec<u8>>;
}

/// Supported source kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    File,
    Kubernetes,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::File => "file",
            SourceKind::Kubernetes => "kubernetes",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "file" => Ok(SourceKind::File),
            "kubernetes" | "k8s" => Ok(SourceKind::Kubernetes),
            _ => Err(KeyLoaderError::ConfigError(format!(
                "Invalid config source: {}",
                s
            ))),
        }
    }
}

/// Build the source for `kind`
pub fn from_kind(kind: SourceKind) -> Result<Box<dyn ConfigSource>> {
    match kind {
        SourceKind::File => Ok(Box::new(FileSource)),
        SourceKind::Kubernetes => Ok(Box::new(ClusterSource::in_cluster()?)),
    }
}

pub(crate) fn source_error(resource: &ResourceRef, reason: impl fmt::Display) -> KeyLoaderError {
    KeyLoaderError::SourceError {
        resource: resource.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind() {
        assert_eq!(SourceKind::from_str("file").unwrap(), SourceKind::File);
        assert_eq!(
            SourceKind::from_str("Kubernetes").unwrap(),
            SourceKind::Kubernetes
        );
        assert!(SourceKind::from_str("consul").is_err());
    }

    #[test]
    fn test_resource_display() {
        let resource = ResourceRef {
            kind: ResourceKind::Secret,
            namespace: "default".to_string(),
            name: "pocket-keys".to_string(),
            key: "keys.json".to_string(),
            path: PathBuf::from("keys.json"),
        };
        assert_eq!(
            resource.to_string(),
            "secret default/pocket-keys key keys.json (file keys.json)"
        );
    }
}
