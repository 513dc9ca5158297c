//! Kubernetes source
//!
//! Reads ConfigMap and Secret data through the Kubernetes REST API with the
//! pod's service account. ConfigMap values are returned as UTF-8 bytes,
//! Secret values are base64-decoded.

use crate::errors::{KeyLoaderError, Result};
use crate::security::SecureString;
use crate::source::{source_error, ConfigSource, ResourceKind, ResourceRef};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

/// Mount point of the pod service account
const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// The part of a ConfigMap or Secret this source reads
#[derive(Debug, Deserialize)]
struct ObjectData {
    #[serde(default)]
    data: Option<HashMap<String, String>>,
}

/// Reads documents from ConfigMaps and Secrets
pub struct ClusterSource {
    client: reqwest::Client,
    api_server: String,
    token: SecureString,
}

impl ClusterSource {
    pub fn new(api_server: impl Into<String>, token: SecureString, client: reqwest::Client) -> Self {
        Self {
            client,
            api_server: api_server.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Configure from the in-cluster environment and service account mount
    pub fn in_cluster() -> Result<Self> {
        let host = env::var("KUBERNETES_SERVICE_HOST").map_err(|_| {
            KeyLoaderError::ConfigError(
                "KUBERNETES_SERVICE_HOST is not set, not running in a cluster?".to_string(),
            )
        })?;
        let port = env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());

        let account_dir = Path::new(SERVICE_ACCOUNT_DIR);
        let token = fs::read_to_string(account_dir.join("token")).map_err(|e| {
            KeyLoaderError::ConfigError(format!("Failed to read service account token: {}", e))
        })?;
        let ca = fs::read(account_dir.join("ca.crt")).map_err(|e| {
            KeyLoaderError::ConfigError(format!("Failed to read cluster CA: {}", e))
        })?;

        let certificate = reqwest::Certificate::from_pem(&ca)
            .map_err(|e| KeyLoaderError::ConfigError(format!("Invalid cluster CA: {}", e)))?;
        let client = reqwest::Client::builder()
            .add_root_certificate(certificate)
            .build()
            .map_err(|e| {
                error!(error = %e, "Failed to create Kubernetes client");
                KeyLoaderError::ConfigError(format!("Error creating Kubernetes client: {}", e))
            })?;

        // IPv6 service hosts need brackets in a URL
        let host = if host.contains(':') {
            format!("[{}]", host)
        } else {
            host
        };

        debug!(host = %host, port = %port, "Using in-cluster Kubernetes configuration");
        Ok(Self::new(
            format!("https://{}:{}", host, port),
            SecureString::new(token.trim().to_string()),
            client,
        ))
    }

    fn url(&self, resource: &ResourceRef) -> String {
        let plural = match resource.kind {
            ResourceKind::ConfigMap => "configmaps",
            ResourceKind::Secret => "secrets",
        };
        format!(
            "{}/api/v1/namespaces/{}/{}/{}",
            self.api_server, resource.namespace, plural, resource.name
        )
    }
}

#[async_trait]
impl ConfigSource for ClusterSource {
    async fn fetch(&self, resource: &ResourceRef) -> Result<Vec<u8>> {
        info!(
            kind = resource.kind.as_str(),
            namespace = %resource.namespace,
            name = %resource.name,
            key = %resource.key,
            "Loading from cluster"
        );

        let response = self
            .client
            .get(self.url(resource))
            .bearer_auth(self.token.expose())
            .send()
            .await
            .map_err(|e| source_error(resource, e))?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, resource = %resource, "Failed to fetch cluster object");
            return Err(source_error(resource, format!("HTTP {}", status)));
        }

        let object: ObjectData = response
            .json()
            .await
            .map_err(|e| source_error(resource, e))?;

        let value = object
            .data
            .and_then(|mut data| data.remove(&resource.key))
            .ok_or_else(|| {
                source_error(
                    resource,
                    format!("{} does not contain key {}", resource.name, resource.key),
                )
            })?;

        let data = match resource.kind {
            ResourceKind::ConfigMap => value.into_bytes(),
            ResourceKind::Secret => STANDARD
                .decode(value.trim())
                .map_err(|e| source_error(resource, format!("Invalid secret data: {}", e)))?,
        };

        debug!(bytes = data.len(), "Cluster object data loaded successfully");
        Ok(data)
    }
}
