//! Filesystem source

use crate::errors::Result;
use crate::source::{source_error, ConfigSource, ResourceRef};
use async_trait::async_trait;
use tracing::{debug, info};

/// Reads documents from `ResourceRef::path`
pub struct FileSource;

#[async_trait]
impl ConfigSource for FileSource {
    async fn fetch(&self, resource: &ResourceRef) -> Result<Vec<u8>> {
        info!(path = %resource.path.display(), "Loading configuration from file");

        let data = tokio::fs::read(&resource.path)
            .await
            .map_err(|e| source_error(resource, e))?;

        debug!(
            path = %resource.path.display(),
            bytes_read = data.len(),
            "File read successfully"
        );
        Ok(data)
    }
}
