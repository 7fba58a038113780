use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::config::{Provider, StorageConfig, StorageOptions};
use crate::error::{ClientError, ClientResult, ConfigError};
use crate::storage::{self, DownloadMetadata, StorageBackend, StorageError};

/// Where an uploaded file ended up. Derived from the call arguments and
/// configuration only, never from the provider's response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferResult {
    pub container: String,
    pub path: String,
    pub filename: String,
    pub url: String,
}

/// One client per container. Clones share the same backend connection.
#[derive(Clone)]
pub struct StorageClient {
    config: Arc<StorageConfig>,
    backend: Arc<dyn StorageBackend>,
}

impl StorageClient {
    pub fn new(options: StorageOptions) -> ClientResult<Self> {
        let config = options.resolve()?;
        let backend = storage::connect(&config).map_err(ConfigError::from)?;
        Ok(Self {
            config: Arc::new(config),
            backend,
        })
    }

    /// Same validation as [`StorageClient::new`], but talks to `backend`.
    pub fn with_backend(
        options: StorageOptions,
        backend: Arc<dyn StorageBackend>,
    ) -> ClientResult<Self> {
        let config = options.resolve()?;
        Ok(Self {
            config: Arc::new(config),
            backend,
        })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn provider(&self) -> Provider {
        self.config.provider
    }

    fn label(&self) -> &'static str {
        self.config.provider.label()
    }

    /// Create the container if it is missing.
    pub async fn init(&self) -> ClientResult<()> {
        let container = &self.config.container;

        self.backend
            .create_container(container)
            .await
            .map_err(|source| {
                tracing::error!("Failed to initialize container {}: {}", container, source);
                ClientError::Initialization {
                    provider: self.label(),
                    source,
                }
            })?;

        tracing::info!("Container {} ready", container);
        Ok(())
    }

    pub async fn upload(
        &self,
        local_path: impl AsRef<Path>,
        dest_path: &str,
    ) -> ClientResult<TransferResult> {
        let local_path = local_path.as_ref();
        let upload_error = |source: StorageError| {
            tracing::error!(
                "Upload of {} to {} failed: {}",
                local_path.display(),
                dest_path,
                source
            );
            ClientError::Upload {
                provider: self.label(),
                source,
            }
        };

        let filename = basename(dest_path)
            .ok_or_else(|| upload_error(StorageError::InvalidPath(dest_path.to_string())))?;

        let mut file = fs::File::open(local_path)
            .await
            .map_err(|e| upload_error(e.into()))?;

        self.backend
            .put_object(
                &self.config.container,
                dest_path,
                &mut file,
                &self.config.headers,
            )
            .await
            .map_err(upload_error)?;

        tracing::info!(
            "Uploaded {} to {}/{}",
            local_path.display(),
            self.config.container,
            dest_path
        );

        Ok(TransferResult {
            container: self.config.container.clone(),
            path: dest_path.to_string(),
            url: format!("{}/{}", self.config.endpoint_uri, filename),
            filename: filename.to_string(),
        })
    }

    /// Stream `dest_path` into `local_path`, creating or truncating it.
    /// A failed transfer can leave a partially written file behind.
    pub async fn download(
        &self,
        dest_path: &str,
        local_path: impl AsRef<Path>,
    ) -> ClientResult<DownloadMetadata> {
        let local_path = local_path.as_ref();
        let download_error = |source: StorageError| {
            tracing::error!(
                "Download of {} to {} failed: {}",
                dest_path,
                local_path.display(),
                source
            );
            ClientError::Download {
                provider: self.label(),
                source,
            }
        };

        let mut file = fs::File::create(local_path)
            .await
            .map_err(|e| download_error(e.into()))?;

        let metadata = self
            .backend
            .get_object(&self.config.container, dest_path, &mut file)
            .await
            .map_err(download_error)?;

        file.flush().await.map_err(|e| download_error(e.into()))?;

        tracing::info!(
            "Downloaded {}/{} to {}",
            self.config.container,
            dest_path,
            local_path.display()
        );

        Ok(metadata)
    }

    pub async fn remove(&self, dest_path: &str) -> ClientResult<()> {
        self.backend
            .remove_object(&self.config.container, dest_path)
            .await
            .map_err(|source| {
                tracing::error!("Failed to remove {}: {}", dest_path, source);
                ClientError::Remove {
                    provider: self.label(),
                    source,
                }
            })?;

        tracing::info!("Removed {}/{}", self.config.container, dest_path);
        Ok(())
    }
}

/// Last non-empty `/`-separated segment, like `path.basename`.
fn basename(path: &str) -> Option<&str> {
    path.rsplit('/').find(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    #[test]
    fn test_basename() {
        assert_eq!(basename("a/b/c.txt"), Some("c.txt"));
        assert_eq!(basename("c.txt"), Some("c.txt"));
        assert_eq!(basename("a/b/"), Some("b"));
        assert_eq!(basename(""), None);
        assert_eq!(basename("///"), None);
    }

    #[test]
    fn test_new_rejects_missing_fields() {
        let err = StorageClient::new(StorageOptions {
            container: Some("bucket1".to_string()),
            key: Some("k".to_string()),
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(matches!(
            err,
            ClientError::Configuration(ConfigError::MissingField("keyId"))
        ));
    }

    #[test]
    fn test_new_connects_without_network() {
        let client = StorageClient::new(StorageOptions {
            container: Some("bucket1".to_string()),
            key: Some("k".to_string()),
            key_id: Some("id".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.provider(), Provider::Amazon);
        assert_eq!(client.config().endpoint_uri, "http://bucket1.s3.amazonaws.com");
    }

    #[tokio::test]
    async fn test_upload_with_empty_destination_fails() {
        let backend = Arc::new(MemoryBackend::new());
        let client = StorageClient::with_backend(
            StorageOptions {
                container: Some("bucket1".to_string()),
                key: Some("k".to_string()),
                key_id: Some("id".to_string()),
                ..Default::default()
            },
            backend,
        )
        .unwrap();

        let err = client.upload("Cargo.toml", "").await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Upload {
                source: StorageError::InvalidPath(_),
                ..
            }
        ));
    }
}
