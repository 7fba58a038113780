use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::RwLock;

use super::{DownloadMetadata, StorageBackend, StorageError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub headers: BTreeMap<String, String>,
}

/// In-process backend. Lossless, keeps everything in memory.
#[derive(Default)]
pub struct MemoryBackend {
    containers: RwLock<HashMap<String, HashMap<String, StoredObject>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn object(&self, container: &str, remote: &str) -> Option<StoredObject> {
        let containers = self.containers.read().await;
        containers.get(container)?.get(remote).cloned()
    }

    pub async fn has_container(&self, container: &str) -> bool {
        self.containers.read().await.contains_key(container)
    }

    pub async fn object_count(&self, container: &str) -> usize {
        let containers = self.containers.read().await;
        containers.get(container).map_or(0, HashMap::len)
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn create_container(&self, container: &str) -> Result<(), StorageError> {
        let mut containers = self.containers.write().await;
        containers.entry(container.to_string()).or_default();
        Ok(())
    }

    async fn put_object(
        &self,
        container: &str,
        remote: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        headers: &BTreeMap<String, String>,
    ) -> Result<(), StorageError> {
        if !self.has_container(container).await {
            return Err(StorageError::NotFound(
                "NoSuchBucket: The specified bucket does not exist".to_string(),
            ));
        }

        // Drain the reader before taking the write lock.
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;

        let mut containers = self.containers.write().await;
        let objects = containers.get_mut(container).ok_or_else(|| {
            StorageError::NotFound("NoSuchBucket: The specified bucket does not exist".to_string())
        })?;
        objects.insert(
            remote.to_string(),
            StoredObject {
                data,
                headers: headers.clone(),
            },
        );
        Ok(())
    }

    async fn get_object(
        &self,
        container: &str,
        remote: &str,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<DownloadMetadata, StorageError> {
        let object = self.object(container, remote).await.ok_or_else(|| {
            StorageError::NotFound("NoSuchKey: The specified key does not exist.".to_string())
        })?;

        writer.write_all(&object.data).await?;
        writer.flush().await?;

        Ok(DownloadMetadata {
            status_code: Some(200),
            bytes: Some(object.data.len() as u64),
        })
    }

    async fn remove_object(&self, container: &str, remote: &str) -> Result<(), StorageError> {
        let mut containers = self.containers.write().await;
        if let Some(objects) = containers.get_mut(container) {
            objects.remove(remote);
        }
        Ok(())
    }
}
