use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Error reported by the provider SDK, message kept verbatim.
    #[error("{0}")]
    Provider(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid header {0}")]
    InvalidHeader(String),

    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    #[error("{0}")]
    NotConfigured(String),
}

/// Whatever the transport reports about a finished download.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DownloadMetadata {
    pub status_code: Option<u16>,
    pub bytes: Option<u64>,
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Create the container if it does not exist yet.
    async fn create_container(&self, container: &str) -> Result<(), StorageError>;

    async fn put_object(
        &self,
        container: &str,
        remote: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        headers: &BTreeMap<String, String>,
    ) -> Result<(), StorageError>;

    async fn get_object(
        &self,
        container: &str,
        remote: &str,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<DownloadMetadata, StorageError>;

    async fn remove_object(&self, container: &str, remote: &str) -> Result<(), StorageError>;
}
