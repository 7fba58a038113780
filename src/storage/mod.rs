pub mod local;
pub mod memory;
pub mod s3;
pub mod r#trait;

use std::sync::Arc;

pub use local::LocalBackend;
pub use memory::MemoryBackend;
pub use r#trait::{DownloadMetadata, StorageBackend, StorageError};
pub use self::s3::S3Backend;

use crate::config::{Provider, StorageConfig};

/// Builds the backend for the configured provider. No network I/O happens here.
pub fn connect(config: &StorageConfig) -> Result<Arc<dyn StorageBackend>, StorageError> {
    match config.provider {
        Provider::Amazon | Provider::R2 => {
            tracing::info!("Using {} storage for container {}", config.provider, config.container);
            Ok(Arc::new(S3Backend::from_config(config)?))
        }
        Provider::Local => {
            let root = config.root.as_ref().ok_or_else(|| {
                StorageError::NotConfigured("local storage requires a root directory".to_string())
            })?;
            tracing::info!("Using local storage at {}", root.display());
            Ok(Arc::new(LocalBackend::new(root)))
        }
    }
}
