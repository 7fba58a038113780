//! Uniform `init` / `upload` / `download` / `remove` client over object storage providers.
//!
//! ```no_run
//! use cloud_storage_client::{StorageClient, StorageOptions};
//!
//! # async fn run() -> Result<(), cloud_storage_client::ClientError> {
//! let client = StorageClient::new(StorageOptions {
//!     container: Some("bucket1".into()),
//!     key: Some("secret".into()),
//!     key_id: Some("AKIA...".into()),
//!     ..Default::default()
//! })?;
//!
//! client.init().await?;
//! let uploaded = client.upload("./report.pdf", "reports/2024/report.pdf").await?;
//! println!("{}", uploaded.url);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod storage;

pub use client::{StorageClient, TransferResult};
pub use config::{AccessKeys, Provider, StorageConfig, StorageOptions};
pub use error::{ClientError, ConfigError, ErrorKind};
pub use storage::{DownloadMetadata, StorageBackend, StorageError};
