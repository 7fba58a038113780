use async_trait::async_trait;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, BucketConfiguration, Region};
use std::collections::BTreeMap;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use super::{DownloadMetadata, StorageBackend, StorageError};
use crate::config::{parse_header, Provider, StorageConfig, DEFAULT_AMAZON_REGION, R2_REGION};

/// Amazon S3 and S3-compatible services (Cloudflare R2, MinIO) through `rust-s3`.
pub struct S3Backend {
    region: Region,
    credentials: Credentials,
    path_style: bool,
}

impl S3Backend {
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let keys = config.credentials.as_ref().ok_or_else(|| {
            StorageError::NotConfigured(format!("{} requires access keys", config.provider))
        })?;

        let credentials = Credentials::new(
            Some(keys.key_id.as_str()),
            Some(keys.key.as_str()),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::NotConfigured(e.to_string()))?;

        let (region, path_style) = match config.provider {
            Provider::Amazon => {
                let name = config
                    .region
                    .clone()
                    .unwrap_or_else(|| DEFAULT_AMAZON_REGION.to_string());
                match &config.service_url {
                    Some(endpoint) => (
                        Region::Custom {
                            region: name,
                            endpoint: endpoint.trim_end_matches('/').to_string(),
                        },
                        true,
                    ),
                    None => (
                        name.parse::<Region>()
                            .map_err(|e| StorageError::NotConfigured(e.to_string()))?,
                        false,
                    ),
                }
            }
            Provider::R2 => {
                let account_id = config.account_id.as_deref().ok_or_else(|| {
                    StorageError::NotConfigured("R2 requires an account id".to_string())
                })?;
                (
                    Region::Custom {
                        region: R2_REGION.to_string(),
                        endpoint: format!("https://{}.r2.cloudflarestorage.com", account_id),
                    },
                    true,
                )
            }
            Provider::Local => {
                return Err(StorageError::NotConfigured(
                    "local provider has no S3 endpoint".to_string(),
                ));
            }
        };

        Ok(Self {
            region,
            credentials,
            path_style,
        })
    }

    fn bucket(&self, container: &str) -> Result<Box<Bucket>, StorageError> {
        let bucket = Bucket::new(container, self.region.clone(), self.credentials.clone())?;
        Ok(if self.path_style {
            bucket.with_path_style()
        } else {
            bucket
        })
    }
}

impl From<S3Error> for StorageError {
    fn from(err: S3Error) -> Self {
        match err {
            S3Error::HttpFailWithBody(404, body) => StorageError::NotFound(body),
            other => StorageError::Provider(other.to_string()),
        }
    }
}

fn already_owned(status: u16, body: &str) -> bool {
    status == 409 && body.contains("BucketAlreadyOwnedByYou")
}

fn content_type_for(remote: &str) -> &'static str {
    let extension = remote
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    async fn create_container(&self, container: &str) -> Result<(), StorageError> {
        let region = self.region.clone();
        let credentials = self.credentials.clone();
        let config = BucketConfiguration::default();

        let response = if self.path_style {
            Bucket::create_with_path_style(container, region, credentials, config).await
        } else {
            Bucket::create(container, region, credentials, config).await
        };

        match response {
            Ok(created) if created.success() => Ok(()),
            Ok(created) if already_owned(created.response_code, &created.response_text) => {
                tracing::debug!("Bucket {} already exists", container);
                Ok(())
            }
            Ok(created) => Err(StorageError::Provider(format!(
                "Got HTTP {} with content '{}'",
                created.response_code, created.response_text
            ))),
            Err(S3Error::HttpFailWithBody(status, body)) if already_owned(status, &body) => {
                tracing::debug!("Bucket {} already exists", container);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put_object(
        &self,
        container: &str,
        remote: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        headers: &BTreeMap<String, String>,
    ) -> Result<(), StorageError> {
        let mut bucket = self.bucket(container)?;
        for (name, value) in headers {
            // `add_header` unwraps its parse, so only hand it a checked name.
            let (header_name, _) = parse_header(name, value).map_err(|reason| {
                StorageError::InvalidHeader(format!(
                    "{}: {}",
                    name.chars().take(64).collect::<String>(),
                    reason
                ))
            })?;
            bucket.add_header(header_name.as_str(), value);
        }

        let mut reader = reader;
        bucket
            .put_object_stream_with_content_type(&mut reader, remote, content_type_for(remote))
            .await?;

        Ok(())
    }

    async fn get_object(
        &self,
        container: &str,
        remote: &str,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<DownloadMetadata, StorageError> {
        let bucket = self.bucket(container)?;

        let mut writer = writer;
        let status_code = bucket.get_object_to_writer(remote, &mut writer).await?;
        writer.flush().await?;

        Ok(DownloadMetadata {
            status_code: Some(status_code),
            bytes: None,
        })
    }

    async fn remove_object(&self, container: &str, remote: &str) -> Result<(), StorageError> {
        let bucket = self.bucket(container)?;
        bucket.delete_object(remote).await?;
        Ok(())
    }
}
