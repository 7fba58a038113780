use http::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

pub const DEFAULT_AMAZON_REGION: &str = "us-east-1";
pub const R2_REGION: &str = "auto";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Provider {
    #[default]
    Amazon,
    R2,
    Local,
}

impl Provider {
    /// Prefix used in operation error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Provider::Amazon => "AmazonClient",
            Provider::R2 => "R2Client",
            Provider::Local => "LocalClient",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Amazon => "amazon",
            Provider::R2 => "r2",
            Provider::Local => "local",
        }
    }

    fn default_headers(&self) -> BTreeMap<String, String> {
        match self {
            Provider::Amazon => {
                BTreeMap::from([("x-amz-acl".to_string(), "public-read".to_string())])
            }
            Provider::R2 | Provider::Local => BTreeMap::new(),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "amazon" | "aws" | "s3" => Ok(Provider::Amazon),
            "r2" | "cloudflare" => Ok(Provider::R2),
            "local" => Ok(Provider::Local),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl TryFrom<String> for Provider {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Caller-supplied configuration. Anything left out is filled in from the
/// provider's defaults by [`StorageOptions::resolve`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageOptions {
    pub provider: Option<Provider>,
    pub container: Option<String>,
    pub key: Option<String>,
    pub key_id: Option<String>,
    pub headers: Option<BTreeMap<String, String>>,
    pub endpoint_uri: Option<String>,
    pub region: Option<String>,
    /// S3-compatible API endpoint (MinIO and friends). Amazon only.
    pub service_url: Option<String>,
    pub account_id: Option<String>,
    pub root: Option<PathBuf>,
}

impl StorageOptions {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = lookup("STORAGE_PROVIDER")
            .map(|value| value.parse::<Provider>())
            .transpose()?;

        let headers = lookup("STORAGE_HEADERS")
            .map(|raw| serde_json::from_str::<BTreeMap<String, String>>(&raw))
            .transpose()?;

        Ok(Self {
            provider,
            container: lookup("STORAGE_CONTAINER"),
            key: lookup("STORAGE_KEY"),
            key_id: lookup("STORAGE_KEY_ID"),
            headers,
            endpoint_uri: lookup("STORAGE_ENDPOINT_URI"),
            region: lookup("STORAGE_REGION"),
            service_url: lookup("STORAGE_SERVICE_URL"),
            account_id: lookup("STORAGE_ACCOUNT_ID"),
            root: lookup("STORAGE_ROOT").map(PathBuf::from),
        })
    }

    /// Merge over the provider's defaults and validate.
    pub fn resolve(self) -> Result<StorageConfig, ConfigError> {
        let provider = self.provider.unwrap_or_default();

        match provider {
            Provider::Amazon => {
                let key = required(self.key, "key")?;
                let key_id = required(self.key_id, "keyId")?;
                let container = required(self.container, "container")?;
                let endpoint_uri = self
                    .endpoint_uri
                    .unwrap_or_else(|| format!("http://{}.s3.amazonaws.com", container));

                finish(StorageConfig {
                    provider,
                    credentials: Some(AccessKeys { key_id, key }),
                    headers: self.headers.unwrap_or_else(|| provider.default_headers()),
                    endpoint_uri,
                    region: Some(
                        self.region
                            .unwrap_or_else(|| DEFAULT_AMAZON_REGION.to_string()),
                    ),
                    service_url: self.service_url,
                    account_id: None,
                    root: None,
                    container,
                })
            }
            Provider::R2 => {
                let key = required(self.key, "key")?;
                let key_id = required(self.key_id, "keyId")?;
                let container = required(self.container, "container")?;
                let account_id = required(self.account_id, "accountId")?;
                let endpoint_uri = self.endpoint_uri.unwrap_or_else(|| {
                    format!("https://{}.r2.cloudflarestorage.com/{}", account_id, container)
                });

                finish(StorageConfig {
                    provider,
                    credentials: Some(AccessKeys { key_id, key }),
                    headers: self.headers.unwrap_or_else(|| provider.default_headers()),
                    endpoint_uri,
                    region: Some(R2_REGION.to_string()),
                    service_url: None,
                    account_id: Some(account_id),
                    root: None,
                    container,
                })
            }
            Provider::Local => {
                let container = required(self.container, "container")?;
                let root = self
                    .root
                    .filter(|root| !root.as_os_str().is_empty())
                    .ok_or(ConfigError::MissingField("root"))?;
                let endpoint_uri = self.endpoint_uri.unwrap_or_else(|| {
                    format!(
                        "file://{}/{}",
                        root.display().to_string().trim_end_matches('/'),
                        container
                    )
                });

                finish(StorageConfig {
                    provider,
                    credentials: None,
                    headers: self.headers.unwrap_or_else(|| provider.default_headers()),
                    endpoint_uri,
                    region: None,
                    service_url: None,
                    account_id: None,
                    root: Some(root),
                    container,
                })
            }
        }
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingField(field))
}

fn finish(mut config: StorageConfig) -> Result<StorageConfig, ConfigError> {
    for (name, value) in &config.headers {
        validate_header(name, value)?;
    }
    config.endpoint_uri = config.endpoint_uri.trim_end_matches('/').to_string();
    Ok(config)
}

fn validate_header(name: &str, value: &str) -> Result<(), ConfigError> {
    parse_header(name, value).map(|_| ()).map_err(|reason| ConfigError::InvalidHeader {
        name: name.chars().take(64).collect(),
        reason,
    })
}

/// Parses a header with the same `http` types the S3 SDK uses.
pub(crate) fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), String> {
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| e.to_string())?;
    let header_value = HeaderValue::from_str(value).map_err(|e| e.to_string())?;
    Ok((header_name, header_value))
}

#[derive(Clone, PartialEq, Eq)]
pub struct AccessKeys {
    pub key_id: String,
    pub key: String,
}

impl fmt::Debug for AccessKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessKeys")
            .field("key_id", &self.key_id)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Fully resolved configuration held by a client for its whole lifetime.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub provider: Provider,
    pub container: String,
    pub credentials: Option<AccessKeys>,
    pub headers: BTreeMap<String, String>,
    /// Public base URL; uploaded file URLs are built from it.
    pub endpoint_uri: String,
    pub region: Option<String>,
    pub service_url: Option<String>,
    pub account_id: Option<String>,
    pub root: Option<PathBuf>,
}
