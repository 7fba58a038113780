use thiserror::Error;

use crate::storage::StorageError;

/// Problems detected while building a client, before any network call.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration field: {0}")]
    MissingField(&'static str),

    #[error("Unknown storage provider: {0}")]
    UnknownProvider(String),

    #[error("Invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Invalid headers JSON: {0}")]
    InvalidHeadersJson(#[from] serde_json::Error),

    #[error("Could not create connection: {0}")]
    Connection(#[from] StorageError),
}

/// Category of a [`ClientError`], for callers that branch on failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Initialization,
    Upload,
    Download,
    Remove,
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("{provider}: There was a problem with initialization. Details: {source}")]
    Initialization {
        provider: &'static str,
        source: StorageError,
    },

    #[error("{provider}: There was a problem with uploading. Details: {source}")]
    Upload {
        provider: &'static str,
        source: StorageError,
    },

    #[error("{provider}: There was a problem with downloading. Details: {source}")]
    Download {
        provider: &'static str,
        source: StorageError,
    },

    #[error("{provider}: There was a problem with removing. Details: {source}")]
    Remove {
        provider: &'static str,
        source: StorageError,
    },
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Configuration(_) => ErrorKind::Configuration,
            ClientError::Initialization { .. } => ErrorKind::Initialization,
            ClientError::Upload { .. } => ErrorKind::Upload,
            ClientError::Download { .. } => ErrorKind::Download,
            ClientError::Remove { .. } => ErrorKind::Remove,
        }
    }

    /// The transport error underneath an operation failure.
    pub fn storage_error(&self) -> Option<&StorageError> {
        match self {
            ClientError::Configuration(_) => None,
            ClientError::Initialization { source, .. }
            | ClientError::Upload { source, .. }
            | ClientError::Download { source, .. }
            | ClientError::Remove { source, .. } => Some(source),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
