use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

use super::{DownloadMetadata, StorageBackend, StorageError};

/// Directory-backed storage: every container is a directory under `root`.
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn container_dir(&self, container: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(relative_path(container)?))
    }

    fn object_path(&self, container: &str, remote: &str) -> Result<PathBuf, StorageError> {
        Ok(self.container_dir(container)?.join(relative_path(remote)?))
    }
}

/// Rejects paths that would escape the container directory.
fn relative_path(path: &str) -> Result<PathBuf, StorageError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(StorageError::InvalidPath(path.to_string()));
    }

    let mut out = PathBuf::new();
    for segment in trimmed.split('/').filter(|s| !s.is_empty()) {
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => out.push(part),
            _ => return Err(StorageError::InvalidPath(path.to_string())),
        }
    }
    Ok(out)
}

#[async_trait]
impl StorageBackend for LocalBackend {
    async fn create_container(&self, container: &str) -> Result<(), StorageError> {
        let dir = self.container_dir(container)?;
        fs::create_dir_all(&dir).await?;
        tracing::debug!("Local container ready at {}", dir.display());
        Ok(())
    }

    async fn put_object(
        &self,
        container: &str,
        remote: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        headers: &BTreeMap<String, String>,
    ) -> Result<(), StorageError> {
        let container_dir = self.container_dir(container)?;
        if !fs::try_exists(&container_dir).await? {
            return Err(StorageError::NotFound(format!(
                "container {} does not exist",
                container
            )));
        }

        let file_path = self.object_path(container, remote)?;
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if !headers.is_empty() {
            tracing::debug!("Local storage ignores {} upload header(s)", headers.len());
        }

        // Readers never observe a half-written object.
        let temp_path = container_dir.join(format!(".upload-{}", Uuid::new_v4()));
        let result = async {
            let mut file = fs::File::create(&temp_path).await?;
            tokio::io::copy(reader, &mut file).await?;
            file.flush().await?;
            fs::rename(&temp_path, &file_path).await
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn get_object(
        &self,
        container: &str,
        remote: &str,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<DownloadMetadata, StorageError> {
        let file_path = self.object_path(container, remote)?;
        let mut file = match fs::File::open(&file_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(format!(
                    "object {} does not exist in container {}",
                    remote, container
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let bytes = tokio::io::copy(&mut file, writer).await?;
        writer.flush().await?;

        Ok(DownloadMetadata {
            status_code: None,
            bytes: Some(bytes),
        })
    }

    async fn remove_object(&self, container: &str, remote: &str) -> Result<(), StorageError> {
        let file_path = self.object_path(container, remote)?;

        if fs::try_exists(&file_path).await? {
            fs::remove_file(&file_path).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_rejects_escapes() {
        assert!(relative_path("a/b/c.txt").is_ok());
        assert_eq!(relative_path("/a//b/").unwrap(), PathBuf::from("a").join("b"));
        for bad in ["", "/", "../etc/passwd", "a/../../b", "a/./b"] {
            assert!(
                matches!(relative_path(bad), Err(StorageError::InvalidPath(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_put_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path());
        backend.create_container("media").await.unwrap();

        let mut body: &[u8] = b"hello local";
        backend
            .put_object("media", "docs/hello.txt", &mut body, &BTreeMap::new())
            .await
            .unwrap();
        assert!(dir.path().join("media/docs/hello.txt").exists());

        let mut out = Vec::new();
        let meta = backend.get_object("media", "docs/hello.txt", &mut out).await.unwrap();
        assert_eq!(out, b"hello local");
        assert_eq!(meta.bytes, Some(11));

        backend.remove_object("media", "docs/hello.txt").await.unwrap();
        assert!(!dir.path().join("media/docs/hello.txt").exists());
        // Removing again is not an error.
        backend.remove_object("media", "docs/hello.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_put_into_missing_container_fails() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path());

        let mut body: &[u8] = b"x";
        let err = backend
            .put_object("nope", "a.txt", &mut body, &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path());
        backend.create_container("media").await.unwrap();

        let mut out = Vec::new();
        let err = backend.get_object("media", "missing.bin", &mut out).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
