//! Filesystem-backed object store.
//!
//! Objects land at `{root}/{key}` and are served from `{public_base_url}/{key}`.

use async_trait::async_trait;
use atelier_error::{AtelierResult, StorageError, StorageErrorKind};
use atelier_interface::ObjectStore;
use std::path::{Component, Path, PathBuf};

/// Object store writing into a local directory that a web server exposes.
///
/// Writes go to a temp file first and are renamed into place, so readers never
/// observe a partially written object.
#[derive(Debug, Clone)]
pub struct FileSystemObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl FileSystemObjectStore {
    /// Create a store rooted at `root`.
    ///
    /// Creates the root directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    #[tracing::instrument(skip(root, public_base_url))]
    pub fn new(
        root: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> AtelierResult<Self> {
        let root = root.into();

        std::fs::create_dir_all(&root).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                root.display(),
                e
            )))
        })?;

        tracing::info!(path = %root.display(), "Created filesystem object store");
        Ok(Self {
            root,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Local path an object key maps to.
    pub fn local_path(&self, key: &str) -> AtelierResult<PathBuf> {
        Ok(self.root.join(validate_key(key)?))
    }

    /// Public URL for an object key.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

fn validate_key(key: &str) -> Result<&Path, StorageError> {
    let path = Path::new(key);
    let safe = !key.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if safe {
        Ok(path)
    } else {
        Err(StorageError::new(StorageErrorKind::InvalidKey(
            key.to_string(),
        )))
    }
}

#[async_trait]
impl ObjectStore for FileSystemObjectStore {
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn put(&self, bytes: Vec<u8>, path: &str, content_type: &str) -> AtelierResult<String> {
        let target = self.local_path(path)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let mut temp_name = target.as_os_str().to_os_string();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        tokio::fs::write(&temp_path, &bytes).await.map_err(|e| {
            StorageError::new(StorageErrorKind::Write(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;

        tokio::fs::rename(&temp_path, &target).await.map_err(|e| {
            StorageError::new(StorageErrorKind::Write(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                target.display(),
                e
            )))
        })?;

        tracing::info!(path, size = bytes.len(), "Stored object");
        Ok(self.public_url(path))
    }
}
