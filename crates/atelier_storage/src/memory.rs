//! In-process object store.

use async_trait::async_trait;
use atelier_error::{AtelierResult, StorageError, StorageErrorKind};
use atelier_interface::ObjectStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
struct Inner {
    objects: HashMap<String, (Vec<u8>, String)>,
    failing_puts: u32,
}

/// Object store keeping everything in memory.
///
/// Used for development servers and tests. [`fail_next`](Self::fail_next) makes
/// upcoming writes fail as if the CDN were unavailable.
#[derive(Debug, Clone)]
pub struct MemoryObjectStore {
    inner: Arc<Mutex<Inner>>,
    public_base_url: String,
}

impl MemoryObjectStore {
    /// Create an empty store serving from `public_base_url`.
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            inner: Arc::default(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fail the next `count` writes.
    pub fn fail_next(&self, count: u32) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .failing_puts = count;
    }

    /// Stored bytes and content type for `key`.
    pub fn get(&self, key: &str) -> Option<(Vec<u8>, String)> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .objects
            .get(key)
            .cloned()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .objects
            .len()
    }

    /// Whether nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, bytes: Vec<u8>, path: &str, content_type: &str) -> AtelierResult<String> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.failing_puts > 0 {
            inner.failing_puts -= 1;
            return Err(StorageError::new(StorageErrorKind::Unavailable(format!(
                "write of {} rejected",
                path
            )))
            .into());
        }
        inner
            .objects
            .insert(path.to_string(), (bytes, content_type.to_string()));
        Ok(format!("{}/{}", self.public_base_url, path))
    }
}
