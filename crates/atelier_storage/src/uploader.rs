//! Artifact upload with bounded retry.

use atelier_core::{ArtifactSource, MediaKind, StoredArtifact, content_type_for_extension};
use atelier_error::{AtelierError, AtelierErrorKind, RetryableError, UploadError, UploadErrorKind};
use atelier_interface::{ArtifactFetcher, ObjectStore};
use atelier_rate_limit::{RetryPolicy, retry_with_policy};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const KNOWN_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "gif", "webp", "mp4", "webm"];

/// Persists finished provider artifacts to the object store.
///
/// Each attempt downloads (or decodes) the source and writes it under a fresh key.
/// Download and store failures are retried with the shared backoff policy; a
/// malformed inline payload fails immediately.
#[derive(Clone)]
pub struct ArtifactUploader {
    store: Arc<dyn ObjectStore>,
    fetcher: Arc<dyn ArtifactFetcher>,
    policy: RetryPolicy,
    category: String,
}

impl std::fmt::Debug for ArtifactUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactUploader")
            .field("policy", &self.policy)
            .field("category", &self.category)
            .finish()
    }
}

impl ArtifactUploader {
    /// Create an uploader writing keys under `category`.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        fetcher: Arc<dyn ArtifactFetcher>,
        policy: RetryPolicy,
        category: impl Into<String>,
    ) -> Self {
        Self {
            store,
            fetcher,
            policy,
            category: category.into(),
        }
    }

    /// Store `source`, making at most `retries` attempts.
    ///
    /// # Errors
    ///
    /// [`UploadErrorKind::Decode`] for a malformed inline payload,
    /// [`UploadErrorKind::Exhausted`] when every attempt failed.
    #[instrument(skip(self, source), fields(category = %self.category))]
    pub async fn upload(
        &self,
        source: &ArtifactSource,
        media_kind: MediaKind,
        retries: u32,
    ) -> Result<StoredArtifact, UploadError> {
        let ext = storage_extension(source, media_kind);
        let content_type = content_type_for_extension(&ext);
        let attempts = retries.max(1);

        let result: Result<StoredArtifact, UploadError> =
            retry_with_policy(&self.policy, attempts, |attempt| {
                let ext = ext.clone();
                async move {
                    let bytes = self.materialize(source).await?;
                    let path = format!("{}/{}.{}", self.category, Uuid::new_v4(), ext);
                    let url = self
                        .store
                        .put(bytes, &path, content_type)
                        .await
                        .map_err(into_upload_error)?;
                    info!(attempt, path = %path, "Artifact stored");
                    Ok(StoredArtifact { path, url })
                }
            })
            .await;

        result.map_err(|e| {
            if e.is_retryable() {
                warn!(attempts, error = %e, "Artifact upload exhausted retries");
                UploadError::new(UploadErrorKind::Exhausted {
                    attempts,
                    last: e.kind.to_string(),
                })
            } else {
                e
            }
        })
    }

    async fn materialize(&self, source: &ArtifactSource) -> Result<Vec<u8>, UploadError> {
        match source {
            ArtifactSource::Url(url) => self.fetcher.fetch(url).await.map_err(into_upload_error),
            ArtifactSource::Inline { data, .. } => decode_inline(data),
        }
    }
}

fn storage_extension(source: &ArtifactSource, media_kind: MediaKind) -> String {
    source
        .extension()
        .filter(|ext| KNOWN_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| media_kind.default_extension().to_string())
}

fn decode_inline(data: &str) -> Result<Vec<u8>, UploadError> {
    let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(&compact)
        .or_else(|_| STANDARD_NO_PAD.decode(&compact))
        .map_err(|e| UploadError::new(UploadErrorKind::Decode(e.to_string())))
        .and_then(|bytes| {
            if bytes.is_empty() {
                Err(UploadError::new(UploadErrorKind::Decode(
                    "empty payload".to_string(),
                )))
            } else {
                Ok(bytes)
            }
        })
}

fn into_upload_error(err: AtelierError) -> UploadError {
    match err.kind() {
        AtelierErrorKind::Upload(e) => e.clone(),
        other => UploadError::new(UploadErrorKind::Store(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extensions_fall_back_to_media_default() {
        let source = ArtifactSource::parse("https://p.example.com/render.php?id=4");
        assert_eq!(storage_extension(&source, MediaKind::Image), "png");
        assert_eq!(storage_extension(&source, MediaKind::Video), "mp4");
    }

    #[test]
    fn inline_whitespace_is_ignored() {
        assert_eq!(decode_inline("aGVs\nbG8=").unwrap(), b"hello");
        assert_eq!(decode_inline("aGVsbG8").unwrap(), b"hello");
        assert!(decode_inline("***").is_err());
        assert!(decode_inline("").is_err());
    }
}
