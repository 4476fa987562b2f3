//! Remote artifact downloads.

use async_trait::async_trait;
use atelier_error::{AtelierResult, UploadError, UploadErrorKind};
use atelier_interface::ArtifactFetcher;

/// [`ArtifactFetcher`] over `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestFetcher {
    http: reqwest::Client,
}

impl ReqwestFetcher {
    /// Fetcher reusing an existing client.
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ArtifactFetcher for ReqwestFetcher {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, url: &str) -> AtelierResult<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| UploadError::new(UploadErrorKind::Download(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::new(UploadErrorKind::Download(format!(
                "{} returned {}",
                url, status
            )))
            .into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| UploadError::new(UploadErrorKind::Download(e.to_string())))?;
        tracing::debug!(size = bytes.len(), "Downloaded artifact");
        Ok(bytes.to_vec())
    }
}
