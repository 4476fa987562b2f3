//! Provider artifact sources and stored artifact references.

use serde::{Deserialize, Serialize};

/// Where a finished provider artifact comes from.
///
/// # Examples
///
/// ```
/// use atelier_core::ArtifactSource;
///
/// let remote = ArtifactSource::parse("https://cdn.example.com/out/abc.webp");
/// assert_eq!(remote.extension().as_deref(), Some("webp"));
///
/// let inline = ArtifactSource::parse("data:image/jpeg;base64,/9j/4AAQ");
/// assert_eq!(inline.extension().as_deref(), Some("jpeg"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactSource {
    /// Remote URL that must be downloaded
    Url(String),
    /// Base64 payload embedded in the provider response
    Inline {
        /// Base64-encoded bytes
        data: String,
        /// MIME type from a `data:` URI, if present
        mime: Option<String>,
    },
}

impl ArtifactSource {
    /// Classify a raw provider output entry.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return ArtifactSource::Url(trimmed.to_string());
        }
        if let Some((header, data)) = trimmed
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(','))
        {
            let mime = header
                .split(';')
                .next()
                .filter(|m| !m.is_empty())
                .map(str::to_string);
            return ArtifactSource::Inline {
                data: data.to_string(),
                mime,
            };
        }
        ArtifactSource::Inline {
            data: trimmed.to_string(),
            mime: None,
        }
    }

    /// File extension implied by the source, lowercased.
    pub fn extension(&self) -> Option<String> {
        match self {
            ArtifactSource::Url(url) => {
                let path = url.split(['?', '#']).next().unwrap_or(url.as_str());
                let last = path.rsplit('/').next()?;
                let (_, ext) = last.rsplit_once('.')?;
                let ext = ext.to_ascii_lowercase();
                (!ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
                    .then_some(ext)
            }
            ArtifactSource::Inline { mime, .. } => mime
                .as_deref()
                .and_then(|m| m.split_once('/'))
                .map(|(_, sub)| sub.to_ascii_lowercase()),
        }
    }
}

/// MIME type for an object key extension; unknown extensions are treated as PNG.
///
/// # Examples
///
/// ```
/// use atelier_core::content_type_for_extension;
///
/// assert_eq!(content_type_for_extension("jpg"), "image/jpeg");
/// assert_eq!(content_type_for_extension("mp4"), "video/mp4");
/// assert_eq!(content_type_for_extension("bin"), "image/png");
/// ```
pub fn content_type_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "image/png",
    }
}

/// Stable reference to an artifact persisted on the CDN.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoredArtifact {
    /// Storage key, `{category}/{id}.{ext}`
    pub path: String,
    /// Public URL
    pub url: String,
}
