//! CDN object storage and artifact upload for Atelier.
//!
//! Finished provider artifacts arrive either as remote URLs or as inline base64
//! payloads. [`ArtifactUploader`] turns either into bytes, stores them under a fresh
//! `{category}/{uuid}.{ext}` key, and returns the stored path and public URL.
//!
//! # Example
//!
//! ```rust,no_run
//! use atelier_core::{ArtifactSource, MediaKind};
//! use atelier_rate_limit::RetryPolicy;
//! use atelier_storage::{ArtifactUploader, FileSystemObjectStore, ReqwestFetcher};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = FileSystemObjectStore::new("/tmp/cdn", "https://cdn.example.com")?;
//! let uploader = ArtifactUploader::new(
//!     Arc::new(store),
//!     Arc::new(ReqwestFetcher::default()),
//!     RetryPolicy::default(),
//!     "generations",
//! );
//!
//! let source = ArtifactSource::parse("https://provider.example.com/out/1.png");
//! let stored = uploader.upload(&source, MediaKind::Image, 3).await?;
//! println!("{} -> {}", stored.path, stored.url);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod fetcher;
mod filesystem;
mod memory;
mod uploader;

pub use fetcher::ReqwestFetcher;
pub use filesystem::FileSystemObjectStore;
pub use memory::MemoryObjectStore;
pub use uploader::ArtifactUploader;
