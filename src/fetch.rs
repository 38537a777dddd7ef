//! Rule text retrieval.
//!
//! A [`Fetcher`] turns a location string into rule text. Three adapters are
//! provided:
//!
//! - [`HttpFetcher`]: remote rule text over HTTP(S), gzip bodies decoded
//! - [`FileFetcher`]: files relative to a root directory
//! - [`MemoryFetcher`]: in-memory texts for tests and embedding

use ahash::AHashMap;
use async_trait::async_trait;
use flate2::read::GzDecoder;
use parking_lot::Mutex;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, Result};

/// Retrieves rule text by location.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the full text stored at `location`.
    async fn fetch_text(&self, location: &str) -> Result<String>;
}

/// Fetches rule text over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Create a fetcher with the default timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    /// Create a fetcher with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_text(&self, location: &str) -> Result<String> {
        log::debug!("Downloading {}", location);
        let response = self.client.get(location).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch {
                location: location.to_string(),
                reason: format!("HTTP status {}", status),
            });
        }

        let body = response.bytes().await?;
        let text = decode_body(location, &body)?;
        log::info!("Downloaded {}: {} bytes", location, text.len());
        Ok(text)
    }
}

/// Reads rule text from files under a root directory.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    /// Create a fetcher resolving locations against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Fetcher for FileFetcher {
    async fn fetch_text(&self, location: &str) -> Result<String> {
        let path = self.root.join(location);
        let data = tokio::fs::read(&path).await.map_err(|e| Error::Fetch {
            location: path.display().to_string(),
            reason: e.to_string(),
        })?;
        decode_body(location, &data)
    }
}

/// Serves rule text from memory.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    texts: Mutex<AHashMap<String, String>>,
}

impl MemoryFetcher {
    /// Create an empty fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the text at `location`.
    pub fn insert(&self, location: impl Into<String>, text: impl Into<String>) {
        self.texts.lock().insert(location.into(), text.into());
    }

    /// Remove the text at `location`; later fetches fail.
    pub fn remove(&self, location: &str) {
        self.texts.lock().remove(location);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(self, location: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(location, text);
        self
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch_text(&self, location: &str) -> Result<String> {
        self.texts
            .lock()
            .get(location)
            .cloned()
            .ok_or_else(|| Error::Fetch {
                location: location.to_string(),
                reason: "not found".to_string(),
            })
    }
}

/// Check if data is gzip compressed.
fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b
}

/// Decompress gzip if needed and decode as UTF-8.
fn decode_body(location: &str, data: &[u8]) -> Result<String> {
    let fail = |reason: String| Error::Fetch {
        location: location.to_string(),
        reason,
    };

    if is_gzip(data) {
        let mut text = String::new();
        GzDecoder::new(data)
            .read_to_string(&mut text)
            .map_err(|e| fail(format!("gzip decompression failed: {}", e)))?;
        log::debug!("Decompressed {}: {} -> {} bytes", location, data.len(), text.len());
        Ok(text)
    } else {
        String::from_utf8(data.to_vec()).map_err(|e| fail(format!("invalid UTF-8: {}", e)))
    }
}
