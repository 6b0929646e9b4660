//! HTTP downloads with progress tracking and cancellation
//!
//! Every request races against a [`CancellationToken`]; once the token is
//! cancelled the in-flight request is dropped and [`UpdateError::Cancelled`]
//! is returned. Non-2xx responses surface as [`UpdateError::HttpStatus`].
//! Nothing is retried here, callers decide whether to try again.

use futures_util::StreamExt;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::NetworkConfig;
use crate::error::{IoResultExt, Result, UpdateError};

/// Progress callback: `(bytes_received, total_bytes)`
///
/// `total_bytes` is `None` when the server does not send a content length.
pub type Progress = Box<dyn FnMut(u64, Option<u64>) + Send>;

/// Download progress information
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadProgress {
    /// Total bytes to download, if known
    pub total_bytes: Option<u64>,

    /// Bytes downloaded so far
    pub downloaded_bytes: u64,
}

impl DownloadProgress {
    /// Create a new progress tracker
    pub fn new(total_bytes: Option<u64>) -> Self {
        Self {
            total_bytes,
            downloaded_bytes: 0,
        }
    }

    /// Record a received chunk
    pub fn advance(&mut self, chunk_len: usize) {
        self.downloaded_bytes += chunk_len as u64;
    }

    /// Progress percentage (0-100), if the total is known
    pub fn percentage(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) | None => None,
            Some(total) => Some((self.downloaded_bytes as f64 / total as f64) * 100.0),
        }
    }

    /// Check if download is complete
    pub fn is_complete(&self) -> bool {
        self.total_bytes
            .is_some_and(|total| self.downloaded_bytes >= total)
    }
}

/// HTTP downloader for release assets
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    /// Create a downloader from network settings
    pub fn new(network: &NetworkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&network.user_agent)
            .connect_timeout(network.http_timeout())
            .timeout(network.download_timeout())
            .build()
            .map_err(UpdateError::HttpClient)?;

        Ok(Self { client })
    }

    /// Create a downloader around an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Stream `url` into `dest`, reporting progress after every chunk
    ///
    /// Returns the number of bytes written. A partially written `dest` is
    /// removed on failure.
    pub async fn download_to_file(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<Progress>,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let result = self.stream_to_file(url, dest, progress, cancel).await;
        if result.is_err() {
            let _ = fs::remove_file(dest);
        }
        result
    }

    /// Fetch `url` as text
    pub async fn download_to_string(&self, url: &str, cancel: &CancellationToken) -> Result<String> {
        let response = self.get(url, cancel).await?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(UpdateError::Cancelled),
            text = response.text() => text.map_err(|source| UpdateError::Network {
                url: url.to_string(),
                source,
            }),
        }
    }

    async fn stream_to_file(
        &self,
        url: &str,
        dest: &Path,
        mut progress: Option<Progress>,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let response = self.get(url, cancel).await?;
        let mut tracker = DownloadProgress::new(response.content_length());

        info!("Downloading {}", url);

        let mut file =
            File::create(dest).io_context(|| format!("Failed to create {}", dest.display()))?;
        let mut stream = response.bytes_stream();

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(UpdateError::Cancelled),
                chunk = stream.next() => chunk,
            };

            let Some(chunk) = chunk else {
                break;
            };
            let chunk = chunk.map_err(|source| UpdateError::Network {
                url: url.to_string(),
                source,
            })?;

            file.write_all(&chunk)
                .io_context(|| format!("Failed to write {}", dest.display()))?;
            tracker.advance(chunk.len());

            if let Some(callback) = progress.as_mut() {
                callback(tracker.downloaded_bytes, tracker.total_bytes);
            }
        }

        file.sync_all()
            .io_context(|| format!("Failed to flush {}", dest.display()))?;

        debug!(
            "Downloaded {} bytes to {}",
            tracker.downloaded_bytes,
            dest.display()
        );
        Ok(tracker.downloaded_bytes)
    }

    async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<reqwest::Response> {
        debug!("GET {}", url);

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UpdateError::Cancelled),
            response = self.client.get(url).send() => response.map_err(|source| UpdateError::Network {
                url: url.to_string(),
                source,
            })?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}
