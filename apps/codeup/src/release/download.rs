//! Asset downloads.
//!
//! The download endpoint answers with a redirect to the real asset on a CDN.
//! Redirects are followed by hand under a [`RedirectPolicy`] so the number of
//! hops is bounded and visible in the logs. The asset body is streamed to
//! disk chunk by chunk while a [`ProgressReporter`] draws the bar.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use futures_util::StreamExt;
use reqwest::header::LOCATION;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::progress::ProgressReporter;
use super::{PlatformId, ReleaseChannel, UpdateServer, http_client};
use crate::errors::CodeupError;

/// Directory downloads land in when none is given, relative to the working
/// directory.
pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads";

/// Upper bound on redirect hops for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectPolicy {
    max_hops: usize,
}

impl RedirectPolicy {
    /// Allows at most `max_hops` redirects.
    #[must_use]
    pub const fn limited(max_hops: usize) -> Self {
        Self { max_hops }
    }

    #[must_use]
    pub fn max_hops(self) -> usize {
        self.max_hops
    }
}

impl Default for RedirectPolicy {
    /// The download endpoint redirects exactly once, to the CDN.
    fn default() -> Self {
        Self::limited(1)
    }
}

/// What to download and where to put it.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub channel: ReleaseChannel,
    pub platform: PlatformId,
    /// Target directory; `./downloads` when unset.
    pub directory: Option<PathBuf>,
    /// File name; see [`default_filename`] when unset.
    pub filename: Option<String>,
    pub redirects: RedirectPolicy,
}

impl DownloadRequest {
    #[must_use]
    pub fn new(channel: ReleaseChannel, platform: PlatformId) -> Self {
        Self {
            channel,
            platform,
            directory: None,
            filename: None,
            redirects: RedirectPolicy::default(),
        }
    }

    #[must_use]
    pub fn directory(mut self, directory: Option<PathBuf>) -> Self {
        self.directory = directory;
        self
    }

    #[must_use]
    pub fn filename(mut self, filename: Option<String>) -> Self {
        self.filename = filename;
        self
    }
}

/// Builds `vscode-{channel}-{platform}-{epoch_ms}.{ext}`.
///
/// The extension follows the platform: `tar.gz` for Linux ids, `zip`
/// otherwise.
#[must_use]
pub fn default_filename(channel: ReleaseChannel, platform: PlatformId) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis());
    format!(
        "vscode-{channel}-{platform}-{millis}.{}",
        platform.archive_extension()
    )
}

/// Returns `./downloads` resolved against the working directory.
///
/// # Errors
///
/// Returns an error if the working directory cannot be determined.
pub fn default_directory() -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    Ok(cwd.join(DEFAULT_DOWNLOAD_DIR))
}

/// Downloads one asset and returns the absolute path of the written file.
///
/// The target directory is created if needed. A partially written file is
/// left in place when the transfer fails.
///
/// # Errors
///
/// Returns `NetworkError` on transport failure, a non-success status, or too
/// many redirects, and a filesystem error if the file cannot be written.
pub async fn download(server: &UpdateServer, request: &DownloadRequest) -> Result<PathBuf> {
    let directory = match &request.directory {
        Some(directory) => directory.clone(),
        None => default_directory()?,
    };
    let filename = request
        .filename
        .clone()
        .unwrap_or_else(|| default_filename(request.channel, request.platform));

    tokio::fs::create_dir_all(&directory)
        .await
        .with_context(|| format!("Failed to create directory: {}", directory.display()))?;

    let dest = directory.join(&filename);
    let url = server.download_url(request.channel, request.platform);
    info!(%url, dest = %dest.display(), "starting download");

    let client = http_client()?;
    let response = send_following(&client, &url, request.redirects).await?;
    stream_to_file(response, &filename, &dest).await?;

    std::path::absolute(&dest)
        .with_context(|| format!("Failed to resolve path: {}", dest.display()))
}

/// Sends a GET, following at most `policy.max_hops()` redirects.
///
/// Any 3xx response carrying a `Location` header consumes one hop; its body
/// is dropped unread.
async fn send_following(
    client: &reqwest::Client,
    url: &str,
    policy: RedirectPolicy,
) -> Result<reqwest::Response> {
    let mut current = url.to_string();
    let mut hops = 0;

    loop {
        let response = client.get(&current).send().await.map_err(|e| {
            CodeupError::network_with_source(format!("Failed to connect to {current}"), e)
        })?;
        let status = response.status();

        if status.is_redirection()
            && let Some(location) = response.headers().get(LOCATION)
        {
            if hops >= policy.max_hops() {
                return Err(CodeupError::network(format!(
                    "Too many redirects for {url} (limit {})",
                    policy.max_hops()
                ))
                .into());
            }
            let location = location.to_str().map_err(|_| {
                CodeupError::network(format!("Invalid redirect location from {current}"))
            })?;
            let next = response.url().join(location).map_err(|_| {
                CodeupError::network(format!("Invalid redirect location: {location}"))
            })?;

            hops += 1;
            debug!(from = %current, to = %next, hop = hops, "following redirect");
            current = next.to_string();
            continue;
        }

        if !status.is_success() {
            return Err(CodeupError::network(format!("HTTP {status} for {current}")).into());
        }
        return Ok(response);
    }
}

async fn stream_to_file(response: reqwest::Response, name: &str, dest: &Path) -> Result<()> {
    let url = response.url().to_string();
    let total = response.content_length().unwrap_or(0);

    let mut file = tokio::fs::File::create(dest)
        .await
        .with_context(|| format!("Failed to create file: {}", dest.display()))?;

    let progress = ProgressReporter::start(name, total);
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            CodeupError::network_with_source(format!("Failed to read chunk from {url}"), e)
        })?;
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write to {}", dest.display()))?;
        progress.advance(chunk.len() as u64);
    }

    file.flush()
        .await
        .with_context(|| format!("Failed to flush {}", dest.display()))?;
    progress.finish();

    Ok(())
}
