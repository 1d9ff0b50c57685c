//! Update server endpoints and the shared HTTP client.
//!
//! All network traffic goes to a single host (default
//! `https://code.visualstudio.com`). The host can be overridden through the
//! `CODEUP_UPDATE_SERVER` environment variable for testing or to use a
//! mirror.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use super::{PlatformId, ReleaseChannel};

/// Environment variable to override the update server URL.
pub const UPDATE_SERVER_ENV: &str = "CODEUP_UPDATE_SERVER";

/// Default update server URL.
const DEFAULT_UPDATE_SERVER: &str = "https://code.visualstudio.com";

/// Path of the version metadata document.
const VERSIONS_PATH: &str = "/sha";

/// Path of the download redirector.
const DOWNLOAD_PATH: &str = "/sha/download";

/// Time allowed for establishing a connection. Reads are not bounded.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// User-Agent header for HTTP requests.
const USER_AGENT: &str = concat!("codeup/", env!("CARGO_PKG_VERSION"));

/// Location of the update server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateServer {
    base: String,
}

impl UpdateServer {
    /// Creates a server rooted at `base` (trailing slashes are ignored).
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// Reads the server from `CODEUP_UPDATE_SERVER`, falling back to the
    /// default. Empty or whitespace-only values are treated as unset.
    #[must_use]
    pub fn from_env() -> Self {
        let base = std::env::var(UPDATE_SERVER_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_UPDATE_SERVER.to_string());
        let server = Self::new(base);
        debug!(server = server.base(), "update server");
        server
    }

    /// Returns the server base URL.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Returns the metadata URL, optionally narrowed to one channel.
    #[must_use]
    pub fn versions_url(&self, channel: Option<ReleaseChannel>) -> String {
        match channel {
            Some(channel) => format!(
                "{}{VERSIONS_PATH}?build={}",
                self.base,
                channel.query_value()
            ),
            None => format!("{}{VERSIONS_PATH}", self.base),
        }
    }

    /// Returns the download URL for one (channel, platform) asset.
    #[must_use]
    pub fn download_url(&self, channel: ReleaseChannel, platform: PlatformId) -> String {
        format!(
            "{}{DOWNLOAD_PATH}?build={}&os={platform}",
            self.base,
            channel.query_value()
        )
    }
}

impl Default for UpdateServer {
    fn default() -> Self {
        Self::new(DEFAULT_UPDATE_SERVER)
    }
}

/// Builds the HTTP client used for every request.
///
/// Automatic redirects are disabled; callers that need to follow them do so
/// explicitly under a [`RedirectPolicy`](super::download::RedirectPolicy).
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("Failed to create HTTP client")
}
