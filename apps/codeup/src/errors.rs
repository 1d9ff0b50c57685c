//! Error types for codeup.
//!
//! Every failure the tool can report is one of the [`CodeupError`] variants.
//! Orchestrators construct them at the point of detection and propagate them
//! through `anyhow::Result`, attaching context on the way up. Only `main`
//! turns an error into process exit status 1.

use std::path::PathBuf;
use thiserror::Error;

/// Consolidated error type for codeup operations.
#[derive(Debug, Error)]
pub enum CodeupError {
    /// A flag value had the wrong shape or an unknown flag was given.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of what was invalid.
        message: String,
    },

    /// The requested action is not one of the known actions.
    #[error("invalid action: {action}")]
    InvalidAction {
        /// The action name as given on the command line.
        action: String,
    },

    /// The requested build is neither `stable` nor `insiders`.
    #[error("invalid build: {value} (expected stable or insiders)")]
    InvalidChannel {
        /// The rejected channel value.
        value: String,
    },

    /// The host OS or CPU architecture has no published build.
    #[error("unsupported platform: {os} on {arch}")]
    UnsupportedPlatform {
        /// Operating system reported by the host.
        os: String,
        /// CPU architecture reported by the host.
        arch: String,
    },

    /// Transport failure or unexpected HTTP status.
    #[error("network error: {message}")]
    NetworkError {
        /// Description of the request that failed.
        message: String,
        /// The underlying transport error, when there is one.
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The metadata endpoint returned a body that is not the expected JSON.
    #[error("malformed response from {url}")]
    MalformedResponse {
        /// The URL whose body failed to parse.
        url: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A required path is missing or cannot be written.
    #[error("{message}: {}", path.display())]
    FilesystemError {
        /// Description of the failed check or operation.
        message: String,
        /// The offending path.
        path: PathBuf,
    },

    /// A downloaded archive does not match the published SHA-256.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The published checksum.
        expected: String,
        /// The checksum of the file on disk.
        actual: String,
    },
}

impl CodeupError {
    /// Creates a new `InvalidArgument` error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidAction` error.
    #[must_use]
    pub fn invalid_action(action: impl Into<String>) -> Self {
        Self::InvalidAction {
            action: action.into(),
        }
    }

    /// Creates a new `InvalidChannel` error.
    #[must_use]
    pub fn invalid_channel(value: impl Into<String>) -> Self {
        Self::InvalidChannel {
            value: value.into(),
        }
    }

    /// Creates a new `UnsupportedPlatform` error.
    #[must_use]
    pub fn unsupported_platform(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self::UnsupportedPlatform {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Creates a new `NetworkError` without an underlying transport error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new `NetworkError` wrapping a reqwest error.
    #[must_use]
    pub fn network_with_source(message: impl Into<String>, source: reqwest::Error) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a new `MalformedResponse` error.
    #[must_use]
    pub fn malformed_response(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::MalformedResponse {
            url: url.into(),
            source,
        }
    }

    /// Creates a new `FilesystemError`.
    #[must_use]
    pub fn filesystem(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::FilesystemError {
            message: message.into(),
            path: path.into(),
        }
    }

    /// Creates a new `ChecksumMismatch` error.
    #[must_use]
    pub fn checksum_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ChecksumMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
