//! Everything that talks to the update server.
//!
//! ## Module Structure
//!
//! - [`channel`] - stable / insiders release tracks
//! - [`platform`] - host detection and platform identifiers
//! - [`server`] - endpoint URLs and the shared HTTP client
//! - [`metadata`] - version metadata fetching and parsing
//! - [`download`] - redirect-bounded streaming downloads
//! - [`progress`] - terminal progress bar
//! - [`verify`] - SHA-256 checksum verification

pub mod channel;
pub mod download;
pub mod metadata;
pub mod platform;
pub mod progress;
pub mod server;
pub mod verify;

pub use channel::{ChannelFilter, ReleaseChannel};
pub use download::{DownloadRequest, download};
pub use metadata::{VersionRecord, fetch_versions, find_for_platform, latest_for_platform};
pub use platform::{HostOs, PlatformDescriptor, PlatformId};
pub use server::{UpdateServer, http_client};
pub use verify::verify_sha256;
