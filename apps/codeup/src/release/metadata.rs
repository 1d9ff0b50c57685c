//! Version metadata client.
//!
//! The update server publishes one JSON document describing the newest
//! build of every (channel, platform) pair:
//!
//! ```json
//! {
//!   "products": [
//!     {
//!       "url": "https://update.code.visualstudio.com/.../code-stable-x64-1700000000.tar.gz",
//!       "name": "1.85.0",
//!       "version": "0ee08df0cf4527e40edc9aa28f4b5bd38bbff2b2",
//!       "productVersion": "1.85.0",
//!       "hash": "0ee08df0cf4527e40edc9aa28f4b5bd38bbff2b2",
//!       "timestamp": 1701902211415,
//!       "sha256hash": "d1b3...",
//!       "supportsFastUpdate": true,
//!       "build": "stable",
//!       "platform": { "os": "linux-x64", "prettyname": "Linux .tar.gz (64 bit)" }
//!     }
//!   ]
//! }
//! ```
//!
//! The document is fetched fresh on every call; nothing is cached.

use anyhow::Result;
use serde::Deserialize;
use tracing::debug;

use super::{PlatformDescriptor, PlatformId, ReleaseChannel, UpdateServer, http_client};
use crate::errors::CodeupError;

/// Publication time of a build.
///
/// The server has used both epoch milliseconds and ISO 8601 strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    EpochMillis(u64),
    Iso8601(String),
}

/// The newest build for one (channel, platform) pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub url: String,
    #[serde(default)]
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub product_version: String,
    /// Commit the build was produced from.
    #[serde(rename = "hash")]
    pub commit_hash: String,
    pub timestamp: Option<Timestamp>,
    #[serde(rename = "sha256hash", default)]
    pub sha256: String,
    #[serde(default)]
    pub supports_fast_update: bool,
    pub build: ReleaseChannel,
    pub platform: PlatformDescriptor,
}

/// Top-level shape of the metadata document.
#[derive(Debug, Deserialize)]
struct VersionsDocument {
    products: Vec<serde_json::Value>,
}

/// Parses a metadata document body.
///
/// # Errors
///
/// Returns `MalformedResponse` if the body is not the expected JSON.
pub fn parse_versions(url: &str, body: &[u8]) -> Result<Vec<VersionRecord>, CodeupError> {
    let document: VersionsDocument =
        serde_json::from_slice(body).map_err(|e| CodeupError::malformed_response(url, e))?;

    let mut records = Vec::with_capacity(document.products.len());
    for product in document.products {
        if let Some(build) = product.get("build").and_then(serde_json::Value::as_str)
            && ReleaseChannel::from_server_value(build).is_none()
        {
            debug!(build, "skipping record for unknown channel");
            continue;
        }
        let record = serde_json::from_value(product)
            .map_err(|e| CodeupError::malformed_response(url, e))?;
        records.push(record);
    }
    Ok(records)
}

/// Fetches the version metadata, optionally narrowed to one channel.
///
/// Issues exactly one GET and buffers the whole body. There is no retry.
///
/// # Errors
///
/// Returns `NetworkError` on transport failure or a non-success status, and
/// `MalformedResponse` if the body cannot be parsed.
pub async fn fetch_versions(
    server: &UpdateServer,
    channel: Option<ReleaseChannel>,
) -> Result<Vec<VersionRecord>> {
    let url = server.versions_url(channel);
    debug!(%url, "fetching version metadata");

    let client = http_client()?;
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| CodeupError::network_with_source(format!("Failed to connect to {url}"), e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(CodeupError::network(format!("HTTP {status} for {url}")).into());
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| CodeupError::network_with_source(format!("Failed to read {url}"), e))?;

    let records = parse_versions(&url, &body)?;
    debug!(count = records.len(), "parsed version metadata");
    Ok(records)
}

/// Returns the record for `platform` on `channel`, if one is published.
///
/// At most one record is returned; if the server ever lists duplicates the
/// first one wins.
#[must_use]
pub fn find_for_platform(
    records: &[VersionRecord],
    channel: ReleaseChannel,
    platform: PlatformId,
) -> Option<&VersionRecord> {
    records
        .iter()
        .find(|r| r.build == channel && r.platform.id() == Some(platform))
}

/// Fetches the metadata and returns the newest record for one pair.
///
/// # Errors
///
/// Fails like [`fetch_versions`], or with `NetworkError` when the server
/// publishes nothing for the pair.
pub async fn latest_for_platform(
    server: &UpdateServer,
    channel: ReleaseChannel,
    platform: PlatformId,
) -> Result<VersionRecord> {
    let records = fetch_versions(server, Some(channel)).await?;
    find_for_platform(&records, channel, platform)
        .cloned()
        .ok_or_else(|| {
            CodeupError::network(format!("No {channel} version found for {platform}")).into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn record_json(build: &str, os: &str, hash: &str) -> String {
        format!(
            r#"{{
                "url": "https://update.example/{os}/{build}",
                "name": "1.85.0",
                "version": "{hash}",
                "productVersion": "1.85.0",
                "hash": "{hash}",
                "timestamp": 1701902211415,
                "sha256hash": "abc",
                "supportsFastUpdate": true,
                "build": "{build}",
                "platform": {{ "os": "{os}", "prettyname": "{os}" }}
            }}"#
        )
    }

    fn document(records: &[String]) -> String {
        format!(r#"{{"products": [{}]}}"#, records.join(","))
    }

    #[test]
    fn parses_products_array() {
        let body = document(&[
            record_json("stable", "linux-x64", "aaa"),
            record_json("insider", "darwin-universal", "bbb"),
        ]);
        let records = parse_versions("test", body.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].build, ReleaseChannel::Stable);
        assert_eq!(records[0].commit_hash, "aaa");
        assert_eq!(records[0].product_version, "1.85.0");
        assert_eq!(records[0].timestamp, Some(Timestamp::EpochMillis(1_701_902_211_415)));
        assert!(records[0].supports_fast_update);
        assert_eq!(records[1].build, ReleaseChannel::Insiders);
        assert_eq!(records[1].platform.id(), Some(PlatformId::DarwinUniversal));
    }

    #[test]
    fn accepts_iso_timestamps() {
        let body = record_json("stable", "linux-x64", "aaa")
            .replace("1701902211415", "\"2023-12-06T22:36:51.415Z\"");
        let records = parse_versions("test", document(&[body]).as_bytes()).unwrap();
        assert_eq!(
            records[0].timestamp,
            Some(Timestamp::Iso8601("2023-12-06T22:36:51.415Z".to_string()))
        );
    }

    #[test]
    fn malformed_body_is_reported() {
        let err = parse_versions("http://x/sha", b"<html>oops</html>").unwrap_err();
        assert!(matches!(err, CodeupError::MalformedResponse { .. }));

        let err = parse_versions("http://x/sha", br#"{"items": []}"#).unwrap_err();
        assert!(matches!(err, CodeupError::MalformedResponse { .. }));
    }

    #[test]
    fn records_for_unknown_channels_are_skipped() {
        let body = document(&[
            record_json("exploration", "linux-x64", "xxx"),
            record_json("stable", "linux-x64", "aaa"),
        ]);
        let records = parse_versions("test", body.as_bytes()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].commit_hash, "aaa");
    }

    #[test]
    fn record_without_hash_is_malformed() {
        let record = record_json("stable", "linux-x64", "aaa").replace(r#""hash""#, r#""commit""#);
        let body = document(&[record]);
        let err = parse_versions("test", body.as_bytes()).unwrap_err();
        assert!(matches!(err, CodeupError::MalformedResponse { .. }));
    }

    #[test]
    fn platform_filter_returns_at_most_one_record() {
        let body = document(&[
            record_json("stable", "linux-x64", "first"),
            record_json("stable", "linux-deb-x64", "deb"),
            record_json("stable", "linux-x64", "duplicate"),
            record_json("insider", "linux-x64", "insider"),
            record_json("stable", "darwin-universal", "mac"),
        ]);
        let records = parse_versions("test", body.as_bytes()).unwrap();

        let found = find_for_platform(&records, ReleaseChannel::Stable, PlatformId::LinuxX64)
            .expect("stable linux-x64 record");
        assert_eq!(found.commit_hash, "first");

        let insider = find_for_platform(&records, ReleaseChannel::Insiders, PlatformId::LinuxX64)
            .expect("insider linux-x64 record");
        assert_eq!(insider.commit_hash, "insider");

        assert!(
            find_for_platform(&records, ReleaseChannel::Stable, PlatformId::LinuxArm64).is_none()
        );
    }

    #[tokio::test]
    async fn fetch_versions_sends_channel_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/sha")
            .match_query(mockito::Matcher::UrlEncoded("build".into(), "insider".into()))
            .with_status(200)
            .with_body(document(&[record_json("insider", "linux-x64", "ccc")]))
            .expect(1)
            .create_async()
            .await;

        let update_server = UpdateServer::new(server.url());
        let records = fetch_versions(&update_server, Some(ReleaseChannel::Insiders))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].commit_hash, "ccc");
    }

    #[tokio::test]
    async fn fetch_versions_fails_on_error_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/sha")
            .with_status(503)
            .create_async()
            .await;

        let err = fetch_versions(&UpdateServer::new(server.url()), None)
            .await
            .unwrap_err();
        let err = err.downcast_ref::<CodeupError>().expect("typed error");
        assert!(matches!(err, CodeupError::NetworkError { .. }));
    }

    #[tokio::test]
    async fn fetch_versions_fails_on_unparsable_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/sha")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = fetch_versions(&UpdateServer::new(server.url()), None)
            .await
            .unwrap_err();
        let err = err.downcast_ref::<CodeupError>().expect("typed error");
        assert!(matches!(err, CodeupError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn fetch_versions_reports_unreachable_server() {
        let err = fetch_versions(&UpdateServer::new("http://127.0.0.1:1"), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to connect to http://127.0.0.1:1/sha"));
    }

    #[tokio::test]
    async fn latest_for_platform_reports_missing_pair() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/sha")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(document(&[record_json("stable", "linux-x64", "aaa")]))
            .create_async()
            .await;

        let err = latest_for_platform(
            &UpdateServer::new(server.url()),
            ReleaseChannel::Stable,
            PlatformId::LinuxArm64,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("No stable version found for linux-arm64"));
    }
}
