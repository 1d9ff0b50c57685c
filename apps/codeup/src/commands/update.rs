//! Update action.
//!
//! Compares the commit of the installed build with the newest published
//! build and reinstalls when they differ. Only Linux installs are managed
//! this way; on other hosts the application updates itself.
//!
//! ## Process
//!
//! 1. Check the install directory and its `bin/` exist and are writable
//! 2. Probe the installed commit
//! 3. Fetch the newest record for this host and channel
//! 4. If the commits differ: download, verify SHA-256, extract

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use super::install::install_archive;
use crate::args::ActionSelector;
use crate::install::{InstallTarget, ensure_dir, ensure_writable, installed_commit};
use crate::release::{
    DownloadRequest, HostOs, PlatformId, ReleaseChannel, UpdateServer, VersionRecord, download,
    latest_for_platform, verify_sha256,
};

/// Arguments for the update action.
#[derive(Parser, Debug)]
#[command(name = "codeup", disable_help_flag = true, disable_version_flag = true)]
pub struct UpdateArgs {
    /// The build to update. Can either be stable or insiders
    #[clap(long, short = 'b', default_value = "stable", value_parser = ReleaseChannel::from_str)]
    pub build: ReleaseChannel,

    /// The directory to update. Defaults to /usr/share/code[-insiders]
    #[clap(long, short = 'd')]
    pub install_directory: Option<PathBuf>,

    #[command(flatten)]
    pub selector: ActionSelector,
}

/// Result of a completed update run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The installed commit already matches the newest build.
    UpToDate { commit: String },
    /// The installation was replaced.
    Updated { from: String, to: String },
}

/// Executes the update action.
///
/// # Errors
///
/// Returns an error if the installation is missing or not writable, the
/// installed version cannot be determined, or the download, checksum or
/// extraction fails.
pub async fn execute(args: &UpdateArgs) -> Result<()> {
    let host = HostOs::detect()?;
    if host != HostOs::Linux {
        println!("Update is only supported on Linux; use the built-in updater instead");
        return Ok(());
    }

    let target = InstallTarget::resolve(args.install_directory.clone(), args.build, host)?;
    update_installation(
        &UpdateServer::from_env(),
        &target,
        args.build,
        PlatformId::detect()?,
        None,
    )
    .await?;

    Ok(())
}

/// Brings the installation at `target` up to the newest `platform` build.
///
/// Downloads go to `downloads`, or `./downloads` when unset. The archive
/// is only extracted after its checksum matches.
///
/// # Errors
///
/// See [`execute`].
pub async fn update_installation(
    server: &UpdateServer,
    target: &InstallTarget,
    channel: ReleaseChannel,
    platform: PlatformId,
    downloads: Option<PathBuf>,
) -> Result<UpdateOutcome> {
    for dir in [target.directory().to_path_buf(), target.bin_dir()] {
        ensure_dir(&dir)?;
        ensure_writable(&dir)?;
    }

    let current = installed_commit(target, channel)
        .context("Cannot determine the installed version")?;
    let latest = latest_for_platform(server, channel, platform).await?;

    println!("Latest {} Version: {}", channel.title(), latest.commit_hash);
    println!("Current {} Version: {current}", channel.title());

    if !needs_update(&current, &latest) {
        println!("Already up to date: {current}");
        return Ok(UpdateOutcome::UpToDate { commit: current });
    }

    let request = DownloadRequest::new(channel, platform).directory(downloads);
    let archive = download(server, &request).await?;

    if latest.sha256.is_empty() {
        warn!(archive = %archive.display(), "no checksum published, skipping verification");
    } else {
        verify_sha256(&archive, &latest.sha256)?;
    }

    info!(from = %current, to = %latest.commit_hash, "replacing installation");
    install_archive(&archive, target, platform.os())?;
    println!("Updated {} to {}", channel.title(), latest.commit_hash);

    Ok(UpdateOutcome::Updated {
        from: current,
        to: latest.commit_hash,
    })
}

/// The installed build is stale when its commit differs from the newest
/// published one.
#[must_use]
pub fn needs_update(installed_commit: &str, latest: &VersionRecord) -> bool {
    !installed_commit
        .trim()
        .eq_ignore_ascii_case(latest.commit_hash.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CodeupError;
    use crate::release::PlatformDescriptor;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use mockito::{Matcher, Server, ServerGuard};
    use serial_test::serial;
    use sha2::{Digest, Sha256};

    fn record(hash: &str) -> VersionRecord {
        VersionRecord {
            url: "https://update.example/linux-x64".into(),
            name: "1.85.0".into(),
            version: hash.into(),
            product_version: "1.85.0".into(),
            commit_hash: hash.into(),
            timestamp: None,
            sha256: String::new(),
            supports_fast_update: false,
            build: ReleaseChannel::Stable,
            platform: PlatformDescriptor::from(PlatformId::LinuxX64),
        }
    }

    #[test]
    fn same_commit_is_up_to_date() {
        assert!(!needs_update("abc123", &record("abc123")));
        assert!(!needs_update("ABC123\n", &record("abc123")));
    }

    #[test]
    fn different_commit_needs_update() {
        assert!(needs_update("abc123", &record("def456")));
    }

    #[test]
    fn build_is_validated_while_parsing() {
        let err =
            crate::args::parse_action_args::<UpdateArgs, _, _>(["codeup", "-a", "update", "-b", "x"])
                .unwrap_err();
        assert!(err.to_string().contains("invalid build: x"));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn missing_install_directory_fails_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let args = UpdateArgs {
            build: ReleaseChannel::Stable,
            install_directory: Some(dir.path().join("absent")),
            selector: ActionSelector::default(),
        };

        let err = execute(&args).await.unwrap_err();
        assert!(err.to_string().contains("Directory does not exist"));
    }

    /// Install directory whose `bin/code` reports `commit` like a real
    /// stable launcher.
    #[cfg(unix)]
    fn fake_install(commit: &str) -> tempfile::TempDir {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let target = InstallTarget::new(dir.path());
        std::fs::create_dir_all(target.bin_dir()).unwrap();
        let launcher = target.binary(ReleaseChannel::Stable);
        std::fs::write(
            &launcher,
            format!("#!/bin/sh\necho 1.85.0\necho {commit}\necho x64\n"),
        )
        .unwrap();
        std::fs::set_permissions(&launcher, std::fs::Permissions::from_mode(0o755)).unwrap();
        dir
    }

    /// A Linux release archive carrying a new `product.json`.
    fn release_tar_gz(commit: &str) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        let data = format!(r#"{{"commit":"{commit}"}}"#);
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(
                &mut header,
                "VSCode-linux-x64/resources/app/product.json",
                data.as_bytes(),
            )
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn metadata_body(platform: PlatformId, hash: &str, sha256: &str) -> String {
        format!(
            r#"{{"products":[{{"url":"u","name":"1.86.0","version":"{hash}","productVersion":"1.86.0","hash":"{hash}","timestamp":1,"sha256hash":"{sha256}","supportsFastUpdate":true,"build":"stable","platform":{{"os":"{platform}","prettyname":"{platform}"}}}}]}}"#
        )
    }

    async fn mock_metadata(
        server: &mut ServerGuard,
        platform: PlatformId,
        hash: &str,
        sha256: &str,
    ) {
        server
            .mock("GET", "/sha")
            .match_query(Matcher::UrlEncoded("build".into(), "stable".into()))
            .with_status(200)
            .with_body(metadata_body(platform, hash, sha256))
            .create_async()
            .await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn matching_commit_downloads_nothing() {
        let install = fake_install("cafe");
        let downloads = tempfile::tempdir().unwrap();
        let mut server = Server::new_async().await;
        mock_metadata(&mut server, PlatformId::LinuxX64, "CAFE", "").await;
        let asset = server
            .mock("GET", "/sha/download")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let outcome = update_installation(
            &UpdateServer::new(server.url()),
            &InstallTarget::new(install.path()),
            ReleaseChannel::Stable,
            PlatformId::LinuxX64,
            Some(downloads.path().join("dl")),
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            UpdateOutcome::UpToDate {
                commit: "cafe".into()
            }
        );
        asset.assert_async().await;
        assert!(!downloads.path().join("dl").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stale_install_is_downloaded_verified_and_extracted() {
        let install = fake_install("old");
        let downloads = tempfile::tempdir().unwrap();
        let archive = release_tar_gz("new");
        let digest = hex::encode(Sha256::digest(&archive));

        let mut server = Server::new_async().await;
        mock_metadata(&mut server, PlatformId::LinuxX64, "new", &digest).await;
        let asset = server
            .mock("GET", "/sha/download")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("build".into(), "stable".into()),
                Matcher::UrlEncoded("os".into(), "linux-x64".into()),
            ]))
            .with_status(200)
            .with_body(archive)
            .expect(1)
            .create_async()
            .await;

        let target = InstallTarget::new(install.path());
        let outcome = update_installation(
            &UpdateServer::new(server.url()),
            &target,
            ReleaseChannel::Stable,
            PlatformId::LinuxX64,
            Some(downloads.path().to_path_buf()),
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            UpdateOutcome::Updated {
                from: "old".into(),
                to: "new".into()
            }
        );
        asset.assert_async().await;
        assert_eq!(
            std::fs::read_to_string(target.product_json()).unwrap(),
            r#"{"commit":"new"}"#
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn checksum_mismatch_installs_nothing() {
        let install = fake_install("old");
        let downloads = tempfile::tempdir().unwrap();
        let mut server = Server::new_async().await;
        mock_metadata(&mut server, PlatformId::LinuxX64, "new", &"0".repeat(64)).await;
        server
            .mock("GET", "/sha/download")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(release_tar_gz("new"))
            .create_async()
            .await;

        let target = InstallTarget::new(install.path());
        let err = update_installation(
            &UpdateServer::new(server.url()),
            &target,
            ReleaseChannel::Stable,
            PlatformId::LinuxX64,
            Some(downloads.path().to_path_buf()),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<CodeupError>(),
            Some(CodeupError::ChecksumMismatch { .. })
        ));
        assert!(!target.product_json().exists());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    #[serial]
    async fn execute_uses_configured_update_server() {
        let install = fake_install("cafe");
        let platform = PlatformId::detect().unwrap();
        let mut server = Server::new_async().await;
        mock_metadata(&mut server, platform, "cafe", "").await;

        // SAFETY: serialized with other env-mutating tests.
        unsafe { std::env::set_var("CODEUP_UPDATE_SERVER", server.url()) };
        let args = UpdateArgs {
            build: ReleaseChannel::Stable,
            install_directory: Some(install.path().to_path_buf()),
            selector: ActionSelector::default(),
        };
        let result = execute(&args).await;
        unsafe { std::env::remove_var("CODEUP_UPDATE_SERVER") };

        result.unwrap();
    }
}
