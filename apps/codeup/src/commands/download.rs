//! Download action.
//!
//! Fetches the newest build of one channel for one platform into a local
//! directory and prints where it landed.
//!
//! ## Usage
//!
//! ```bash
//! codeup                                   # stable build for this host into ./downloads
//! codeup --download -b insiders -d /tmp    # insiders build into /tmp
//! codeup -a download -p darwin-universal   # a build for another platform
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use clap::Parser;

use crate::args::ActionSelector;
use crate::release::{DownloadRequest, PlatformId, ReleaseChannel, UpdateServer, download};

/// Arguments for the download action.
#[derive(Parser, Debug)]
#[command(name = "codeup", disable_help_flag = true, disable_version_flag = true)]
pub struct DownloadArgs {
    /// The build to download. Can either be stable or insiders
    #[clap(long, short = 'b', default_value = "stable", value_parser = ReleaseChannel::from_str)]
    pub build: ReleaseChannel,

    /// The filename to download to. Defaults to
    /// vscode-{build}-{platform}-{timestamp}.{tar.gz or zip}
    #[clap(long, short = 'f')]
    pub filename: Option<String>,

    /// The directory the file will be downloaded to. Defaults to downloads/
    /// in the current directory
    #[clap(long, short = 'd')]
    pub download_directory: Option<PathBuf>,

    /// The platform to download for. Defaults to the current host
    #[clap(long, short = 'p', value_parser = PlatformId::from_str)]
    pub platform: Option<PlatformId>,

    #[command(flatten)]
    pub selector: ActionSelector,
}

/// Executes the download action.
///
/// # Errors
///
/// Returns an error if the host platform is unsupported (and none was
/// given), or the download fails.
pub async fn execute(args: &DownloadArgs) -> Result<()> {
    let platform = match args.platform {
        Some(platform) => platform,
        None => PlatformId::detect()?,
    };

    let request = DownloadRequest::new(args.build, platform)
        .directory(args.download_directory.clone())
        .filename(args.filename.clone());

    let path = download(&UpdateServer::from_env(), &request).await?;
    println!("{}", path.display());

    Ok(())
}
