//! Versions action.
//!
//! Prints the newest published commit and the installed commit for each
//! selected channel.
//!
//! ## Output Format
//!
//! ```text
//! Latest Stable Version: 0ee08df0cf4527e40edc9aa28f4b5bd38bbff2b2
//! Current Stable Version: 0ee08df0cf4527e40edc9aa28f4b5bd38bbff2b2
//! Latest Insiders Version: 8b617bd08fd9e3fc94d14adb8d358b56e3f72314
//! Current Insiders Version: not installed
//! ```

use std::str::FromStr;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use crate::args::ActionSelector;
use crate::install::{InstallTarget, installed_commit};
use crate::release::{
    ChannelFilter, HostOs, PlatformId, ReleaseChannel, UpdateServer, VersionRecord,
    fetch_versions, find_for_platform,
};

/// Shown when no build of a channel is found locally.
const NOT_INSTALLED: &str = "not installed";

/// Shown when the server publishes nothing for this host.
const UNAVAILABLE: &str = "unavailable";

/// Arguments for the versions action.
#[derive(Parser, Debug)]
#[command(name = "codeup", disable_help_flag = true, disable_version_flag = true)]
pub struct VersionsArgs {
    /// The build to get versions for. Can either be stable, insiders, or all
    #[clap(long, short = 'b', default_value = "all", value_parser = ChannelFilter::from_str)]
    pub build: ChannelFilter,

    #[command(flatten)]
    pub selector: ActionSelector,
}

/// Executes the versions action.
///
/// # Errors
///
/// Returns an error if the host platform is unsupported or the metadata
/// cannot be fetched. A missing local install is reported, not an error.
pub async fn execute(args: &VersionsArgs) -> Result<()> {
    let host = HostOs::detect()?;
    let platform = PlatformId::detect()?;

    let query = match args.build {
        ChannelFilter::Only(channel) => Some(channel),
        ChannelFilter::All => None,
    };
    let records = fetch_versions(&UpdateServer::from_env(), query).await?;

    for channel in args.build.channels() {
        let current = probe_current(channel, host);
        for line in report(&records, channel, platform, current.as_deref()) {
            println!("{line}");
        }
    }

    Ok(())
}

/// Any failure to find or run the installed build counts as not installed.
fn probe_current(channel: ReleaseChannel, host: HostOs) -> Option<String> {
    let probed = InstallTarget::resolve(None, channel, host)
        .and_then(|target| installed_commit(&target, channel));
    match probed {
        Ok(commit) => Some(commit),
        Err(e) => {
            debug!(%channel, error = %e, "no installed build found");
            None
        }
    }
}

/// Formats the two report lines for one channel.
#[must_use]
pub fn report(
    records: &[VersionRecord],
    channel: ReleaseChannel,
    platform: PlatformId,
    current: Option<&str>,
) -> [String; 2] {
    let latest = find_for_platform(records, channel, platform)
        .map_or(UNAVAILABLE, |record| record.commit_hash.as_str());
    [
        format!("Latest {} Version: {latest}", channel.title()),
        format!(
            "Current {} Version: {}",
            channel.title(),
            current.unwrap_or(NOT_INSTALLED)
        ),
    ]
}
