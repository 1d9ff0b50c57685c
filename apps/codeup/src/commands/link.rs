//! Link action.
//!
//! Puts `code` (or `code-insiders`) on the `PATH` by symlinking the launcher
//! shipped in `{install}/bin` into a directory such as `/usr/bin`. Windows
//! installs need no link.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use crate::args::ActionSelector;
use crate::errors::CodeupError;
use crate::install::{InstallTarget, default_symlink_dir, ensure_dir, ensure_writable, link_binary};
use crate::release::{HostOs, ReleaseChannel};

/// Arguments for the link action.
#[derive(Parser, Debug)]
#[command(name = "codeup", disable_help_flag = true, disable_version_flag = true)]
pub struct LinkArgs {
    /// The build to link. Can either be stable or insiders
    #[clap(long, short = 'b', default_value = "stable", value_parser = ReleaseChannel::from_str)]
    pub build: ReleaseChannel,

    /// The directory to link from. Defaults to the install directory of the
    /// build
    #[clap(long, short = 'd')]
    pub install_directory: Option<PathBuf>,

    /// The directory to link to. Defaults to /usr/bin on Linux and ~/bin
    /// elsewhere
    #[clap(long, short = 's')]
    pub symlink_directory: Option<PathBuf>,

    #[command(flatten)]
    pub selector: ActionSelector,
}

/// Executes the link action.
///
/// # Errors
///
/// Returns an error if the install or symlink directory is missing, the
/// launcher is not installed, or the link cannot be created.
pub fn execute(args: &LinkArgs) -> Result<()> {
    let host = HostOs::detect()?;
    if host == HostOs::Windows {
        println!("Link not needed on Windows");
        return Ok(());
    }

    let symlink_dir = match &args.symlink_directory {
        Some(dir) => dir.clone(),
        None => default_symlink_dir(host)?,
    };
    let target = InstallTarget::resolve(args.install_directory.clone(), args.build, host)?;
    let link = link_into(&target, args.build, &symlink_dir)?;

    println!(
        "Linked {} -> {}",
        link.display(),
        target.binary(args.build).display()
    );
    Ok(())
}

/// Links the launcher of `target` into `symlink_dir` and returns the link
/// path.
///
/// # Errors
///
/// See [`execute`].
pub fn link_into(
    target: &InstallTarget,
    channel: ReleaseChannel,
    symlink_dir: &Path,
) -> Result<PathBuf> {
    ensure_dir(&target.bin_dir())?;
    let source = target.binary(channel);
    if !source.is_file() {
        return Err(CodeupError::filesystem("Launcher not found", source).into());
    }

    ensure_dir(symlink_dir)?;
    ensure_writable(symlink_dir)?;

    let link = symlink_dir.join(channel.binary_name());
    debug!(source = %source.display(), link = %link.display(), "linking");
    link_binary(&source, &link)?;

    Ok(link)
}
