//! Install action.
//!
//! Unpacks a previously downloaded archive into the install directory.
//!
//! ## Usage
//!
//! ```bash
//! sudo codeup --install -f downloads/vscode-stable-linux-x64-1700000000000.tar.gz
//! codeup -a install -f code.zip -i -d "$HOME/vscode-insiders"
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::args::ActionSelector;
use crate::errors::CodeupError;
use crate::install::{InstallTarget, ensure_writable, extract_archive};
use crate::release::{HostOs, ReleaseChannel};

/// Arguments for the install action.
#[derive(Parser, Debug)]
#[command(name = "codeup", disable_help_flag = true, disable_version_flag = true)]
pub struct InstallArgs {
    /// The file to install from
    #[clap(long, short = 'f', required = true)]
    pub file: PathBuf,

    /// Install as insiders build (this option overrides --build or -b)
    #[clap(long, short = 'i')]
    pub insiders: bool,

    /// Install as stable build (this option overrides --build or -b)
    #[clap(long, short = 's')]
    pub stable: bool,

    /// The build to install. Can either be stable or insiders
    #[clap(long, short = 'b', default_value = "stable", value_parser = ReleaseChannel::from_str)]
    pub build: ReleaseChannel,

    /// The directory to install to. Defaults to /usr/share/code[-insiders] on
    /// Linux, ~/Applications/Visual Studio Code[ - Insiders] on macOS and
    /// %LOCALAPPDATA%\Programs\Microsoft VS Code[ Insiders] on Windows
    #[clap(long, short = 'd')]
    pub install_directory: Option<PathBuf>,

    #[command(flatten)]
    pub selector: ActionSelector,
}

impl InstallArgs {
    /// `--insiders` beats `--stable`, which beats `--build`.
    #[must_use]
    pub fn channel(&self) -> ReleaseChannel {
        if self.insiders {
            ReleaseChannel::Insiders
        } else if self.stable {
            ReleaseChannel::Stable
        } else {
            self.build
        }
    }
}

/// Executes the install action.
///
/// # Errors
///
/// Returns an error if the archive does not exist, the install directory
/// cannot be created or written, or extraction fails.
pub fn execute(args: &InstallArgs) -> Result<()> {
    if !args.file.is_file() {
        return Err(CodeupError::filesystem("File does not exist", &args.file).into());
    }

    let channel = args.channel();
    let host = HostOs::detect()?;
    let target = InstallTarget::resolve(args.install_directory.clone(), channel, host)?;

    install_archive(&args.file, &target, host)?;
    println!(
        "Installed {} build to {}",
        channel.title(),
        target.directory().display()
    );

    Ok(())
}

/// Creates the install directory and extracts `archive` into it.
///
/// On Linux the directory must be writable by the current user; the usual
/// fix is to rerun with `sudo`.
///
/// # Errors
///
/// See [`execute`].
pub fn install_archive(archive: &Path, target: &InstallTarget, host: HostOs) -> Result<()> {
    let dir = target.directory();

    if let Err(e) = std::fs::create_dir_all(dir) {
        if host == HostOs::Linux && e.kind() == std::io::ErrorKind::PermissionDenied {
            return Err(CodeupError::filesystem(
                "Directory is not writable, please run as root (sudo)",
                dir,
            )
            .into());
        }
        return Err(e).with_context(|| format!("Failed to create directory: {}", dir.display()));
    }
    if host == HostOs::Linux {
        ensure_writable(dir)?;
    }

    info!(archive = %archive.display(), dir = %dir.display(), "installing");
    extract_archive(archive, dir, host)
}
