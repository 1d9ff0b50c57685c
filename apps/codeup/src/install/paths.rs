//! Install and symlink locations.
//!
//! ## Default Locations
//!
//! | Host    | Install directory                                        |
//! |---------|----------------------------------------------------------|
//! | Windows | `%LOCALAPPDATA%\Programs\Microsoft VS Code[ Insiders]`    |
//! | macOS   | `~/Applications/Visual Studio Code[ - Insiders]`         |
//! | Linux   | `/usr/share/code[-insiders]`                             |
//!
//! The command-line symlink goes to `/usr/bin` on Linux and `~/bin`
//! elsewhere. Every default can be overridden from the command line.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::errors::CodeupError;
use crate::release::{HostOs, ReleaseChannel};

/// Linux install root; the channel decides the leaf name.
const LINUX_SHARE_DIR: &str = "/usr/share";

/// Linux symlink directory.
const LINUX_SYMLINK_DIR: &str = "/usr/bin";

/// A directory holding (or about to hold) an extracted build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    directory: PathBuf,
}

impl InstallTarget {
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Uses `directory` when given, otherwise the host default for `channel`.
    ///
    /// # Errors
    ///
    /// Returns an error if the default needs a home or local data directory
    /// that cannot be determined.
    pub fn resolve(
        directory: Option<PathBuf>,
        channel: ReleaseChannel,
        host: HostOs,
    ) -> Result<Self> {
        let directory = match directory {
            Some(directory) => directory,
            None => default_install_dir(channel, host)?,
        };
        debug!(dir = %directory.display(), "install directory");
        Ok(Self::new(directory))
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// `{directory}/bin`
    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.directory.join("bin")
    }

    /// `{directory}/bin/code[-insiders]`
    #[must_use]
    pub fn binary(&self, channel: ReleaseChannel) -> PathBuf {
        self.bin_dir().join(channel.binary_name())
    }

    /// `{directory}/resources/app/product.json`
    #[must_use]
    pub fn product_json(&self) -> PathBuf {
        self.directory
            .join("resources")
            .join("app")
            .join("product.json")
    }
}

/// Default install directory for `channel` on `host`.
///
/// # Errors
///
/// Returns an error if the home (macOS) or local data (Windows) directory
/// cannot be determined.
pub fn default_install_dir(channel: ReleaseChannel, host: HostOs) -> Result<PathBuf> {
    let insiders = channel == ReleaseChannel::Insiders;
    let dir = match host {
        HostOs::Windows => {
            let leaf = if insiders {
                "Microsoft VS Code Insiders"
            } else {
                "Microsoft VS Code"
            };
            dirs::data_local_dir()
                .context("Cannot determine the local application data directory")?
                .join("Programs")
                .join(leaf)
        }
        HostOs::MacOs => {
            let leaf = if insiders {
                "Visual Studio Code - Insiders"
            } else {
                "Visual Studio Code"
            };
            home_dir()?.join("Applications").join(leaf)
        }
        HostOs::Linux => Path::new(LINUX_SHARE_DIR).join(channel.binary_name()),
    };
    Ok(dir)
}

/// Default directory for the command-line symlink on `host`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn default_symlink_dir(host: HostOs) -> Result<PathBuf> {
    match host {
        HostOs::Linux => Ok(PathBuf::from(LINUX_SYMLINK_DIR)),
        HostOs::Windows | HostOs::MacOs => Ok(home_dir()?.join("bin")),
    }
}

fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("Cannot determine home directory")
}

/// Fails unless a file can be created in `dir`.
///
/// Probes by creating and immediately removing a temporary file, which
/// accounts for ACLs and read-only mounts that mode bits alone miss.
///
/// # Errors
///
/// Returns `FilesystemError` advising `sudo` when `dir` is not writable.
pub fn ensure_writable(dir: &Path) -> Result<(), CodeupError> {
    tempfile::Builder::new()
        .prefix(".codeup-write-test")
        .tempfile_in(dir)
        .map(drop)
        .map_err(|_| {
            CodeupError::filesystem("Directory is not writable, please run as root (sudo)", dir)
        })
}

/// Fails with `FilesystemError` unless `dir` exists and is a directory.
///
/// # Errors
///
/// See above.
pub fn ensure_dir(dir: &Path) -> Result<(), CodeupError> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(CodeupError::filesystem("Directory does not exist", dir))
    }
}

/// Points `link` at `source`.
///
/// An existing symlink at `link` is replaced. Anything else already there is
/// left alone and reported as an error.
///
/// # Errors
///
/// Returns `FilesystemError` if `link` is an existing regular file or
/// directory, or an I/O error if the link cannot be created.
pub fn link_binary(source: &Path, link: &Path) -> Result<()> {
    if let Ok(meta) = link.symlink_metadata() {
        if !meta.file_type().is_symlink() {
            return Err(CodeupError::filesystem("Refusing to replace existing file", link).into());
        }
        std::fs::remove_file(link)
            .with_context(|| format!("Failed to remove existing symlink: {}", link.display()))?;
        debug!(link = %link.display(), "replaced existing symlink");
    }

    create_link(source, link)
}

/// Creates a symbolic link (Unix) or the closest available equivalent
/// (Windows) from `source` to `link`.
fn create_link(source: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(source, link).with_context(|| {
            format!(
                "Failed to create symlink from {} to {}",
                link.display(),
                source.display()
            )
        })?;
    }

    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_file(source, link)
            .or_else(|_| std::fs::hard_link(source, link))
            .with_context(|| {
                format!(
                    "Failed to create link from {} to {}",
                    link.display(),
                    source.display()
                )
            })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linux_defaults() {
        assert_eq!(
            default_install_dir(ReleaseChannel::Stable, HostOs::Linux).unwrap(),
            PathBuf::from("/usr/share/code")
        );
        assert_eq!(
            default_install_dir(ReleaseChannel::Insiders, HostOs::Linux).unwrap(),
            PathBuf::from("/usr/share/code-insiders")
        );
        assert_eq!(
            default_symlink_dir(HostOs::Linux).unwrap(),
            PathBuf::from("/usr/bin")
        );
    }

    #[test]
    fn macos_defaults_live_under_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(
            default_install_dir(ReleaseChannel::Insiders, HostOs::MacOs).unwrap(),
            home.join("Applications").join("Visual Studio Code - Insiders")
        );
        assert_eq!(default_symlink_dir(HostOs::MacOs).unwrap(), home.join("bin"));
    }

    #[test]
    fn override_wins_over_default() {
        let target = InstallTarget::resolve(
            Some(PathBuf::from("/opt/vscode")),
            ReleaseChannel::Stable,
            HostOs::Linux,
        )
        .unwrap();
        assert_eq!(target.directory(), Path::new("/opt/vscode"));
        assert_eq!(target.bin_dir(), PathBuf::from("/opt/vscode/bin"));
        assert_eq!(
            target.binary(ReleaseChannel::Insiders),
            PathBuf::from("/opt/vscode/bin/code-insiders")
        );
        assert_eq!(
            target.product_json(),
            PathBuf::from("/opt/vscode/resources/app/product.json")
        );
    }

    #[test]
    fn writable_temp_dir_passes() {
        let dir = tempfile::tempdir().unwrap();
        ensure_writable(dir.path()).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_dir_is_not_writable() {
        let dir = tempfile::tempdir().unwrap();
        let err = ensure_writable(&dir.path().join("absent")).unwrap_err();
        assert!(err.to_string().contains("please run as root (sudo)"));
        assert!(ensure_dir(&dir.path().join("absent")).is_err());
        assert!(ensure_dir(dir.path()).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn link_replaces_existing_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old");
        let new = dir.path().join("new");
        std::fs::write(&old, b"old").unwrap();
        std::fs::write(&new, b"new").unwrap();
        let link = dir.path().join("code");
        std::os::unix::fs::symlink(&old, &link).unwrap();

        link_binary(&new, &link).unwrap();

        assert_eq!(std::fs::read_link(&link).unwrap(), new);
    }

    #[cfg(unix)]
    #[test]
    fn link_keeps_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        std::fs::write(&source, b"bin").unwrap();
        let link = dir.path().join("code");
        std::fs::write(&link, b"someone else's").unwrap();

        let err = link_binary(&source, &link).unwrap_err();
        assert!(err.to_string().contains("Refusing to replace existing file"));
        assert_eq!(std::fs::read(&link).unwrap(), b"someone else's");
    }
}
