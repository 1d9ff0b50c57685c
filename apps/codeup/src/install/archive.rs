//! Archive extraction.
//!
//! Linux builds ship as `.tar.gz` with everything under a single top-level
//! folder (`VSCode-linux-x64/`), which is stripped. Windows and macOS builds
//! ship as `.zip` and are extracted as-is.

use std::io::Read;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;
use tracing::debug;

use crate::errors::CodeupError;
use crate::release::HostOs;

/// Supported archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    Zip,
}

impl ArchiveKind {
    /// Guesses the format from the file name, if it has a known extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    /// Format the update server publishes for `os`.
    #[must_use]
    pub fn for_host(os: HostOs) -> Self {
        match os {
            HostOs::Linux => Self::TarGz,
            HostOs::Windows | HostOs::MacOs => Self::Zip,
        }
    }
}

/// Extracts `archive_path` into `dest_dir`, choosing the format from the
/// extension and falling back to the host's native format.
///
/// # Errors
///
/// Returns an error if the archive is unreadable, contains an entry that
/// would land outside `dest_dir`, or a file cannot be written.
pub fn extract_archive(archive_path: &Path, dest_dir: &Path, host: HostOs) -> Result<()> {
    let kind = ArchiveKind::from_path(archive_path).unwrap_or_else(|| ArchiveKind::for_host(host));
    debug!(archive = %archive_path.display(), ?kind, dest = %dest_dir.display(), "extracting");

    match kind {
        ArchiveKind::TarGz => extract_tar_gz(archive_path, dest_dir),
        ArchiveKind::Zip => extract_zip(archive_path, dest_dir),
    }
}

/// Extracts a tar.gz archive, dropping the first path component of every
/// entry. Entries with nothing left after stripping are skipped.
///
/// # Errors
///
/// See [`extract_archive`].
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    let file = std::fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);

    for entry in archive
        .entries()
        .with_context(|| format!("Failed to read tar entries: {}", archive_path.display()))?
    {
        let mut entry = entry
            .with_context(|| format!("Failed to read tar entry: {}", archive_path.display()))?;

        let entry_path = entry
            .path()
            .with_context(|| "Failed to get entry path")?
            .into_owned();
        let entry_path = contained(&entry_path, dest_dir)?;

        let relative = strip_first_component(&entry_path);
        if relative.as_os_str().is_empty() {
            continue;
        }
        reject_link_ancestors(&relative, dest_dir)?;
        let output_path = dest_dir.join(&relative);
        let entry_type = entry.header().entry_type();

        if entry_type.is_dir() {
            std::fs::create_dir_all(&output_path).with_context(|| {
                format!("Failed to create directory: {}", output_path.display())
            })?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        if entry_type.is_symlink() || entry_type.is_hard_link() {
            let target = entry
                .link_name()
                .with_context(|| format!("Failed to read link target: {}", relative.display()))?
                .with_context(|| format!("Missing link target: {}", relative.display()))?
                .into_owned();

            if entry_type.is_hard_link() {
                let source = strip_first_component(&contained(&target, dest_dir)?);
                reject_link_ancestors(&source, dest_dir)?;
                remove_existing(&output_path)?;
                std::fs::hard_link(dest_dir.join(&source), &output_path)
                    .with_context(|| format!("Failed to create link: {}", output_path.display()))?;
                continue;
            }
            check_link_target(&relative, &target, dest_dir)?;
        }

        entry
            .unpack(&output_path)
            .with_context(|| format!("Failed to extract: {}", output_path.display()))?;
    }

    Ok(())
}

/// Extracts a zip archive without stripping, overwriting existing files.
///
/// On Unix, stored permission bits are applied and symlink entries are
/// recreated as symlinks.
///
/// # Errors
///
/// See [`extract_archive`].
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = std::fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to read ZIP archive: {}", archive_path.display()))?;

    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read archive entry {i}"))?;

        let enclosed = entry
            .enclosed_name()
            .ok_or_else(|| escape_error(Path::new(entry.name()), dest_dir))?;
        let relative = contained(&enclosed, dest_dir)?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        reject_link_ancestors(&relative, dest_dir)?;
        let output_path = dest_dir.join(&relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&output_path).with_context(|| {
                format!("Failed to create directory: {}", output_path.display())
            })?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        if entry.is_symlink() {
            extract_symlink(&mut entry, &relative, dest_dir)?;
            continue;
        }

        remove_existing_link(&output_path)?;
        let mut outfile = std::fs::File::create(&output_path)
            .with_context(|| format!("Failed to create file: {}", output_path.display()))?;
        std::io::copy(&mut entry, &mut outfile)
            .with_context(|| format!("Failed to extract: {}", output_path.display()))?;

        if let Some(mode) = entry.unix_mode() {
            apply_mode(&output_path, mode)?;
        }
    }

    Ok(())
}

/// Recreates a zip symlink entry, whose data is the link target.
#[cfg(unix)]
fn extract_symlink(entry: &mut impl Read, relative: &Path, dest_dir: &Path) -> Result<()> {
    let output_path = dest_dir.join(relative);
    let mut target = String::new();
    entry
        .read_to_string(&mut target)
        .with_context(|| format!("Failed to read link target: {}", output_path.display()))?;
    check_link_target(relative, Path::new(&target), dest_dir)?;
    remove_existing(&output_path)?;
    std::os::unix::fs::symlink(&target, &output_path)
        .with_context(|| format!("Failed to create link: {}", output_path.display()))
}

#[cfg(not(unix))]
fn extract_symlink(entry: &mut impl Read, relative: &Path, dest_dir: &Path) -> Result<()> {
    let output_path = dest_dir.join(relative);
    let mut outfile = std::fs::File::create(&output_path)
        .with_context(|| format!("Failed to create file: {}", output_path.display()))?;
    std::io::copy(entry, &mut outfile)
        .with_context(|| format!("Failed to extract: {}", output_path.display()))?;
    Ok(())
}

/// Removes whatever is at `path`, if anything.
fn remove_existing(path: &Path) -> Result<()> {
    if path.symlink_metadata().is_ok() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to replace: {}", path.display()))?;
    }
    Ok(())
}

/// Removes a symlink at `path` so that writing a file there cannot follow it.
fn remove_existing_link(path: &Path) -> Result<()> {
    if is_symlink(path) {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to replace: {}", path.display()))?;
    }
    Ok(())
}

fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata()
        .is_ok_and(|meta| meta.file_type().is_symlink())
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o7777))
        .with_context(|| format!("Failed to set permissions: {}", path.display()))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn apply_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

fn strip_first_component(path: &Path) -> PathBuf {
    path.components().skip(1).collect()
}

fn escape_error(entry_path: &Path, dest_dir: &Path) -> CodeupError {
    CodeupError::filesystem(
        format!(
            "Refusing to extract {} outside of target directory",
            entry_path.display()
        ),
        dest_dir,
    )
}

/// Rejects entry paths that are absolute or climb out with `..`.
fn contained(entry_path: &Path, dest_dir: &Path) -> Result<PathBuf, CodeupError> {
    let escapes = entry_path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(escape_error(entry_path, dest_dir));
    }
    Ok(entry_path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect())
}

/// Rejects a link at `link` (relative to `dest_dir`) whose target is
/// absolute or, read from the link's own directory, climbs above `dest_dir`.
fn check_link_target(link: &Path, target: &Path, dest_dir: &Path) -> Result<(), CodeupError> {
    let base = link.parent().unwrap_or_else(|| Path::new(""));
    let mut depth = 0usize;
    for component in base.components().chain(target.components()) {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir if depth > 0 => depth -= 1,
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(CodeupError::filesystem(
                    format!(
                        "Refusing to link {} to {} outside of target directory",
                        link.display(),
                        target.display()
                    ),
                    dest_dir,
                ));
            }
        }
    }
    Ok(())
}

/// Fails if a directory between `dest_dir` and `relative` is a symlink.
///
/// Link targets are only checked lexically, so writes are never allowed to
/// pass through a link created by an earlier entry.
fn reject_link_ancestors(relative: &Path, dest_dir: &Path) -> Result<(), CodeupError> {
    let mut current = dest_dir.to_path_buf();
    let Some(parent) = relative.parent() else {
        return Ok(());
    };
    for component in parent.components() {
        current.push(component);
        if is_symlink(&current) {
            return Err(CodeupError::filesystem(
                format!(
                    "Refusing to extract {} through symlink",
                    relative.display()
                ),
                current,
            ));
        }
    }
    Ok(())
}
