//! Installed-version discovery.
//!
//! Stable builds report their commit on the second line of
//! `code --version`:
//!
//! ```text
//! 1.85.0
//! 0ee08df0cf4527e40edc9aa28f4b5bd38bbff2b2
//! x64
//! ```
//!
//! Insiders builds are read from `resources/app/product.json` instead, since
//! running the insiders launcher may start the application.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use super::paths::InstallTarget;
use crate::errors::CodeupError;
use crate::release::ReleaseChannel;

#[derive(Debug, Deserialize)]
struct ProductJson {
    commit: String,
}

/// Returns the commit hash of the build installed at `target`.
///
/// # Errors
///
/// Returns an error if no build is found or its version cannot be read.
pub fn installed_commit(target: &InstallTarget, channel: ReleaseChannel) -> Result<String> {
    match channel {
        ReleaseChannel::Stable => {
            let binary = locate_binary(target, channel)?;
            commit_from_binary(&binary)
        }
        ReleaseChannel::Insiders => commit_from_product_json(&target.product_json()),
    }
}

/// Prefers the launcher inside `target`, then whatever is on `PATH`.
fn locate_binary(target: &InstallTarget, channel: ReleaseChannel) -> Result<PathBuf> {
    let local = target.binary(channel);
    if local.is_file() {
        return Ok(local);
    }
    which::which(channel.binary_name())
        .map_err(|_| CodeupError::filesystem("Installed binary not found", local).into())
}

/// Runs `{binary} --version` and returns the commit line.
///
/// # Errors
///
/// Returns an error if the binary cannot be run, exits unsuccessfully, or
/// prints fewer than two lines.
pub fn commit_from_binary(binary: &Path) -> Result<String> {
    debug!(binary = %binary.display(), "probing installed version");
    let output = Command::new(binary)
        .arg("--version")
        .output()
        .with_context(|| format!("Failed to run {} --version", binary.display()))?;

    if !output.status.success() {
        anyhow::bail!(
            "{} --version exited with {}",
            binary.display(),
            output.status
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_version_output(&stdout)
        .with_context(|| format!("Unexpected output from {} --version", binary.display()))
}

/// Extracts the commit from `--version` output (second non-empty line).
#[must_use]
pub fn parse_version_output(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .nth(1)
        .map(str::to_string)
}

/// Reads the `commit` field of a `product.json`.
///
/// # Errors
///
/// Returns `FilesystemError` if the file is missing, or an error if it does
/// not contain a commit.
pub fn commit_from_product_json(path: &Path) -> Result<String> {
    let contents = std::fs::read(path)
        .map_err(|_| CodeupError::filesystem("Cannot read product metadata", path))?;
    let product: ProductJson = serde_json::from_slice(&contents)
        .with_context(|| format!("Invalid product metadata: {}", path.display()))?;
    Ok(product.commit)
}
