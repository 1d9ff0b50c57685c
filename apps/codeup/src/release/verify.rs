//! SHA-256 verification of downloaded archives.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::errors::CodeupError;

/// Checks `file_path` against the hex digest published in the metadata.
///
/// The comparison ignores case.
///
/// # Errors
///
/// Returns `ChecksumMismatch` if the digests differ, or an I/O error if the
/// file cannot be read.
pub fn verify_sha256(file_path: &Path, expected: &str) -> Result<()> {
    let actual = compute_sha256(file_path)?;
    let expected = expected.trim().to_ascii_lowercase();

    if actual != expected {
        return Err(CodeupError::checksum_mismatch(expected, actual))
            .with_context(|| format!("Downloaded file is corrupt: {}", file_path.display()));
    }
    Ok(())
}

/// Hashes a file in 8 KiB blocks and returns the lowercase hex digest.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn compute_sha256(file_path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(file_path)
        .with_context(|| format!("Failed to open file for checksum: {}", file_path.display()))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer).with_context(|| {
            format!("Failed to read file for checksum: {}", file_path.display())
        })?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
