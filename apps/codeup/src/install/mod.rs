//! Local installation management: where builds live, how archives are
//! unpacked, and how the installed version is discovered.
//!
//! - [`archive`] - tar.gz and zip extraction
//! - [`paths`] - install and symlink directories
//! - [`probe`] - installed commit detection

pub mod archive;
pub mod paths;
pub mod probe;

pub use archive::extract_archive;
pub use paths::{InstallTarget, default_symlink_dir, ensure_dir, ensure_writable, link_binary};
pub use probe::installed_commit;
