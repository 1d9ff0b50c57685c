//! Action implementations.
//!
//! Each module owns a typed argument struct (a [`clap::Parser`]) and an
//! `execute` function.
//!
//! - [`download`] - fetch the newest build into a directory
//! - [`install`] - unpack a downloaded archive
//! - [`link`] - symlink the launcher onto the `PATH`
//! - [`update`] - reinstall when a newer build is published
//! - [`versions`] - show latest and installed commits
//! - [`help`] - option reference

pub mod download;
pub mod help;
pub mod install;
pub mod link;
pub mod update;
pub mod versions;
