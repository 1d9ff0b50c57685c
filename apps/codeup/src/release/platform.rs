//! Platform identification.
//!
//! The update server keys every build by a platform identifier that encodes
//! the OS, the CPU architecture and the packaging flavor (`linux-x64`,
//! `win32-arm64-archive`, `darwin-universal`, ...). This module owns the
//! closed set of identifiers and the mapping from the running host to the
//! one identifier codeup downloads by default.
//!
//! ## Host mapping
//!
//! | Host    | Identifier                                  |
//! |---------|---------------------------------------------|
//! | Windows | `win32-{arch}-archive` (`win32-archive` for 32 bit) |
//! | macOS   | `darwin-universal`                          |
//! | Linux   | `linux-{arch}`                              |

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::errors::CodeupError;

/// Operating system family of the running host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOs {
    Windows,
    MacOs,
    Linux,
}

impl HostOs {
    /// Maps an OS name as reported by `std::env::consts::OS`.
    #[must_use]
    pub fn from_os_name(os: &str) -> Option<Self> {
        match os {
            "windows" => Some(Self::Windows),
            "macos" => Some(Self::MacOs),
            "linux" => Some(Self::Linux),
            _ => None,
        }
    }

    /// Detects the running host's OS family.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPlatform` on any OS other than Windows, macOS or Linux.
    pub fn detect() -> Result<Self, CodeupError> {
        Self::from_os_name(std::env::consts::OS).ok_or_else(|| {
            CodeupError::unsupported_platform(std::env::consts::OS, std::env::consts::ARCH)
        })
    }
}

/// Every platform identifier published by the update server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformId {
    Win32User,
    Win32,
    Win32Archive,
    Win32X64User,
    Win32X64,
    Win32X64Archive,
    Win32Arm64User,
    Win32Arm64Archive,
    Win32Arm64,
    LinuxDebIa32,
    LinuxRpmIa32,
    LinuxIa32,
    LinuxDebX64,
    LinuxRpmX64,
    LinuxX64,
    LinuxArmhf,
    LinuxDebArmhf,
    LinuxRpmArmhf,
    LinuxArm64,
    LinuxDebArm64,
    LinuxRpmArm64,
    DarwinArm64,
    Darwin,
    DarwinUniversal,
}

impl PlatformId {
    pub const ALL: [Self; 24] = [
        Self::Win32User,
        Self::Win32,
        Self::Win32Archive,
        Self::Win32X64User,
        Self::Win32X64,
        Self::Win32X64Archive,
        Self::Win32Arm64User,
        Self::Win32Arm64Archive,
        Self::Win32Arm64,
        Self::LinuxDebIa32,
        Self::LinuxRpmIa32,
        Self::LinuxIa32,
        Self::LinuxDebX64,
        Self::LinuxRpmX64,
        Self::LinuxX64,
        Self::LinuxArmhf,
        Self::LinuxDebArmhf,
        Self::LinuxRpmArmhf,
        Self::LinuxArm64,
        Self::LinuxDebArm64,
        Self::LinuxRpmArm64,
        Self::DarwinArm64,
        Self::Darwin,
        Self::DarwinUniversal,
    ];

    /// Returns the identifier used in metadata and download URLs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Win32User => "win32-user",
            Self::Win32 => "win32",
            Self::Win32Archive => "win32-archive",
            Self::Win32X64User => "win32-x64-user",
            Self::Win32X64 => "win32-x64",
            Self::Win32X64Archive => "win32-x64-archive",
            Self::Win32Arm64User => "win32-arm64-user",
            Self::Win32Arm64Archive => "win32-arm64-archive",
            Self::Win32Arm64 => "win32-arm64",
            Self::LinuxDebIa32 => "linux-deb-ia32",
            Self::LinuxRpmIa32 => "linux-rpm-ia32",
            Self::LinuxIa32 => "linux-ia32",
            Self::LinuxDebX64 => "linux-deb-x64",
            Self::LinuxRpmX64 => "linux-rpm-x64",
            Self::LinuxX64 => "linux-x64",
            Self::LinuxArmhf => "linux-armhf",
            Self::LinuxDebArmhf => "linux-deb-armhf",
            Self::LinuxRpmArmhf => "linux-rpm-armhf",
            Self::LinuxArm64 => "linux-arm64",
            Self::LinuxDebArm64 => "linux-deb-arm64",
            Self::LinuxRpmArm64 => "linux-rpm-arm64",
            Self::DarwinArm64 => "darwin-arm64",
            Self::Darwin => "darwin",
            Self::DarwinUniversal => "darwin-universal",
        }
    }

    /// Returns the human-readable name shown on the download page.
    #[must_use]
    pub fn pretty_name(self) -> &'static str {
        match self {
            Self::Win32User => "Windows User Installer (32 bit)",
            Self::Win32 => "Windows System Installer (32 bit)",
            Self::Win32Archive => "Windows .zip (32 bit)",
            Self::Win32X64User => "Windows User Installer (64 bit)",
            Self::Win32X64 => "Windows System Installer (64 bit)",
            Self::Win32X64Archive => "Windows .zip (64 bit)",
            Self::Win32Arm64User => "Windows User Installer (64-bit ARM)",
            Self::Win32Arm64Archive => "Windows .zip (64-bit ARM)",
            Self::Win32Arm64 => "Windows System Installer (64-bit ARM)",
            Self::LinuxDebIa32 => "Linux .deb (32 bit)",
            Self::LinuxRpmIa32 => "Linux .rpm (32 bit)",
            Self::LinuxIa32 => "Linux .tar.gz (32 bit)",
            Self::LinuxDebX64 => "Linux .deb (64 bit)",
            Self::LinuxRpmX64 => "Linux .rpm (64 bit)",
            Self::LinuxX64 => "Linux .tar.gz (64 bit)",
            Self::LinuxArmhf => "Linux .tar.gz (32-bit ARM)",
            Self::LinuxDebArmhf => "Linux .deb (32-bit ARM)",
            Self::LinuxRpmArmhf => "Linux .rpm (32-bit ARM)",
            Self::LinuxArm64 => "Linux .tar.gz (64-bit ARM)",
            Self::LinuxDebArm64 => "Linux .deb (64-bit ARM)",
            Self::LinuxRpmArm64 => "Linux .rpm (64-bit ARM)",
            Self::DarwinArm64 => "Mac for Apple Silicon",
            Self::Darwin => "Mac for Intel Chip",
            Self::DarwinUniversal => "Mac Universal Build",
        }
    }

    /// Returns the OS family the identifier belongs to.
    #[must_use]
    pub fn os(self) -> HostOs {
        match self {
            Self::Win32User
            | Self::Win32
            | Self::Win32Archive
            | Self::Win32X64User
            | Self::Win32X64
            | Self::Win32X64Archive
            | Self::Win32Arm64User
            | Self::Win32Arm64Archive
            | Self::Win32Arm64 => HostOs::Windows,
            Self::DarwinArm64 | Self::Darwin | Self::DarwinUniversal => HostOs::MacOs,
            _ => HostOs::Linux,
        }
    }

    /// Returns the file extension used for downloads of this platform.
    ///
    /// Linux builds are saved as `tar.gz`, everything else as `zip`.
    #[must_use]
    pub fn archive_extension(self) -> &'static str {
        match self.os() {
            HostOs::Linux => "tar.gz",
            HostOs::Windows | HostOs::MacOs => "zip",
        }
    }

    /// Resolves the download identifier for an OS and architecture pair as
    /// reported by `std::env::consts`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPlatform` if the OS is not Windows, macOS or Linux,
    /// or if no build is published for the architecture.
    pub fn for_host(os: &str, arch: &str) -> Result<Self, CodeupError> {
        let unsupported = || CodeupError::unsupported_platform(os, arch);
        let host = HostOs::from_os_name(os).ok_or_else(unsupported)?;

        if host == HostOs::MacOs {
            return Ok(Self::DarwinUniversal);
        }

        let arch = normalize_arch(arch).ok_or_else(unsupported)?;
        let id = match (host, arch) {
            (HostOs::Windows, "x64") => Self::Win32X64Archive,
            (HostOs::Windows, "arm64") => Self::Win32Arm64Archive,
            (HostOs::Windows, "ia32") => Self::Win32Archive,
            (HostOs::Linux, "x64") => Self::LinuxX64,
            (HostOs::Linux, "arm64") => Self::LinuxArm64,
            (HostOs::Linux, "ia32") => Self::LinuxIa32,
            (HostOs::Linux, "armhf") => Self::LinuxArmhf,
            _ => return Err(unsupported()),
        };
        Ok(id)
    }

    /// Resolves the download identifier for the running host.
    ///
    /// # Errors
    ///
    /// See [`PlatformId::for_host`].
    pub fn detect() -> Result<Self, CodeupError> {
        Self::for_host(std::env::consts::OS, std::env::consts::ARCH)
    }
}

/// Maps a Rust architecture name to the update server's spelling.
fn normalize_arch(arch: &str) -> Option<&'static str> {
    match arch {
        "x86_64" | "x64" => Some("x64"),
        "aarch64" | "arm64" => Some("arm64"),
        "x86" | "ia32" => Some("ia32"),
        "arm" | "armhf" => Some("armhf"),
        _ => None,
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformId {
    type Err = CodeupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| CodeupError::invalid_argument(format!("unknown platform: {s}")))
    }
}

/// Platform entry as published in the version metadata.
///
/// The identifier is kept as a string so that platforms added to the server
/// after this release still parse; [`PlatformDescriptor::id`] maps it onto
/// the known set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlatformDescriptor {
    pub os: String,
    #[serde(rename = "prettyname", default)]
    pub pretty_name: String,
}

impl PlatformDescriptor {
    /// Returns the known identifier, if the server's identifier is one.
    #[must_use]
    pub fn id(&self) -> Option<PlatformId> {
        self.os.parse().ok()
    }
}

impl From<PlatformId> for PlatformDescriptor {
    fn from(id: PlatformId) -> Self {
        Self {
            os: id.as_str().to_string(),
            pretty_name: id.pretty_name().to_string(),
        }
    }
}
