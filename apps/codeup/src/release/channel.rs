//! Release channels.
//!
//! Visual Studio Code ships on two tracks. The command line spells the
//! pre-release track `insiders`; the update server spells it `insider`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::errors::CodeupError;

/// A release track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReleaseChannel {
    #[default]
    Stable,
    Insiders,
}

impl ReleaseChannel {
    /// Both channels, stable first.
    pub const ALL: [Self; 2] = [Self::Stable, Self::Insiders];

    /// Returns the command-line spelling (`stable` / `insiders`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Insiders => "insiders",
        }
    }

    /// Returns the spelling used in update server query strings.
    #[must_use]
    pub fn query_value(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Insiders => "insider",
        }
    }

    /// Parses the update server's spelling, also accepting `insiders`.
    #[must_use]
    pub fn from_server_value(value: &str) -> Option<Self> {
        match value {
            "stable" => Some(Self::Stable),
            "insider" | "insiders" => Some(Self::Insiders),
            _ => None,
        }
    }

    /// Returns the capitalised name used in user-facing summaries.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Stable => "Stable",
            Self::Insiders => "Insiders",
        }
    }

    /// Returns the name of the launcher script shipped in `bin/`.
    #[must_use]
    pub fn binary_name(self) -> &'static str {
        match self {
            Self::Stable => "code",
            Self::Insiders => "code-insiders",
        }
    }
}

impl fmt::Display for ReleaseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseChannel {
    type Err = CodeupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stable" => Ok(Self::Stable),
            "insiders" => Ok(Self::Insiders),
            other => Err(CodeupError::invalid_channel(other)),
        }
    }
}

impl<'de> Deserialize<'de> for ReleaseChannel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::from_server_value(&value)
            .ok_or_else(|| serde::de::Error::unknown_variant(&value, &["stable", "insider"]))
    }
}

/// Channel selection for the versions report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelFilter {
    Only(ReleaseChannel),
    #[default]
    All,
}

impl ChannelFilter {
    /// Returns the channels this filter selects, stable first.
    #[must_use]
    pub fn channels(self) -> Vec<ReleaseChannel> {
        match self {
            Self::Only(channel) => vec![channel],
            Self::All => ReleaseChannel::ALL.to_vec(),
        }
    }
}

impl fmt::Display for ChannelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Only(channel) => channel.fmt(f),
            Self::All => f.write_str("all"),
        }
    }
}

impl FromStr for ChannelFilter {
    type Err = CodeupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(Self::All);
        }
        s.parse().map(Self::Only)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_line_spellings() {
        assert_eq!("stable".parse::<ReleaseChannel>().unwrap(), ReleaseChannel::Stable);
        assert_eq!(
            "insiders".parse::<ReleaseChannel>().unwrap(),
            ReleaseChannel::Insiders
        );
    }

    #[test]
    fn rejects_server_spelling_and_unknown_values() {
        for value in ["insider", "beta", "Stable", "", "all"] {
            let err = value.parse::<ReleaseChannel>().unwrap_err();
            assert!(
                matches!(err, CodeupError::InvalidChannel { .. }),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn query_value_uses_server_spelling() {
        assert_eq!(ReleaseChannel::Stable.query_value(), "stable");
        assert_eq!(ReleaseChannel::Insiders.query_value(), "insider");
    }

    #[test]
    fn binary_names() {
        assert_eq!(ReleaseChannel::Stable.binary_name(), "code");
        assert_eq!(ReleaseChannel::Insiders.binary_name(), "code-insiders");
    }

    #[test]
    fn deserializes_both_insider_spellings() {
        let a: ReleaseChannel = serde_json::from_str("\"insider\"").unwrap();
        let b: ReleaseChannel = serde_json::from_str("\"insiders\"").unwrap();
        assert_eq!(a, ReleaseChannel::Insiders);
        assert_eq!(b, ReleaseChannel::Insiders);
        assert!(serde_json::from_str::<ReleaseChannel>("\"exploration\"").is_err());
    }

    #[test]
    fn filter_all_selects_stable_first() {
        assert_eq!(
            "all".parse::<ChannelFilter>().unwrap().channels(),
            vec![ReleaseChannel::Stable, ReleaseChannel::Insiders]
        );
        assert_eq!(
            "insiders".parse::<ChannelFilter>().unwrap().channels(),
            vec![ReleaseChannel::Insiders]
        );
        assert!("nightly".parse::<ChannelFilter>().is_err());
    }
}
