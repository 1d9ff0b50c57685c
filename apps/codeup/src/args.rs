//! Action selection.
//!
//! `codeup` has no subcommands. The action is picked from the raw flags
//! before anything else is parsed, in this order:
//!
//! 1. `--download`, `--install`, `--link` (presence)
//! 2. `--help` / `-h` (presence)
//! 3. `--action` / `-a` value
//! 4. `download`
//!
//! Once the action is known, the whole command line is parsed again with
//! that action's typed [`clap::Parser`], which rejects unknown flags and
//! invalid values.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use clap::{Args, Parser};

use crate::errors::CodeupError;

/// Value attached to a raw flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// Bare flag with no value.
    Flag,
    /// Value from `--key=value` or the following token.
    Text(String),
}

/// Flags split into long (`--x`) and short (`-x`) maps.
///
/// Values are taken from `--key=value` or from the following token when it
/// does not itself start with `-`. Positional tokens are ignored. No
/// validation happens here.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedArgs {
    pub long: HashMap<String, OptionValue>,
    pub short: HashMap<String, OptionValue>,
}

impl ParsedArgs {
    /// Tokenizes `args` (without the program name).
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = args.into_iter().map(Into::into).collect();
        let mut parsed = Self::default();
        let mut i = 0;

        while i < tokens.len() {
            let token = &tokens[i];
            i += 1;

            let (map, body) = if let Some(body) = token.strip_prefix("--") {
                (&mut parsed.long, body)
            } else if let Some(body) = token.strip_prefix('-') {
                (&mut parsed.short, body)
            } else {
                continue;
            };
            if body.is_empty() {
                continue;
            }

            if let Some((key, value)) = body.split_once('=') {
                map.insert(key.to_string(), OptionValue::Text(value.to_string()));
            } else if let Some(next) = tokens.get(i).filter(|next| !next.starts_with('-')) {
                map.insert(body.to_string(), OptionValue::Text(next.clone()));
                i += 1;
            } else {
                map.insert(body.to_string(), OptionValue::Flag);
            }
        }

        parsed
    }

    #[must_use]
    pub fn has_long(&self, key: &str) -> bool {
        self.long.contains_key(key)
    }

    /// Looks up `--long`, then `-short`.
    #[must_use]
    pub fn get(&self, long: &str, short: &str) -> Option<&OptionValue> {
        self.long.get(long).or_else(|| self.short.get(short))
    }
}

/// The operations `codeup` can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    #[default]
    Download,
    Install,
    Link,
    Update,
    Versions,
    Help,
}

impl Action {
    pub const ALL: [Self; 6] = [
        Self::Download,
        Self::Install,
        Self::Link,
        Self::Update,
        Self::Versions,
        Self::Help,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Install => "install",
            Self::Link => "link",
            Self::Update => "update",
            Self::Versions => "versions",
            Self::Help => "help",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = CodeupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| CodeupError::invalid_action(s))
    }
}

/// Picks the action to run.
///
/// # Errors
///
/// Returns `InvalidAction` when `--action` has no value or names an
/// unknown action.
pub fn select_action(args: &ParsedArgs) -> Result<Action, CodeupError> {
    for action in [Action::Download, Action::Install, Action::Link] {
        if args.has_long(action.as_str()) {
            return Ok(action);
        }
    }
    if args.get("help", "h").is_some() {
        return Ok(Action::Help);
    }
    match args.get("action", "a") {
        Some(OptionValue::Text(name)) => name.parse(),
        Some(OptionValue::Flag) => Err(CodeupError::invalid_action("(no value given)")),
        None => Ok(Action::default()),
    }
}

/// Action-selection flags accepted by every action.
///
/// They were already consumed by [`select_action`]; declaring them keeps the
/// typed parsers from rejecting them as unknown.
#[derive(Args, Debug, Default)]
pub struct ActionSelector {
    /// The action to perform. Can be one of download, install, link, update,
    /// versions, or help
    #[clap(long, short = 'a', default_value = "download", hide = true)]
    pub action: String,

    #[clap(long, num_args = 0..=1, hide = true)]
    pub download: Option<Option<String>>,

    #[clap(long, num_args = 0..=1, hide = true)]
    pub install: Option<Option<String>>,

    #[clap(long, num_args = 0..=1, hide = true)]
    pub link: Option<Option<String>>,

    /// Show this help message
    #[clap(long, short = 'h', num_args = 0..=1, hide = true)]
    pub help: Option<Option<String>>,
}

/// Parses the full command line (program name first) with `T`.
///
/// # Errors
///
/// Returns `InvalidArgument` for unknown flags, missing required flags, or
/// values that fail validation.
pub fn parse_action_args<T, I, S>(argv: I) -> Result<T, CodeupError>
where
    T: Parser,
    I: IntoIterator<Item = S>,
    S: Into<std::ffi::OsString> + Clone,
{
    T::try_parse_from(argv).map_err(|e| CodeupError::invalid_argument(clap_message(&e.to_string())))
}

/// Collapses a rendered clap error into one line, dropping the usage and
/// help hints.
fn clap_message(rendered: &str) -> String {
    rendered
        .lines()
        .take_while(|line| !line.starts_with("Usage:"))
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("For more information"))
        .map(|line| line.trim_start_matches("error: "))
        .collect::<Vec<_>>()
        .join(" ")
}
