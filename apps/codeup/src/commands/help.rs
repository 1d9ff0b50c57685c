//! Help action.
//!
//! The option reference is rendered from the same clap definitions that
//! parse the command line, so the two cannot drift apart.
//!
//! ```text
//! download
//!   --build, -b: (default: stable)
//!     The build to download. Can either be stable or insiders
//! ```

use clap::{Arg, Args, Command, CommandFactory, Parser};

use super::download::DownloadArgs;
use super::install::InstallArgs;
use super::link::LinkArgs;
use super::update::UpdateArgs;
use super::versions::VersionsArgs;
use crate::args::ActionSelector;
use crate::errors::CodeupError;

/// Section names in display order.
pub const SECTIONS: [&str; 7] = [
    "sections", "main", "download", "install", "link", "update", "versions",
];

/// Values accepted by `--section`.
const SECTION_CHOICES: [&str; 8] = [
    "all", "sections", "main", "download", "install", "link", "update", "versions",
];

/// Arguments for the help action.
#[derive(Parser, Debug)]
#[command(name = "codeup", disable_help_flag = true, disable_version_flag = true)]
pub struct HelpArgs {
    #[command(flatten)]
    pub selector: ActionSelector,

    /// Show a specific section. Can be one of: sections, main, download,
    /// install, link, update, versions
    #[clap(
        long,
        short = 's',
        default_value = "all",
        value_parser = clap::builder::PossibleValuesParser::new(SECTION_CHOICES)
    )]
    pub section: String,
}

/// One documented option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDoc {
    pub keys: String,
    pub description: String,
    pub required: bool,
    pub default: Option<String>,
}

impl OptionDoc {
    fn from_arg(arg: &Arg) -> Self {
        let mut keys = Vec::new();
        if let Some(long) = arg.get_long() {
            keys.push(format!("--{long}"));
        }
        if let Some(short) = arg.get_short() {
            keys.push(format!("-{short}"));
        }

        let default = arg
            .get_default_values()
            .iter()
            .map(|v| v.to_string_lossy().into_owned())
            .collect::<Vec<_>>();

        Self {
            keys: keys.join(", "),
            description: arg.get_help().map(ToString::to_string).unwrap_or_default(),
            required: arg.is_required_set(),
            default: (!default.is_empty()).then(|| default.join(", ")),
        }
    }
}

/// Collects the documented options of `command` that pass `keep`.
fn options(command: &Command, keep: impl Fn(&Arg) -> bool) -> Vec<OptionDoc> {
    command
        .get_arguments()
        .filter(|arg| keep(arg))
        .map(OptionDoc::from_arg)
        .collect()
}

/// Returns the options documented under section `name`.
#[must_use]
pub fn section(name: &str) -> Option<Vec<OptionDoc>> {
    let visible = |arg: &Arg| !arg.is_hide_set();
    let docs = match name {
        "sections" => options(&HelpArgs::command(), |arg| {
            matches!(arg.get_id().as_str(), "help" | "section")
        }),
        "main" => options(
            &ActionSelector::augment_args(Command::new("codeup")),
            |arg| arg.get_id() == "action",
        ),
        "download" => options(&DownloadArgs::command(), visible),
        "install" => options(&InstallArgs::command(), visible),
        "link" => options(&LinkArgs::command(), visible),
        "update" => options(&UpdateArgs::command(), visible),
        "versions" => options(&VersionsArgs::command(), visible),
        _ => return None,
    };
    Some(docs)
}

fn render_section(name: &str, docs: &[OptionDoc], out: &mut String) {
    out.push_str(name);
    out.push('\n');
    for doc in docs {
        out.push_str("  ");
        out.push_str(&doc.keys);
        out.push(':');
        if doc.required {
            out.push_str(" (required)");
        }
        if let Some(default) = &doc.default {
            out.push_str(&format!(" (default: {default})"));
        }
        out.push('\n');
        for line in doc.description.lines() {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out.push('\n');
}

/// Renders one section, or every section for `all`.
///
/// # Errors
///
/// Returns `InvalidArgument` for an unknown section name.
pub fn render(selection: &str) -> Result<String, CodeupError> {
    let mut out = String::new();

    if selection == "all" {
        out.push_str("All sections:\n\n");
        for name in SECTIONS {
            if let Some(docs) = section(name) {
                render_section(name, &docs, &mut out);
            }
        }
        return Ok(out);
    }

    let docs = section(selection)
        .ok_or_else(|| CodeupError::invalid_argument(format!("Invalid section: {selection}")))?;
    render_section(selection, &docs, &mut out);
    Ok(out)
}

/// Executes the help action.
///
/// # Errors
///
/// Returns `InvalidArgument` for an unknown section name.
pub fn execute(args: &HelpArgs) -> anyhow::Result<()> {
    print!("{}", render(&args.section)?);
    Ok(())
}
