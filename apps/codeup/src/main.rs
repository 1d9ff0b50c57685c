#![warn(clippy::pedantic)]

//! # codeup
//!
//! Downloads, installs, links and updates Visual Studio Code builds from the
//! official update server, for the stable and insiders channels.
//!
//! ## Actions
//!
//! - `download` - fetch the newest build for this host (default)
//! - `install` - extract a downloaded archive into the install directory
//! - `link` - symlink `code` / `code-insiders` onto the `PATH`
//! - `update` - reinstall when the installed commit is stale (Linux)
//! - `versions` - show the latest and installed commit per channel
//! - `help` - print the option reference
//!
//! ## Examples
//!
//! ```bash
//! codeup --download --build insiders
//! sudo codeup --install --file downloads/vscode-stable-linux-x64-1700000000000.tar.gz
//! sudo codeup --link
//! codeup -a versions
//! codeup --help --section install
//! ```
//!
//! ## Environment Variables
//!
//! - `CODEUP_UPDATE_SERVER` - update server URL (default: https://code.visualstudio.com)
//! - `CODEUP_LOG` - log filter, e.g. `debug` (falls back to `RUST_LOG`)

mod args;
mod commands;
mod errors;
mod install;
mod logging;
mod release;

use anyhow::Result;
use args::{Action, ParsedArgs, parse_action_args, select_action};
use commands::{download, help, install as install_cmd, link, update, versions};

#[tokio::main]
async fn main() {
    logging::init_logging();

    if let Err(e) = run().await {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Prints the error chain and returns the exit code. Every failure maps
/// to 1.
fn handle_error(e: &anyhow::Error) -> i32 {
    eprintln!("Error: {e:?}");
    1
}

async fn run() -> Result<()> {
    let argv: Vec<String> = std::env::args().collect();
    let action = select_action(&ParsedArgs::parse(argv.iter().skip(1).cloned()))?;
    tracing::debug!(%action, "selected action");

    match action {
        Action::Download => download::execute(&parse_action_args(&argv)?).await,
        Action::Install => install_cmd::execute(&parse_action_args(&argv)?),
        Action::Link => link::execute(&parse_action_args(&argv)?),
        Action::Update => update::execute(&parse_action_args(&argv)?).await,
        Action::Versions => versions::execute(&parse_action_args(&argv)?).await,
        Action::Help => help::execute(&parse_action_args(&argv)?),
    }
}
