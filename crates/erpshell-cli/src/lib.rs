//! # erpshell CLI
//!
//! Command-line client for OpenERP-style business servers.
//!
//! ## Usage
//!
//! ```bash
//! # Server version and databases
//! erpshell -s http://localhost:8069 version
//! erpshell -s http://localhost:8069 databases
//!
//! # Records, with a profile of erpshell.ini
//! erpshell -e demo search res.partner "name like Agro" --limit 5
//! erpshell -e demo read res.partner "active = True" -F "%(name)s <%(email)s>"
//!
//! # Any method by name
//! erpshell -e demo call ResUsers read 1 -k fields='["login"]'
//!
//! # Modules
//! erpshell -e demo upgrade sale stock
//! ```
//!
//! ## Architecture
//!
//! 1. **Command layer** (`cli`): clap argument parsing
//! 2. **Configuration** (`config`): INI profiles merged with flags
//! 3. **Execution layer** (`executor`): commands run through erpshell-client
//! 4. **Output layer** (`formatter`): human, JSON and table output

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod formatter;
pub mod logging;
pub mod prompt;

use std::io::IsTerminal;

use clap::Parser;

pub use cli::{Cli, Commands, Connection, OutputFormat};
pub use config::{Profile, ProfileStore};
pub use error::{CliError, CliResult, ErrorCategory};
pub use executor::CommandExecutor;
pub use formatter::{Formatter, TerminalReporter};

/// Run the CLI and return the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let colored = !cli.no_color && std::io::stdout().is_terminal();
    logging::init(cli.verbose, cli.quiet, !cli.no_color && std::io::stderr().is_terminal());

    let executor = CommandExecutor::new(cli.format, colored, cli.verbose_rpc);
    match executor.execute(cli.command, &cli.connection).await {
        Ok(()) => 0,
        Err(e) => {
            executor.display_error(&e);
            1
        }
    }
}
