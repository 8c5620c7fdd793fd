//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Calls the engine to execute the run
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! Commands that talk to a wiki are async because they involve network
//! I/O. Handlers are synchronous wrappers that build a tokio runtime and
//! block on the async implementation.

mod check_config;
mod completion;
mod run;

pub use check_config::check_config;
pub use completion::completion;
pub use run::{run, RunArgs};

use anyhow::Result;

use super::args::{Cli, Command};
use crate::ui::Verbosity;

/// Dispatch a parsed command to its handler.
pub fn dispatch(cli: Cli, verbosity: Verbosity) -> Result<()> {
    let settings_path = cli.settings.as_deref();
    match cli.command {
        Command::Run {
            config,
            start_date,
            end_date,
            no_renames,
            dry_run,
        } => run(
            settings_path,
            verbosity,
            RunArgs {
                config,
                start_date,
                end_date,
                include_renames: !no_renames,
                dry_run,
            },
        ),
        Command::CheckConfig { config, file } => {
            check_config(settings_path, verbosity, config, file)
        }
        Command::Completion { shell } => completion(shell),
    }
}
