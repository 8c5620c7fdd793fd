//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--settings <path>`: Use this settings file
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Masslist - keeps MassMessage delivery lists in sync with user rights
#[derive(Parser, Debug)]
#[command(name = "masslist")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the settings file (default: $MASSLIST_CONFIG, then the
    /// user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reconcile the configured lists against a window of log events
    #[command(
        name = "run",
        long_about = "Reconcile the configured MassMessage lists.\n\n\
            Fetches user rights changes (and renames) for the date window, \
            applies each enabled list's policy, and saves every changed list \
            with a change summary. The window defaults to yesterday (UTC).",
        after_help = "\
EXAMPLES:
    # Process yesterday's events (the usual cron invocation)
    masslist run 'User:ExampleBot/lists.json'

    # Catch up a span of days
    masslist run 'User:ExampleBot/lists.json' --start-date 2024-05-01 --end-date 2024-05-07

    # See what would change without saving anything
    masslist run 'User:ExampleBot/lists.json' --dry-run"
    )]
    Run {
        /// Page holding the list configuration JSON
        #[arg(value_name = "CONFIG_PAGE")]
        config: String,

        /// First day of the window, YYYY-MM-DD (default: yesterday, UTC)
        #[arg(long, value_name = "DATE")]
        start_date: Option<NaiveDate>,

        /// Last day of the window, YYYY-MM-DD, inclusive (default: start)
        #[arg(long, value_name = "DATE")]
        end_date: Option<NaiveDate>,

        /// Do not fetch or apply rename events
        #[arg(long)]
        no_renames: bool,

        /// Reconcile and report without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate a list configuration without running
    #[command(
        name = "check-config",
        long_about = "Validate a list configuration.\n\n\
            Loads the configuration from a wiki page or a local file and \
            reports the first defect found, or the enabled lists on success."
    )]
    CheckConfig {
        /// Page holding the list configuration JSON
        #[arg(value_name = "CONFIG_PAGE", required_unless_present = "file")]
        config: Option<String>,

        /// Validate a local file instead of a wiki page
        #[arg(long, value_name = "PATH", conflicts_with = "config")]
        file: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
EXAMPLES:
    # Bash
    masslist completion bash > ~/.local/share/bash-completion/completions/masslist

    # Zsh
    masslist completion zsh > ~/.zfunc/_masslist"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn run_parses_dates() {
        let cli = Cli::try_parse_from([
            "masslist",
            "run",
            "User:Bot/lists.json",
            "--start-date",
            "2024-05-01",
            "--end-date",
            "2024-05-07",
            "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Command::Run {
                config,
                start_date,
                end_date,
                no_renames,
                dry_run,
            } => {
                assert_eq!(config, "User:Bot/lists.json");
                assert_eq!(
                    start_date,
                    Some(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
                );
                assert_eq!(end_date, Some(NaiveDate::from_ymd_opt(2024, 5, 7).unwrap()));
                assert!(!no_renames);
                assert!(dry_run);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn run_rejects_bad_date() {
        assert!(Cli::try_parse_from([
            "masslist",
            "run",
            "User:Bot/lists.json",
            "--start-date",
            "May first",
        ])
        .is_err());
    }

    #[test]
    fn check_config_requires_page_or_file() {
        assert!(Cli::try_parse_from(["masslist", "check-config"]).is_err());
        assert!(Cli::try_parse_from(["masslist", "check-config", "--file", "lists.json"]).is_ok());
        assert!(Cli::try_parse_from(["masslist", "check-config", "Page", "--file", "x"]).is_err());
    }
}
