//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag. Per-list
//! outcomes are rendered as one line each so a run's effect is scannable
//! in cron mail.

use std::fmt::Display;

use crate::engine::{ListStatus, RunReport};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print a debug message (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Render a run report, one line per list plus a totals line.
pub fn print_report(report: &RunReport, dry_run: bool, verbosity: Verbosity) {
    for list in &report.lists {
        let line = match &list.status {
            ListStatus::Updated(summary) => format!("{}: {}", list.title, summary),
            ListStatus::WouldUpdate(summary) => {
                format!("{}: would update ({})", list.title, summary)
            }
            ListStatus::Unchanged => format!("{}: no changes", list.title),
            ListStatus::Skipped(reason) => {
                warn(format!("{}: skipped: {}", list.title, reason), verbosity);
                continue;
            }
        };
        print(line, verbosity);
    }

    let action = if dry_run { "would update" } else { "updated" };
    print(
        format!(
            "{} of {} lists {}, {} skipped ({} renames, {} group changes, {} records skipped)",
            report.updated(),
            report.lists.len(),
            action,
            report.skipped(),
            report.renames,
            report.group_changes,
            report.skipped_records,
        ),
        verbosity,
    );
}
