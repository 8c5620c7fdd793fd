//! run command - reconcile the configured lists for a date window

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, Utc};

use crate::core::event::Window;
use crate::core::types::PageTitle;
use crate::engine::{RunOptions, Runner};
use crate::settings::Settings;
use crate::ui::output;
use crate::ui::Verbosity;
use crate::wiki::{ApiClient, Wiki};

/// Arguments to the run command.
#[derive(Debug, Clone)]
pub struct RunArgs {
    /// Page holding the list configuration JSON.
    pub config: String,
    /// First day of the window.
    pub start_date: Option<NaiveDate>,
    /// Last day of the window, inclusive.
    pub end_date: Option<NaiveDate>,
    /// Whether to fetch and apply rename events.
    pub include_renames: bool,
    /// Reconcile and report without saving.
    pub dry_run: bool,
}

/// Run the run command.
///
/// This is a synchronous wrapper that uses tokio to run the async
/// implementation.
pub fn run(settings_path: Option<&Path>, verbosity: Verbosity, args: RunArgs) -> Result<()> {
    let settings = Settings::load(settings_path)?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_async(&settings, verbosity, args))
}

async fn run_async(settings: &Settings, verbosity: Verbosity, args: RunArgs) -> Result<()> {
    let policy_page = PageTitle::new(&args.config)
        .with_context(|| format!("invalid config page '{}'", args.config))?;
    let window = window_for(args.start_date, args.end_date, Utc::now().date_naive())?;
    output::debug(format!("window {window}"), verbosity);

    let password = settings.password()?;
    let local = ApiClient::new(
        &settings.api_url,
        &settings.db_name,
        settings.user_agent.as_deref(),
    )?;
    local
        .login(&settings.username, &password)
        .await
        .context("login to the local wiki failed")?;
    output::debug(
        format!("logged in to {} as {}", settings.api_url, settings.username),
        verbosity,
    );

    // The shared origin is only read; no login needed.
    let shared = match &settings.shared_api_url {
        Some(url) => Some(ApiClient::new(url, "shared", settings.user_agent.as_deref())?),
        None => None,
    };

    let runner = Runner::new(
        &local,
        shared.as_ref().map(|s| s as &dyn Wiki),
        &settings.db_name,
        settings.shutoff_page(),
    );
    let options = RunOptions {
        policy_page,
        window,
        include_renames: args.include_renames,
        dry_run: args.dry_run,
    };
    let report = runner.run(&options).await?;

    output::print_report(&report, args.dry_run, verbosity);
    Ok(())
}

/// Compute the event window from the date arguments.
///
/// Days are whole UTC days: the window spans `[start 00:00, end + 1 day
/// 00:00)`. Start defaults to yesterday, end defaults to start.
fn window_for(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<Window> {
    let start = match start {
        Some(date) => date,
        None => today
            .pred_opt()
            .ok_or_else(|| anyhow!("cannot compute yesterday from {today}"))?,
    };
    let end = end.unwrap_or(start);
    let after_end = end
        .succ_opt()
        .ok_or_else(|| anyhow!("end date {end} is out of range"))?;
    let window = Window::new(
        start.and_time(chrono::NaiveTime::MIN).and_utc(),
        after_end.and_time(chrono::NaiveTime::MIN).and_utc(),
    )?;
    Ok(window)
}
