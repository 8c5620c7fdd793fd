//! check-config command - validate a list configuration

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::policy::load_policies;
use crate::settings::Settings;
use crate::ui::output;
use crate::ui::Verbosity;
use crate::wiki::{ApiClient, Wiki};

/// Run the check-config command.
///
/// Exactly one source is given: a wiki page (fetched with the configured
/// credentials' wiki, no login) or a local file.
pub fn check_config(
    settings_path: Option<&Path>,
    verbosity: Verbosity,
    config: Option<String>,
    file: Option<PathBuf>,
) -> Result<()> {
    let raw = match (config, file) {
        (_, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read '{}'", path.display()))?,
        (Some(page), None) => fetch_page_text(settings_path, &page)?,
        (None, None) => bail!("a config page or --file is required"),
    };

    let policies = load_policies(&raw)?;
    output::print(
        format!("configuration is valid: {} enabled lists", policies.len()),
        verbosity,
    );
    for title in policies.keys() {
        output::print(format!("  {title}"), verbosity);
    }
    Ok(())
}

fn fetch_page_text(settings_path: Option<&Path>, page: &str) -> Result<String> {
    let settings = Settings::load(settings_path)?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let wiki = ApiClient::new(
            &settings.api_url,
            &settings.db_name,
            settings.user_agent.as_deref(),
        )?;
        let text = wiki
            .fetch_page(page)
            .await?
            .with_context(|| format!("config page '{page}' does not exist"))?;
        Ok(text.text)
    })
}
