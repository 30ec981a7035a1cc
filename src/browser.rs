// SPDX-License-Identifier: MIT OR Apache-2.0

//! Opening a query in the web interface instead of the terminal

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

use crate::config::ClientConfig;

const BROWSERS: [&str; 3] = ["sensible-browser", "xdg-open", "open"];

/// First browser launcher found on PATH
pub fn find_browser() -> Option<PathBuf> {
    BROWSERS.iter().find_map(|name| which::which(name).ok())
}

/// Replace this process with a browser showing the query
pub fn open(config: &ClientConfig, query: &str) -> Result<()> {
    let url = config.search_url(query);
    let browser = find_browser().ok_or_else(|| {
        anyhow::anyhow!(
            "No web browser launcher found (tried {})\n\nOpen this URL manually:\n  {url}",
            BROWSERS.join(", ")
        )
    })?;
    debug!(browser = %browser.display(), %url, "opening browser");

    let mut cmd = Command::new(&browser);
    cmd.arg(&url);
    launch(cmd).with_context(|| format!("failed to run {}", browser.display()))
}

#[cfg(unix)]
fn launch(mut cmd: Command) -> Result<()> {
    use std::os::unix::process::CommandExt;
    // exec only returns on failure
    Err(cmd.exec().into())
}

#[cfg(not(unix))]
fn launch(mut cmd: Command) -> Result<()> {
    let status = cmd.status()?;
    if !status.success() {
        anyhow::bail!("browser exited with {status}");
    }
    Ok(())
}
