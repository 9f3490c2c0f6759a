use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::runtime::Runtime;

/// Get the default install root: `$HOME/.addonctl`
#[tracing::instrument(skip(runtime))]
pub fn default_install_root<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    let home_dir = runtime
        .home_dir()
        .context("Could not find home directory")?;
    Ok(home_dir.join(".addonctl"))
}
