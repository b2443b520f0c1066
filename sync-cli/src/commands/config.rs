//! Inspect group configuration.

use anyhow::{Context, Result};
use lockstep_sync_client::GroupConfig;
use std::path::Path;

/// Load `path`, or the defaults when no file is given.
pub fn load(path: Option<&Path>) -> Result<GroupConfig> {
    match path {
        Some(path) => GroupConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(GroupConfig::default()),
    }
}

/// Run the config command.
pub fn run(path: Option<&Path>) -> Result<()> {
    let config = load(path)?;
    let json = serde_json::to_string_pretty(&config).context("Failed to render config")?;
    println!("{}", json);
    Ok(())
}
