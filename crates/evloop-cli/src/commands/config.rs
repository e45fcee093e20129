//! `evloop config`: print the effective configuration.

use std::path::Path;

/// Effective configuration rendered as TOML
pub fn render(path: Option<&Path>) -> anyhow::Result<String> {
    let config = super::resolve_config(path, None, None)?;
    Ok(toml::to_string_pretty(&config)?)
}

pub fn execute(path: Option<&Path>) -> anyhow::Result<()> {
    print!("{}", render(path)?);
    Ok(())
}
