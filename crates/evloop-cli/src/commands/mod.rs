//! Subcommand implementations

pub mod config;
pub mod run;

use anyhow::Context;
use evloop_core::LoopConfig;
use std::path::Path;

/// Load the config file (or defaults), then apply command-line overrides
pub fn resolve_config(
    path: Option<&Path>,
    name: Option<String>,
    max_queue_size: Option<usize>,
) -> anyhow::Result<LoopConfig> {
    let mut config = match path {
        Some(path) => LoopConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => LoopConfig::default(),
    };

    if let Some(name) = name {
        config.name = name;
    }
    if let Some(max_queue_size) = max_queue_size {
        config.max_queue_size = max_queue_size;
    }
    config.validate().context("Invalid loop configuration")?;
    Ok(config)
}
