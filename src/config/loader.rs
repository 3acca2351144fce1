// src/config/loader.rs

use std::path::Path;

use tracing::debug;

use crate::errors::Result;

use super::model::BuildConfig;
use super::validate::validate;

/// Load a [`BuildConfig`] from a TOML file and validate it.
pub fn load_and_validate(path: &Path) -> Result<BuildConfig> {
    let text = std::fs::read_to_string(path)?;
    let config: BuildConfig = toml::from_str(&text)?;
    validate(&config)?;
    debug!(?path, ?config, "loaded build config");
    Ok(config)
}
