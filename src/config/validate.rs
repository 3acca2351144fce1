// src/config/validate.rs

use crate::errors::{DriverError, Result};

use super::model::BuildConfig;

/// Reject configurations the driver cannot run with.
pub fn validate(config: &BuildConfig) -> Result<()> {
    if config.max_concurrent_actions == 0 {
        return Err(DriverError::ConfigError(
            "max_concurrent_actions must be at least 1".to_string(),
        ));
    }
    if config.src_dir == config.tmp_dir {
        return Err(DriverError::ConfigError(format!(
            "src_dir and tmp_dir must differ (both are {:?})",
            config.src_dir
        )));
    }
    Ok(())
}
