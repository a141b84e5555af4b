pub mod types;

use std::path::Path;

use crate::error::{BookingError, Result};
use types::Config;

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        BookingError::Config(format!(
            "failed to read config file {}: {e}",
            path.display()
        ))
    })?;
    let config: Config = serde_yml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let policy = &config.policy;
    if policy.partial_refund_days > policy.free_cancellation_days {
        return Err(BookingError::Config(format!(
            "policy.partial_refund_days ({}) must not exceed policy.free_cancellation_days ({})",
            policy.partial_refund_days, policy.free_cancellation_days
        )));
    }
    if config.listing.page_size == 0 || config.listing.page_size > config.listing.max_page_size {
        return Err(BookingError::Config(format!(
            "listing.page_size must be between 1 and {}",
            config.listing.max_page_size
        )));
    }
    Ok(())
}
