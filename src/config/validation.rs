use crate::config::types::{ApiConfig, Config, RetryConfig, StoreConfig, SweepConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Earliest release year accepted in `[sweep]`
pub const MIN_YEAR: i32 = 1870;

/// Latest release year accepted in `[sweep]`
pub const MAX_YEAR: i32 = 9999;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_sweep_config(&config.sweep)?;
    validate_api_config(&config.api)?;
    validate_retry_config(&config.retry)?;
    validate_store_config(&config.store)?;
    Ok(())
}

/// Validates the traversal range
fn validate_sweep_config(config: &SweepConfig) -> Result<(), ConfigError> {
    for (name, year) in [("start-year", config.start_year), ("end-year", config.end_year)] {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(ConfigError::Validation(format!(
                "{} must be between {} and {}, got {}",
                name, MIN_YEAR, MAX_YEAR, year
            )));
        }
    }

    if config.start_year > config.end_year {
        return Err(ConfigError::Validation(format!(
            "start-year must not be after end-year, got {} > {}",
            config.start_year, config.end_year
        )));
    }

    if config.regions.is_empty() {
        return Err(ConfigError::Validation(
            "at least one region is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for region in &config.regions {
        if !seen.insert(region.as_str()) {
            return Err(ConfigError::Validation(format!(
                "region '{}' is listed more than once",
                region
            )));
        }
    }

    if config.language_filter.trim().is_empty() {
        return Err(ConfigError::Validation(
            "language-filter cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates upstream endpoints
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;
    Url::parse(&config.image_base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid image-base-url: {}", e)))?;

    if config.request_timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }
    Ok(())
}

/// Validates persistence settings
fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch-size must be >= 1, got {}",
            config.batch_size
        )));
    }

    for (name, table) in [
        ("records-table", &config.records_table),
        ("progress-table", &config.progress_table),
    ] {
        let valid = !table.is_empty()
            && table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(ConfigError::Validation(format!(
                "{} must contain only alphanumeric characters and underscores, got '{}'",
                name, table
            )));
        }
    }

    if config.sqlite_path.is_empty() {
        return Err(ConfigError::Validation(
            "sqlite-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
