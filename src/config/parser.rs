use crate::config::types::{Config, Secrets, StoreBackend, SweepConfig};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable holding the TMDb API key
pub const ENV_TMDB_API_KEY: &str = "TMDB_API_KEY";

/// Environment variable holding the REST store base URL
pub const ENV_STORE_URL: &str = "SUPABASE_URL";

/// Environment variable holding the REST store access key
pub const ENV_STORE_KEY: &str = "SUPABASE_KEY";

/// Loads the sweep configuration and its secrets
///
/// # Arguments
///
/// * `path` - Optional path to a TOML file; defaults are used when `None`
///
/// # Returns
///
/// * `Ok(Config)` - Validated configuration with secrets attached
/// * `Err(ConfigError)` - The file could not be read or parsed, validation
///   failed, or a required secret is missing from the environment
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            parse_config(&content)?
        }
        None => {
            let config = Config::default();
            validate(&config)?;
            config
        }
    };

    config.secrets = secrets_from_lookup(config.store.backend, |name| std::env::var(name).ok())?;

    Ok(config)
}

/// Parses and validates configuration from TOML text (without secrets)
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Resolves the required secrets through `lookup`
///
/// The TMDb key is always required. The store URL and key are only
/// required when the REST backend is selected.
pub fn secrets_from_lookup<F>(backend: StoreBackend, lookup: F) -> Result<Secrets, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |name: &'static str| -> Result<String, ConfigError> {
        lookup(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingEnv(name))
    };

    let tmdb_api_key = required(ENV_TMDB_API_KEY)?;
    let (store_url, store_key) = match backend {
        StoreBackend::Rest => (required(ENV_STORE_URL)?, required(ENV_STORE_KEY)?),
        StoreBackend::Sqlite => (String::new(), String::new()),
    };

    Ok(Secrets {
        tmdb_api_key,
        store_url,
        store_key,
    })
}

/// Computes a SHA-256 hash of the sweep section
///
/// The hash is stored next to the checkpoint so a resumed run can notice
/// that the traversal it is continuing was configured differently.
pub fn compute_config_hash(sweep: &SweepConfig) -> Result<String, ConfigError> {
    let canonical = toml::to_string(sweep)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: Option<&Path>) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(&config.sweep)?;
    Ok((config, hash))
}
