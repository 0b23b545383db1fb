//! Configuration module for TMDb Sweep
//!
//! Sweep tuning comes from an optional TOML file; credentials always come
//! from the environment.
//!
//! # Example
//!
//! ```no_run
//! use tmdb_sweep::config::load_config;
//!
//! let config = load_config(None).unwrap();
//! println!("Sweeping {}..={}", config.sweep.start_year, config.sweep.end_year);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ApiConfig, Config, RetryConfig, Secrets, StoreBackend, StoreConfig, SweepConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, parse_config, secrets_from_lookup,
    ENV_STORE_KEY, ENV_STORE_URL, ENV_TMDB_API_KEY,
};
pub use validation::validate;
