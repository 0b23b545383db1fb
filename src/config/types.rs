use crate::state::Region;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Main configuration structure for a sweep
///
/// Every TOML section is optional; missing sections fall back to their
/// defaults. Secrets never come from the file, only from the environment.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub sweep: SweepConfig,
    pub api: ApiConfig,
    pub retry: RetryConfig,
    pub store: StoreConfig,
    #[serde(skip)]
    pub secrets: Secrets,
}

/// Traversal range of the sweep
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SweepConfig {
    /// First release year to sweep (inclusive)
    #[serde(rename = "start-year")]
    pub start_year: i32,

    /// Last release year to sweep (inclusive)
    #[serde(rename = "end-year")]
    pub end_year: i32,

    /// Regions visited for every year, in this order
    pub regions: Vec<Region>,

    /// Value passed as `with_original_language` to the discover endpoint
    #[serde(rename = "language-filter")]
    pub language_filter: String,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            start_year: 2000,
            end_year: 2024,
            regions: vec![Region::us(), Region::india()],
            language_filter: "hi|en".to_string(),
        }
    }
}

/// Upstream catalog API endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Prefix prepended to `poster_path` values
    #[serde(rename = "image-base-url")]
    pub image_base_url: String,

    /// Overall per-request timeout; the transport default applies when unset
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.themoviedb.org/3".to_string(),
            image_base_url: "https://image.tmdb.org/t/p/w500".to_string(),
            request_timeout_secs: None,
        }
    }
}

/// Retry behaviour shared by network calls and persistence writes
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per call, including the first one
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Delay after a transient failure (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,

    /// Delay after HTTP 429 when the server sends no usable Retry-After (milliseconds)
    #[serde(rename = "rate-limit-fallback-ms")]
    pub rate_limit_fallback_ms: u64,
}

impl RetryConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn rate_limit_fallback(&self) -> Duration {
        Duration::from_millis(self.rate_limit_fallback_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay_ms: 2_000,
            rate_limit_fallback_ms: 10_000,
        }
    }
}

/// Which persistence backend receives records and checkpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Rest,
    Sqlite,
}

/// Persistence configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Database file used by the sqlite backend
    #[serde(rename = "sqlite-path")]
    pub sqlite_path: String,

    /// Maximum number of records per upsert call
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    #[serde(rename = "records-table")]
    pub records_table: String,

    #[serde(rename = "progress-table")]
    pub progress_table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Rest,
            sqlite_path: "./tmdb-sweep.db".to_string(),
            batch_size: 50,
            records_table: "movies".to_string(),
            progress_table: "progress".to_string(),
        }
    }
}

/// Credentials read from the environment
#[derive(Clone, Default)]
pub struct Secrets {
    pub tmdb_api_key: String,
    pub store_url: String,
    pub store_key: String,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("tmdb_api_key", &"<redacted>")
            .field("store_url", &self.store_url)
            .field("store_key", &"<redacted>")
            .finish()
    }
}
