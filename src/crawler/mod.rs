//! Crawler module for catalog traversal
//!
//! This module contains the core sweep logic, including:
//! - The request executor (retries, 429 handling, quota headers)
//! - Discover listing and pagination
//! - Per-movie detail enrichment
//! - Overall sweep coordination and checkpointing

mod catalog;
mod coordinator;
mod detail;
mod endpoint;
mod executor;

pub use catalog::{CatalogPage, CatalogWalker, Fetched, ItemRef};
pub use coordinator::{run_sweep, Coordinator, RunOutcome, RunSummary};
pub use detail::{DetailEnricher, DETAIL_APPEND};
pub use endpoint::ApiEndpoint;
pub use executor::{
    build_http_client, quota_headers, Executor, HEADER_QUOTA_LIMIT, HEADER_QUOTA_REMAINING,
};
