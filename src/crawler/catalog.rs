//! Catalog walker: one discover listing per (year, region, page)

use crate::crawler::endpoint::ApiEndpoint;
use crate::crawler::executor::Executor;
use crate::state::Region;
use serde_json::Value;

/// Outcome of a single upstream fetch
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    /// The payload was returned and carried the expected data
    Found(T),

    /// The call succeeded but there was nothing to use (no items, missing fields)
    Empty,

    /// The call failed after every retry, or was not issued
    Failed,
}

/// A listed movie, before enrichment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemRef {
    pub id: i64,
}

/// One page of discover results
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPage {
    pub items: Vec<ItemRef>,
    pub total_pages: u32,
}

impl CatalogPage {
    /// Parses a discover payload
    ///
    /// Returns `None` when `results` is missing or not a list. Entries
    /// without a numeric `id` are skipped. A missing `total_pages` counts as 1.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let results = payload.get("results")?.as_array()?;
        let items = results
            .iter()
            .filter_map(|entry| entry.get("id").and_then(Value::as_i64))
            .map(|id| ItemRef { id })
            .collect();
        let total_pages = payload
            .get("total_pages")
            .and_then(Value::as_u64)
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .unwrap_or(1);

        Some(Self { items, total_pages })
    }

    /// Returns true if no page follows `page`
    pub fn is_last(&self, page: u32) -> bool {
        page >= self.total_pages
    }
}

/// Lists discover pages through the executor
pub struct CatalogWalker {
    endpoint: ApiEndpoint,
    language_filter: String,
}

impl CatalogWalker {
    pub fn new(endpoint: ApiEndpoint, language_filter: &str) -> Self {
        Self {
            endpoint,
            language_filter: language_filter.to_string(),
        }
    }

    /// Lists one page of movies released in `year` for `region`
    ///
    /// `Empty` and `Failed` both end pagination for the (year, region) pair.
    pub async fn list_page(
        &self,
        executor: &Executor,
        year: i32,
        region: &Region,
        page: u32,
    ) -> Fetched<CatalogPage> {
        let year_param = year.to_string();
        let page_param = page.to_string();
        let url = self.endpoint.url(
            &["discover", "movie"],
            &[
                ("primary_release_year", year_param.as_str()),
                ("region", region.as_str()),
                ("with_original_language", self.language_filter.as_str()),
                ("page", page_param.as_str()),
            ],
        );

        let what = format!("listing {}/{} page {}", year, region, page);
        let payload = match executor.get_json(&what, &url).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("{}", e);
                return Fetched::Failed;
            }
        };

        match CatalogPage::from_payload(&payload) {
            Some(listing) if !listing.items.is_empty() => Fetched::Found(listing),
            Some(_) => Fetched::Empty,
            None => {
                tracing::warn!("{}: payload has no results list", what);
                Fetched::Empty
            }
        }
    }
}
