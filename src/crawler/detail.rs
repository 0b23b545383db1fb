//! Detail enricher: per-movie detail fetch followed by normalization

use crate::crawler::catalog::Fetched;
use crate::crawler::endpoint::ApiEndpoint;
use crate::crawler::executor::Executor;
use crate::record::{normalize, NormalizedRecord, RawDetail};

/// Sub-resources appended to every detail request
pub const DETAIL_APPEND: &str = "credits,videos,external_ids,keywords";

pub struct DetailEnricher {
    endpoint: ApiEndpoint,
    image_base_url: String,
}

impl DetailEnricher {
    pub fn new(endpoint: ApiEndpoint, image_base_url: &str) -> Self {
        Self {
            endpoint,
            image_base_url: image_base_url.to_string(),
        }
    }

    /// Fetches the raw detail payload for one movie
    ///
    /// A payload that does not deserialize (for instance one without an
    /// `id`) is reported as `Empty`.
    pub async fn fetch(&self, executor: &Executor, item_id: i64) -> Fetched<RawDetail> {
        let id = item_id.to_string();
        let url = self
            .endpoint
            .url(&["movie", id.as_str()], &[("append_to_response", DETAIL_APPEND)]);

        let what = format!("detail {}", item_id);
        let payload = match executor.get_json(&what, &url).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("{}", e);
                return Fetched::Failed;
            }
        };

        match serde_json::from_value::<RawDetail>(payload) {
            Ok(raw) => Fetched::Found(raw),
            Err(e) => {
                tracing::warn!("{}: unusable payload: {}", what, e);
                Fetched::Empty
            }
        }
    }

    /// Fetches and normalizes one movie
    pub async fn enrich(&self, executor: &Executor, item_id: i64) -> Fetched<NormalizedRecord> {
        match self.fetch(executor, item_id).await {
            Fetched::Found(raw) => Fetched::Found(normalize(&raw, &self.image_base_url)),
            Fetched::Empty => Fetched::Empty,
            Fetched::Failed => Fetched::Failed,
        }
    }
}
