use crate::ConfigError;
use url::Url;

/// Base URL plus credential for catalog API calls
#[derive(Debug, Clone)]
pub struct ApiEndpoint {
    base: Url,
    api_key: String,
}

impl ApiEndpoint {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ConfigError> {
        let base = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;
        if base.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl(format!(
                "base-url cannot carry paths: {}",
                base_url
            )));
        }
        Ok(Self {
            base,
            api_key: api_key.to_string(),
        })
    }

    /// Builds `{base}/{segments...}?api_key=...&{params...}`
    pub fn url(&self, segments: &[&str], params: &[(&str, &str)]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.query_pairs_mut()
            .append_pair("api_key", &self.api_key)
            .extend_pairs(params);
        url
    }
}
