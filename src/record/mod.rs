//! Record module: raw TMDb detail payloads and the normalized output shape
//!
//! Normalization is a pure function boundary. It never fails: missing or
//! blank upstream fields become `None` or empty lists.

mod normalize;

pub use normalize::{
    normalize, CastMember, Credits, ExternalIds, Genre, Keyword, Keywords, RawDetail, Video,
    Videos, YOUTUBE_WATCH_URL,
};

use serde::{Deserialize, Serialize};

/// A movie record as persisted to the store
///
/// `external_id` is the TMDb id and the upsert key; every other field is
/// optional so repeated fetches of the same movie converge to one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub external_id: i64,
    pub imdb_id: Option<String>,
    pub title: Option<String>,
    pub plot: Option<String>,
    pub year: Option<i32>,
    pub runtime: Option<u32>,
    pub poster: Option<String>,
    pub cast: Vec<String>,
    pub genres: Vec<String>,
    pub trailer: Option<String>,
    pub tags: Vec<String>,
    pub original_language: Option<String>,
}

impl NormalizedRecord {
    /// A record carrying only its key
    pub fn bare(external_id: i64) -> Self {
        Self {
            external_id,
            imdb_id: None,
            title: None,
            plot: None,
            year: None,
            runtime: None,
            poster: None,
            cast: Vec::new(),
            genres: Vec::new(),
            trailer: None,
            tags: Vec::new(),
            original_language: None,
        }
    }
}
