use crate::record::NormalizedRecord;
use serde::{Deserialize, Deserializer};

/// Watch URL prefix for YouTube-hosted trailers
pub const YOUTUBE_WATCH_URL: &str = "https://www.youtube.com/watch?v=";

const TRAILER_TYPE: &str = "Trailer";
const TRAILER_SITE: &str = "YouTube";
const MAX_CAST: usize = 5;

/// Movie detail payload with credits, videos, external ids and keywords appended
///
/// Only `id` is required. Lists that are missing or `null` deserialize as empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDetail {
    pub id: i64,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub runtime: Option<u32>,
    pub poster_path: Option<String>,
    pub original_language: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub genres: Vec<Genre>,
    pub credits: Option<Credits>,
    pub videos: Option<Videos>,
    pub external_ids: Option<ExternalIds>,
    pub keywords: Option<Keywords>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Genre {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credits {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub cast: Vec<CastMember>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CastMember {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Videos {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub results: Vec<Video>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Video {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub site: Option<String>,
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalIds {
    pub imdb_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Keywords {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub keywords: Vec<Keyword>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Keyword {
    pub name: Option<String>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Maps a raw detail payload to the output record
///
/// # Arguments
///
/// * `raw` - The detail payload
/// * `image_base_url` - Prefix for the poster path (e.g. `https://image.tmdb.org/t/p/w500`)
///
/// # Rules
///
/// - `cast`: the first five credited names, in upstream order
/// - `trailer`: the first YouTube video of type "Trailer", as a watch URL
/// - `year`: the four-character prefix of `release_date`
pub fn normalize(raw: &RawDetail, image_base_url: &str) -> NormalizedRecord {
    let cast = raw
        .credits
        .iter()
        .flat_map(|credits| credits.cast.iter())
        .filter_map(|member| non_blank(member.name.as_deref()))
        .take(MAX_CAST)
        .collect();

    let genres = raw
        .genres
        .iter()
        .filter_map(|genre| non_blank(genre.name.as_deref()))
        .collect();

    let tags = raw
        .keywords
        .iter()
        .flat_map(|keywords| keywords.keywords.iter())
        .filter_map(|keyword| non_blank(keyword.name.as_deref()))
        .collect();

    NormalizedRecord {
        external_id: raw.id,
        imdb_id: raw
            .external_ids
            .as_ref()
            .and_then(|ids| non_blank(ids.imdb_id.as_deref())),
        title: non_blank(raw.title.as_deref()),
        plot: non_blank(raw.overview.as_deref()),
        year: raw.release_date.as_deref().and_then(release_year),
        runtime: raw.runtime,
        poster: non_blank(raw.poster_path.as_deref()).map(|path| poster_url(image_base_url, &path)),
        cast,
        genres,
        trailer: trailer_url(raw),
        tags,
        original_language: non_blank(raw.original_language.as_deref()),
    }
}

fn trailer_url(raw: &RawDetail) -> Option<String> {
    raw.videos
        .iter()
        .flat_map(|videos| videos.results.iter())
        .filter(|video| {
            video.kind.as_deref() == Some(TRAILER_TYPE) && video.site.as_deref() == Some(TRAILER_SITE)
        })
        .find_map(|video| non_blank(video.key.as_deref()))
        .map(|key| format!("{}{}", YOUTUBE_WATCH_URL, key))
}

fn release_year(date: &str) -> Option<i32> {
    date.get(..4).and_then(|prefix| prefix.parse().ok())
}

fn poster_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
