// src/providers/imdb.rs
//! IMDb (RapidAPI `imdb8`) identity search, rating and genres.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use crate::providers::decode_json;
use crate::providers::types::{HttpRequest, MovieIdentity, PageFetcher, ProviderError};
use crate::score::{normalize_rating, round1};

pub const PROVIDER: &str = "imdb";
pub const DEFAULT_BASE_URL: &str = "https://imdb8.p.rapidapi.com";
pub const TITLE_PAGE_BASE: &str = "https://www.imdb.com/title/";

/// Marker that distinguishes a title id (`tt0133093`) from name/list ids.
const TITLE_ID_MARKER: &str = "tt";

/// Candidate kinds that describe a watchable title.
const TITLE_KINDS: &[&str] = &[
    "movie",
    "tvSeries",
    "tvEpisode",
    "tvMiniSeries",
    "tvMovie",
    "tvSpecial",
    "short",
    "tvShort",
];

pub fn title_page_url(id: &str) -> String {
    format!("{TITLE_PAGE_BASE}{id}/")
}

#[derive(Debug, Deserialize)]
struct AutoComplete {
    #[serde(default)]
    d: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    id: Option<String>,
    #[serde(rename = "l")]
    title: Option<String>,
    #[serde(rename = "y")]
    year: Option<i64>,
    #[serde(rename = "qid")]
    kind: Option<String>,
    #[serde(rename = "i")]
    image: Option<CandidateImage>,
}

#[derive(Debug, Deserialize)]
struct CandidateImage {
    #[serde(rename = "imageUrl", alias = "url")]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Ratings {
    rating: Option<f64>,
}

/// Pick the first candidate that is a recognized title kind with a title id.
/// Candidates that fail to deserialize or lack an id/title are skipped.
pub fn select_identity(payload: &str) -> Result<Option<MovieIdentity>, ProviderError> {
    let resp: AutoComplete = serde_json::from_str(payload).map_err(|e| ProviderError::Malformed {
        provider: PROVIDER,
        message: e.to_string(),
    })?;

    for raw in resp.d {
        let Ok(c) = serde_json::from_value::<Candidate>(raw) else {
            continue;
        };
        let (Some(id), Some(title), Some(kind)) = (c.id, c.title, c.kind) else {
            continue;
        };
        if !TITLE_KINDS.contains(&kind.as_str()) || !id.contains(TITLE_ID_MARKER) {
            continue;
        }
        let year = c
            .year
            .and_then(|y| u16::try_from(y).ok())
            .filter(|y| *y > 0);
        let poster_url = c.image.and_then(|i| i.url).unwrap_or_default();
        return Ok(Some(MovieIdentity {
            id,
            title,
            year,
            poster_url,
            title_kind: kind,
        }));
    }
    Ok(None)
}

/// Thin client over the RapidAPI IMDb endpoints.
#[derive(Clone)]
pub struct ImdbClient {
    fetcher: Arc<dyn PageFetcher>,
    base_url: Url,
    api_key: String,
    timeout: Duration,
}

impl ImdbClient {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        base_url: Url,
        api_key: String,
        timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            base_url,
            api_key,
            timeout,
        }
    }

    fn request(&self, path: &str, params: &[(&str, &str)]) -> Result<HttpRequest, ProviderError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| ProviderError::Transport {
                provider: PROVIDER,
                message: format!("bad url: {e}"),
            })?;
        url.query_pairs_mut().extend_pairs(params);
        let host = self.base_url.host_str().unwrap_or_default().to_string();
        Ok(HttpRequest::get(PROVIDER, url, self.timeout)
            .header("X-RapidAPI-Key", self.api_key.clone())
            .header("X-RapidAPI-Host", host))
    }

    /// Resolve free text (e.g. "The Matrix 1999") to a title identity.
    pub async fn search(&self, query: &str) -> Result<Option<MovieIdentity>, ProviderError> {
        let req = self.request("auto-complete", &[("q", query)])?;
        let resp = self.fetcher.fetch(req).await?;
        match resp.status {
            429 => Err(ProviderError::RateLimited { provider: PROVIDER }),
            404 => Ok(None),
            s if !(200..300).contains(&s) => Err(ProviderError::Status {
                provider: PROVIDER,
                status: s,
            }),
            _ => select_identity(&resp.body),
        }
    }

    /// 0–10 rating rounded to one decimal.
    pub async fn rating(&self, id: &str) -> Result<Option<f64>, ProviderError> {
        let req = self.request("title/get-ratings", &[("tconst", id)])?;
        let resp = self.fetcher.fetch(req).await?;
        let body: Option<Ratings> = decode_json(PROVIDER, resp)?;
        Ok(body
            .and_then(|r| r.rating)
            .and_then(|r| normalize_rating(r, 10.0))
            .map(round1))
    }

    pub async fn genres(&self, id: &str) -> Result<Option<Vec<String>>, ProviderError> {
        let req = self.request("title/get-genres", &[("tconst", id)])?;
        let resp = self.fetcher.fetch(req).await?;
        let genres: Option<Vec<String>> = decode_json(PROVIDER, resp)?;
        Ok(genres.map(|g| {
            g.into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        }))
    }
}
