// src/providers/tmdb.rs
//! TMDb movie search (rating by title + year).

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use crate::providers::decode_json;
use crate::providers::types::{HttpRequest, PageFetcher, ProviderError, TmdbRating};
use crate::score::{normalize_rating, round1};

pub const PROVIDER: &str = "tmdb";
pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3/";
pub const MOVIE_PAGE_BASE: &str = "https://www.themoviedb.org/movie/";
pub const BACKDROP_BASE: &str = "https://image.tmdb.org/t/p/w1280";
pub const BACKDROP_BASE_HD: &str = "https://image.tmdb.org/t/p/original";

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    results: Vec<Value>,
}

/// First search hit, before year validation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TmdbMovie {
    pub id: u64,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
}

impl TmdbMovie {
    /// Year from `YYYY-MM-DD`.
    pub fn release_year(&self) -> Option<u16> {
        self.release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse::<u16>().ok())
            .filter(|y| *y > 0)
    }

    pub fn into_rating(self) -> TmdbRating {
        let year = self.release_year();
        let (backdrop_url, backdrop_url_hd) = match self.backdrop_path.as_deref() {
            Some(p) if !p.is_empty() => (
                format!("{BACKDROP_BASE}{p}"),
                format!("{BACKDROP_BASE_HD}{p}"),
            ),
            _ => (String::new(), String::new()),
        };
        TmdbRating {
            rating: self
                .vote_average
                .and_then(|v| normalize_rating(v, 10.0))
                .map(round1),
            page_url: format!("{MOVIE_PAGE_BASE}{}", self.id),
            year,
            backdrop_url,
            backdrop_url_hd,
        }
    }
}

/// Only the first result is considered; a malformed first result counts as
/// no match.
pub(crate) fn first_result(payload: SearchResponse) -> Option<TmdbMovie> {
    payload
        .results
        .into_iter()
        .next()
        .and_then(|v| serde_json::from_value(v).ok())
}

#[derive(Clone)]
pub struct TmdbClient {
    fetcher: Arc<dyn PageFetcher>,
    base_url: Url,
    api_key: String,
    timeout: Duration,
}

impl TmdbClient {
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

    pub async fn search_movie(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> Result<Option<TmdbMovie>, ProviderError> {
        let mut url = self
            .base_url
            .join("search/movie")
            .map_err(|e| ProviderError::Transport {
                provider: PROVIDER,
                message: format!("bad url: {e}"),
            })?;
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("api_key", &self.api_key)
                .append_pair("language", "en-US")
                .append_pair("query", title)
                .append_pair("include_adult", "true");
            if let Some(y) = year.filter(|y| *y > 0) {
                q.append_pair("year", &y.to_string());
            }
        }

        let resp = self
            .fetcher
            .fetch(HttpRequest::get(PROVIDER, url, self.timeout))
            .await?;
        let payload: Option<SearchResponse> = decode_json(PROVIDER, resp)?;
        Ok(payload.and_then(first_result))
    }
}
