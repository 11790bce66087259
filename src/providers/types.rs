// src/providers/types.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Canonical title identity resolved by the identity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieIdentity {
    pub id: String, // e.g. "tt0133093"
    pub title: String,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default, alias = "logo_url")]
    pub poster_url: String,
    #[serde(default)]
    pub title_kind: String, // e.g. "movie", "tvSeries"
}

/// IMDb rating by canonical id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImdbRating {
    pub rating: Option<f64>,
    pub page_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImdbGenres {
    pub genres: Vec<String>,
}

/// TMDb rating by title (+ year). The empty value means "no usable match".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TmdbRating {
    pub rating: Option<f64>,
    pub page_url: String,
    pub year: Option<u16>,
    pub backdrop_url: String,
    pub backdrop_url_hd: String,
}

/// Rotten Tomatoes scores, both on a 0–10 scale.
/// `rating` mirrors the tomatometer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RtRating {
    pub rating: Option<f64>,
    pub tomatometer: Option<f64>,
    pub popcornmeter: Option<f64>,
    pub page_url: String,
    pub year: Option<u16>,
}

/// A movie with every source attached, ready for ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedMovie {
    pub id: String,
    pub title: String,
    pub year: Option<u16>,
    pub logo_url: String,
    pub imdb: ImdbRating,
    pub tmdb: TmdbRating,
    pub rt: RtRating,
    pub average_score: Option<f64>,
}

/// Provider failures. Only `RateLimited` is allowed to reach callers of
/// the service; everything else degrades to "not found".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider}: transport error: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },
    #[error("{provider}: unexpected HTTP status {status}")]
    Status { provider: &'static str, status: u16 },
    #[error("{provider}: malformed payload: {message}")]
    Malformed {
        provider: &'static str,
        message: String,
    },
    #[error("Rate limited by {provider}")]
    RateLimited { provider: &'static str },
}

impl ProviderError {
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Transport { provider, .. }
            | Self::Status { provider, .. }
            | Self::Malformed { provider, .. }
            | Self::RateLimited { provider } => provider,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// One outbound GET.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub provider: &'static str,
    pub url: Url,
    pub headers: Vec<(&'static str, String)>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn get(provider: &'static str, url: Url, timeout: Duration) -> Self {
        Self {
            provider,
            url,
            headers: Vec::new(),
            timeout,
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network seam shared by every provider. Implementations must enforce
/// `HttpRequest::timeout` and report connect/timeout/redirect failures as
/// `ProviderError::Transport`; any HTTP status is returned as a response.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError>;
}
