// src/providers/mod.rs
pub mod imdb;
pub mod rt;
pub mod tmdb;
pub mod types;

use async_trait::async_trait;
use metrics::counter;
use reqwest::{redirect::Policy, Client};
use serde::de::DeserializeOwned;

use crate::providers::types::{HttpRequest, HttpResponse, PageFetcher, ProviderError};

/// Browser-like UA; Rotten Tomatoes serves a stripped page to unknown agents.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

/// `PageFetcher` backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for ReqwestFetcher {
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError> {
        let provider = request.provider;
        let mut builder = self
            .client
            .get(request.url.clone())
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let resp = builder.send().await.map_err(|e| transport(provider, &e))?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| transport(provider, &e))?;
        Ok(HttpResponse { status, body })
    }
}

fn transport(provider: &'static str, e: &reqwest::Error) -> ProviderError {
    let kind = if e.is_timeout() {
        "timeout"
    } else if e.is_redirect() {
        "too many redirects"
    } else if e.is_connect() {
        "connection error"
    } else {
        "request error"
    };
    ProviderError::Transport {
        provider,
        message: format!("{kind}: {e}"),
    }
}

/// Map a JSON API response to a typed body.
///
/// * 2xx → `Ok(Some(body))`
/// * 404 → `Ok(None)`
/// * 429 → `Err(RateLimited)`
/// * anything else → `Err(Status)`
pub(crate) fn decode_json<T: DeserializeOwned>(
    provider: &'static str,
    resp: HttpResponse,
) -> Result<Option<T>, ProviderError> {
    match resp.status {
        429 => return Err(ProviderError::RateLimited { provider }),
        404 => return Ok(None),
        _ if !resp.is_success() => {
            return Err(ProviderError::Status {
                provider,
                status: resp.status,
            })
        }
        _ => {}
    }
    serde_json::from_str(&resp.body)
        .map(Some)
        .map_err(|e| ProviderError::Malformed {
            provider,
            message: e.to_string(),
        })
}

/// Log + count a provider failure that is about to be absorbed.
pub(crate) fn record_provider_error(e: &ProviderError) {
    tracing::warn!(target: "providers", error = %e, provider = e.provider(), "provider error");
    counter!("ranklist_provider_errors_total", "provider" => e.provider()).increment(1);
}
