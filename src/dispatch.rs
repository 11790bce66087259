// src/dispatch.rs
//! Batch fan-out/fan-in for identity searches.
//!
//! Every entry is parsed up front; unparsable entries go straight to the
//! error list. The rest run as tokio tasks gated by a semaphore (at most
//! `max_concurrency` lookups in flight) and are collected in completion
//! order. The call returns once every task has finished.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::providers::types::{MovieIdentity, ProviderError};
use crate::query::{parse_movie_query, MovieQuery};

pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

pub const ERR_MISSING_QUERY: &str = "query is required";
pub const ERR_EMPTY_QUERY: &str = "Empty query";
pub const ERR_NOT_FOUND: &str = "Movie not found";
pub const ERR_WORKER_FAILED: &str = "Search failed";

/// One batch entry as sent by the client: `{"query": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEntry {
    #[serde(default)]
    pub query: Option<String>,
}

impl From<&str> for SearchEntry {
    fn from(q: &str) -> Self {
        Self {
            query: Some(q.to_string()),
        }
    }
}

/// Identity metadata returned for a found query (no ratings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieSummary {
    pub id: String,
    pub query: String,
    pub title: String,
    pub year: Option<u16>,
    pub logo_url: String,
}

impl MovieSummary {
    pub fn new(query: &MovieQuery, identity: MovieIdentity) -> Self {
        Self {
            id: identity.id,
            query: query.raw_text.clone(),
            title: identity.title,
            year: identity.year,
            logo_url: identity.poster_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchError {
    pub query: String,
    pub error: String,
}

impl SearchError {
    pub fn new(query: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            error: error.into(),
        }
    }
}

/// Unordered success/error split for one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub movies: Vec<MovieSummary>,
    pub errors: Vec<SearchError>,
}

/// Resolves a parsed query to an identity. Implemented by the rating
/// service; tests plug in fakes.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn lookup(&self, query: &MovieQuery) -> Result<Option<MovieIdentity>, ProviderError>;
}

/// Fan the batch out over at most `max_concurrency` concurrent lookups.
pub async fn search_parallel<L>(
    lookup: L,
    entries: &[SearchEntry],
    max_concurrency: usize,
) -> SearchOutcome
where
    L: IdentityLookup + Clone + 'static,
{
    let t0 = Instant::now();
    let mut out = SearchOutcome::default();
    let permits = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut in_flight: HashMap<tokio::task::Id, String> = HashMap::new();

    for entry in entries {
        let Some(raw) = entry.query.as_deref() else {
            out.errors.push(SearchError::new("", ERR_MISSING_QUERY));
            continue;
        };
        let Some(query) = parse_movie_query(raw) else {
            out.errors.push(SearchError::new(raw, ERR_EMPTY_QUERY));
            continue;
        };

        let lookup = lookup.clone();
        let permits = permits.clone();
        let raw_text = query.raw_text.clone();
        let handle = tasks.spawn(async move {
            // The semaphore is never closed, so acquisition only waits.
            let _permit = permits.acquire_owned().await.ok();
            let res = lookup.lookup(&query).await;
            (query, res)
        });
        in_flight.insert(handle.id(), raw_text);
    }

    let scheduled = in_flight.len();
    let rejected = out.errors.len();

    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((id, (query, res))) => {
                in_flight.remove(&id);
                match res {
                    Ok(Some(identity)) => out.movies.push(MovieSummary::new(&query, identity)),
                    Ok(None) => out.errors.push(SearchError::new(query.raw_text, ERR_NOT_FOUND)),
                    Err(e) => out.errors.push(SearchError::new(query.raw_text, e.to_string())),
                }
            }
            Err(e) => {
                let query = in_flight.remove(&e.id()).unwrap_or_default();
                warn!(target: "dispatch", error = %e, %query, "search worker failed");
                counter!("ranklist_worker_failures_total", "stage" => "search").increment(1);
                out.errors.push(SearchError::new(query, ERR_WORKER_FAILED));
            }
        }
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    counter!("ranklist_batch_queries_total").increment(entries.len() as u64);
    histogram!("ranklist_batch_duration_ms").record(ms);
    info!(
        target: "dispatch",
        total = entries.len(),
        scheduled,
        rejected,
        found = out.movies.len(),
        errors = out.errors.len(),
        ms,
        "batch search finished"
    );

    out
}
