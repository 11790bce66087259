// src/lib.rs
// Public library surface for integration tests (and the Shuttle binary).

pub mod api;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod metrics;
pub mod providers;
pub mod query;
pub mod score;
pub mod service;
pub mod year_match;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::config::RanklistConfig;
pub use crate::dispatch::{SearchEntry, SearchError, SearchOutcome};
pub use crate::providers::types::{
    ImdbGenres, ImdbRating, MovieIdentity, ProviderError, RankedMovie, RtRating, TmdbRating,
};
pub use crate::service::RatingService;

use ::metrics::counter;
use tracing::{info, warn};

/// Identity with no ratings attached; ranks after every scored movie.
fn unscored(identity: &MovieIdentity) -> RankedMovie {
    RankedMovie {
        id: identity.id.clone(),
        title: identity.title.clone(),
        year: identity.year,
        logo_url: identity.poster_url.clone(),
        imdb: ImdbRating {
            rating: None,
            page_url: providers::imdb::title_page_url(&identity.id),
        },
        tmdb: TmdbRating::default(),
        rt: RtRating::default(),
        average_score: None,
    }
}

/// Enrich every identity with all three ratings and return them ranked,
/// best score first. A rate limit from any provider fails the whole list;
/// a failed enrich task keeps its movie, unscored.
pub async fn rank_identities(
    service: &RatingService,
    identities: &[MovieIdentity],
) -> Result<Vec<RankedMovie>, ProviderError> {
    let handles: Vec<_> = identities
        .iter()
        .cloned()
        .map(|identity| {
            let service = service.clone();
            tokio::spawn(async move { service.enrich(&identity).await })
        })
        .collect();

    let mut movies = Vec::with_capacity(handles.len());
    for (identity, handle) in identities.iter().zip(handles) {
        match handle.await {
            Ok(res) => movies.push(res?),
            Err(e) => {
                warn!(target: "service", error = %e, id = %identity.id, "enrich worker failed");
                counter!("ranklist_worker_failures_total", "stage" => "enrich").increment(1);
                movies.push(unscored(identity));
            }
        }
    }

    let ranked = score::rank_movies(movies);
    info!(target: "service", ranked = ranked.len(), "ranklist built");
    Ok(ranked)
}
