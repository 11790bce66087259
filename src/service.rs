// src/service.rs
//! Rating service: the functional surface consumed by the web layer.
//!
//! Composes the three providers with per-lookup TTL caches and applies
//! the error policy: transport/status/payload failures are logged and
//! reported as "not found" (and never cached); only rate limiting
//! propagates so callers can back off.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::cache::{Clock, SystemClock, TtlCache};
use crate::config::{parse_base_url, RanklistConfig};
use crate::dispatch::{self, IdentityLookup, SearchEntry, SearchOutcome};
use crate::metrics::ensure_metrics_described;
use crate::providers::imdb::{self, ImdbClient};
use crate::providers::record_provider_error;
use crate::providers::rt::RtScraper;
use crate::providers::tmdb::{TmdbClient, TmdbMovie};
use crate::providers::types::{
    ImdbGenres, ImdbRating, MovieIdentity, PageFetcher, ProviderError, RankedMovie, RtRating,
    TmdbRating,
};
use crate::providers::ReqwestFetcher;
use crate::query::MovieQuery;
use crate::score::movie_score;
use crate::year_match::is_year_match;

struct Caches {
    search: TtlCache<Option<MovieIdentity>>,
    imdb_rating: TtlCache<Option<f64>>,
    imdb_genres: TtlCache<Option<Vec<String>>>,
    tmdb: TtlCache<Option<TmdbMovie>>,
    rt: TtlCache<RtRating>,
}

struct Inner {
    imdb: ImdbClient,
    tmdb: TmdbClient,
    rt: RtScraper,
    caches: Caches,
    year_tolerance: u16,
    max_concurrency: usize,
}

/// Cheap to clone; all clones share the same caches.
#[derive(Clone)]
pub struct RatingService {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RatingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RatingService")
            .field("year_tolerance", &self.inner.year_tolerance)
            .field("max_concurrency", &self.inner.max_concurrency)
            .finish_non_exhaustive()
    }
}

/// Cache read-through for fallible lookups. Only `Ok` results are stored.
async fn cached<T, Fut>(
    cache: &TtlCache<Option<T>>,
    key: String,
    fetch: Fut,
) -> Result<Option<T>, ProviderError>
where
    T: Clone,
    Fut: Future<Output = Result<Option<T>, ProviderError>>,
{
    if let Some(hit) = cache.get(&key) {
        return Ok(hit);
    }
    match fetch.await {
        Ok(found) => {
            cache.set(key, found.clone());
            Ok(found)
        }
        Err(e) => {
            record_provider_error(&e);
            if e.is_rate_limited() {
                Err(e)
            } else {
                Ok(None)
            }
        }
    }
}

impl RatingService {
    /// Production wiring: reqwest transport and the wall clock.
    pub fn from_config(config: &RanklistConfig) -> Result<Self> {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(ReqwestFetcher::new()?);
        Self::new(config, fetcher, Arc::new(SystemClock))
    }

    pub fn new(
        config: &RanklistConfig,
        fetcher: Arc<dyn PageFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        ensure_metrics_described();

        // Never log keys; lengths are enough to spot a missing one.
        info!(
            target: "service",
            imdb_key_len = config.imdb_api_key.len(),
            tmdb_key_len = config.tmdb_api_key.len(),
            max_concurrency = config.max_concurrency,
            cache_ttl_secs = config.cache_ttl_secs,
            "rating service configured"
        );

        let ttl = config.cache_ttl();
        let caches = Caches {
            search: TtlCache::new("search", ttl, clock.clone()),
            imdb_rating: TtlCache::new("imdb_rating", ttl, clock.clone()),
            imdb_genres: TtlCache::new("imdb_genres", ttl, clock.clone()),
            tmdb: TtlCache::new("tmdb", ttl, clock.clone()),
            rt: TtlCache::new("rt", ttl, clock),
        };

        let inner = Inner {
            imdb: ImdbClient::new(
                fetcher.clone(),
                parse_base_url(&config.imdb_base_url)?,
                config.imdb_api_key.clone(),
                config.api_timeout(),
            ),
            tmdb: TmdbClient::new(
                fetcher.clone(),
                parse_base_url(&config.tmdb_base_url)?,
                config.tmdb_api_key.clone(),
                config.api_timeout(),
            ),
            rt: RtScraper::new(
                fetcher,
                parse_base_url(&config.rt_base_url)?,
                config.scrape_timeout(),
            ),
            caches,
            year_tolerance: config.year_tolerance,
            max_concurrency: config.max_concurrency.max(1),
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn year_tolerance(&self) -> u16 {
        self.inner.year_tolerance
    }

    /// Resolve free text to a canonical identity (cached as `search:{query}`).
    pub async fn search_movie(&self, query: &str) -> Result<Option<MovieIdentity>, ProviderError> {
        let query = query.trim();
        cached(
            &self.inner.caches.search,
            format!("search:{query}"),
            self.inner.imdb.search(query),
        )
        .await
    }

    /// The page URL is derived from the id even when no rating is known.
    pub async fn fetch_imdb_rating(&self, id: &str) -> Result<ImdbRating, ProviderError> {
        let rating = cached(
            &self.inner.caches.imdb_rating,
            format!("imdbRating:{id}"),
            self.inner.imdb.rating(id),
        )
        .await?;
        Ok(ImdbRating {
            rating,
            page_url: imdb::title_page_url(id),
        })
    }

    pub async fn fetch_imdb_genres(&self, id: &str) -> Result<ImdbGenres, ProviderError> {
        let genres = cached(
            &self.inner.caches.imdb_genres,
            format!("imdbGenres:{id}"),
            self.inner.imdb.genres(id),
        )
        .await?;
        Ok(ImdbGenres {
            genres: genres.unwrap_or_default(),
        })
    }

    /// TMDb rating using the configured year tolerance.
    pub async fn fetch_tmdb_rating(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> Result<TmdbRating, ProviderError> {
        self.fetch_tmdb_rating_with_tolerance(title, year, self.inner.year_tolerance)
            .await
    }

    pub async fn fetch_tmdb_rating_with_tolerance(
        &self,
        title: &str,
        year: Option<u16>,
        tolerance: u16,
    ) -> Result<TmdbRating, ProviderError> {
        let title = title.trim();
        let hit = cached(
            &self.inner.caches.tmdb,
            format!("tmdbRating:{title}:{}", year.unwrap_or(0)),
            self.inner.tmdb.search_movie(title, year),
        )
        .await?;

        let Some(movie) = hit else {
            return Ok(TmdbRating::default());
        };
        if !is_year_match(year, movie.release_year(), tolerance) {
            debug!(
                target: "tmdb",
                title,
                expected = ?year,
                actual = ?movie.release_year(),
                "year mismatch; discarding hit"
            );
            return Ok(TmdbRating::default());
        }
        Ok(movie.into_rating())
    }

    /// Rotten Tomatoes scores using the configured year tolerance.
    /// Scrape failures never surface; they yield an empty result.
    pub async fn fetch_rt_rating(&self, title: &str, year: Option<u16>) -> RtRating {
        self.fetch_rt_rating_with_tolerance(title, year, self.inner.year_tolerance)
            .await
    }

    pub async fn fetch_rt_rating_with_tolerance(
        &self,
        title: &str,
        year: Option<u16>,
        tolerance: u16,
    ) -> RtRating {
        let title = title.trim();
        let key = format!("rtRating:{title}:{}", year.unwrap_or(0));
        let scraped = match self.inner.caches.rt.get(&key) {
            Some(hit) => hit,
            None => {
                let fresh = self.inner.rt.fetch(title, year).await;
                // An empty page URL means no page was fetched at all; retry next time.
                if !fresh.page_url.is_empty() {
                    self.inner.caches.rt.set(key, fresh.clone());
                }
                fresh
            }
        };

        if !is_year_match(year, scraped.year, tolerance) {
            debug!(
                target: "rt",
                title,
                expected = ?year,
                actual = ?scraped.year,
                "year mismatch; discarding scores"
            );
            return RtRating::default();
        }
        scraped
    }

    /// Batch identity search across the bounded worker pool.
    pub async fn search_movies_parallel(&self, entries: &[SearchEntry]) -> SearchOutcome {
        dispatch::search_parallel(self.clone(), entries, self.inner.max_concurrency).await
    }

    /// Fetch all three ratings for one identity concurrently and score it.
    pub async fn enrich(&self, identity: &MovieIdentity) -> Result<RankedMovie, ProviderError> {
        let (imdb, tmdb, rt) = tokio::join!(
            self.fetch_imdb_rating(&identity.id),
            self.fetch_tmdb_rating(&identity.title, identity.year),
            self.fetch_rt_rating(&identity.title, identity.year),
        );
        let (imdb, tmdb) = (imdb?, tmdb?);
        let average_score = movie_score(&imdb, &tmdb, &rt);

        Ok(RankedMovie {
            id: identity.id.clone(),
            title: identity.title.clone(),
            year: identity.year,
            logo_url: identity.poster_url.clone(),
            imdb,
            tmdb,
            rt,
            average_score,
        })
    }
}

#[async_trait]
impl IdentityLookup for RatingService {
    async fn lookup(&self, query: &MovieQuery) -> Result<Option<MovieIdentity>, ProviderError> {
        self.search_movie(&query.raw_text).await
    }
}
