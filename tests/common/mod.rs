// tests/common/mod.rs
//
// Shared test doubles: a scripted `PageFetcher` that records every URL it
// is asked for, plus a service builder wired to it and a manual clock.
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use movie_ranklist::cache::ManualClock;
use movie_ranklist::providers::types::{HttpRequest, HttpResponse, PageFetcher, ProviderError};
use movie_ranklist::{RanklistConfig, RatingService};

pub const IMDB_BASE: &str = "http://imdb.test/";
pub const TMDB_BASE: &str = "http://tmdb.test/3/";
pub const RT_BASE: &str = "http://rt.test/";

pub const IMDB_AUTOCOMPLETE_MATRIX: &str = include_str!("../fixtures/imdb_autocomplete_matrix.json");
pub const IMDB_AUTOCOMPLETE_EMPTY: &str = include_str!("../fixtures/imdb_autocomplete_empty.json");
pub const IMDB_RATINGS_MATRIX: &str = include_str!("../fixtures/imdb_ratings_matrix.json");
pub const IMDB_GENRES_MATRIX: &str = include_str!("../fixtures/imdb_genres_matrix.json");
pub const TMDB_SEARCH_MATRIX: &str = include_str!("../fixtures/tmdb_search_matrix.json");
pub const TMDB_SEARCH_RELOADED: &str = include_str!("../fixtures/tmdb_search_reloaded.json");
pub const RT_MATRIX_HTML: &str = include_str!("../fixtures/rt_matrix.html");
pub const RT_NO_SCORE_HTML: &str = include_str!("../fixtures/rt_no_score.html");
pub const RT_AUDIENCE_ONLY_HTML: &str = include_str!("../fixtures/rt_audience_only.html");

#[derive(Clone)]
enum Matcher {
    Exact(String),
    Contains(String),
}

impl Matcher {
    fn matches(&self, url: &str) -> bool {
        match self {
            Matcher::Exact(u) => url == u,
            Matcher::Contains(s) => url.contains(s.as_str()),
        }
    }
}

#[derive(Clone)]
enum Reply {
    Response(HttpResponse),
    Fail(ProviderError),
    Panic,
}

/// Replies with the first matching route; unmatched URLs get a 404.
#[derive(Default)]
pub struct FakeFetcher {
    routes: Mutex<Vec<(Matcher, Reply)>>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Route any URL containing `needle`.
    pub fn on(&self, needle: &str, status: u16, body: &str) -> &Self {
        self.routes.lock().push((
            Matcher::Contains(needle.to_string()),
            Reply::Response(HttpResponse {
                status,
                body: body.to_string(),
            }),
        ));
        self
    }

    /// Route exactly one URL.
    pub fn on_exact(&self, url: &str, status: u16, body: &str) -> &Self {
        self.routes.lock().push((
            Matcher::Exact(url.to_string()),
            Reply::Response(HttpResponse {
                status,
                body: body.to_string(),
            }),
        ));
        self
    }

    /// Fail any URL containing `needle` at the transport level.
    pub fn fail(&self, needle: &str, err: ProviderError) -> &Self {
        self.routes
            .lock()
            .push((Matcher::Contains(needle.to_string()), Reply::Fail(err)));
        self
    }

    /// Panic inside the fetch for any URL containing `needle`.
    pub fn panic_on(&self, needle: &str) -> &Self {
        self.routes
            .lock()
            .push((Matcher::Contains(needle.to_string()), Reply::Panic));
        self
    }

    /// Drop every scripted route (calls are kept).
    pub fn reset_routes(&self) {
        self.routes.lock().clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn calls_containing(&self, needle: &str) -> usize {
        self.calls.lock().iter().filter(|u| u.contains(needle)).count()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError> {
        let url = request.url.to_string();
        self.calls.lock().push(url.clone());

        let reply = self
            .routes
            .lock()
            .iter()
            .find(|(m, _)| m.matches(&url))
            .map(|(_, r)| r.clone());

        match reply {
            Some(Reply::Response(r)) => Ok(r),
            Some(Reply::Fail(e)) => Err(e),
            Some(Reply::Panic) => panic!("scripted panic for {url}"),
            None => Ok(HttpResponse {
                status: 404,
                body: String::new(),
            }),
        }
    }
}

pub fn test_config() -> RanklistConfig {
    RanklistConfig {
        imdb_api_key: "imdb-key".into(),
        tmdb_api_key: "tmdb-key".into(),
        imdb_base_url: IMDB_BASE.into(),
        tmdb_base_url: TMDB_BASE.into(),
        rt_base_url: RT_BASE.into(),
        ..RanklistConfig::default()
    }
}

/// Service over the fake fetcher with a clock starting at t=1_000_000.
pub fn test_service(fetcher: Arc<FakeFetcher>) -> (RatingService, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_000_000));
    let service = RatingService::new(&test_config(), fetcher, clock.clone())
        .expect("build test service");
    (service, clock)
}

/// Routes every provider answers for "The Matrix" (1999).
pub fn script_matrix(f: &FakeFetcher) {
    f.on("auto-complete?q=The+Matrix", 200, IMDB_AUTOCOMPLETE_MATRIX)
        .on("get-ratings?tconst=tt0133093", 200, IMDB_RATINGS_MATRIX)
        .on("get-genres?tconst=tt0133093", 200, IMDB_GENRES_MATRIX)
        .on("query=The+Matrix", 200, TMDB_SEARCH_MATRIX)
        .on_exact("http://rt.test/m/the_matrix_1999", 200, RT_MATRIX_HTML);
}
