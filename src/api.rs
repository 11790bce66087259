use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::dispatch::SearchEntry;
use crate::providers::types::{MovieIdentity, ProviderError};
use crate::service::RatingService;

#[derive(Clone)]
pub struct AppState {
    pub service: RatingService,
}

pub fn router(service: RatingService) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/ping", get(|| async { "pong" }))
        .route("/api/movies/search", post(search_movies))
        .route("/api/movies/ranklist", post(ranklist))
        .route("/api/movies/{movie_id}/rating/{platform}", get(movie_rating))
        .route("/api/movies/{movie_id}/genres", get(movie_genres))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn error_response(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(json!({ "error": msg.into() }))).into_response()
}

fn provider_error_response(e: ProviderError) -> Response {
    // Only rate limits escape the service.
    let status = if e.is_rate_limited() {
        StatusCode::TOO_MANY_REQUESTS
    } else {
        StatusCode::BAD_GATEWAY
    };
    error_response(status, e.to_string())
}

/// `{"movies": [{"query": "The Matrix 1999"}, ...]}` → `{"movies": [...], "errors": [...]}`
async fn search_movies(State(state): State<AppState>, body: Option<Json<Value>>) -> Response {
    let Some(Json(body)) = body else {
        return error_response(StatusCode::BAD_REQUEST, "Request must include 'movies' array");
    };
    let Some(movies) = body.get("movies") else {
        return error_response(StatusCode::BAD_REQUEST, "Request must include 'movies' array");
    };
    let Some(items) = movies.as_array() else {
        return error_response(StatusCode::BAD_REQUEST, "'movies' must be an array");
    };

    // Entries without a usable `query` string still go through the batch
    // so they are reported in `errors`.
    let entries: Vec<SearchEntry> = items
        .iter()
        .map(|it| serde_json::from_value(it.clone()).unwrap_or_default())
        .collect();

    let outcome = state.service.search_movies_parallel(&entries).await;
    Json(outcome).into_response()
}

#[derive(Debug, Deserialize)]
struct RanklistRequest {
    movies: Vec<MovieIdentity>,
}

/// Enrich the posted identities and return them best score first.
async fn ranklist(
    State(state): State<AppState>,
    Json(req): Json<RanklistRequest>,
) -> Response {
    match crate::rank_identities(&state.service, &req.movies).await {
        Ok(ranked) => Json(ranked).into_response(),
        Err(e) => provider_error_response(e),
    }
}

#[derive(Debug, Default, Deserialize)]
struct RatingParams {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    year: Option<String>,
}

impl RatingParams {
    fn title(&self) -> Option<&str> {
        self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Unparsable years are ignored rather than rejected.
    fn year(&self) -> Option<u16> {
        self.year.as_deref().and_then(|y| y.trim().parse().ok())
    }
}

async fn movie_rating(
    State(state): State<AppState>,
    Path((movie_id, platform)): Path<(String, String)>,
    Query(params): Query<RatingParams>,
) -> Response {
    let service = &state.service;
    match platform.to_ascii_lowercase().as_str() {
        "imdb" => match service.fetch_imdb_rating(&movie_id).await {
            Ok(r) => Json(r).into_response(),
            Err(e) => provider_error_response(e),
        },
        "tmdb" => {
            let Some(title) = params.title() else {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "Title is required for TMDb rating lookup",
                );
            };
            match service.fetch_tmdb_rating(title, params.year()).await {
                Ok(r) => Json(r).into_response(),
                Err(e) => provider_error_response(e),
            }
        }
        "rt" => {
            let Some(title) = params.title() else {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "Title is required for RT rating lookup",
                );
            };
            Json(service.fetch_rt_rating(title, params.year()).await).into_response()
        }
        other => error_response(
            StatusCode::BAD_REQUEST,
            format!("Unknown platform: {other}. Supported: imdb, tmdb, rt"),
        ),
    }
}

async fn movie_genres(State(state): State<AppState>, Path(movie_id): Path<String>) -> Response {
    match state.service.fetch_imdb_genres(&movie_id).await {
        Ok(g) => Json(g).into_response(),
        Err(e) => provider_error_response(e),
    }
}
