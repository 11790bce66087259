//! # Score Aggregation
//!
//! Combines per-source ratings (all on a 0–10 scale) into one composite
//! score and orders enriched movies by it.
//!
//! - Absent and zero ratings are excluded from the denominator.
//! - No qualifying source → no score (`None`), never `0.0`.
//! - Output is rounded to one decimal, half away from zero.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::providers::types::{ImdbRating, RankedMovie, RtRating, TmdbRating};

/// Round to one decimal place.
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Normalize a provider value on `scale` (10 or 100 or 1) to 0–10.
/// Non-finite, negative and zero values are reported as absent.
pub fn normalize_rating(value: f64, scale: f64) -> Option<f64> {
    if !value.is_finite() || scale <= 0.0 {
        return None;
    }
    let v = if scale == 10.0 {
        value
    } else {
        value * 10.0 / scale
    };
    if v > 0.0 {
        Some(v.min(10.0))
    } else {
        None
    }
}

/// Mean of present, strictly positive ratings.
pub fn average_score(ratings: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = ratings
        .iter()
        .flatten()
        .copied()
        .filter(|r| r.is_finite() && *r > 0.0)
        .collect();

    if present.is_empty() {
        return None;
    }
    let sum: f64 = present.iter().sum();
    Some(round1(sum / present.len() as f64))
}

/// Composite score for one movie. The Rotten Tomatoes contribution is the
/// critics score (tomatometer).
pub fn movie_score(imdb: &ImdbRating, tmdb: &TmdbRating, rt: &RtRating) -> Option<f64> {
    average_score(&[imdb.rating, tmdb.rating, rt.rating])
}

/// Drop duplicate ids (first wins) and sort by score, best first.
/// Movies without a score go last, in input order.
pub fn rank_movies(movies: Vec<RankedMovie>) -> Vec<RankedMovie> {
    let mut seen = HashSet::new();
    let mut out: Vec<RankedMovie> = movies
        .into_iter()
        .filter(|m| seen.insert(m.id.clone()))
        .collect();

    out.sort_by(|a, b| match (a.average_score, b.average_score) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    out
}
