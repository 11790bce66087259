// tests/service_ratings.rs
//
// Per-source rating lookups through the service: year validation,
// not-found shapes, rate-limit propagation and full enrichment.

mod common;

use common::{
    script_matrix, test_service, FakeFetcher, RT_MATRIX_HTML, TMDB_SEARCH_MATRIX,
    TMDB_SEARCH_RELOADED,
};
use movie_ranklist::{MovieIdentity, ProviderError, RtRating, TmdbRating};

fn matrix_identity() -> MovieIdentity {
    MovieIdentity {
        id: "tt0133093".into(),
        title: "The Matrix".into(),
        year: Some(1999),
        poster_url: "https://m.media-amazon.com/images/M/matrix.jpg".into(),
        title_kind: "movie".into(),
    }
}

#[tokio::test]
async fn tmdb_match_carries_rating_page_and_backdrops() {
    let f = FakeFetcher::new();
    script_matrix(&f);
    let (svc, _clock) = test_service(f.clone());

    let r = svc.fetch_tmdb_rating("The Matrix", Some(1999)).await.unwrap();
    assert_eq!(r.rating, Some(8.2));
    assert_eq!(r.year, Some(1999));
    assert_eq!(r.page_url, "https://www.themoviedb.org/movie/603");
    assert!(r.backdrop_url.ends_with("/fNG7i7RqMErkcqhohV2a6cV1Ehy.jpg"));
    assert!(r.backdrop_url_hd.contains("/original/"));

    let url = f.calls().pop().unwrap();
    assert!(url.contains("api_key=tmdb-key"), "{url}");
    assert!(url.contains("year=1999"), "{url}");
    assert!(url.contains("include_adult=true"), "{url}");
}

#[tokio::test]
async fn tmdb_year_outside_tolerance_is_discarded() {
    let f = FakeFetcher::new();
    f.on("search/movie", 200, TMDB_SEARCH_RELOADED);
    let (svc, _clock) = test_service(f);

    let r = svc.fetch_tmdb_rating("The Matrix", Some(1999)).await.unwrap();
    assert_eq!(r, TmdbRating::default());
}

#[tokio::test]
async fn tmdb_year_within_tolerance_is_kept() {
    let f = FakeFetcher::new();
    f.on("search/movie", 200, TMDB_SEARCH_MATRIX);
    let (svc, _clock) = test_service(f);

    let r = svc.fetch_tmdb_rating("The Matrix", Some(2000)).await.unwrap();
    assert_eq!(r.rating, Some(8.2));

    let strict = svc
        .fetch_tmdb_rating_with_tolerance("The Matrix", Some(2000), 0)
        .await
        .unwrap();
    assert_eq!(strict, TmdbRating::default());
}

#[tokio::test]
async fn unknown_year_fails_open() {
    let f = FakeFetcher::new();
    f.on("search/movie", 200, TMDB_SEARCH_RELOADED);
    let (svc, _clock) = test_service(f.clone());

    let r = svc.fetch_tmdb_rating("The Matrix", None).await.unwrap();
    assert_eq!(r.rating, Some(7.0));
    assert!(!f.calls()[0].contains("year="));
}

#[tokio::test]
async fn imdb_not_found_still_has_page_url() {
    let f = FakeFetcher::new();
    let (svc, _clock) = test_service(f);

    let r = svc.fetch_imdb_rating("tt9999999").await.unwrap();
    assert_eq!(r.rating, None);
    assert_eq!(r.page_url, "https://www.imdb.com/title/tt9999999/");
}

#[tokio::test]
async fn imdb_genres_use_the_genres_endpoint() {
    let f = FakeFetcher::new();
    script_matrix(&f);
    let (svc, _clock) = test_service(f.clone());

    let genres = svc.fetch_imdb_genres("tt0133093").await.unwrap();
    assert_eq!(genres.genres, vec!["Action".to_string(), "Sci-Fi".to_string()]);
    assert_eq!(
        f.calls(),
        vec!["http://imdb.test/title/get-genres?tconst=tt0133093".to_string()]
    );
}

#[tokio::test]
async fn rate_limit_propagates_and_is_not_cached() {
    let f = FakeFetcher::new();
    f.on("get-ratings", 429, "");
    let (svc, _clock) = test_service(f.clone());

    let err = svc.fetch_imdb_rating("tt0133093").await.unwrap_err();
    assert_eq!(err, ProviderError::RateLimited { provider: "imdb" });
    assert_eq!(err.to_string(), "Rate limited by imdb");

    svc.fetch_imdb_rating("tt0133093").await.unwrap_err();
    assert_eq!(f.calls_containing("get-ratings"), 2);
}

#[tokio::test]
async fn tmdb_rate_limit_propagates() {
    let f = FakeFetcher::new();
    f.on("search/movie", 429, "");
    let (svc, _clock) = test_service(f);

    let err = svc.fetch_tmdb_rating("The Matrix", Some(1999)).await.unwrap_err();
    assert!(err.is_rate_limited());
    assert_eq!(err.provider(), "tmdb");
}

#[tokio::test]
async fn malformed_payload_reads_as_not_found() {
    let f = FakeFetcher::new();
    f.on("search/movie", 200, "<html>oops</html>");
    let (svc, _clock) = test_service(f);

    let r = svc.fetch_tmdb_rating("The Matrix", Some(1999)).await.unwrap();
    assert_eq!(r, TmdbRating::default());
}

#[tokio::test]
async fn rt_year_mismatch_empties_result() {
    let f = FakeFetcher::new();
    f.on("rt.test/m/", 200, RT_MATRIX_HTML);
    let (svc, _clock) = test_service(f);

    let r = svc.fetch_rt_rating("The Matrix", Some(2021)).await;
    assert_eq!(r, RtRating::default());
}

#[tokio::test]
async fn enrich_scores_all_three_sources() {
    let f = FakeFetcher::new();
    script_matrix(&f);
    let (svc, _clock) = test_service(f);

    let m = svc.enrich(&matrix_identity()).await.unwrap();
    assert_eq!(m.imdb.rating, Some(8.7));
    assert_eq!(m.tmdb.rating, Some(8.2));
    assert_eq!(m.rt.rating, Some(8.3));
    // (8.7 + 8.2 + 8.3) / 3 = 8.4
    assert_eq!(m.average_score, Some(8.4));
    assert_eq!(m.logo_url, "https://m.media-amazon.com/images/M/matrix.jpg");
}

#[tokio::test]
async fn enrich_without_any_rating_has_no_score() {
    let f = FakeFetcher::new();
    let (svc, _clock) = test_service(f);

    let m = svc.enrich(&matrix_identity()).await.unwrap();
    assert_eq!(m.average_score, None);
    assert_eq!(m.imdb.page_url, "https://www.imdb.com/title/tt0133093/");
}

#[tokio::test]
async fn ranklist_keeps_movie_whose_enrich_panicked() {
    let f = FakeFetcher::new();
    script_matrix(&f);
    f.panic_on("get-ratings?tconst=tt0000666");
    let (svc, _clock) = test_service(f);

    let broken = MovieIdentity {
        id: "tt0000666".into(),
        title: "Broken Reel".into(),
        year: Some(1970),
        poster_url: "https://img.test/broken.jpg".into(),
        title_kind: "movie".into(),
    };
    let ranked = movie_ranklist::rank_identities(&svc, &[broken, matrix_identity()])
        .await
        .unwrap();

    let ids: Vec<_> = ranked.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["tt0133093", "tt0000666"]);
    let last = &ranked[1];
    assert_eq!(last.average_score, None);
    assert_eq!(last.title, "Broken Reel");
    assert_eq!(last.logo_url, "https://img.test/broken.jpg");
    assert_eq!(last.imdb.page_url, "https://www.imdb.com/title/tt0000666/");
}

#[tokio::test]
async fn ranklist_orders_by_score_and_drops_duplicates() {
    let f = FakeFetcher::new();
    script_matrix(&f);
    let (svc, _clock) = test_service(f);

    let unknown = MovieIdentity {
        id: "tt0000001".into(),
        title: "Unrated Short".into(),
        year: Some(1894),
        poster_url: String::new(),
        title_kind: "short".into(),
    };
    let ranked = movie_ranklist::rank_identities(
        &svc,
        &[unknown.clone(), matrix_identity(), matrix_identity()],
    )
    .await
    .unwrap();

    let ids: Vec<_> = ranked.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["tt0133093", "tt0000001"]);
    assert_eq!(ranked[1].average_score, None);
}
