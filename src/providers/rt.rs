// src/providers/rt.rs
//! Rotten Tomatoes scores by scraping the public movie page.
//!
//! Best effort only: markup drifts, so every failure (HTTP, timeout,
//! unparsable page) degrades to an empty `RtRating` instead of an error.
//! With a known year the `{slug}_{year}` page is tried first and the bare
//! `{slug}` page is the fallback.

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::providers::types::{HttpRequest, PageFetcher, RtRating};
use crate::providers::{record_provider_error, USER_AGENT};
use crate::score::normalize_rating;
use crate::year_match::known_year;

pub const PROVIDER: &str = "rt";
pub const DEFAULT_BASE_URL: &str = "https://www.rottentomatoes.com/";

static SCOREBOARD: Lazy<Selector> =
    Lazy::new(|| Selector::parse("score-board, media-scorecard").expect("scoreboard selector"));
static LD_JSON: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("ld+json selector")
});
static AUDIENCE_QA: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[data-qa="audience-score"]"#).expect("audience selector"));
static WITH_CLASS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[class]").expect("class selector"));

static RE_AUDIENCE_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)audience.*score").expect("audience class regex"));
static RE_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)").expect("digits regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// `"Spider-Man: No Way Home"` → `"spiderman_no_way_home"`.
pub fn title_to_slug(title: &str) -> String {
    let stripped: String = title
        .to_lowercase()
        .chars()
        .filter(|c| {
            !matches!(
                c,
                '\'' | '\u{2019}' | ':' | '!' | '?' | ',' | '.' | '-' | '(' | ')'
            )
        })
        .collect();
    RE_WS.replace_all(stripped.trim(), "_").into_owned()
}

/// Scores found on one page, already on a 0–10 scale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapedPage {
    pub tomatometer: Option<f64>,
    pub popcornmeter: Option<f64>,
    pub year: Option<u16>,
}

impl ScrapedPage {
    pub fn has_score(&self) -> bool {
        self.tomatometer.is_some() || self.popcornmeter.is_some()
    }
}

fn attr_score(el: &ElementRef<'_>, names: &[&str]) -> Option<f64> {
    names
        .iter()
        .filter_map(|n| el.value().attr(n))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .and_then(|v| v.parse::<f64>().ok())
        .and_then(|v| normalize_rating(v, 100.0))
}

fn json_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    }
}

fn year_prefix(s: &str) -> Option<u16> {
    s.get(..4).and_then(|y| y.parse::<u16>().ok()).filter(|y| *y > 0)
}

fn read_ld_object(obj: &Value, page: &mut ScrapedPage) {
    if page.tomatometer.is_none() {
        page.tomatometer = obj
            .get("aggregateRating")
            .and_then(|r| r.get("ratingValue"))
            .and_then(json_number)
            .and_then(|v| normalize_rating(v, 100.0));
    }
    if page.year.is_none() {
        page.year = ["datePublished", "dateCreated"]
            .iter()
            .filter_map(|k| obj.get(*k).and_then(Value::as_str))
            .find_map(year_prefix);
    }
}

fn audience_from_text(el: &ElementRef<'_>) -> Option<f64> {
    let text: String = el.text().collect();
    RE_DIGITS
        .captures(text.trim())
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .and_then(|v| normalize_rating(v, 100.0))
}

/// Extract scores from a movie page.
///
/// Order: scoreboard element attributes, then JSON-LD
/// (`aggregateRating.ratingValue`, `datePublished`), then any element
/// tagged as an audience score.
pub fn parse_rt_page(html: &str) -> ScrapedPage {
    let doc = Html::parse_document(html);
    let mut page = ScrapedPage::default();

    if let Some(board) = doc.select(&SCOREBOARD).next() {
        page.tomatometer = attr_score(&board, &["tomatometerscore", "criticsscore"]);
        page.popcornmeter = attr_score(&board, &["audiencescore"]);
    }

    for script in doc.select(&LD_JSON) {
        let raw: String = script.text().collect();
        let Ok(data) = serde_json::from_str::<Value>(&raw) else {
            continue;
        };
        match &data {
            Value::Array(items) => items.iter().for_each(|o| read_ld_object(o, &mut page)),
            Value::Object(_) => read_ld_object(&data, &mut page),
            _ => {}
        }
        if page.tomatometer.is_some() && page.year.is_some() {
            break;
        }
    }

    if page.popcornmeter.is_none() {
        page.popcornmeter = doc.select(&AUDIENCE_QA).find_map(|el| audience_from_text(&el));
    }
    if page.popcornmeter.is_none() {
        page.popcornmeter = doc
            .select(&WITH_CLASS)
            .filter(|el| {
                el.value()
                    .attr("class")
                    .is_some_and(|c| RE_AUDIENCE_CLASS.is_match(c))
            })
            .find_map(|el| audience_from_text(&el));
    }

    page
}

#[derive(Clone)]
pub struct RtScraper {
    fetcher: Arc<dyn PageFetcher>,
    base_url: Url,
    timeout: Duration,
}

impl RtScraper {
    pub fn new(fetcher: Arc<dyn PageFetcher>, base_url: Url, timeout: Duration) -> Self {
        Self {
            fetcher,
            base_url,
            timeout,
        }
    }

    /// `{base}/m/{slug}`.
    pub fn page_url(&self, slug: &str) -> Option<Url> {
        self.base_url.join(&format!("m/{slug}")).ok()
    }

    async fn fetch_page(&self, url: Url) -> RtRating {
        let req =
            HttpRequest::get(PROVIDER, url.clone(), self.timeout).header("User-Agent", USER_AGENT);
        let resp = match self.fetcher.fetch(req).await {
            Ok(r) => r,
            Err(e) => {
                record_provider_error(&e);
                return RtRating::default();
            }
        };
        if !resp.is_success() {
            debug!(target: "rt", url = %url, status = resp.status, "page not available");
            return RtRating::default();
        }

        let page = parse_rt_page(&resp.body);
        RtRating {
            rating: page.tomatometer,
            tomatometer: page.tomatometer,
            popcornmeter: page.popcornmeter,
            page_url: url.to_string(),
            year: page.year,
        }
    }

    /// Scrape scores for `title`, trying the year-suffixed page first.
    pub async fn fetch(&self, title: &str, year: Option<u16>) -> RtRating {
        let slug = title_to_slug(title);
        if slug.is_empty() {
            return RtRating::default();
        }

        if let Some(y) = known_year(year) {
            if let Some(url) = self.page_url(&format!("{slug}_{y}")) {
                let r = self.fetch_page(url).await;
                if r.tomatometer.is_some() || r.popcornmeter.is_some() {
                    return r;
                }
                debug!(target: "rt", %slug, year = y, "year page had no score; trying bare slug");
            }
        }

        match self.page_url(&slug) {
            Some(url) => self.fetch_page(url).await,
            None => RtRating::default(),
        }
    }
}
