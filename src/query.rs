// src/query.rs
//! Query parsing: raw search text → title + optional release year.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A parsed search request. `raw_text` is the cleaned input (no `\r`, trimmed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieQuery {
    pub raw_text: String,
    pub title: String,
    pub year: Option<u16>,
}

fn year_token_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\b(1[89]\d\d|2\d{3})\b").expect("year regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

/// Parse a raw query like `"The Matrix 1999"`.
///
/// The last year-shaped token wins (`"Blade Runner 2049 2017"` → title
/// `"Blade Runner 2049"`, year 2017). Returns `None` for empty input.
pub fn parse_movie_query(raw: &str) -> Option<MovieQuery> {
    let cleaned = raw.replace('\r', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }

    let Some(m) = year_token_re().find_iter(cleaned).last() else {
        return Some(MovieQuery {
            raw_text: cleaned.to_string(),
            title: cleaned.to_string(),
            year: None,
        });
    };

    let mut title = String::with_capacity(cleaned.len());
    title.push_str(&cleaned[..m.start()]);
    title.push(' ');
    title.push_str(&cleaned[m.end()..]);
    let title = whitespace_re().replace_all(title.trim(), " ").to_string();

    // A bare year ("1917") is a title, not a year filter.
    if title.is_empty() {
        return Some(MovieQuery {
            raw_text: cleaned.to_string(),
            title: cleaned.to_string(),
            year: None,
        });
    }

    Some(MovieQuery {
        raw_text: cleaned.to_string(),
        title,
        year: m.as_str().parse::<u16>().ok(),
    })
}

/// Collect raw queries from a single-line field and a multi-line field.
/// Blank lines are kept so the dispatcher can report them as errors.
pub fn split_query_lines(single: Option<&str>, multiple: Option<&str>) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(s) = single.filter(|s| !s.is_empty()) {
        out.push(s.replace('\r', ""));
    }
    if let Some(m) = multiple.filter(|m| !m.is_empty()) {
        out.extend(m.split('\n').map(|line| line.replace('\r', "")));
    }
    out
}
