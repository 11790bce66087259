// src/config/ranklist.rs
use anyhow::{anyhow, Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::providers::{imdb, rt, tmdb};
use crate::year_match::DEFAULT_YEAR_TOLERANCE;

pub const DEFAULT_RANKLIST_CONFIG_PATH: &str = "config/ranklist.toml";
pub const ENV_RANKLIST_CONFIG_PATH: &str = "RANKLIST_CONFIG_PATH";

pub const ENV_IMDB_API_KEY: &str = "IMDB_API_KEY";
pub const ENV_TMDB_API_KEY: &str = "TMDB_API_KEY";
pub const ENV_IMDB_BASE_URL: &str = "IMDB_BASE_URL";
pub const ENV_TMDB_BASE_URL: &str = "TMDB_BASE_URL";
pub const ENV_RT_BASE_URL: &str = "RT_BASE_URL";
pub const ENV_MAX_CONCURRENCY: &str = "RANKLIST_MAX_CONCURRENCY";
pub const ENV_CACHE_TTL_SECS: &str = "RANKLIST_CACHE_TTL_SECS";

fn default_imdb_base_url() -> String {
    imdb::DEFAULT_BASE_URL.to_string()
}
fn default_tmdb_base_url() -> String {
    tmdb::DEFAULT_BASE_URL.to_string()
}
fn default_rt_base_url() -> String {
    rt::DEFAULT_BASE_URL.to_string()
}
fn default_api_timeout_secs() -> u64 {
    5
}
fn default_scrape_timeout_secs() -> u64 {
    10
}
fn default_max_concurrency() -> usize {
    10
}
fn default_cache_ttl_secs() -> u64 {
    3600
}
fn default_year_tolerance() -> u16 {
    DEFAULT_YEAR_TOLERANCE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RanklistConfig {
    /// RapidAPI key for the IMDb endpoints.
    #[serde(default)]
    pub imdb_api_key: String,
    #[serde(default)]
    pub tmdb_api_key: String,
    #[serde(default = "default_imdb_base_url")]
    pub imdb_base_url: String,
    #[serde(default = "default_tmdb_base_url")]
    pub tmdb_base_url: String,
    #[serde(default = "default_rt_base_url")]
    pub rt_base_url: String,
    /// Per-request timeout for the JSON APIs.
    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,
    /// Per-request timeout for page scrapes.
    #[serde(default = "default_scrape_timeout_secs")]
    pub scrape_timeout_secs: u64,
    /// In-flight identity lookups per batch.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_year_tolerance")]
    pub year_tolerance: u16,
}

impl Default for RanklistConfig {
    fn default() -> Self {
        Self {
            imdb_api_key: String::new(),
            tmdb_api_key: String::new(),
            imdb_base_url: default_imdb_base_url(),
            tmdb_base_url: default_tmdb_base_url(),
            rt_base_url: default_rt_base_url(),
            api_timeout_secs: default_api_timeout_secs(),
            scrape_timeout_secs: default_scrape_timeout_secs(),
            max_concurrency: default_max_concurrency(),
            cache_ttl_secs: default_cache_ttl_secs(),
            year_tolerance: default_year_tolerance(),
        }
    }
}

impl RanklistConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading ranklist config from {}", path.display()))?;
        let cfg: RanklistConfig = toml::from_str(&data)
            .with_context(|| format!("parsing ranklist config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Resolution order:
    /// 1) $RANKLIST_CONFIG_PATH (must exist)
    /// 2) config/ranklist.toml
    /// 3) built-in defaults
    ///
    /// Environment variables override whatever the file says.
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = env::var(ENV_RANKLIST_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!(
                    "{ENV_RANKLIST_CONFIG_PATH} points to non-existent path"
                ));
            }
            Self::load_from_file(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_RANKLIST_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from_file(&default_p)?
            } else {
                Self::default()
            }
        };
        base.with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(v) = env::var(ENV_IMDB_API_KEY) {
            self.imdb_api_key = v;
        }
        if let Ok(v) = env::var(ENV_TMDB_API_KEY) {
            self.tmdb_api_key = v;
        }
        if let Ok(v) = env::var(ENV_IMDB_BASE_URL) {
            self.imdb_base_url = v;
        }
        if let Ok(v) = env::var(ENV_TMDB_BASE_URL) {
            self.tmdb_base_url = v;
        }
        if let Ok(v) = env::var(ENV_RT_BASE_URL) {
            self.rt_base_url = v;
        }
        if let Ok(v) = env::var(ENV_MAX_CONCURRENCY) {
            self.max_concurrency = v
                .trim()
                .parse()
                .with_context(|| format!("{ENV_MAX_CONCURRENCY} must be an integer"))?;
        }
        if let Ok(v) = env::var(ENV_CACHE_TTL_SECS) {
            self.cache_ttl_secs = v
                .trim()
                .parse()
                .with_context(|| format!("{ENV_CACHE_TTL_SECS} must be an integer"))?;
        }
        Ok(self.sanitized())
    }

    /// Out-of-range values fall back to defaults.
    pub fn sanitized(mut self) -> Self {
        if self.max_concurrency == 0 {
            self.max_concurrency = default_max_concurrency();
        }
        if self.api_timeout_secs == 0 {
            self.api_timeout_secs = default_api_timeout_secs();
        }
        if self.scrape_timeout_secs == 0 {
            self.scrape_timeout_secs = default_scrape_timeout_secs();
        }
        if self.cache_ttl_secs == 0 {
            self.cache_ttl_secs = default_cache_ttl_secs();
        }
        self
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Parse a provider base URL; a trailing `/` is added so relative joins
/// append instead of replacing the last path segment.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let mut s = raw.trim().to_string();
    if !s.ends_with('/') {
        s.push('/');
    }
    Url::parse(&s).with_context(|| format!("invalid base url: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = RanklistConfig::default();
        assert_eq!(c.max_concurrency, 10);
        assert_eq!(c.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(c.api_timeout(), Duration::from_secs(5));
        assert_eq!(c.scrape_timeout(), Duration::from_secs(10));
        assert_eq!(c.year_tolerance, 1);
    }

    #[test]
    fn partial_toml_fills_defaults_and_sanitizes() {
        let cfg: RanklistConfig = toml::from_str(
            r#"
            tmdb_api_key = "abc"
            max_concurrency = 0
            year_tolerance = 2
            "#,
        )
        .unwrap();
        let cfg = cfg.sanitized();
        assert_eq!(cfg.tmdb_api_key, "abc");
        assert_eq!(cfg.max_concurrency, 10);
        assert_eq!(cfg.year_tolerance, 2);
        assert_eq!(cfg.rt_base_url, "https://www.rottentomatoes.com/");
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let u = parse_base_url("http://127.0.0.1:8080/imdb").unwrap();
        assert_eq!(
            u.join("auto-complete").unwrap().as_str(),
            "http://127.0.0.1:8080/imdb/auto-complete"
        );
        assert!(parse_base_url("not a url").is_err());
    }
}
