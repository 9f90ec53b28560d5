use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TMDB_BASE: &str = "https://api.themoviedb.org/3";

#[derive(Debug, Clone, PartialEq)]
pub struct FilterDefaults {
    pub language: String,
    pub fallback_language: String,
    pub region: String,
    pub min_vote_count: u32,
    pub min_vote_average: f32,
    pub recent_years: Option<u32>,
    pub limit: usize,
}

impl Default for FilterDefaults {
    fn default() -> Self {
        Self {
            language: "ko-KR".to_string(),
            fallback_language: "en-US".to_string(),
            region: "KR".to_string(),
            min_vote_count: 50,
            min_vote_average: 6.0,
            recent_years: None,
            limit: 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub tmdb_api_key: Option<String>,
    pub tmdb_base_url: String,
    pub filters: FilterDefaults,
    pub retry: RetryPolicy,
    pub cache_ttl: Duration,
    pub session_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = FilterDefaults::default();
        let filters = FilterDefaults {
            language: env_or("DEFAULT_LANGUAGE", defaults.language),
            fallback_language: env_or("FALLBACK_LANGUAGE", defaults.fallback_language),
            region: env_or("DEFAULT_REGION", defaults.region),
            min_vote_count: env_parse("MIN_VOTE_COUNT", defaults.min_vote_count)?,
            min_vote_average: env_parse("MIN_VOTE_AVERAGE", defaults.min_vote_average)?,
            recent_years: match non_empty_var("RECENT_YEARS") {
                Some(v) => Some(v.parse().context("RECENT_YEARS must be a whole number")?),
                None => defaults.recent_years,
            },
            limit: env_parse("RESULT_LIMIT", defaults.limit)?,
        };
        let retry = RetryPolicy {
            max_attempts: env_parse("TMDB_MAX_ATTEMPTS", 3u32)?.max(1),
            backoff: Duration::from_millis(env_parse("TMDB_BACKOFF_MS", 1000u64)?),
        };

        Ok(Self {
            bind_addr: env_parse("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3147)))?,
            tmdb_api_key: non_empty_var("TMDB_API_KEY"),
            tmdb_base_url: env_or("TMDB_BASE_URL", DEFAULT_TMDB_BASE.to_string()),
            filters,
            retry,
            cache_ttl: Duration::from_secs(env_parse("CACHE_TTL_SECS", 3600u64)?),
            session_ttl: Duration::from_secs(env_parse("SESSION_TTL_SECS", 1800u64)?),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: String) -> String {
    non_empty_var(key).unwrap_or(default)
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty_var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: '{}'", key, raw)),
        None => Ok(default),
    }
}
