use crate::config::{Config, RetryPolicy};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub const POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";

#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn discover(&self, query: &DiscoverQuery) -> Result<DiscoverPage>;
    async fn movie_details(&self, id: u64, language: &str) -> Result<MovieDetails>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverQuery {
    // All listed genres must match (comma join).
    pub genre_ids: Vec<u32>,
    pub language: String,
    pub region: String,
    pub min_vote_count: u32,
    pub min_vote_average: Option<f32>,
    pub released_after: Option<NaiveDate>,
    pub page: u32,
}

impl DiscoverQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let genres = self
            .genre_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let mut pairs = vec![
            ("with_genres", genres),
            ("language", self.language.clone()),
            ("region", self.region.clone()),
            ("sort_by", "popularity.desc".to_string()),
            ("include_adult", "false".to_string()),
            ("vote_count.gte", self.min_vote_count.to_string()),
            ("page", self.page.to_string()),
        ];
        if let Some(avg) = self.min_vote_average {
            pairs.push(("vote_average.gte", format!("{avg:.1}")));
        }
        if let Some(date) = self.released_after {
            pairs.push(("primary_release_date.gte", date.to_string()));
        }
        pairs
    }

    pub fn cache_key(&self) -> String {
        self.query_pairs()
            .into_iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(&v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverPage {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub results: Vec<DiscoverItem>,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverItem {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: f32,
    #[serde(default)]
    pub vote_count: u32,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovieDetails {
    pub id: u64,
    pub title: String,
    pub overview: String,
    pub tagline: Option<String>,
    pub runtime_minutes: Option<u32>,
    pub genres: Vec<String>,
    pub trailer: Option<String>,
    pub poster: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, retry: RetryPolicy) -> Result<Self> {
        let user_agent = format!("movie_match/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
        })
    }

    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        match &config.tmdb_api_key {
            Some(key) => Ok(Some(Self::new(
                key.clone(),
                config.tmdb_base_url.clone(),
                config.retry,
            )?)),
            None => Ok(None),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let sent = self
                .client
                .get(&url)
                .query(&[("api_key", self.api_key.as_str())])
                .query(params)
                .send()
                .await;

            let reason = match sent {
                Ok(res) => {
                    let status = res.status();
                    if status.is_success() {
                        let text = res.text().await.context("reading body failed")?;
                        return serde_json::from_str(&text)
                            .with_context(|| format!("JSON parse failed for {}", path));
                    }
                    let body = res.text().await.unwrap_or_default();
                    let retryable =
                        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                    if !retryable || attempt >= self.retry.max_attempts {
                        return Err(anyhow!("{} -> {} {}", path, status, body));
                    }
                    format!("status {}", status)
                }
                Err(e) => {
                    let e = e.without_url();
                    let transient = e.is_timeout() || e.is_connect();
                    if !transient || attempt >= self.retry.max_attempts {
                        return Err(anyhow::Error::new(e).context(format!("request to {} failed", path)));
                    }
                    e.to_string()
                }
            };

            let delay = self.retry.delay_after(attempt);
            warn!(
                "TMDB {} failed ({}), retrying in {:?} (attempt {}/{})",
                path, reason, delay, attempt, self.retry.max_attempts
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn discover(&self, query: &DiscoverQuery) -> Result<DiscoverPage> {
        debug!("TMDB discover: {}", query.cache_key());
        self.get_json("/discover/movie", &query.query_pairs()).await
    }

    async fn movie_details(&self, id: u64, language: &str) -> Result<MovieDetails> {
        let params = [
            ("language", language.to_string()),
            ("append_to_response", "videos".to_string()),
            ("include_video_language", video_languages(language)),
        ];
        let detail: MovieDetail = self
            .get_json(&format!("/movie/{id}"), &params)
            .await
            .with_context(|| format!("fetching details for movie {id}"))?;
        Ok(detail.into_details())
    }
}

#[derive(Debug, Deserialize)]
struct Genre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct MovieDetail {
    id: u64,
    title: String,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    tagline: Option<String>,
    runtime: Option<u32>,
    poster_path: Option<String>,
    #[serde(default)]
    genres: Vec<Genre>,
    #[serde(default)]
    videos: Option<Videos>,
}

impl MovieDetail {
    fn into_details(self) -> MovieDetails {
        let trailer = self.videos.as_ref().and_then(select_trailer);
        MovieDetails {
            id: self.id,
            title: self.title,
            overview: self.overview.unwrap_or_default().trim().to_string(),
            tagline: self.tagline.filter(|t| !t.trim().is_empty()),
            runtime_minutes: self.runtime.filter(|r| *r > 0),
            genres: self.genres.into_iter().map(|g| g.name).collect(),
            trailer,
            poster: self.poster_path.as_deref().map(poster_url),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Videos {
    results: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    site: String,
    #[serde(rename = "type")]
    video_type: String,
    key: String,
}

pub fn poster_url(path: &str) -> String {
    format!("{POSTER_BASE}{path}")
}

// `ko-KR` -> `ko,en,null` so trailers in the display language, English and
// untagged videos all come back.
fn video_languages(language: &str) -> String {
    let primary = language.split('-').next().unwrap_or(language);
    if primary.eq_ignore_ascii_case("en") {
        "en,null".to_string()
    } else {
        format!("{primary},en,null")
    }
}

fn select_trailer(videos: &Videos) -> Option<String> {
    videos
        .results
        .iter()
        .find(|v| v.site.eq_ignore_ascii_case("YouTube") && v.video_type == "Trailer")
        .or_else(|| {
            videos
                .results
                .iter()
                .find(|v| v.site.eq_ignore_ascii_case("YouTube") && v.video_type == "Teaser")
        })
        .map(|v| format!("https://www.youtube.com/watch?v={}", v.key))
}
