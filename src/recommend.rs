use crate::config::FilterDefaults;
use crate::error::RecommendError;
use crate::genre::Genre;
use crate::scoring::{score_answers, select_genre, GenreResult, GenreSummary};
use crate::tmdb::{poster_url, DiscoverItem, DiscoverQuery, MovieDetails, TmdbApi};
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

const MAX_LIMIT: usize = 20;
const DEFAULT_MAX_PAGES: u32 = 2;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterOverrides {
    pub language: Option<String>,
    pub region: Option<String>,
    pub min_vote_count: Option<u32>,
    pub min_vote_average: Option<f32>,
    pub recent_years: Option<u32>,
    pub limit: Option<usize>,
    pub include_details: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filters {
    pub language: String,
    pub fallback_language: String,
    pub region: String,
    pub min_vote_count: u32,
    pub min_vote_average: f32,
    pub recent_years: Option<u32>,
    pub limit: usize,
    pub include_details: bool,
    pub max_pages: u32,
}

impl Filters {
    pub fn resolve(defaults: &FilterDefaults, overrides: &FilterOverrides) -> Self {
        let non_empty = |v: &Option<String>| v.as_ref().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            language: non_empty(&overrides.language).unwrap_or_else(|| defaults.language.clone()),
            fallback_language: defaults.fallback_language.clone(),
            region: non_empty(&overrides.region).unwrap_or_else(|| defaults.region.clone()),
            min_vote_count: overrides.min_vote_count.unwrap_or(defaults.min_vote_count),
            min_vote_average: overrides
                .min_vote_average
                .unwrap_or(defaults.min_vote_average)
                .clamp(0.0, 10.0),
            recent_years: overrides.recent_years.or(defaults.recent_years).filter(|y| *y > 0),
            limit: overrides.limit.unwrap_or(defaults.limit).clamp(1, MAX_LIMIT),
            include_details: overrides.include_details.unwrap_or(true),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MovieCard {
    pub id: u64,
    pub title: String,
    pub original_title: Option<String>,
    pub overview: String,
    pub overview_language: String,
    pub tagline: Option<String>,
    pub poster: Option<String>,
    pub rating: f32,
    pub vote_count: u32,
    pub release_date: Option<String>,
    pub runtime_minutes: Option<u32>,
    pub genres: Vec<String>,
    pub trailer: Option<String>,
}

impl MovieCard {
    fn from_discover(item: DiscoverItem, language: &str) -> Self {
        let genres = item
            .genre_ids
            .iter()
            .filter_map(|id| Genre::from_tmdb_id(*id))
            .map(|g| g.label().to_string())
            .collect();
        Self {
            id: item.id,
            original_title: item.original_title.filter(|t| *t != item.title),
            title: item.title,
            overview: item.overview.trim().to_string(),
            overview_language: language.to_string(),
            tagline: None,
            poster: item.poster_path.as_deref().map(poster_url),
            rating: item.vote_average,
            vote_count: item.vote_count,
            release_date: item.release_date.filter(|d| !d.is_empty()),
            runtime_minutes: None,
            genres,
            trailer: None,
        }
    }

    fn apply_details(&mut self, details: MovieDetails) {
        if !details.title.trim().is_empty() {
            self.title = details.title;
        }
        if !details.overview.is_empty() {
            self.overview = details.overview;
        }
        if !details.genres.is_empty() {
            self.genres = details.genres;
        }
        self.tagline = details.tagline;
        self.runtime_minutes = details.runtime_minutes;
        self.trailer = details.trailer;
        if self.poster.is_none() {
            self.poster = details.poster;
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub genre: GenreSummary,
    pub relaxed: bool,
    pub movies: Vec<MovieCard>,
}

#[derive(Debug, Clone, PartialEq)]
struct Rung {
    genre_ids: Vec<u32>,
    strict_quality: bool,
}

fn relaxation_ladder(result: &GenreResult) -> Vec<Rung> {
    let primary = vec![result.primary().tmdb_id()];
    let mut ladder = Vec::new();
    if let GenreResult::Composite(a, b) = result {
        ladder.push(Rung {
            genre_ids: vec![a.tmdb_id(), b.tmdb_id()],
            strict_quality: true,
        });
    }
    ladder.push(Rung {
        genre_ids: primary.clone(),
        strict_quality: true,
    });
    ladder.push(Rung {
        genre_ids: primary,
        strict_quality: false,
    });
    ladder
}

fn released_after(today: NaiveDate, recent_years: Option<u32>) -> Option<NaiveDate> {
    recent_years.and_then(|y| today.checked_sub_months(Months::new(y.saturating_mul(12))))
}

fn rung_query(rung: &Rung, filters: &Filters, today: NaiveDate, page: u32) -> DiscoverQuery {
    let strict = rung.strict_quality;
    DiscoverQuery {
        genre_ids: rung.genre_ids.clone(),
        language: filters.language.clone(),
        region: filters.region.clone(),
        min_vote_count: filters.min_vote_count,
        min_vote_average: (strict && filters.min_vote_average > 0.0).then_some(filters.min_vote_average),
        released_after: if strict {
            released_after(today, filters.recent_years)
        } else {
            None
        },
        page,
    }
}

pub async fn discover_movies(
    tmdb: &dyn TmdbApi,
    result: &GenreResult,
    filters: &Filters,
    today: NaiveDate,
) -> Result<(Vec<DiscoverItem>, bool), RecommendError> {
    let mut seen: HashSet<u64> = HashSet::new();
    let mut collected: Vec<DiscoverItem> = Vec::new();
    let mut tried: Vec<String> = Vec::new();
    let mut relaxed = false;

    'ladder: for (step, rung) in relaxation_ladder(result).iter().enumerate() {
        if collected.len() >= filters.limit {
            break;
        }
        let first_key = rung_query(rung, filters, today, 1).cache_key();
        if tried.contains(&first_key) {
            continue;
        }
        tried.push(first_key);
        if step > 0 {
            relaxed = true;
            info!(
                "Only {} result(s) so far for {}, relaxing to genres {:?} (quality filters: {})",
                collected.len(),
                result.label(),
                rung.genre_ids,
                rung.strict_quality
            );
        }

        for page in 1..=filters.max_pages {
            let query = rung_query(rung, filters, today, page);
            let fetched = match tmdb.discover(&query).await {
                Ok(p) => p,
                Err(e) if collected.is_empty() => return Err(RecommendError::Network(e)),
                Err(e) => {
                    warn!("Discover failed after partial results, keeping what we have: {:#}", e);
                    break 'ladder;
                }
            };
            for item in fetched.results {
                if seen.insert(item.id) {
                    collected.push(item);
                }
            }
            if collected.len() >= filters.limit || page >= fetched.total_pages {
                break;
            }
        }
    }

    collected.truncate(filters.limit);
    Ok((collected, relaxed))
}

// An empty synopsis triggers exactly one request in the fallback language.
pub async fn build_card(tmdb: &dyn TmdbApi, item: DiscoverItem, filters: &Filters) -> MovieCard {
    let mut card = MovieCard::from_discover(item, &filters.language);

    if filters.include_details {
        match tmdb.movie_details(card.id, &filters.language).await {
            Ok(details) => card.apply_details(details),
            Err(e) => warn!("Details lookup failed for '{}': {:#}", card.title, e),
        }
    }

    if card.overview.is_empty() && filters.fallback_language != filters.language {
        match tmdb.movie_details(card.id, &filters.fallback_language).await {
            Ok(details) if !details.overview.is_empty() => {
                card.overview = details.overview;
                card.overview_language = filters.fallback_language.clone();
            }
            Ok(_) => {}
            Err(e) => warn!(
                "Fallback synopsis lookup failed for '{}' ({}): {:#}",
                card.title, filters.fallback_language, e
            ),
        }
    }

    card
}

pub async fn recommend<S: AsRef<str>>(
    tmdb: &dyn TmdbApi,
    answers: &[S],
    filters: &Filters,
    today: NaiveDate,
) -> Result<Recommendation, RecommendError> {
    let scores = score_answers(answers)?;
    let result = select_genre(&scores);
    info!("Quiz result: {} (composite: {})", result.label(), result.is_composite());

    let (items, relaxed) = discover_movies(tmdb, &result, filters, today).await?;
    if items.is_empty() {
        return Err(RecommendError::NoResults);
    }

    let mut movies = Vec::with_capacity(items.len());
    for item in items {
        movies.push(build_card(tmdb, item, filters).await);
    }

    Ok(Recommendation {
        genre: GenreSummary::new(result, &scores),
        relaxed,
        movies,
    })
}
