use crate::error::RecommendError;
use crate::genre::Genre;
use crate::quiz::{lookup_answer, QUESTION_COUNT};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

pub const COMPOSITE_MARGIN: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenreScores {
    scores: BTreeMap<Genre, f64>,
}

impl GenreScores {
    pub fn get(&self, genre: Genre) -> f64 {
        self.scores.get(&genre).copied().unwrap_or(0.0)
    }

    fn add(&mut self, genre: Genre, amount: f64) {
        *self.scores.entry(genre).or_insert(0.0) += amount;
    }

    // Ties keep genre declaration order.
    pub fn ranked(&self) -> Vec<(Genre, f64)> {
        let mut ranked: Vec<(Genre, f64)> = Genre::ALL.iter().map(|g| (*g, self.get(*g))).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenreResult {
    Single(Genre),
    Composite(Genre, Genre),
}

impl GenreResult {
    pub fn primary(&self) -> Genre {
        match self {
            GenreResult::Single(g) | GenreResult::Composite(g, _) => *g,
        }
    }

    pub fn genres(&self) -> Vec<Genre> {
        match self {
            GenreResult::Single(g) => vec![*g],
            GenreResult::Composite(a, b) => vec![*a, *b],
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, GenreResult::Composite(..))
    }

    pub fn label(&self) -> String {
        match self {
            GenreResult::Single(g) => g.label().to_string(),
            GenreResult::Composite(a, b) => format!("{} + {}", a.label(), b.label()),
        }
    }

    pub fn explanation(&self) -> String {
        match self {
            GenreResult::Single(g) => g.explanation().to_string(),
            GenreResult::Composite(a, b) => format!(
                "{}와(과) {} 취향이 비슷하게 나왔어요. {} {}",
                a.label(),
                b.label(),
                a.explanation(),
                b.explanation()
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenreSummary {
    pub label: String,
    pub genres: Vec<Genre>,
    pub composite: bool,
    pub explanation: String,
    pub scores: Vec<ScoreEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreEntry {
    pub genre: Genre,
    pub score: f64,
}

impl GenreSummary {
    pub fn new(result: GenreResult, scores: &GenreScores) -> Self {
        Self {
            label: result.label(),
            genres: result.genres(),
            composite: result.is_composite(),
            explanation: result.explanation(),
            scores: scores
                .ranked()
                .into_iter()
                .map(|(genre, score)| ScoreEntry { genre, score })
                .collect(),
        }
    }
}

pub fn score_answers<S: AsRef<str>>(answers: &[S]) -> Result<GenreScores, RecommendError> {
    let answered: Vec<&str> = answers
        .iter()
        .map(|a| a.as_ref().trim())
        .filter(|a| !a.is_empty())
        .collect();
    if answered.len() < QUESTION_COUNT {
        return Err(RecommendError::IncompleteAnswers {
            answered: answered.len(),
            expected: QUESTION_COUNT,
        });
    }
    if answered.len() > QUESTION_COUNT {
        return Err(RecommendError::TooManyAnswers {
            answered: answered.len(),
            expected: QUESTION_COUNT,
        });
    }

    let mut seen = HashSet::new();
    let mut scores = GenreScores::default();
    for answer in answered {
        if !seen.insert(answer) {
            return Err(RecommendError::DuplicateAnswer(answer.to_string()));
        }
        let (question, option) =
            lookup_answer(answer).ok_or_else(|| RecommendError::UnknownAnswer(answer.to_string()))?;
        for (genre, increment) in option.increments {
            scores.add(*genre, increment * question.weight);
        }
    }
    Ok(scores)
}

pub fn select_genre(scores: &GenreScores) -> GenreResult {
    let ranked = scores.ranked();
    let (top, top_score) = ranked[0];
    let (second, second_score) = ranked[1];
    if top_score - second_score <= COMPOSITE_MARGIN {
        GenreResult::Composite(top, second)
    } else {
        GenreResult::Single(top)
    }
}
