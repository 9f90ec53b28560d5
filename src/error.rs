use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Failures a quiz taker can see; each one ends the current interaction.
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("TMDB API key is not configured. Set TMDB_API_KEY and try again.")]
    MissingCredential,

    #[error("Please answer every question ({answered}/{expected} answered).")]
    IncompleteAnswers { answered: usize, expected: usize },

    #[error("Expected {expected} answers but received {answered}.")]
    TooManyAnswers { answered: usize, expected: usize },

    #[error("'{0}' is not one of the available answers.")]
    UnknownAnswer(String),

    #[error("'{0}' was given more than once.")]
    DuplicateAnswer(String),

    #[error("No movies matched the selected filters. Try loosening them.")]
    NoResults,

    #[error("Could not reach the movie database: {0:#}")]
    Network(#[source] anyhow::Error),
}

impl RecommendError {
    pub fn status(&self) -> StatusCode {
        match self {
            RecommendError::MissingCredential => StatusCode::SERVICE_UNAVAILABLE,
            RecommendError::IncompleteAnswers { .. }
            | RecommendError::TooManyAnswers { .. }
            | RecommendError::UnknownAnswer(_)
            | RecommendError::DuplicateAnswer(_) => StatusCode::BAD_REQUEST,
            RecommendError::NoResults => StatusCode::NOT_FOUND,
            RecommendError::Network(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for RecommendError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
