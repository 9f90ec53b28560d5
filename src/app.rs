use crate::cache::CachedTmdb;
use crate::config::{Config, FilterDefaults};
use crate::error::RecommendError;
use crate::quiz::question_views;
use crate::recommend::{recommend, FilterOverrides, Filters};
use crate::session::{valid_session_id, SessionStore};
use crate::tmdb::{TmdbApi, TmdbClient};
use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    // None without a TMDB key; /recommend then answers MissingCredential.
    pub tmdb: Option<Arc<dyn TmdbApi>>,
    pub defaults: Arc<FilterDefaults>,
    pub sessions: Arc<SessionStore>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    #[serde(default)]
    pub answers: Vec<String>,
    #[serde(default)]
    pub filters: FilterOverrides,
    pub session_id: Option<String>,
}

pub async fn run_server(config: Config) -> Result<()> {
    let tmdb: Option<Arc<dyn TmdbApi>> = match TmdbClient::from_config(&config)? {
        Some(client) => {
            info!("TMDB responses cached for {:?}", config.cache_ttl);
            let cached: Arc<dyn TmdbApi> =
                Arc::new(CachedTmdb::new(Arc::new(client), config.cache_ttl));
            Some(cached)
        }
        None => {
            warn!("TMDB_API_KEY is not set; recommendations will be refused until it is");
            None
        }
    };

    let state = AppState {
        tmdb,
        defaults: Arc::new(config.filters.clone()),
        sessions: Arc::new(SessionStore::new(config.session_ttl)),
    };

    let app = build_router(state);

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/questions", get(questions))
        .route("/recommend", post(handle_recommend))
        .route("/sessions/:id", get(load_session).delete(reset_session))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn questions() -> Response {
    Json(json!({ "questions": question_views() })).into_response()
}

async fn handle_recommend(
    State(state): State<AppState>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Rejecting recommendation: {}", rejection.body_text());
            return (
                rejection.status(),
                Json(json!({ "error": rejection.body_text() })),
            )
                .into_response();
        }
    };

    let session_id = match request.session_id.as_deref().map(str::trim) {
        Some(id) if !valid_session_id(id) => {
            return bad_session_id();
        }
        other => other.map(str::to_string),
    };

    let Some(tmdb) = state.tmdb.clone() else {
        warn!("Rejecting recommendation: no TMDB credential configured");
        return RecommendError::MissingCredential.into_response();
    };

    let filters = Filters::resolve(&state.defaults, &request.filters);
    let today = Utc::now().date_naive();
    match recommend(&*tmdb, &request.answers, &filters, today).await {
        Ok(recommendation) => {
            info!(
                "Recommended {} title(s) for {}",
                recommendation.movies.len(),
                recommendation.genre.label
            );
            if let Some(id) = session_id {
                state.sessions.save(&id, recommendation.clone()).await;
            }
            (StatusCode::OK, Json(recommendation)).into_response()
        }
        Err(e) => {
            warn!("Recommendation failed: {}", e);
            e.into_response()
        }
    }
}

async fn load_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if !valid_session_id(&id) {
        return bad_session_id();
    }
    match state.sessions.load(&id).await {
        Some(recommendation) => (StatusCode::OK, Json(recommendation)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No saved result for this session." })),
        )
            .into_response(),
    }
}

async fn reset_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if !valid_session_id(&id) {
        return bad_session_id();
    }
    if state.sessions.reset(&id).await {
        info!("Session {} reset", id);
    }
    StatusCode::NO_CONTENT.into_response()
}

fn bad_session_id() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "Session ids may only contain letters, digits, '-' and '_'." })),
    )
        .into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
