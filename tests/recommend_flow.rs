use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use movie_match::app::{build_router, AppState};
use movie_match::config::FilterDefaults;
use movie_match::error::RecommendError;
use movie_match::genre::Genre;
use movie_match::recommend::{build_card, discover_movies, recommend, FilterOverrides, Filters};
use movie_match::scoring::GenreResult;
use movie_match::session::SessionStore;
use movie_match::tmdb::{DiscoverItem, DiscoverPage, DiscoverQuery, MovieDetails, TmdbApi};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::util::ServiceExt;

const COMEDY_ANSWERS: [&str; 5] = ["웃는 재미", "분위기 메이커", "맛있는 거 먹기", "즉흥적", "주도하기"];
// Comedy 6.5 vs Action 6.0 -> composite.
const COMEDY_ACTION_ANSWERS: [&str; 5] = ["친구와 놀기", "운동하기", "웃는 재미", "액티비티", "주도하기"];

// Pages keyed by (with_genres, strict quality filters, page).
#[derive(Default)]
struct FakeTmdb {
    pages: HashMap<(String, bool, u32), DiscoverPage>,
    details: HashMap<(u64, String), MovieDetails>,
    fail_discover: bool,
    discover_calls: Mutex<Vec<DiscoverQuery>>,
    details_calls: Mutex<Vec<(u64, String)>>,
}

impl FakeTmdb {
    fn with_page(mut self, genres: &str, strict: bool, page: u32, total_pages: u32, ids: &[u64]) -> Self {
        self.pages.insert(
            (genres.to_string(), strict, page),
            DiscoverPage {
                page,
                total_pages,
                results: ids.iter().map(|id| item(*id)).collect(),
            },
        );
        self
    }

    fn with_details(mut self, id: u64, language: &str, overview: &str) -> Self {
        self.details.insert(
            (id, language.to_string()),
            MovieDetails {
                id,
                title: format!("Movie {id} ({language})"),
                overview: overview.to_string(),
                tagline: None,
                runtime_minutes: Some(100),
                genres: vec!["코미디".to_string()],
                trailer: Some(format!("https://www.youtube.com/watch?v={id}")),
                poster: None,
            },
        );
        self
    }

    fn details_calls_for(&self, id: u64, language: &str) -> usize {
        self.details_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(i, l)| *i == id && l == language)
            .count()
    }
}

#[async_trait::async_trait]
impl TmdbApi for FakeTmdb {
    async fn discover(&self, query: &DiscoverQuery) -> anyhow::Result<DiscoverPage> {
        self.discover_calls.lock().unwrap().push(query.clone());
        if self.fail_discover {
            anyhow::bail!("/discover/movie -> 500 Internal Server Error");
        }
        let genres = query
            .genre_ids
            .iter()
            .map(|g| g.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let strict = query.min_vote_average.is_some();
        Ok(self
            .pages
            .get(&(genres, strict, query.page))
            .cloned()
            .unwrap_or(DiscoverPage {
                page: query.page,
                total_pages: 0,
                results: Vec::new(),
            }))
    }

    async fn movie_details(&self, id: u64, language: &str) -> anyhow::Result<MovieDetails> {
        self.details_calls
            .lock()
            .unwrap()
            .push((id, language.to_string()));
        self.details
            .get(&(id, language.to_string()))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no details for {} in {}", id, language))
    }
}

fn item(id: u64) -> DiscoverItem {
    DiscoverItem {
        id,
        title: format!("Movie {id}"),
        original_title: Some(format!("Movie {id}")),
        overview: String::new(),
        poster_path: Some(format!("/poster{id}.jpg")),
        vote_average: 7.5,
        vote_count: 1200,
        release_date: Some("2020-05-01".to_string()),
        genre_ids: vec![35],
    }
}

fn filters(limit: usize) -> Filters {
    Filters::resolve(
        &FilterDefaults::default(),
        &FilterOverrides {
            limit: Some(limit),
            ..Default::default()
        },
    )
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

#[tokio::test]
async fn composite_relaxes_to_primary_genre_and_dedupes() {
    let tmdb = FakeTmdb::default()
        .with_page("18,10749", true, 1, 1, &[1, 2])
        .with_page("18", true, 1, 2, &[2, 3, 1])
        .with_page("18", true, 2, 2, &[3, 4, 5]);
    let result = GenreResult::Composite(Genre::Drama, Genre::Romance);

    let (items, relaxed) = discover_movies(&tmdb, &result, &filters(4), today())
        .await
        .expect("discover");

    let ids: Vec<u64> = items.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    assert!(relaxed);
    let unique: HashSet<u64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());
}

#[tokio::test]
async fn quality_filters_are_dropped_as_last_resort() {
    let tmdb = FakeTmdb::default()
        .with_page("35", true, 1, 1, &[10])
        .with_page("35", false, 1, 1, &[10, 11, 12]);
    let result = GenreResult::Single(Genre::Comedy);

    let (items, relaxed) = discover_movies(&tmdb, &result, &filters(3), today())
        .await
        .expect("discover");

    assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![10, 11, 12]);
    assert!(relaxed);
    let calls = tmdb.discover_calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].min_vote_average.is_none());
    assert!(calls[1].released_after.is_none());
}

#[tokio::test]
async fn enough_strict_results_skip_relaxation() {
    let tmdb = FakeTmdb::default().with_page("35", true, 1, 3, &[1, 2, 3, 4, 5, 6, 7]);
    let (items, relaxed) = discover_movies(&tmdb, &GenreResult::Single(Genre::Comedy), &filters(6), today())
        .await
        .expect("discover");
    assert_eq!(items.len(), 6);
    assert!(!relaxed);
    assert_eq!(tmdb.discover_calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_synopsis_falls_back_to_second_language_once() {
    let tmdb = FakeTmdb::default()
        .with_details(7, "ko-KR", "")
        .with_details(7, "en-US", "An English synopsis.");

    let card = build_card(&tmdb, item(7), &filters(6)).await;

    assert_eq!(card.overview, "An English synopsis.");
    assert_eq!(card.overview_language, "en-US");
    assert_eq!(card.title, "Movie 7 (ko-KR)");
    assert_eq!(card.trailer.as_deref(), Some("https://www.youtube.com/watch?v=7"));
    assert_eq!(tmdb.details_calls_for(7, "ko-KR"), 1);
    assert_eq!(tmdb.details_calls_for(7, "en-US"), 1);
}

#[tokio::test]
async fn empty_fallback_keeps_empty_synopsis() {
    let tmdb = FakeTmdb::default()
        .with_details(8, "ko-KR", "")
        .with_details(8, "en-US", "");

    let card = build_card(&tmdb, item(8), &filters(6)).await;

    assert_eq!(card.overview, "");
    assert_eq!(card.overview_language, "ko-KR");
    assert_eq!(tmdb.details_calls_for(8, "en-US"), 1);
}

#[tokio::test]
async fn present_synopsis_makes_no_fallback_request() {
    let tmdb = FakeTmdb::default().with_details(9, "ko-KR", "한국어 줄거리");

    let card = build_card(&tmdb, item(9), &filters(6)).await;

    assert_eq!(card.overview, "한국어 줄거리");
    assert_eq!(tmdb.details_calls_for(9, "en-US"), 0);
}

#[tokio::test]
async fn details_failure_keeps_discover_data() {
    let tmdb = FakeTmdb::default();
    let mut with_overview = item(5);
    with_overview.overview = "discover overview".to_string();

    let card = build_card(&tmdb, with_overview, &filters(6)).await;

    assert_eq!(card.title, "Movie 5");
    assert_eq!(card.overview, "discover overview");
    assert_eq!(card.poster.as_deref(), Some("https://image.tmdb.org/t/p/w500/poster5.jpg"));
    assert_eq!(card.genres, vec!["코미디".to_string()]);
    assert!(card.original_title.is_none());
}

#[tokio::test]
async fn no_results_is_reported() {
    let tmdb = FakeTmdb::default();
    let err = recommend(&tmdb, &COMEDY_ANSWERS, &filters(6), today())
        .await
        .unwrap_err();
    assert!(matches!(err, RecommendError::NoResults));
}

#[tokio::test]
async fn discover_failure_is_a_network_error() {
    let tmdb = FakeTmdb {
        fail_discover: true,
        ..Default::default()
    };
    let err = recommend(&tmdb, &COMEDY_ANSWERS, &filters(6), today())
        .await
        .unwrap_err();
    assert!(matches!(err, RecommendError::Network(_)));
}

#[tokio::test]
async fn composite_answers_produce_composite_recommendation() {
    let tmdb = FakeTmdb::default()
        .with_page("35,28", true, 1, 1, &[21, 22])
        .with_details(21, "ko-KR", "줄거리 21")
        .with_details(22, "ko-KR", "줄거리 22");

    let rec = recommend(&tmdb, &COMEDY_ACTION_ANSWERS, &filters(2), today())
        .await
        .expect("recommendation");

    assert!(rec.genre.composite);
    assert_eq!(rec.genre.label, "코미디 + 액션");
    assert!(!rec.relaxed);
    assert_eq!(rec.movies.len(), 2);
}

fn app_with(tmdb: Option<FakeTmdb>) -> Router {
    let state = AppState {
        tmdb: tmdb.map(|t| Arc::new(t) as Arc<dyn TmdbApi>),
        defaults: Arc::new(FilterDefaults::default()),
        sessions: Arc::new(SessionStore::new(Duration::from_secs(60))),
    };
    build_router(state)
}

fn comedy_tmdb() -> FakeTmdb {
    FakeTmdb::default()
        .with_page("35", true, 1, 1, &[1, 2, 3])
        .with_details(1, "ko-KR", "하나")
        .with_details(2, "ko-KR", "둘")
        .with_details(3, "ko-KR", "셋")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn questions_endpoint_lists_five_questions() {
    let app = app_with(None);
    let res = app
        .oneshot(Request::get("/questions").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    let questions = body["questions"].as_array().expect("array");
    assert_eq!(questions.len(), 5);
    assert_eq!(questions[2]["weight"], json!(1.5));
    assert_eq!(questions[0]["options"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn missing_credential_is_rejected() {
    let app = app_with(None);
    let res = app
        .oneshot(post_json("/recommend", json!({ "answers": COMEDY_ANSWERS })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(res).await;
    assert!(body["error"].as_str().unwrap().contains("TMDB_API_KEY"));
}

#[tokio::test]
async fn incomplete_answers_are_rejected() {
    let app = app_with(Some(comedy_tmdb()));
    let res = app
        .oneshot(post_json("/recommend", json!({ "answers": ["웃는 재미", "즉흥적"] })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = json_body(res).await;
    assert!(body["error"].as_str().unwrap().contains("2/5"));
}

#[tokio::test]
async fn recommendation_is_saved_and_reset_per_session() {
    let app = app_with(Some(comedy_tmdb()));

    let res = app
        .clone()
        .oneshot(post_json(
            "/recommend",
            json!({
                "answers": COMEDY_ANSWERS,
                "filters": { "limit": 3 },
                "session_id": "abc-123"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["genre"]["label"], json!("코미디"));
    assert_eq!(body["genre"]["composite"], json!(false));
    assert_eq!(body["movies"].as_array().unwrap().len(), 3);
    assert_eq!(body["movies"][0]["overview"], json!("하나"));

    let res = app
        .clone()
        .oneshot(Request::get("/sessions/abc-123").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["genre"]["label"], json!("코미디"));

    let res = app
        .clone()
        .oneshot(Request::delete("/sessions/abc-123").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = app
        .oneshot(Request::get("/sessions/abc-123").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_session_id_is_rejected() {
    let app = app_with(Some(comedy_tmdb()));
    let res = app
        .oneshot(post_json(
            "/recommend",
            json!({ "answers": COMEDY_ANSWERS, "session_id": "no spaces allowed" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn extra_and_repeated_answers_are_rejected() {
    let app = app_with(Some(comedy_tmdb()));
    let mut six: Vec<&str> = COMEDY_ANSWERS.to_vec();
    six.push("힐링");
    let res = app
        .clone()
        .oneshot(post_json("/recommend", json!({ "answers": six })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(res).await["error"].as_str().unwrap().contains("received 6"));

    let repeated = vec!["웃는 재미"; 5];
    let res = app
        .oneshot(post_json("/recommend", json!({ "answers": repeated })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(res).await["error"].as_str().unwrap().contains("more than once"));
}

#[tokio::test]
async fn malformed_bodies_get_json_errors() {
    let app = app_with(Some(comedy_tmdb()));

    let res = app
        .clone()
        .oneshot(
            Request::post("/recommend")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(res).await["error"].is_string());

    let res = app
        .clone()
        .oneshot(
            Request::post("/recommend")
                .header("content-type", "text/plain")
                .body(Body::from(json!({ "answers": COMEDY_ANSWERS }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(json_body(res).await["error"].is_string());

    let res = app
        .oneshot(post_json("/recommend", json!({ "answers": [1, 2] })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json_body(res).await["error"].is_string());
}
