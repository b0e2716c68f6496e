use actix_cors::Cors;
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpResponse, HttpServer, ResponseError};
use resumatch_core::Error;
use resumatch_engine::{IngestOutcome, Ingestor, Matcher, RankedCandidate};
use resumatch_services::{Embedder, Structurer};
use resumatch_similarity::TopN;
use resumatch_storage::{MemoryStore, SnapshotStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared state behind every handler
pub struct AppState<E, S> {
    pub matcher: Matcher<E, S, MemoryStore>,
    pub ingestor: Ingestor<E, S>,
    /// Saved after every successful ingest when set
    pub snapshots: Option<Arc<SnapshotStore>>,
    pub default_top_n: usize,
}

#[derive(Deserialize)]
struct MatchRequest {
    jd_text: String,
    top_n: Option<usize>,
}

#[derive(Serialize)]
struct MatchResponse {
    matches: Vec<RankedCandidate>,
}

#[derive(Deserialize)]
struct IngestRequest {
    text: String,
}

#[derive(Serialize)]
struct IngestResponse {
    id: u64,
    inserted: bool,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    candidates: usize,
    dimension_mismatches: u64,
    missing_sections: u64,
}

/// Errors surfaced to HTTP clients
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("No matching resumes found.")]
    NoMatches,

    #[error(transparent)]
    Core(#[from] Error),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NoMatches => StatusCode::NOT_FOUND,
            ApiError::Core(Error::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::Core(Error::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Core(e) if e.is_infrastructure() => StatusCode::BAD_GATEWAY,
            ApiError::Core(Error::Duplicate(_)) => StatusCode::CONFLICT,
            ApiError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string()
        }))
    }
}

/// Register the resumatch routes; expects `web::Data<AppState<E, S>>` in app data
pub fn routes<E, S>(cfg: &mut web::ServiceConfig)
where
    E: Embedder + 'static,
    S: Structurer + 'static,
{
    cfg.route("/health", web::get().to(health::<E, S>))
        .route("/match", web::post().to(match_resumes::<E, S>))
        .route("/resumes", web::post().to(ingest_resume::<E, S>));
}

pub struct RestApi;

impl RestApi {
    pub async fn start<E, S>(
        state: web::Data<AppState<E, S>>,
        host: &str,
        port: u16,
    ) -> std::io::Result<()>
    where
        E: Embedder + 'static,
        S: Structurer + 'static,
    {
        info!("Starting HTTP server on {}:{}", host, port);
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(state.clone())
                .configure(routes::<E, S>)
        })
        .bind((host, port))?
        .run()
        .await
    }
}

async fn health<E, S>(state: web::Data<AppState<E, S>>) -> HttpResponse
where
    E: Embedder + 'static,
    S: Structurer + 'static,
{
    let stats = state.matcher.scorer_stats();
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        candidates: state.ingestor.store().len(),
        dimension_mismatches: stats.dimension_mismatches(),
        missing_sections: stats.missing_sections(),
    })
}

async fn match_resumes<E, S>(
    state: web::Data<AppState<E, S>>,
    req: web::Json<MatchRequest>,
) -> Result<HttpResponse, ApiError>
where
    E: Embedder + 'static,
    S: Structurer + 'static,
{
    if req.jd_text.trim().is_empty() {
        return Err(ApiError::BadRequest("jd_text is required".to_string()));
    }
    let top_n = req.top_n.unwrap_or(state.default_top_n);
    if top_n == 0 {
        return Err(ApiError::BadRequest("top_n must be at least 1".to_string()));
    }

    let matches = state.matcher.rank(&req.jd_text, TopN::Count(top_n)).await?;
    if matches.is_empty() {
        return Err(ApiError::NoMatches);
    }

    Ok(HttpResponse::Ok().json(MatchResponse { matches }))
}

async fn ingest_resume<E, S>(
    state: web::Data<AppState<E, S>>,
    req: web::Json<IngestRequest>,
) -> Result<HttpResponse, ApiError>
where
    E: Embedder + 'static,
    S: Structurer + 'static,
{
    if req.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text is required".to_string()));
    }

    let outcome = state.ingestor.ingest_text(&req.text).await?;

    if let (IngestOutcome::Inserted(_), Some(snapshots)) = (outcome, &state.snapshots) {
        let snapshots = snapshots.clone();
        let store = state.ingestor.store().clone();
        match web::block(move || snapshots.save(&store)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "snapshot after ingest failed"),
            Err(e) => warn!(error = %e, "snapshot task failed"),
        }
    }

    Ok(HttpResponse::Ok().json(IngestResponse {
        id: outcome.id(),
        inserted: outcome.is_inserted(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;
    use resumatch_core::{GeoTables, Profile, StructuredQuery};
    use resumatch_engine::{MatcherConfig, TimeoutSettings};
    use resumatch_services::{FixedStructurer, HashEmbedder};
    use resumatch_similarity::SectionWeights;
    use resumatch_storage::StoreConfig;
    use serde_json::{json, Value};

    type State = AppState<HashEmbedder, FixedStructurer>;

    fn state(location: &str, snapshots: Option<Arc<SnapshotStore>>) -> web::Data<State> {
        let embedder = Arc::new(HashEmbedder::new(32));
        let structurer = Arc::new(
            FixedStructurer::new()
                .with_query(StructuredQuery {
                    job_title: "Electrician".into(),
                    required_skills: vec!["Wiring".into()],
                    location: location.into(),
                    ..Default::default()
                })
                .with_profile(
                    "resume of ravi",
                    Profile {
                        name: Some("Ravi".into()),
                        location: Some("Surat".into()),
                        current_job_title: Some("Electrician".into()),
                        skills: vec!["Wiring".into()],
                        ..Default::default()
                    },
                ),
        );
        let store = Arc::new(MemoryStore::new(StoreConfig {
            dimension: Some(32),
            ..Default::default()
        }));
        let tables = Arc::new(GeoTables::india());

        web::Data::new(AppState {
            matcher: Matcher::new(
                embedder.clone(),
                structurer.clone(),
                store.clone(),
                tables.clone(),
                SectionWeights::default(),
                MatcherConfig::default(),
            ),
            ingestor: Ingestor::new(embedder, structurer, store, tables, TimeoutSettings::default()),
            snapshots,
            default_top_n: 5,
        })
    }

    #[actix_web::test]
    async fn test_ingest_then_match() {
        let data = state("Ahmedabad", None);
        let app = test::init_service(
            App::new()
                .app_data(data.clone())
                .configure(routes::<HashEmbedder, FixedStructurer>),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/resumes")
            .set_json(json!({"text": "resume of ravi"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"id": 1, "inserted": true}));

        let req = test::TestRequest::post()
            .uri("/resumes")
            .set_json(json!({"text": "resume of ravi"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["inserted"], false);

        let req = test::TestRequest::post()
            .uri("/match")
            .set_json(json!({"jd_text": "Need an electrician in Ahmedabad"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["matches"][0]["name"], "Ravi");
        assert_eq!(body["matches"][0]["region"], "gujarat");
    }

    #[actix_web::test]
    async fn test_empty_result_is_404() {
        let app = test::init_service(
            App::new()
                .app_data(state("Chennai", None))
                .configure(routes::<HashEmbedder, FixedStructurer>),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/match")
            .set_json(json!({"jd_text": "anything", "top_n": 3}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "No matching resumes found.");
    }

    #[actix_web::test]
    async fn test_bad_requests() {
        let app = test::init_service(
            App::new()
                .app_data(state("Chennai", None))
                .configure(routes::<HashEmbedder, FixedStructurer>),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/match")
            .set_json(json!({"jd_text": "   "}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/match")
            .set_json(json!({"jd_text": "jd", "top_n": 0}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/resumes")
            .set_json(json!({"text": ""}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_unstructurable_resume_is_502() {
        let app = test::init_service(
            App::new()
                .app_data(state("Chennai", None))
                .configure(routes::<HashEmbedder, FixedStructurer>),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/resumes")
            .set_json(json!({"text": "unregistered prose"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_GATEWAY);
    }

    #[actix_web::test]
    async fn test_health() {
        let app = test::init_service(
            App::new()
                .app_data(state("Chennai", None))
                .configure(routes::<HashEmbedder, FixedStructurer>),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["candidates"], 0);
    }

    #[actix_web::test]
    async fn test_ingest_saves_snapshot() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let snapshots = Arc::new(SnapshotStore::new(temp_dir.path()).unwrap());
        let app = test::init_service(
            App::new()
                .app_data(state("Surat", Some(snapshots.clone())))
                .configure(routes::<HashEmbedder, FixedStructurer>),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/resumes")
            .set_json(json!({"text": "resume of ravi"}))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let data = snapshots.load().unwrap().unwrap();
        assert_eq!(data.records.len(), 1);
    }

    #[::core::prelude::v1::test]
    fn test_error_status_mapping() {
        use resumatch_core::Collaborator;

        let timeout = ApiError::from(Error::Timeout {
            collaborator: Collaborator::Embedding,
            timeout_ms: 10,
        });
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            ApiError::from(Error::Store("down".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(Error::InvalidInput("x".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(Error::Serialization("x".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
