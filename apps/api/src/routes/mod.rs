pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::jobs::handlers as jobs;
use crate::matching::handlers as matching;
use crate::state::AppState;

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        // Jobs
        .route("/api/jobs/search", post(jobs::handle_search))
        .route("/api/jobs/search/stream", post(jobs::handle_search_stream))
        .route("/api/jobs/:id", get(jobs::handle_get_job))
        // Analysis
        .route(
            "/api/analysis/match",
            post(matching::handle_match).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::harvest::harvester::testing::{candidate, FakeAdapter};
    use crate::harvest::harvester::Harvester;
    use crate::harvest::source::SourceAdapter;
    use crate::jobs::store::testing::MemoryJobStore;
    use crate::jobs::store::JobStore;
    use crate::matching::service::MatchConfig;
    use crate::models::job::Platform;

    const BOUNDARY: &str = "jobscout-test-boundary";

    fn state_with(store: Arc<MemoryJobStore>) -> AppState {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(FakeAdapter::returning(Platform::Linkedin, 3, Duration::from_millis(5))),
            Arc::new(FakeAdapter::failing(Platform::Glassdoor)),
        ];
        AppState {
            store,
            harvester: Harvester::new(adapters, Duration::from_secs(2)),
            match_config: MatchConfig::from_config(&Config::for_tests()),
        }
    }

    fn app() -> Router {
        build_router(state_with(Arc::new(MemoryJobStore::default())))
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn match_request(job_id: &str, filename: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"job_id\"\r\n\r\n\
             {job_id}\r\n\
             --{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"resume\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             {content}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::post("/api/analysis/match")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_root_lists_endpoints() {
        let response = app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["endpoints"]["search_jobs"], "POST /api/jobs/search");
    }

    #[tokio::test]
    async fn test_search_absorbs_failing_source() {
        let response = app()
            .oneshot(post_json(
                "/api/jobs/search",
                serde_json::json!({"query": "backend engineer"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["total"], 3);
        assert_eq!(body["jobs"].as_array().unwrap().len(), 3);
        assert_eq!(body["jobs"][0]["platform"], "linkedin");
    }

    #[tokio::test]
    async fn test_search_rejects_blank_query() {
        let response = app()
            .oneshot(post_json("/api/jobs/search", serde_json::json!({"query": " "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_stream_is_server_sent_events() {
        let response = app()
            .oneshot(post_json(
                "/api/jobs/search/stream",
                serde_json::json!({"query": "sre"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(response.headers()["x-accel-buffering"], "no");

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let events: Vec<Value> = text
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|data| serde_json::from_str(data.trim()).unwrap())
            .collect();

        assert_eq!(events.len(), 4);
        assert_eq!(events[0]["type"], "start");
        assert_eq!(events[0]["platforms"], serde_json::json!(["linkedin", "glassdoor"]));
        let jobs_events: Vec<&Value> = events.iter().filter(|e| e["type"] == "jobs").collect();
        assert_eq!(jobs_events.len(), 2);
        assert_eq!(events[3]["type"], "done");
    }

    #[tokio::test]
    async fn test_get_unknown_job_is_404() {
        let response = app()
            .oneshot(
                Request::get(format!("/api/jobs/{}", uuid::Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_job_returns_stored_row() {
        let store = Arc::new(MemoryJobStore::default());
        let mut job = candidate(Platform::Linkedin, 9);
        job.description = Some("Maintain the API".to_string());
        let stored = store.upsert(&job).await.unwrap();

        let response = build_router(state_with(store))
            .oneshot(
                Request::get(format!("/api/jobs/{}", stored.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["description"], "Maintain the API");
        assert_eq!(body["url"], stored.url);
    }

    #[tokio::test]
    async fn test_match_unknown_job_is_404() {
        let response = app()
            .oneshot(match_request(
                &uuid::Uuid::new_v4().to_string(),
                "cv.txt",
                "Rust, SQL",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_match_rejects_unsupported_resume_format() {
        let store = Arc::new(MemoryJobStore::default());
        let stored = store.upsert(&candidate(Platform::Linkedin, 1)).await.unwrap();

        let response = build_router(state_with(store))
            .oneshot(match_request(&stored.id.to_string(), "cv.rtf", "Rust"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_match_without_description_is_400() {
        // The Linkedin fake yields no description on detail fetch.
        let store = Arc::new(MemoryJobStore::default());
        let stored = store.upsert(&candidate(Platform::Linkedin, 2)).await.unwrap();

        let response = build_router(state_with(store))
            .oneshot(match_request(&stored.id.to_string(), "cv.txt", "Rust, SQL"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("job description"));
    }

    #[tokio::test]
    async fn test_match_without_provider_returns_placeholder() {
        let store = Arc::new(MemoryJobStore::default());
        let mut job = candidate(Platform::Glassdoor, 4);
        job.description = Some("Postgres and Rust".to_string());
        let stored = store.upsert(&job).await.unwrap();

        let response = build_router(state_with(store))
            .oneshot(match_request(&stored.id.to_string(), "cv.txt", "Rust, SQL"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["match_percentage"], 0);
        assert_eq!(body["matching_skills"], serde_json::json!([]));
        assert!(body["recommendations"][0]
            .as_str()
            .unwrap()
            .contains("No AI provider"));
    }
}
