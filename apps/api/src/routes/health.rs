use axum::Json;
use serde_json::{json, Value};

/// GET /
/// Service banner listing the public endpoints.
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "Job Scout API",
        "endpoints": {
            "search_jobs": "POST /api/jobs/search",
            "search_jobs_stream": "POST /api/jobs/search/stream",
            "get_job": "GET /api/jobs/{job_id}",
            "analyze_resume": "POST /api/analysis/match"
        }
    }))
}

/// GET /health
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": env!("CARGO_PKG_NAME")
    }))
}
