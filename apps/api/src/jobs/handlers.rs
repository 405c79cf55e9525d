use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    http::header::{HeaderName, CACHE_CONTROL},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::details::ensure_description;
use crate::jobs::search::{run_search, stream_search, SearchRequest, SearchResponse};
use crate::models::job::JobPosting;
use crate::state::AppState;

const EVENT_BUFFER: usize = 16;

/// POST /api/jobs/search
pub async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let (query, platforms) = req.validate()?;
    let response = run_search(state.store.as_ref(), &state.harvester, &query, &platforms).await?;
    Ok(Json(response))
}

/// POST /api/jobs/search/stream
///
/// Emits `start`, one `jobs` event per platform as each finishes, then `done`.
pub async fn handle_search_stream(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (query, platforms) = req.validate()?;

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    tokio::spawn(stream_search(
        state.store.clone(),
        state.harvester.clone(),
        query,
        platforms,
        tx,
    ));

    let events = ReceiverStream::new(rx).filter_map(|event| {
        Event::default()
            .json_data(&event)
            .ok()
            .map(Ok::<_, Infallible>)
    });

    let headers = [
        (CACHE_CONTROL, "no-cache"),
        (HeaderName::from_static("x-accel-buffering"), "no"),
    ];
    Ok((headers, Sse::new(events).keep_alive(KeepAlive::default())))
}

/// GET /api/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobPosting>, AppError> {
    let job = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;

    let job = ensure_description(state.store.as_ref(), &state.harvester, job).await?;
    Ok(Json(job))
}
