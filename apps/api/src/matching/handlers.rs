use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::details::ensure_description;
use crate::matching::documents::extract_text;
use crate::matching::normalizer::MatchResult;
use crate::matching::service::MatchService;
use crate::state::AppState;

struct MatchUpload {
    job_id: Uuid,
    filename: String,
    data: Bytes,
}

async fn read_upload(mut multipart: Multipart) -> Result<MatchUpload, AppError> {
    let mut job_id: Option<Uuid> = None;
    let mut resume: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("job_id") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Read error: {e}")))?;
                let id = Uuid::parse_str(raw.trim())
                    .map_err(|_| AppError::Validation(format!("Invalid job_id '{raw}'")))?;
                job_id = Some(id);
            }
            Some("resume") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Read error: {e}")))?;
                resume = Some((filename, data));
            }
            _ => {}
        }
    }

    let job_id = job_id.ok_or_else(|| AppError::Validation("job_id is required".to_string()))?;
    let (filename, data) =
        resume.ok_or_else(|| AppError::Validation("resume file is required".to_string()))?;

    Ok(MatchUpload {
        job_id,
        filename,
        data,
    })
}

/// POST /api/analysis/match
///
/// multipart/form-data: `job_id`, `resume` (.pdf, .docx, .doc or .txt).
pub async fn handle_match(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<MatchResult>, AppError> {
    let upload = read_upload(multipart).await?;

    let job = state
        .store
        .get(upload.job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    let resume_text = extract_text(&upload.filename, upload.data).await?;

    let job = ensure_description(state.store.as_ref(), &state.harvester, job).await?;
    let description = job.description.as_deref().ok_or_else(|| {
        AppError::Validation("Could not fetch job description for analysis".to_string())
    })?;

    let service = MatchService::connect(&state.match_config)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    debug!("Scoring job {} with {:?}", job.id, service.models());
    let result = service
        .analyze_match(&resume_text, description, &job.title)
        .await;

    Ok(Json(result))
}
