//! Axum route handler for the Screening API.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::info;

use crate::errors::AppError;
use crate::extraction::extract_resume_text;
use crate::screening::router::{LabelMatching, MATCH_LABEL};
use crate::screening::state::PipelineState;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// The multipart fields of a screening request.
#[derive(Debug)]
pub struct ScreenUpload {
    pub job_description: String,
    pub file_name: String,
    pub resume: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Maybe,
    Reject,
}

/// The simplified view of a finished screening returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningResult {
    pub candidate_email: Option<String>,
    pub experience_level: Option<String>,
    /// 100 when the skill label counts as "Match" under the pipeline's label matching, otherwise 0.
    pub skill_match: u8,
    pub decision: Decision,
}

#[derive(Debug, Serialize)]
pub struct ScreenResponse {
    pub success: bool,
    pub data: ScreeningResult,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /screen
///
/// Multipart form with `job_description` (text) and `resume` (PDF or Word file).
/// Failures of any kind come back as `{"success": false, "error": ...}`.
pub async fn handle_screen(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ScreenResponse>, AppError> {
    let upload = read_upload(multipart, state.max_upload_bytes).await?;
    info!(
        "Screening {} ({} bytes)",
        upload.file_name,
        upload.resume.len()
    );

    let ScreenUpload {
        job_description,
        file_name,
        resume,
    } = upload;

    let resume_text =
        tokio::task::spawn_blocking(move || stage_upload(&file_name, &resume).and_then(extract_staged))
            .await
            .context("Resume extraction task failed")??;

    let final_state = state.pipeline.run(resume_text, job_description).await?;
    let data = to_screening_result(final_state, state.pipeline.label_matching());
    info!("Screening decision: {:?}", data.decision);

    Ok(Json(ScreenResponse {
        success: true,
        data,
    }))
}

async fn read_upload(mut multipart: Multipart, limit: usize) -> Result<ScreenUpload, AppError> {
    let mut job_description = None;
    let mut resume = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(e, limit, "Malformed multipart body"))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "job_description" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| upload_error(e, limit, "Unreadable job_description"))?;
                job_description = Some(text);
            }
            "resume" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| upload_error(e, limit, "Unreadable resume upload"))?;
                resume = Some((file_name, bytes));
            }
            _ => {}
        }
    }

    let job_description = job_description
        .ok_or_else(|| AppError::Validation("Missing form field 'job_description'".to_string()))?;
    if job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }
    let (file_name, resume) =
        resume.ok_or_else(|| AppError::Validation("Missing form field 'resume'".to_string()))?;

    Ok(ScreenUpload {
        job_description,
        file_name,
        resume,
    })
}

/// A body cut off by the upload limit surfaces as a multipart error; report it as such.
fn upload_error(err: MultipartError, limit: usize, context: &str) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { limit }
    } else {
        AppError::Validation(format!("{context}: {err}"))
    }
}

/// Writes the upload to a temporary file carrying the original extension.
fn stage_upload(file_name: &str, contents: &[u8]) -> Result<NamedTempFile, AppError> {
    let suffix = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();

    let mut file = tempfile::Builder::new()
        .prefix("resume_")
        .suffix(&suffix)
        .tempfile()
        .context("Failed to create temporary resume file")?;
    file.write_all(contents)
        .and_then(|_| file.flush())
        .context("Failed to write temporary resume file")?;

    Ok(file)
}

/// Extracts the staged resume. Consumes the file so it is deleted on every path.
fn extract_staged(file: NamedTempFile) -> Result<String, AppError> {
    Ok(extract_resume_text(file.path())?)
}

/// Maps the merged pipeline state to the client-facing result.
pub fn to_screening_result(state: PipelineState, matching: LabelMatching) -> ScreeningResult {
    let response = state.response.as_deref().unwrap_or_default().to_lowercase();
    let decision = if response.contains("shortlisted") {
        Decision::Accept
    } else if response.contains("recruiter") {
        Decision::Maybe
    } else {
        Decision::Reject
    };

    let skill_match = if matching.matches(state.skill_match.as_deref(), MATCH_LABEL) {
        100
    } else {
        0
    };

    ScreeningResult {
        candidate_email: state.email,
        experience_level: state.experience_level,
        skill_match,
        decision,
    }
}
