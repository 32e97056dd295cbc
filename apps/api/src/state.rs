use crate::screening::pipeline::ScreeningPipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Built once at startup around the process-wide LLM client.
    pub pipeline: ScreeningPipeline,
    /// Request body cap for `POST /screen`.
    pub max_upload_bytes: usize,
}
