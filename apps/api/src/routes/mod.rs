pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::screening::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/screen",
            post(handlers::handle_screen).layer(DefaultBodyLimit::max(state.max_upload_bytes)),
        )
        .with_state(state)
}
