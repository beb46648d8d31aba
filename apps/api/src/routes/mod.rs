pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::documents::handlers as documents;
use crate::evaluation::handlers as evaluation;
use crate::state::AppState;

/// Request body cap; multi-page scanned resumes run well past axum's 2 MB default.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Document store
        .route("/api/v1/resumes", get(documents::handle_list_resumes))
        .route("/api/v1/folders", get(documents::handle_list_folders))
        .route("/api/v1/upload", post(documents::handle_upload))
        // Evaluation
        .route("/api/v1/scan", post(evaluation::handle_scan))
        .route("/api/v1/scan-upload", post(evaluation::handle_scan_upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
