use std::sync::Arc;

use crate::config::Config;
use crate::documents::store::DocumentStore;
use crate::evaluation::engine::EvaluationEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Where uploaded resumes live. Default: S3DocumentStore.
    pub documents: Arc<dyn DocumentStore>,
    /// Evaluation engine with its extractor, embedder and scorer already wired in.
    pub engine: Arc<EvaluationEngine>,
}
