use thiserror::Error;

/// Run-level failures of the evaluation engine.
///
/// A single evaluator failing is not represented here: the scheduler degrades
/// it to a zero-score entry and the run carries on.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Invalid run configuration: {0}")]
    Configuration(String),

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Aggregation failed: {0}")]
    Aggregation(String),

    /// A partial update tried to redefine a set-once field.
    #[error("State conflict: field '{field}' was already set")]
    StateConflict { field: &'static str },

    #[error("Node '{node}' failed: {message}")]
    NodeFailed { node: String, message: String },

    /// No node is eligible but the graph has not finished.
    #[error("Scheduler stalled with pending nodes: {pending:?}")]
    Stalled { pending: Vec<String> },
}

impl EvaluationError {
    /// True for failures caused by the caller's input rather than the engine.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EvaluationError::Configuration(_)
                | EvaluationError::UnsupportedFormat(_)
                | EvaluationError::Extraction(_)
        )
    }
}
