//! Evaluation State: the record threaded along every edge of the graph.
//!
//! Field policy:
//! - `document_reference`, `job_description`, `required_skills`: fixed before the
//!   run starts. `StateUpdate` has no slot for them, so no node can rewrite them.
//! - `extracted_text`, `document_embedding`, `final_score`, `final_breakdown`:
//!   set once. A second write is a `StateConflict`.
//! - `evaluation_results`: key-union merge, right-biased on collision.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::evaluation::errors::EvaluationError;

/// One evaluator's output. `score` is kept as the raw JSON value the scorer
/// produced; the aggregator decides whether it is usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub score: Value,
    pub explanation: String,
    /// Set when the evaluator failed and this entry was recorded in its place.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

impl EvaluationResult {
    pub fn new(score: impl Into<Value>, explanation: impl Into<String>) -> Self {
        Self {
            score: score.into(),
            explanation: explanation.into(),
            degraded: false,
        }
    }

    /// Worst-case entry for an evaluator that failed.
    pub fn degraded(explanation: impl Into<String>) -> Self {
        Self {
            score: Value::from(0),
            explanation: explanation.into(),
            degraded: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationState {
    pub document_reference: PathBuf,
    pub job_description: Option<String>,
    pub required_skills: Vec<String>,
    pub extracted_text: Option<String>,
    pub document_embedding: Option<Vec<f32>>,
    pub evaluation_results: BTreeMap<String, EvaluationResult>,
    pub final_score: Option<f64>,
    pub final_breakdown: Option<BTreeMap<String, u8>>,
}

/// What a node hands back to the scheduler. Unset fields leave the state alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub extracted_text: Option<String>,
    pub document_embedding: Option<Vec<f32>>,
    pub evaluation_results: BTreeMap<String, EvaluationResult>,
    pub final_score: Option<f64>,
    pub final_breakdown: Option<BTreeMap<String, u8>>,
}

impl StateUpdate {
    pub fn extracted_text(text: String) -> Self {
        Self {
            extracted_text: Some(text),
            ..Default::default()
        }
    }

    pub fn document_embedding(vector: Vec<f32>) -> Self {
        Self {
            document_embedding: Some(vector),
            ..Default::default()
        }
    }

    pub fn evaluation(identifier: impl Into<String>, result: EvaluationResult) -> Self {
        Self {
            evaluation_results: BTreeMap::from([(identifier.into(), result)]),
            ..Default::default()
        }
    }

    pub fn verdict(final_score: f64, final_breakdown: BTreeMap<String, u8>) -> Self {
        Self {
            final_score: Some(final_score),
            final_breakdown: Some(final_breakdown),
            ..Default::default()
        }
    }
}

impl EvaluationState {
    pub fn new(
        document_reference: impl Into<PathBuf>,
        job_description: Option<String>,
        required_skills: Vec<String>,
    ) -> Self {
        Self {
            document_reference: document_reference.into(),
            job_description,
            required_skills,
            ..Default::default()
        }
    }

    /// Applies a partial update.
    ///
    /// Every set-once field is checked before anything is written, so a rejected
    /// update leaves the state untouched.
    pub fn merge(&mut self, update: StateUpdate) -> Result<(), EvaluationError> {
        ensure_unset("extracted_text", &self.extracted_text, &update.extracted_text)?;
        ensure_unset(
            "document_embedding",
            &self.document_embedding,
            &update.document_embedding,
        )?;
        ensure_unset("final_score", &self.final_score, &update.final_score)?;
        ensure_unset(
            "final_breakdown",
            &self.final_breakdown,
            &update.final_breakdown,
        )?;

        let StateUpdate {
            extracted_text,
            document_embedding,
            evaluation_results,
            final_score,
            final_breakdown,
        } = update;

        if extracted_text.is_some() {
            self.extracted_text = extracted_text;
        }
        if document_embedding.is_some() {
            self.document_embedding = document_embedding;
        }
        if final_score.is_some() {
            self.final_score = final_score;
        }
        if final_breakdown.is_some() {
            self.final_breakdown = final_breakdown;
        }
        self.evaluation_results.extend(evaluation_results);

        Ok(())
    }
}

fn ensure_unset<T>(
    field: &'static str,
    current: &Option<T>,
    incoming: &Option<T>,
) -> Result<(), EvaluationError> {
    if current.is_some() && incoming.is_some() {
        return Err(EvaluationError::StateConflict { field });
    }
    Ok(())
}
