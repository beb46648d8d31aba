//! Task Node: one unit of work in the evaluation graph.
//!
//! A node reads the state snapshot it was scheduled with and returns only its
//! own partial update. Kinds are a closed set: the two preprocessing stages,
//! one evaluator per dimension, and the aggregator.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::documents::embedding::Embedder;
use crate::documents::extract::TextExtractor;
use crate::evaluation::aggregator::aggregate;
use crate::evaluation::config::Skill;
use crate::evaluation::errors::EvaluationError;
use crate::evaluation::scorers::{ScoreRequest, Scorer};
use crate::evaluation::state::{EvaluationResult, EvaluationState, StateUpdate};

pub const PARSE_NODE: &str = "parse_resume";
pub const EMBED_NODE: &str = "embed_resume";
pub const AGGREGATE_NODE: &str = "aggregate";

/// One scoring dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluatorKind {
    Skill { name: String, key: String },
    Experience,
    CultureFit,
    JdMatch,
}

impl EvaluatorKind {
    pub fn skill(skill: &Skill) -> Self {
        EvaluatorKind::Skill {
            name: skill.name.clone(),
            key: skill.key.clone(),
        }
    }

    /// The key this evaluator writes under in `evaluation_results`.
    ///
    /// Skill identifiers are always prefixed with `skill_`, so they can never
    /// collide with the fixed evaluators.
    pub fn identifier(&self) -> String {
        match self {
            EvaluatorKind::Skill { key, .. } => format!("skill_{key}"),
            EvaluatorKind::Experience => "experience_validation".to_string(),
            EvaluatorKind::CultureFit => "culture_fit".to_string(),
            EvaluatorKind::JdMatch => "jd_match".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Parse,
    Embed,
    Evaluate(EvaluatorKind),
    Aggregate,
}

impl NodeKind {
    pub fn is_evaluator(&self) -> bool {
        matches!(self, NodeKind::Evaluate(_))
    }
}

/// Collaborators injected into every run. Nothing here is global.
#[derive(Clone)]
pub struct NodeServices {
    pub extractor: Arc<dyn TextExtractor>,
    pub embedder: Arc<dyn Embedder>,
    pub scorer: Arc<dyn Scorer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNode {
    pub id: String,
    pub kind: NodeKind,
    pub depends_on: Vec<String>,
}

impl TaskNode {
    pub fn new(id: impl Into<String>, kind: NodeKind, depends_on: Vec<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            depends_on,
        }
    }

    pub fn evaluator(kind: EvaluatorKind, depends_on: Vec<String>) -> Self {
        Self::new(kind.identifier(), NodeKind::Evaluate(kind), depends_on)
    }

    pub async fn execute(
        &self,
        state: &EvaluationState,
        services: &NodeServices,
    ) -> Result<StateUpdate, EvaluationError> {
        match &self.kind {
            NodeKind::Parse => {
                let text = services
                    .extractor
                    .extract(&state.document_reference)
                    .await?;
                Ok(StateUpdate::extracted_text(text))
            }
            NodeKind::Embed => {
                let text = require_text(state)?;
                let vector = services
                    .embedder
                    .embed(text)
                    .await
                    .map_err(|e| EvaluationError::Embedding(e.to_string()))?;
                if vector.len() != services.embedder.dimensions() {
                    return Err(EvaluationError::Embedding(format!(
                        "expected {} dimensions, got {}",
                        services.embedder.dimensions(),
                        vector.len()
                    )));
                }
                Ok(StateUpdate::document_embedding(vector))
            }
            NodeKind::Evaluate(kind) => {
                let text = require_text(state)?;
                let request = ScoreRequest {
                    evaluator: kind,
                    resume_text: text,
                    job_description: state.job_description.as_deref(),
                };
                let raw = services
                    .scorer
                    .score(&request)
                    .await
                    .map_err(|e| EvaluationError::NodeFailed {
                        node: self.id.clone(),
                        message: e.to_string(),
                    })?;
                Ok(StateUpdate::evaluation(
                    self.id.clone(),
                    EvaluationResult::new(raw.score, raw.explanation),
                ))
            }
            NodeKind::Aggregate => {
                let verdict = aggregate(&state.evaluation_results)?;
                Ok(StateUpdate::verdict(verdict.final_score, verdict.breakdown))
            }
        }
    }
}

impl fmt::Display for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

fn require_text(state: &EvaluationState) -> Result<&str, EvaluationError> {
    state
        .extracted_text
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            EvaluationError::Extraction("resume text missing; parse step not completed".to_string())
        })
}
