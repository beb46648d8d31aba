//! Engine: the single call a caller makes to evaluate one document.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::evaluation::config::RunConfiguration;
use crate::evaluation::errors::EvaluationError;
use crate::evaluation::graph::GraphBuilder;
use crate::evaluation::node::NodeServices;
use crate::evaluation::scheduler::Scheduler;
use crate::evaluation::state::{EvaluationResult, EvaluationState};

/// Result fields of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationOutcome {
    pub final_score: f64,
    pub final_breakdown: BTreeMap<String, u8>,
    pub evaluation_results: BTreeMap<String, EvaluationResult>,
}

pub struct EvaluationEngine {
    scheduler: Scheduler,
}

impl EvaluationEngine {
    pub fn new(services: NodeServices) -> Self {
        Self {
            scheduler: Scheduler::new(services),
        }
    }

    pub fn with_evaluator_timeout(self, timeout: Duration) -> Self {
        Self {
            scheduler: self.scheduler.with_evaluator_timeout(timeout),
        }
    }

    /// Builds the graph for `config`, runs it against the document at
    /// `document_reference` and returns the verdict.
    ///
    /// Configuration errors are raised before any node runs. A run either
    /// returns a complete outcome (possibly with degraded entries) or an error.
    pub async fn run(
        &self,
        document_reference: &Path,
        config: &RunConfiguration,
    ) -> Result<EvaluationOutcome, EvaluationError> {
        let graph = GraphBuilder::for_run(config)?;
        let initial = EvaluationState::new(
            document_reference,
            config.job_description().map(str::to_string),
            config.skill_names(),
        );

        let run_id = Uuid::new_v4();
        let span = info_span!(
            "evaluation_run",
            %run_id,
            document = %document_reference.display(),
            evaluators = graph.evaluator_ids().len()
        );

        async move {
            let started = Instant::now();
            let state = self.scheduler.run(&graph, initial).await?;
            let outcome = into_outcome(state)?;

            info!(
                final_score = outcome.final_score,
                degraded = outcome.evaluation_results.values().filter(|r| r.degraded).count(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "evaluation complete"
            );
            Ok(outcome)
        }
        .instrument(span)
        .await
    }
}

fn into_outcome(state: EvaluationState) -> Result<EvaluationOutcome, EvaluationError> {
    match (state.final_score, state.final_breakdown) {
        (Some(final_score), Some(final_breakdown)) => Ok(EvaluationOutcome {
            final_score,
            final_breakdown,
            evaluation_results: state.evaluation_results,
        }),
        _ => Err(EvaluationError::Aggregation(
            "run finished without a verdict".to_string(),
        )),
    }
}
