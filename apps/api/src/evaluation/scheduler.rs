//! Scheduler: walks an `EvaluationGraph` and drives it to the aggregator.
//!
//! Flow: start every node whose dependencies have completed → poll all running
//! nodes together → merge each partial update as it arrives → repeat.
//!
//! - The scheduler owns the one mutable `EvaluationState` of the run. Nodes get
//!   an immutable snapshot taken when they became eligible.
//! - Merging happens on this task only, one update at a time, so the state
//!   needs no lock.
//! - Evaluator failures (error, panic or timeout) are degraded to a 0-score
//!   entry. Any other node failing ends the run.
//! - Running nodes are polled here rather than spawned. Returning early, or
//!   dropping the `run` future, drops every sibling still in flight.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::evaluation::errors::EvaluationError;
use crate::evaluation::graph::EvaluationGraph;
use crate::evaluation::node::{NodeServices, TaskNode};
use crate::evaluation::state::{EvaluationResult, EvaluationState, StateUpdate};

pub const DEFAULT_EVALUATOR_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Pending,
    Running,
    Completed,
}

pub struct Scheduler {
    services: NodeServices,
    evaluator_timeout: Duration,
}

impl Scheduler {
    pub fn new(services: NodeServices) -> Self {
        Self {
            services,
            evaluator_timeout: DEFAULT_EVALUATOR_TIMEOUT,
        }
    }

    /// Upper bound on one evaluator's scoring call; slower ones are degraded.
    pub fn with_evaluator_timeout(mut self, timeout: Duration) -> Self {
        self.evaluator_timeout = timeout;
        self
    }

    pub async fn run(
        &self,
        graph: &EvaluationGraph,
        initial: EvaluationState,
    ) -> Result<EvaluationState, EvaluationError> {
        let mut progress: HashMap<&str, NodeState> = graph
            .node_ids()
            .into_iter()
            .map(|id| (id, NodeState::Pending))
            .collect();
        debug!(
            document = %initial.document_reference.display(),
            skills = ?initial.required_skills,
            nodes = progress.len(),
            "scheduler started"
        );
        let mut state = initial;
        let mut in_flight = FuturesUnordered::new();

        loop {
            let ready: Vec<&TaskNode> = graph
                .nodes()
                .iter()
                .filter(|n| is_eligible(n, &progress))
                .collect();

            if !ready.is_empty() {
                let snapshot = Arc::new(state.clone());
                for node in ready {
                    progress.insert(node.id.as_str(), NodeState::Running);
                    debug!(node = %node, "node started");
                    in_flight.push(self.execute(node, Arc::clone(&snapshot)));
                }
            }

            let Some((node, outcome, elapsed)) = in_flight.next().await else {
                break;
            };

            let update = self.settle(node, outcome)?;
            state.merge(update)?;
            progress.insert(node.id.as_str(), NodeState::Completed);

            info!(
                node = %node,
                elapsed_ms = elapsed.as_millis() as u64,
                "node completed"
            );
        }

        let mut pending: Vec<String> = progress
            .iter()
            .filter(|(_, s)| **s != NodeState::Completed)
            .map(|(id, _)| id.to_string())
            .collect();
        if !pending.is_empty() {
            pending.sort();
            return Err(EvaluationError::Stalled { pending });
        }

        Ok(state)
    }

    /// Runs one node against its snapshot, catching panics and, for
    /// evaluators, enforcing the scoring timeout.
    async fn execute<'g>(
        &self,
        node: &'g TaskNode,
        snapshot: Arc<EvaluationState>,
    ) -> (&'g TaskNode, Result<StateUpdate, EvaluationError>, Duration) {
        let started = Instant::now();
        let work = AssertUnwindSafe(node.execute(&snapshot, &self.services)).catch_unwind();

        let caught = if node.kind.is_evaluator() {
            match tokio::time::timeout(self.evaluator_timeout, work).await {
                Ok(caught) => caught,
                Err(_) => {
                    let outcome = Err(EvaluationError::NodeFailed {
                        node: node.id.clone(),
                        message: format!(
                            "timed out after {}s",
                            self.evaluator_timeout.as_secs_f32()
                        ),
                    });
                    return (node, outcome, started.elapsed());
                }
            }
        } else {
            work.await
        };

        let outcome = caught.unwrap_or_else(|payload| {
            Err(EvaluationError::NodeFailed {
                node: node.id.clone(),
                message: format!("panicked: {}", panic_message(payload.as_ref())),
            })
        });
        (node, outcome, started.elapsed())
    }

    /// Applies the failure policy: degrade evaluators, fail on anything else.
    fn settle(
        &self,
        node: &TaskNode,
        outcome: Result<StateUpdate, EvaluationError>,
    ) -> Result<StateUpdate, EvaluationError> {
        match outcome {
            Ok(update) => Ok(update),
            Err(err) if node.kind.is_evaluator() => {
                warn!(evaluator = %node, error = %err, "evaluator degraded to score 0");
                Ok(StateUpdate::evaluation(
                    node.id.clone(),
                    EvaluationResult::degraded(format!("Evaluator '{}' failed: {err}", node.id)),
                ))
            }
            Err(err) => {
                warn!(node = %node, error = %err, "node failed; aborting run");
                Err(err)
            }
        }
    }
}

fn is_eligible(node: &TaskNode, progress: &HashMap<&str, NodeState>) -> bool {
    progress.get(node.id.as_str()) == Some(&NodeState::Pending)
        && node
            .depends_on
            .iter()
            .all(|dep| progress.get(dep.as_str()) == Some(&NodeState::Completed))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::config::{EvaluatorFlags, RunConfiguration};
    use crate::evaluation::graph::GraphBuilder;
    use crate::evaluation::node::{NodeKind, AGGREGATE_NODE, EMBED_NODE, PARSE_NODE};
    use crate::testing::{services_with, FakeScorer, StaticExtractor, SAMPLE_RESUME};
    use serde_json::json;

    fn graph(skills: &[&str], experience: bool, culture_fit: bool) -> EvaluationGraph {
        let config = RunConfiguration::new(
            skills,
            EvaluatorFlags {
                experience,
                culture_fit,
                jd_match: false,
            },
            None,
        )
        .unwrap();
        GraphBuilder::for_run(&config).unwrap()
    }

    fn initial() -> EvaluationState {
        EvaluationState::new("/tmp/cv.pdf", None, vec![])
    }

    fn scheduler(scorer: Arc<FakeScorer>) -> Scheduler {
        Scheduler::new(services_with(
            Arc::new(StaticExtractor::text(SAMPLE_RESUME)),
            scorer,
        ))
    }

    #[tokio::test]
    async fn test_full_run_reaches_aggregator() {
        let scorer = Arc::new(FakeScorer::scores(&[
            ("skill_python", 8),
            ("skill_communication", 6),
            ("experience_validation", 7),
        ]));
        let graph = graph(&["python", "communication"], true, false);

        let state = scheduler(scorer.clone()).run(&graph, initial()).await.unwrap();

        assert_eq!(state.extracted_text.as_deref(), Some(SAMPLE_RESUME));
        assert!(state.document_embedding.is_some());
        assert_eq!(state.evaluation_results.len(), 3);
        assert_eq!(state.final_score, Some(7.0));
        let breakdown = state.final_breakdown.unwrap();
        assert_eq!(breakdown["skill_python"], 8);
        assert_eq!(breakdown["skill_communication"], 6);
        assert_eq!(breakdown["experience_validation"], 7);
        assert_eq!(
            scorer.calls(),
            vec!["experience_validation", "skill_communication", "skill_python"]
        );
    }

    #[tokio::test]
    async fn test_failing_evaluator_is_degraded_not_fatal() {
        let scorer = Arc::new(
            FakeScorer::scores(&[("skill_python", 8), ("experience_validation", 7)])
                .failing("skill_communication"),
        );
        let graph = graph(&["python", "communication"], true, false);

        let state = scheduler(scorer).run(&graph, initial()).await.unwrap();

        let degraded = &state.evaluation_results["skill_communication"];
        assert!(degraded.degraded);
        assert_eq!(degraded.score, 0);
        assert!(degraded.explanation.contains("skill_communication"));
        assert_eq!(state.final_breakdown.unwrap()["skill_communication"], 0);
        assert_eq!(state.final_score, Some(5.0));
    }

    #[tokio::test]
    async fn test_panicking_evaluator_is_degraded() {
        let scorer = Arc::new(FakeScorer::scores(&[("skill_go", 9)]).panicking("culture_fit"));
        let graph = graph(&["go"], false, true);

        let state = scheduler(scorer).run(&graph, initial()).await.unwrap();

        let entry = &state.evaluation_results["culture_fit"];
        assert!(entry.degraded);
        assert!(entry.explanation.contains("panicked"));
        assert_eq!(state.final_score, Some(4.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_evaluator_times_out_and_degrades() {
        let scorer = Arc::new(
            FakeScorer::scores(&[("skill_rust", 10)])
                .delayed("experience_validation", Duration::from_secs(120)),
        );
        let graph = graph(&["rust"], true, false);

        let state = scheduler(scorer)
            .with_evaluator_timeout(Duration::from_secs(5))
            .run(&graph, initial())
            .await
            .unwrap();

        let entry = &state.evaluation_results["experience_validation"];
        assert!(entry.degraded);
        assert!(entry.explanation.contains("timed out"));
        assert_eq!(state.final_score, Some(5.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sibling_evaluators_run_concurrently() {
        let scorer =
            Arc::new(FakeScorer::scores(&[]).with_default_delay(Duration::from_millis(200)));
        let graph = graph(&["a", "b", "c", "d"], true, true);

        let started = tokio::time::Instant::now();
        scheduler(scorer.clone()).run(&graph, initial()).await.unwrap();

        assert_eq!(scorer.peak_concurrency(), 6);
        // Six 200ms calls overlapping, not stacked end to end.
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_failed_extraction_runs_no_evaluator() {
        let scorer = Arc::new(FakeScorer::scores(&[]));
        let extractor = Arc::new(StaticExtractor::empty());
        let scheduler = Scheduler::new(services_with(extractor.clone(), scorer.clone()));
        let graph = graph(&["python"], true, true);

        let err = scheduler.run(&graph, initial()).await.unwrap_err();

        assert!(matches!(err, EvaluationError::Extraction(_)));
        assert_eq!(extractor.calls(), 1);
        assert!(scorer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_scores_still_count_in_average() {
        let scorer = Arc::new(
            FakeScorer::scores(&[("skill_python", 9)])
                .with_raw("experience_validation", json!("very good")),
        );
        let graph = graph(&["python"], true, false);

        let state = scheduler(scorer).run(&graph, initial()).await.unwrap();

        assert_eq!(state.evaluation_results["experience_validation"].score, json!("very good"));
        assert_eq!(state.final_breakdown.unwrap()["experience_validation"], 0);
        assert_eq!(state.final_score, Some(4.5));
    }

    #[tokio::test]
    async fn test_result_is_independent_of_completion_order() {
        let scores = [("skill_a", 3), ("skill_b", 9), ("skill_c", 6)];
        let fast_first = Arc::new(
            FakeScorer::scores(&scores)
                .delayed("skill_a", Duration::from_millis(30))
                .delayed("skill_b", Duration::from_millis(1)),
        );
        let slow_first = Arc::new(
            FakeScorer::scores(&scores)
                .delayed("skill_c", Duration::from_millis(30))
                .delayed("skill_a", Duration::from_millis(1)),
        );
        let graph = graph(&["a", "b", "c"], false, false);

        let one = scheduler(fast_first).run(&graph, initial()).await.unwrap();
        let two = scheduler(slow_first).run(&graph, initial()).await.unwrap();

        assert_eq!(one.evaluation_results, two.evaluation_results);
        assert_eq!(one.final_breakdown, two.final_breakdown);
        assert_eq!(one.final_score, Some(6.0));
    }

    #[tokio::test]
    async fn test_aggregator_without_evaluators_fails_run() {
        let mut builder = GraphBuilder::new();
        builder
            .add_node(TaskNode::new(PARSE_NODE, NodeKind::Parse, vec![]))
            .unwrap();
        builder
            .add_node(TaskNode::new(EMBED_NODE, NodeKind::Embed, vec![PARSE_NODE.into()]))
            .unwrap();
        builder
            .add_node(TaskNode::new(AGGREGATE_NODE, NodeKind::Aggregate, vec![EMBED_NODE.into()]))
            .unwrap();
        let graph = builder.build();

        let err = scheduler(Arc::new(FakeScorer::scores(&[])))
            .run(&graph, initial())
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::Aggregation(_)));
    }

    #[tokio::test]
    async fn test_dropping_run_cancels_in_flight_evaluators() {
        let scorer =
            Arc::new(FakeScorer::scores(&[]).with_default_delay(Duration::from_secs(3600)));
        let graph = graph(&["python", "rust"], true, false);
        let scheduler = scheduler(scorer.clone());

        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            scheduler.run(&graph, initial()),
        )
        .await;

        assert!(outcome.is_err(), "run should still be waiting on evaluators");
        assert_eq!(scorer.calls().len(), 3);
    }
}
