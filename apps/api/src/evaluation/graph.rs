//! Graph Builder: turns a Run Configuration into the evaluation topology.
//!
//! ```text
//! parse_resume ─► embed_resume ─┬─► skill_<key> ...     ─┐
//!                               ├─► experience_validation ├─► aggregate
//!                               ├─► culture_fit           │
//!                               └─► jd_match             ─┘
//! ```
//!
//! Evaluators depend only on the feature node, never on each other, and each
//! writes a distinct key. That is what lets the scheduler run them at once.

use std::collections::BTreeSet;

use crate::evaluation::config::RunConfiguration;
use crate::evaluation::errors::EvaluationError;
use crate::evaluation::node::{
    EvaluatorKind, NodeKind, TaskNode, AGGREGATE_NODE, EMBED_NODE, PARSE_NODE,
};

/// An immutable, validated topology. Nodes are kept in insertion order,
/// which is always a valid topological order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationGraph {
    nodes: Vec<TaskNode>,
}

impl EvaluationGraph {
    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    pub fn node_ids(&self) -> BTreeSet<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    pub fn evaluator_ids(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| n.kind.is_evaluator())
            .map(|n| n.id.as_str())
            .collect()
    }
}

/// Assembles nodes and rejects anything that would break the scheduler's
/// assumptions: duplicate identifiers or edges to unknown nodes.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<TaskNode>,
    ids: BTreeSet<String>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the standard topology for one evaluation request.
    pub fn for_run(config: &RunConfiguration) -> Result<EvaluationGraph, EvaluationError> {
        if config.evaluator_count() == 0 {
            return Err(EvaluationError::Configuration(
                "no skills requested and no fixed evaluator enabled; nothing to aggregate"
                    .to_string(),
            ));
        }

        let mut builder = Self::new();
        builder.add_node(TaskNode::new(PARSE_NODE, NodeKind::Parse, vec![]))?;
        builder.add_node(TaskNode::new(
            EMBED_NODE,
            NodeKind::Embed,
            vec![PARSE_NODE.to_string()],
        ))?;

        let mut fan_in = Vec::with_capacity(config.evaluator_count());
        for kind in evaluator_kinds(config) {
            let node = TaskNode::evaluator(kind, vec![EMBED_NODE.to_string()]);
            fan_in.push(node.id.clone());
            builder.add_node(node)?;
        }

        builder.add_node(TaskNode::new(AGGREGATE_NODE, NodeKind::Aggregate, fan_in))?;
        Ok(builder.build())
    }

    pub fn add_node(&mut self, node: TaskNode) -> Result<&mut Self, EvaluationError> {
        if self.ids.contains(&node.id) {
            return Err(EvaluationError::Configuration(format!(
                "duplicate node identifier '{}'",
                node.id
            )));
        }
        // Dependencies must already exist, so insertion order stays topological
        // and no cycle can be formed.
        if let Some(missing) = node
            .depends_on
            .iter()
            .find(|dep| !self.ids.contains(dep.as_str()))
        {
            return Err(EvaluationError::Configuration(format!(
                "node '{}' depends on unknown node '{}'",
                node.id, missing
            )));
        }

        self.ids.insert(node.id.clone());
        self.nodes.push(node);
        Ok(self)
    }

    pub fn build(self) -> EvaluationGraph {
        EvaluationGraph { nodes: self.nodes }
    }
}

/// Skill evaluators in request order, then the enabled fixed evaluators.
fn evaluator_kinds(config: &RunConfiguration) -> Vec<EvaluatorKind> {
    let flags = config.flags();
    let mut kinds: Vec<EvaluatorKind> = config.skills().iter().map(EvaluatorKind::skill).collect();

    if flags.experience {
        kinds.push(EvaluatorKind::Experience);
    }
    if flags.culture_fit {
        kinds.push(EvaluatorKind::CultureFit);
    }
    if flags.jd_match {
        kinds.push(EvaluatorKind::JdMatch);
    }
    kinds
}
