//! Scoring functions: the port every evaluator node calls, plus its LLM adapter.
//!
//! The scheduler carries an `Arc<dyn Scorer>`; tests swap in a fake.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::evaluation::node::EvaluatorKind;
use crate::evaluation::prompts::{
    CULTURE_FIT_PROMPT_TEMPLATE, CULTURE_FIT_SYSTEM, EXPERIENCE_PROMPT_TEMPLATE,
    EXPERIENCE_SYSTEM, JD_MATCH_PROMPT_TEMPLATE, JD_MATCH_SYSTEM, SKILL_PROMPT_TEMPLATE,
    SKILL_SYSTEM,
};
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, SCORE_OUTPUT_INSTRUCTION};
use crate::llm_client::{strip_json_fences, LlmClient, LlmError};

/// How much of a malformed model reply is echoed into the explanation.
const RAW_OUTPUT_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("model returned malformed output: {raw}")]
    Malformed { raw: String },

    #[error("{evaluator} requires a job description")]
    MissingJobDescription { evaluator: String },
}

/// Everything a scoring function may look at.
#[derive(Debug, Clone, Copy)]
pub struct ScoreRequest<'a> {
    pub evaluator: &'a EvaluatorKind,
    pub resume_text: &'a str,
    pub job_description: Option<&'a str>,
}

/// A scorer's answer before validation.
///
/// `score` stays untyped: a string, float or out-of-range number is passed
/// through and coerced by the aggregator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawScore {
    #[serde(default)]
    pub score: Value,
    #[serde(default)]
    pub explanation: String,
}

#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, request: &ScoreRequest<'_>) -> Result<RawScore, ScoreError>;
}

/// Scores each dimension with one chat-completion call.
pub struct LlmScorer {
    llm: LlmClient,
}

impl LlmScorer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Scorer for LlmScorer {
    async fn score(&self, request: &ScoreRequest<'_>) -> Result<RawScore, ScoreError> {
        let (prompt, system) = build_prompt(request)?;
        let system = format!("{system} {JSON_ONLY_SYSTEM}");

        let reply = self.llm.call_text(&prompt, &system).await?;
        debug!(
            evaluator = %request.evaluator.identifier(),
            reply_len = reply.len(),
            "scorer reply received"
        );

        parse_reply(&reply)
    }
}

/// Fills the template for the requested evaluator.
fn build_prompt(request: &ScoreRequest<'_>) -> Result<(String, &'static str), ScoreError> {
    let (template, system) = match request.evaluator {
        EvaluatorKind::Skill { .. } => (SKILL_PROMPT_TEMPLATE, SKILL_SYSTEM),
        EvaluatorKind::Experience => (EXPERIENCE_PROMPT_TEMPLATE, EXPERIENCE_SYSTEM),
        EvaluatorKind::CultureFit => (CULTURE_FIT_PROMPT_TEMPLATE, CULTURE_FIT_SYSTEM),
        EvaluatorKind::JdMatch => (JD_MATCH_PROMPT_TEMPLATE, JD_MATCH_SYSTEM),
    };

    let mut values = vec![
        ("resume_text", request.resume_text),
        ("output_instruction", SCORE_OUTPUT_INSTRUCTION),
    ];
    match request.evaluator {
        EvaluatorKind::Skill { name, .. } => values.push(("skill", name.as_str())),
        EvaluatorKind::JdMatch => {
            let jd = request
                .job_description
                .filter(|jd| !jd.trim().is_empty())
                .ok_or_else(|| ScoreError::MissingJobDescription {
                    evaluator: request.evaluator.identifier(),
                })?;
            values.push(("job_description", jd));
        }
        EvaluatorKind::Experience | EvaluatorKind::CultureFit => {}
    }

    Ok((render(template, &values), system))
}

/// Replaces the `{name}` placeholders of `template` in a single pass.
///
/// Substituted values are never rescanned, so braces inside a resume or job
/// description reach the model verbatim. Unknown `{...}` stays literal.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let hit = after.find('}').and_then(|close| {
            values
                .iter()
                .find(|(name, _)| *name == &after[..close])
                .map(|(_, value)| (*value, close))
        });
        match hit {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn parse_reply(reply: &str) -> Result<RawScore, ScoreError> {
    serde_json::from_str::<RawScore>(strip_json_fences(reply)).map_err(|_| {
        ScoreError::Malformed {
            raw: reply.chars().take(RAW_OUTPUT_PREVIEW_CHARS).collect(),
        }
    })
}
