//! Aggregator: reduces every evaluator's result into the final verdict.
//!
//! Scores that are missing, non-numeric or outside 0–10 count as 0. They stay
//! in the denominator: a broken evaluator penalizes the candidate's average
//! instead of silently dropping out of it.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::evaluation::errors::EvaluationError;
use crate::evaluation::state::EvaluationResult;

pub const MAX_SCORE: i64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub final_score: f64,
    pub breakdown: BTreeMap<String, u8>,
}

pub fn aggregate(results: &BTreeMap<String, EvaluationResult>) -> Result<Verdict, EvaluationError> {
    if results.is_empty() {
        return Err(EvaluationError::Aggregation(
            "no evaluator outputs found; nothing to aggregate".to_string(),
        ));
    }

    let breakdown: BTreeMap<String, u8> = results
        .iter()
        .map(|(id, result)| (id.clone(), coerce_score(&result.score)))
        .collect();

    let total: u32 = breakdown.values().map(|s| u32::from(*s)).sum();
    let mean = f64::from(total) / breakdown.len() as f64;

    Ok(Verdict {
        final_score: round_to_hundredths(mean),
        breakdown,
    })
}

/// Maps a raw score to an integer in 0..=10, or 0 if it cannot be used.
///
/// Floats truncate toward zero and numeric strings are parsed, matching how
/// the model's JSON is usually shaped ("7", 7.0, 7).
pub fn coerce_score(raw: &Value) -> u8 {
    let parsed = match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match parsed {
        Some(score) if (0..=MAX_SCORE).contains(&score) => score as u8,
        _ => 0,
    }
}

/// Rounds to two decimals, ties to even: 5.625 becomes 5.62.
pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
