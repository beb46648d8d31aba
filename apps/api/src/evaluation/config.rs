//! Run Configuration: the immutable input that decides the shape of the graph.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::evaluation::errors::EvaluationError;

/// Which fixed evaluators to include alongside the per-skill ones.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatorFlags {
    pub experience: bool,
    pub culture_fit: bool,
    pub jd_match: bool,
}

impl EvaluatorFlags {
    pub fn enabled_count(&self) -> usize {
        [self.experience, self.culture_fit, self.jd_match]
            .iter()
            .filter(|f| **f)
            .count()
    }
}

/// A requested skill: the name as supplied plus its normalized key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skill {
    pub name: String,
    pub key: String,
}

impl Skill {
    fn parse(raw: &str) -> Option<Self> {
        let name = raw.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            key: normalize_skill(name),
        })
    }
}

/// Lowercases and joins whitespace-separated words with `_`.
///
/// "Machine  Learning" and "machine learning" share the key `machine_learning`.
pub fn normalize_skill(name: &str) -> String {
    name.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Created once per evaluation request and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfiguration {
    skills: Vec<Skill>,
    flags: EvaluatorFlags,
    job_description: Option<String>,
}

impl RunConfiguration {
    /// Validates and normalizes the request.
    ///
    /// Skills are deduplicated case-insensitively (first spelling wins, order kept).
    /// Blank skill names and a JD-match flag without a job description are rejected.
    pub fn new<S: AsRef<str>>(
        skills: &[S],
        flags: EvaluatorFlags,
        job_description: Option<String>,
    ) -> Result<Self, EvaluationError> {
        let mut seen = HashSet::new();
        let mut parsed = Vec::with_capacity(skills.len());

        for raw in skills {
            let skill = Skill::parse(raw.as_ref()).ok_or_else(|| {
                EvaluationError::Configuration("skill names must be non-empty".to_string())
            })?;
            if seen.insert(skill.key.clone()) {
                parsed.push(skill);
            }
        }

        let job_description = job_description
            .map(|jd| jd.trim().to_string())
            .filter(|jd| !jd.is_empty());

        if flags.jd_match && job_description.is_none() {
            return Err(EvaluationError::Configuration(
                "job description match requires a job description".to_string(),
            ));
        }

        Ok(Self {
            skills: parsed,
            flags,
            job_description,
        })
    }

    pub fn skills(&self) -> &[Skill] {
        &self.skills
    }

    pub fn skill_names(&self) -> Vec<String> {
        self.skills.iter().map(|s| s.name.clone()).collect()
    }

    pub fn flags(&self) -> EvaluatorFlags {
        self.flags
    }

    pub fn job_description(&self) -> Option<&str> {
        self.job_description.as_deref()
    }

    /// Number of evaluation nodes this configuration produces.
    pub fn evaluator_count(&self) -> usize {
        self.skills.len() + self.flags.enabled_count()
    }
}
