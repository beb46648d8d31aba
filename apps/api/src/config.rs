use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::{DEFAULT_BASE_URL, DEFAULT_MODEL};

const DEFAULT_SKILLS: &str = "python,machine learning,communication";
const DEFAULT_JOB_DESCRIPTION: &str = "Looking for a skilled professional.";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub s3_region: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub groq_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
    /// Bound on a single evaluator's scoring call.
    pub evaluator_timeout: Duration,
    pub default_skills: Vec<String>,
    pub default_job_description: String,
    /// Where fetched and uploaded documents are written before extraction.
    pub scratch_dir: PathBuf,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            s3_region: optional_env("S3_REGION", "us-east-1"),
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            groq_api_key: require_env("GROQ_API_KEY")?,
            llm_base_url: optional_env("LLM_BASE_URL", DEFAULT_BASE_URL),
            llm_model: optional_env("LLM_MODEL", DEFAULT_MODEL),
            evaluator_timeout: Duration::from_secs(
                optional_env("EVALUATOR_TIMEOUT_SECS", "60")
                    .parse::<u64>()
                    .context("EVALUATOR_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            default_skills: parse_skill_list(&optional_env("DEFAULT_SKILLS", DEFAULT_SKILLS)),
            default_job_description: optional_env(
                "DEFAULT_JOB_DESCRIPTION",
                DEFAULT_JOB_DESCRIPTION,
            ),
            scratch_dir: std::env::var("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir().join("screener")),
            port: optional_env("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG", "info"),
        })
    }
}

/// Splits a comma-separated list, dropping blank entries.
pub fn parse_skill_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
