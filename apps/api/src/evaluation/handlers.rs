use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use axum::{
    extract::{Multipart, State},
    Json,
};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{parse_skill_list, Config};
use crate::documents::handlers::{read_upload, UploadForm};
use crate::errors::AppError;
use crate::evaluation::config::{EvaluatorFlags, RunConfiguration};
use crate::evaluation::engine::EvaluationOutcome;
use crate::state::AppState;

/// Documents of one batch scanned at the same time.
const SCAN_CONCURRENCY: usize = 4;

#[derive(Debug, Default, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub storage_paths: Vec<String>,
    pub job_description: Option<String>,
    pub skills: Option<Vec<String>>,
    pub evaluate_experience: Option<bool>,
    pub evaluate_culture_fit: Option<bool>,
    pub evaluate_jd_match: Option<bool>,
}

/// Outcome for one document of a batch.
#[derive(Debug, Serialize)]
pub struct DocumentScan {
    pub storage_path: String,
    pub filename: String,
    pub success: bool,
    #[serde(flatten)]
    pub outcome: Option<EvaluationOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentScan {
    fn new(storage_path: String, result: Result<EvaluationOutcome, AppError>) -> Self {
        let filename = storage_path
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        match result {
            Ok(outcome) => Self {
                storage_path,
                filename,
                success: true,
                outcome: Some(outcome),
                error: None,
            },
            Err(e) => Self {
                storage_path,
                filename,
                success: false,
                outcome: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Failed documents sort below every scored one.
    fn rank(&self) -> f64 {
        self.outcome.as_ref().map_or(-1.0, |o| o.final_score)
    }
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub results: Vec<DocumentScan>,
    pub total_scanned: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
pub struct UploadScanResponse {
    pub filename: String,
    #[serde(flatten)]
    pub outcome: EvaluationOutcome,
}

/// POST /api/v1/scan
pub async fn handle_scan(
    State(state): State<AppState>,
    Json(req): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, AppError> {
    if req.storage_paths.is_empty() {
        return Err(AppError::Validation("No resumes selected".to_string()));
    }

    let flags = ScanFlags {
        experience: req.evaluate_experience,
        culture_fit: req.evaluate_culture_fit,
        jd_match: req.evaluate_jd_match,
    };
    let config = resolve_run(&state.config, req.skills, req.job_description, flags)?;

    let mut results: Vec<DocumentScan> = stream::iter(req.storage_paths)
        .map(|path| {
            let state = &state;
            let config = &config;
            async move {
                let result = scan_stored(state, &path, config).await;
                if let Err(e) = &result {
                    warn!(storage_path = %path, error = %e, "resume scan failed");
                }
                DocumentScan::new(path, result)
            }
        })
        .buffered(SCAN_CONCURRENCY)
        .collect()
        .await;

    results.sort_by(|a, b| b.rank().partial_cmp(&a.rank()).unwrap_or(Ordering::Equal));
    let failed = results.iter().filter(|r| !r.success).count();
    info!(total = results.len(), failed, "scan batch finished");

    Ok(Json(ScanResponse {
        total_scanned: results.len(),
        failed,
        results,
    }))
}

/// POST /api/v1/scan-upload
///
/// Multipart fields: `file` (PDF), optional `job_description` and
/// comma-separated `skills`.
pub async fn handle_scan_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadScanResponse>, AppError> {
    let UploadForm {
        filename,
        bytes,
        fields,
    } = read_upload(multipart).await?;

    let skills = fields.get("skills").map(|s| parse_skill_list(s));
    let config = resolve_run(
        &state.config,
        skills,
        fields.get("job_description").cloned(),
        ScanFlags::default(),
    )?;

    let local = scratch_path(&state.config.scratch_dir, &filename);
    tokio::fs::create_dir_all(&state.config.scratch_dir)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    tokio::fs::write(&local, &bytes)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let result = state.engine.run(&local, &config).await;
    remove_scratch(&local).await;

    Ok(Json(UploadScanResponse {
        filename,
        outcome: result?,
    }))
}

async fn scan_stored(
    state: &AppState,
    storage_path: &str,
    config: &RunConfiguration,
) -> Result<EvaluationOutcome, AppError> {
    let local = state
        .documents
        .materialize(storage_path, &state.config.scratch_dir)
        .await?;
    let result = state.engine.run(&local, config).await;
    remove_scratch(&local).await;
    Ok(result?)
}

/// Per-request overrides of the fixed evaluators; `None` means default.
#[derive(Debug, Default, Clone, Copy)]
struct ScanFlags {
    experience: Option<bool>,
    culture_fit: Option<bool>,
    jd_match: Option<bool>,
}

/// Fills in service defaults for anything the request left out.
///
/// Missing or empty skills fall back to the configured list. Every fixed
/// evaluator defaults on, except JD match when the caller sent a blank job
/// description. A missing or blank description is replaced by the configured
/// default.
fn resolve_run(
    config: &Config,
    skills: Option<Vec<String>>,
    job_description: Option<String>,
    flags: ScanFlags,
) -> Result<RunConfiguration, AppError> {
    let skills = skills
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| config.default_skills.clone());

    let sent_blank = job_description
        .as_deref()
        .is_some_and(|jd| jd.trim().is_empty());
    let flags = EvaluatorFlags {
        experience: flags.experience.unwrap_or(true),
        culture_fit: flags.culture_fit.unwrap_or(true),
        jd_match: flags.jd_match.unwrap_or(!sent_blank),
    };
    let job_description = job_description
        .filter(|jd| !jd.trim().is_empty())
        .or_else(|| Some(config.default_job_description.clone()));

    Ok(RunConfiguration::new(&skills, flags, job_description)?)
}

fn scratch_path(dir: &Path, filename: &str) -> PathBuf {
    let name = Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().replace(' ', "_"))
        .unwrap_or_else(|| "upload.pdf".to_string());
    dir.join(format!("{}_{}", Uuid::new_v4().simple(), name))
}

async fn remove_scratch(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "could not remove scratch file");
    }
}
