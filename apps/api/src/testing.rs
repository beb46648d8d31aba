//! Hand-written fakes for the collaborator traits, shared by unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::config::Config;
use crate::documents::embedding::HashingEmbedder;
use crate::documents::extract::{ExtractError, TextExtractor};
use crate::documents::store::{is_resume_file, DocumentEntry, DocumentStore, StoreError};
use crate::evaluation::node::NodeServices;
use crate::evaluation::scorers::{RawScore, ScoreError, ScoreRequest, Scorer};

pub const SAMPLE_RESUME: &str = "Jane Doe. Senior backend engineer, 6 years of Python and \
    machine learning work. Led a team of four; mentors juniors; presents at meetups.";

/// Returns the same text (or the same error) for every document.
pub struct StaticExtractor {
    outcome: Result<String, String>,
    calls: AtomicUsize,
}

impl StaticExtractor {
    pub fn text(text: &str) -> Self {
        Self {
            outcome: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Behaves like a document with no recoverable text.
    pub fn empty() -> Self {
        Self {
            outcome: Err("scanned image without a text layer".to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextExtractor for StaticExtractor {
    async fn extract(&self, _document: &Path) -> Result<String, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone().map_err(ExtractError::Empty)
    }
}

/// Scripted scorer keyed by evaluator identifier.
///
/// Unscripted evaluators score 5. Tracks calls and peak concurrency.
#[derive(Default)]
pub struct FakeScorer {
    scores: HashMap<String, Value>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeScorer {
    pub fn scores(entries: &[(&str, i64)]) -> Self {
        Self {
            scores: entries
                .iter()
                .map(|(id, score)| (id.to_string(), Value::from(*score)))
                .collect(),
            ..Default::default()
        }
    }

    pub fn with_raw(mut self, id: &str, raw: Value) -> Self {
        self.scores.insert(id.to_string(), raw);
        self
    }

    pub fn failing(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn panicking(mut self, id: &str) -> Self {
        self.panicking.insert(id.to_string());
        self
    }

    pub fn delayed(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.to_string(), delay);
        self
    }

    /// Every call sleeps this long unless a per-evaluator delay is set.
    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        let mut calls = self.calls.lock().unwrap().clone();
        calls.sort();
        calls
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scorer for FakeScorer {
    async fn score(&self, request: &ScoreRequest<'_>) -> Result<RawScore, ScoreError> {
        let id = request.evaluator.identifier();
        self.calls.lock().unwrap().push(id.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays.get(&id).copied().unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panicking.contains(&id) {
            panic!("scorer for {id} blew up");
        }
        if self.failing.contains(&id) {
            return Err(ScoreError::Malformed {
                raw: format!("not json for {id}"),
            });
        }

        Ok(RawScore {
            score: self.scores.get(&id).cloned().unwrap_or(Value::from(5)),
            explanation: format!("scripted score for {id}"),
        })
    }
}

pub fn services_with(extractor: Arc<dyn TextExtractor>, scorer: Arc<dyn Scorer>) -> NodeServices {
    NodeServices {
        extractor,
        embedder: Arc::new(HashingEmbedder::default()),
        scorer,
    }
}

/// Services with a working extractor and the given scorer.
pub fn fixed_services(scorer: FakeScorer) -> NodeServices {
    services_with(Arc::new(StaticExtractor::text(SAMPLE_RESUME)), Arc::new(scorer))
}

/// Configuration with the service defaults and dummy credentials.
pub fn test_config() -> Config {
    Config {
        s3_bucket: "resumes".to_string(),
        s3_endpoint: "http://localhost:9000".to_string(),
        s3_region: "us-east-1".to_string(),
        aws_access_key_id: "test".to_string(),
        aws_secret_access_key: "test".to_string(),
        groq_api_key: "test".to_string(),
        llm_base_url: "http://localhost:0".to_string(),
        llm_model: "test-model".to_string(),
        evaluator_timeout: Duration::from_secs(5),
        default_skills: vec![
            "python".to_string(),
            "machine learning".to_string(),
            "communication".to_string(),
        ],
        default_job_description: "Looking for a skilled professional.".to_string(),
        scratch_dir: std::env::temp_dir().join("screener-tests"),
        port: 0,
        rust_log: "debug".to_string(),
    }
}

/// In-memory document store keyed by storage path.
#[derive(Default)]
pub struct MemoryDocumentStore {
    objects: Mutex<BTreeMap<String, Bytes>>,
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list(&self, folder: &str) -> Result<Vec<DocumentEntry>, StoreError> {
        let prefix = if folder.is_empty() {
            String::new()
        } else {
            format!("{}/", folder.trim_matches('/'))
        };
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .iter()
            .filter_map(|(key, bytes)| {
                let name = key.strip_prefix(&prefix)?;
                is_resume_file(name).then(|| DocumentEntry {
                    name: name.to_string(),
                    storage_path: key.clone(),
                    created_at: None,
                    size: bytes.len() as i64,
                })
            })
            .collect())
    }

    async fn list_folders(&self) -> Result<Vec<String>, StoreError> {
        let objects = self.objects.lock().unwrap();
        let mut folders: Vec<String> = objects
            .keys()
            .filter_map(|k| k.split_once('/').map(|(f, _)| f.to_string()))
            .collect();
        folders.sort_unstable_by(|a, b| b.cmp(a));
        folders.dedup();
        Ok(folders)
    }

    async fn fetch(&self, storage_path: &str) -> Result<Bytes, StoreError> {
        self.objects
            .lock()
            .unwrap()
            .get(storage_path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(storage_path.to_string()))
    }

    async fn store(
        &self,
        bytes: Bytes,
        filename: &str,
        folder: &str,
    ) -> Result<String, StoreError> {
        let key = if folder.is_empty() {
            filename.to_string()
        } else {
            format!("{folder}/{filename}")
        };
        self.objects.lock().unwrap().insert(key.clone(), bytes);
        Ok(key)
    }
}
