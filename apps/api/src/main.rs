mod config;
mod documents;
mod errors;
mod evaluation;
mod llm_client;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::documents::embedding::HashingEmbedder;
use crate::documents::extract::FileTextExtractor;
use crate::documents::store::S3DocumentStore;
use crate::evaluation::engine::EvaluationEngine;
use crate::evaluation::node::NodeServices;
use crate::evaluation::scorers::LlmScorer;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting screener v{}", env!("CARGO_PKG_VERSION"));

    // Initialize S3-compatible document store
    let s3 = build_s3_client(&config).await;
    let documents = Arc::new(S3DocumentStore::new(s3, config.s3_bucket.clone()));
    info!("Document store initialized (bucket: {})", config.s3_bucket);

    // Initialize LLM client
    let llm = LlmClient::new(
        config.groq_api_key.clone(),
        config.llm_base_url.clone(),
        config.llm_model.clone(),
    );
    info!("LLM client initialized (model: {})", llm.model());

    // Wire the evaluation engine's collaborators
    let services = NodeServices {
        extractor: Arc::new(FileTextExtractor),
        embedder: Arc::new(HashingEmbedder::default()),
        scorer: Arc::new(LlmScorer::new(llm)),
    };
    let engine = EvaluationEngine::new(services).with_evaluator_timeout(config.evaluator_timeout);
    info!(
        "Evaluation engine ready (evaluator timeout: {}s, default skills: {:?})",
        config.evaluator_timeout.as_secs(),
        config.default_skills
    );

    tokio::fs::create_dir_all(&config.scratch_dir).await?;

    // Build app state
    let state = AppState {
        config: config.clone(),
        documents,
        engine: Arc::new(engine),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client for MinIO (local) or any S3-compatible storage.
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "screener-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.s3_region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // Path-style addressing for MinIO and Supabase storage endpoints.
    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
