// Resume evaluation engine.
// Builds a per-run task graph (parse → embed → evaluators → aggregate), runs
// the evaluators concurrently and reduces their partial results to a verdict.
// All LLM calls go through llm_client via the Scorer port.

pub mod aggregator;
pub mod config;
pub mod engine;
pub mod errors;
pub mod graph;
pub mod handlers;
pub mod node;
pub mod prompts;
pub mod scheduler;
pub mod scorers;
pub mod state;
