//! Analysis pipeline and model client for linefix.

pub mod llm;
pub mod pipeline;

pub use llm::client::OpenRouterClient;
pub use pipeline::{analyze_response, analyze_response_within, run_analysis, AnalysisReport};
