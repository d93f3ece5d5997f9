use crate::config::Config;
use crate::generation::generator::PromptGenerator;
use crate::index::AttributeIndex;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Persistent semantic index of historical prompt examples.
    pub index: AttributeIndex,
    /// Few-shot generator backed by the hosted LLM.
    pub generator: PromptGenerator,
}
