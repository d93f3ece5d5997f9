pub mod prompt;

pub use prompt::{AttributeRecord, GeneratedPrompt, PromptGenerationRequest, SimilarAttribute};
