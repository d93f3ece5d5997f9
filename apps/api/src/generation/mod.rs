// Attribute prompt generation: exact-match bypass or few-shot LLM generation.
// All LLM calls go through llm_client; no direct chat API calls here.

pub mod formatting;
pub mod generator;
pub mod handlers;
pub mod prompts;
