//! Prompt generation pipeline.
//!
//! Flow: search index → exact-match bypass, or few-shot LLM generation →
//!       append formatting rules → two response variants.
//!
//! An exact match (case-insensitive) with `has_failed = false` returns the stored
//! prompt and never calls the LLM. With `has_failed = true` the stored prompt is
//! handed to the LLM as the failed version to improve on.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::generation::formatting::append_formatting_rules;
use crate::generation::prompts::{build_system_prompt, build_user_prompt};
use crate::index::AttributeIndex;
use crate::llm_client::{ChatModel, LlmError};
use crate::models::{GeneratedPrompt, PromptGenerationRequest, SimilarAttribute};

/// `user_input` values of the two response variants, in order.
pub const USER_INPUT_VARIANTS: [&str; 2] = ["all_images", "None"];

/// What the LLM must return.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratedDraft {
    pub prompt: String,
    pub system_role: String,
}

/// Writes new extraction prompts from few-shot examples.
#[derive(Clone)]
pub struct PromptGenerator {
    llm: Arc<dyn ChatModel>,
}

impl PromptGenerator {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self { llm }
    }

    pub async fn generate(
        &self,
        attribute_name: &str,
        description: &str,
        examples: &[SimilarAttribute],
        failed_prompt: Option<&str>,
    ) -> Result<GeneratedDraft, LlmError> {
        let system = build_system_prompt(failed_prompt);
        let user = build_user_prompt(attribute_name, description, examples);

        let value = self.llm.complete_json(&system, &user).await?;
        let draft: GeneratedDraft = serde_json::from_value(value)?;
        Ok(draft)
    }
}

fn same_attribute(stored: &str, requested: &str) -> bool {
    stored.trim().to_lowercase() == requested.trim().to_lowercase()
}

fn into_variants(prompt: String, system_role: String) -> Vec<GeneratedPrompt> {
    USER_INPUT_VARIANTS
        .iter()
        .map(|variant| GeneratedPrompt {
            prompt: prompt.clone(),
            system_role: system_role.clone(),
            user_input: Some(variant.to_string()),
        })
        .collect()
}

/// Runs the full request pipeline for one attribute.
pub async fn generate_prompts(
    index: &AttributeIndex,
    generator: &PromptGenerator,
    top_k: usize,
    request: &PromptGenerationRequest,
) -> Result<Vec<GeneratedPrompt>, AppError> {
    let attribute_name = request.attribute_name.as_str();
    let similar = index.search(attribute_name, top_k).await?;

    let mut failed_prompt: Option<&str> = None;

    if let Some(nearest) = similar
        .first()
        .filter(|s| same_attribute(&s.attribute_name, attribute_name))
    {
        if request.has_failed() {
            info!(
                "Exact match found in DB for {attribute_name}, but 'has_failed' is true. \
                 Passing to LLM for improvement."
            );
            failed_prompt = Some(nearest.prompt.as_str());
        } else {
            info!("Exact match found in DB for {attribute_name}. Bypassing LLM generation.");
            let prompt = append_formatting_rules(
                &nearest.prompt,
                attribute_name,
                request.has_fixed_values(),
            );
            return Ok(into_variants(prompt, nearest.system_role.clone()));
        }
    }

    info!("Found {} similar attributes.", similar.len());

    let draft = generator
        .generate(
            attribute_name,
            request.description.as_deref().unwrap_or_default(),
            &similar,
            failed_prompt,
        )
        .await?;

    let prompt = append_formatting_rules(&draft.prompt, attribute_name, request.has_fixed_values());
    Ok(into_variants(prompt, draft.system_role))
}
