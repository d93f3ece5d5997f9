//! Axum route handlers for the generation API.

use axum::{extract::State, Json};
use tracing::info;

use crate::errors::AppError;
use crate::generation::generator::generate_prompts;
use crate::models::{GeneratedPrompt, PromptGenerationRequest};
use crate::state::AppState;

/// POST /generate-prompt
///
/// Returns two ready-to-use prompt variants (`user_input` = `all_images`, `None`).
/// Uses the stored prompt on an exact match, otherwise generates one from the
/// nearest stored attributes.
pub async fn handle_generate_prompt(
    State(state): State<AppState>,
    Json(request): Json<PromptGenerationRequest>,
) -> Result<Json<Vec<GeneratedPrompt>>, AppError> {
    if request.attribute_name.trim().is_empty() {
        return Err(AppError::Validation(
            "attribute_name cannot be empty".to_string(),
        ));
    }

    info!(
        "Received generation request for attribute: {}",
        request.attribute_name
    );

    let prompts = generate_prompts(
        &state.index,
        &state.generator,
        state.config.search_top_k,
        &request,
    )
    .await?;

    Ok(Json(prompts))
}
