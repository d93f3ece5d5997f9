use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::state::AppState;

/// GET /health
/// Returns service status and the number of indexed prompt examples.
pub async fn health_handler(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let db_count = state.index.count().await?;
    Ok(Json(json!({
        "status": "ok",
        "db_count": db_count
    })))
}
