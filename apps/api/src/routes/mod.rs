pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::generation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/generate-prompt", post(handlers::handle_generate_prompt))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::generation::generator::tests::{seeded_index, StubChatModel};
    use crate::generation::generator::PromptGenerator;
    use crate::llm_client::LlmClient;

    async fn test_state(llm: Arc<dyn crate::llm_client::ChatModel>) -> AppState {
        AppState {
            config: Config::for_tests(PathBuf::from(".")),
            index: seeded_index().await,
            generator: PromptGenerator::new(llm),
        }
    }

    fn post_json(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/generate-prompt")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn stub() -> Arc<StubChatModel> {
        Arc::new(StubChatModel::new(json!({
            "prompt": "Generated logic.",
            "system_role": "Generated role"
        })))
    }

    #[tokio::test]
    async fn test_health_reports_count() {
        let app = build_router(test_state(stub()).await);
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["db_count"], 3);
    }

    #[tokio::test]
    async fn test_missing_attribute_name_is_unprocessable() {
        let app = build_router(test_state(stub()).await);
        let response = app
            .oneshot(post_json(json!({"description": "test"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_blank_attribute_name_is_bad_request() {
        let app = build_router(test_state(stub()).await);
        let response = app
            .oneshot(post_json(json!({"attribute_name": "   "})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_exact_match_returns_two_variants() {
        let llm = stub();
        let app = build_router(test_state(llm.clone()).await);
        let response = app
            .oneshot(post_json(json!({
                "attribute_name": "top_notes",
                "has_fixed_values": true
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let variants = body.as_array().unwrap();
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0]["user_input"], "all_images");
        assert_eq!(variants[1]["user_input"], "None");
        assert_eq!(variants[0]["system_role"], "Perfume expert");
        assert!(variants[0]["prompt"]
            .as_str()
            .unwrap()
            .starts_with("Identify the top notes.\nSelect only from the following allowed values."));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_generated_prompt_for_new_attribute() {
        let llm = stub();
        let app = build_router(test_state(llm.clone()).await);
        let response = app
            .oneshot(post_json(json!({"attribute_name": "base_notes"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body[0]["system_role"], "Generated role");
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_llm_failure_is_internal_error() {
        let llm = LlmClient::new(&Config::for_tests(PathBuf::from("."))).unwrap();
        let app = build_router(test_state(Arc::new(llm)).await);
        let response = app
            .oneshot(post_json(json!({"attribute_name": "base_notes"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "LLM_ERROR");
    }
}
