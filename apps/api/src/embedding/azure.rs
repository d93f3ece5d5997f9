use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{normalize, Embedder, EmbeddingError};

/// Inputs sent per embeddings request.
const BATCH_SIZE: usize = 64;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct AzureError {
    error: AzureErrorBody,
}

#[derive(Debug, Deserialize)]
struct AzureErrorBody {
    message: String,
}

/// Azure OpenAI embeddings deployment.
#[derive(Clone)]
pub struct AzureEmbeddingClient {
    client: Client,
    url: String,
    api_key: String,
    model_id: String,
}

impl AzureEmbeddingClient {
    pub fn new(
        endpoint: &str,
        deployment: &str,
        api_version: &str,
        api_key: String,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            url: format!(
                "{}/openai/deployments/{deployment}/embeddings?api-version={api_version}",
                endpoint.trim_end_matches('/')
            ),
            api_key,
            model_id: format!("azure:{deployment}"),
        })
    }

    async fn embed_chunk(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&EmbeddingRequest { input: texts })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AzureError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let mut parsed: EmbeddingResponse = response.json().await?;
        if parsed.data.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed
            .data
            .into_iter()
            .map(|d| normalize(d.embedding))
            .collect())
    }
}

#[async_trait]
impl Embedder for AzureEmbeddingClient {
    fn id(&self) -> &str {
        &self.model_id
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            vectors.extend(self.embed_chunk(chunk).await?);
        }

        debug!("Embedded {} texts with {}", texts.len(), self.model_id);
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_built_from_endpoint_and_deployment() {
        let client = AzureEmbeddingClient::new(
            "https://example.openai.azure.com/",
            "text-embedding-3-small",
            "2024-02-15-preview",
            "key".to_string(),
        )
        .unwrap();
        assert_eq!(
            client.url,
            "https://example.openai.azure.com/openai/deployments/text-embedding-3-small/embeddings?api-version=2024-02-15-preview"
        );
        assert_eq!(client.id(), "azure:text-embedding-3-small");
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected() {
        let client = AzureEmbeddingClient::new("https://x", "d", "v", "k".to_string()).unwrap();
        let result = client.embed_batch(&[]).await;
        assert!(matches!(result, Err(EmbeddingError::EmptyInput)));
    }
}
