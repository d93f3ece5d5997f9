//! Embedding providers: turn attribute names into vectors for the index.
//!
//! ```text
//! Embedder (trait)
//! ├── LocalEmbedder        (in-process, deterministic)
//! └── AzureEmbeddingClient (Azure OpenAI embeddings deployment)
//! ```

mod azure;
mod local;

pub use azure::AzureEmbeddingClient;
pub use local::LocalEmbedder;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty input provided")]
    EmptyInput,
}

/// Common interface for every embedding backend the index can use.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier of the model. Vectors from different ids are not comparable.
    fn id(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text]).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("no embedding returned".to_string()))
    }

    /// One vector per input, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Scales a vector to unit length. A zero vector is returned unchanged.
pub fn normalize(mut vec: Vec<f32>) -> Vec<f32> {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        vec.iter_mut().for_each(|x| *x /= norm);
    }
    vec
}
