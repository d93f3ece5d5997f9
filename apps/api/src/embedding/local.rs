//! Deterministic in-process embedder.
//!
//! Hashes whole tokens and character trigrams of the normalised text into a
//! fixed-size bag, then L2-normalises it. Identical names map to identical
//! vectors; names sharing words or spelling fragments land close together.
//! Buckets come from FNV-1a: persisted vectors must stay comparable across
//! toolchain upgrades, which `DefaultHasher` does not promise.

use async_trait::async_trait;

use super::{normalize, Embedder, EmbeddingError};

pub const LOCAL_DIMENSIONS: usize = 384;
const TOKEN_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

#[derive(Debug, Clone, Default)]
pub struct LocalEmbedder;

impl LocalEmbedder {
    pub fn new() -> Self {
        Self
    }

    fn vectorize(text: &str) -> Vec<f32> {
        let mut bag = vec![0.0f32; LOCAL_DIMENSIONS];

        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect();

        for token in &tokens {
            bag[bucket(token.as_bytes())] += TOKEN_WEIGHT;

            let padded: Vec<char> = format!(" {token} ").chars().collect();
            for window in padded.windows(3) {
                let gram: String = window.iter().collect();
                bag[bucket(gram.as_bytes())] += TRIGRAM_WEIGHT;
            }
        }

        normalize(bag)
    }
}

fn bucket(bytes: &[u8]) -> usize {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    (hash % LOCAL_DIMENSIONS as u64) as usize
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn id(&self) -> &str {
        "local-hashed-ngram-v1"
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| Self::vectorize(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_same_text_same_vector() {
        let embedder = LocalEmbedder::new();
        let a = embedder.embed("Screen Resolution").await.unwrap();
        let b = embedder.embed("Screen Resolution").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), LOCAL_DIMENSIONS);
    }

    #[tokio::test]
    async fn test_case_and_separators_do_not_matter() {
        let embedder = LocalEmbedder::new();
        let a = embedder.embed("heart_notes").await.unwrap();
        let b = embedder.embed("Heart Notes").await.unwrap();
        assert!((cosine(&a, &b) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_related_names_are_closer_than_unrelated() {
        let embedder = LocalEmbedder::new();
        let query = embedder.embed("top_notes").await.unwrap();
        let related = embedder.embed("heart_notes").await.unwrap();
        let unrelated = embedder.embed("battery capacity").await.unwrap();
        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let embedder = LocalEmbedder::new();
        let v = embedder.embed("  ").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
