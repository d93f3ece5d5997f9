//! Persistent attribute index: SQLite rows plus brute-force cosine search.
//!
//! Each row holds one historical prompt example keyed by `(collection, id)`.
//! The attribute name is the embedded document; prompt and system role ride
//! along as metadata.

use std::path::Path;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

use crate::embedding::Embedder;
use crate::errors::AppError;
use crate::models::{AttributeRecord, SimilarAttribute};

#[derive(Clone)]
pub struct AttributeIndex {
    pool: SqlitePool,
    collection: String,
    embedder: Arc<dyn Embedder>,
}

impl AttributeIndex {
    /// Opens (creating if missing) the index file at `path`.
    pub async fn open(
        path: &Path,
        collection: &str,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, AppError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Internal(anyhow::anyhow!(
                    "Could not create index directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let index = Self::with_pool(pool, collection, embedder).await?;
        info!(
            "Initialized attribute index with collection '{}' at '{}'",
            collection,
            path.display()
        );
        Ok(index)
    }

    /// In-memory index. Data lives as long as the single pooled connection.
    #[cfg(test)]
    pub async fn open_in_memory(
        collection: &str,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, AppError> {
        use std::str::FromStr;
        use std::time::Duration;

        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        Self::with_pool(pool, collection, embedder).await
    }

    async fn with_pool(
        pool: SqlitePool,
        collection: &str,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, AppError> {
        let index = Self {
            pool,
            collection: collection.to_string(),
            embedder,
        };
        index.init_schema().await?;
        Ok(index)
    }

    async fn init_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS attribute_examples (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                attribute_name TEXT NOT NULL,
                prompt TEXT NOT NULL,
                system_role TEXT NOT NULL DEFAULT '',
                original_id TEXT NOT NULL DEFAULT '',
                embedding BLOB NOT NULL,
                PRIMARY KEY (collection, id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_meta (
                collection TEXT PRIMARY KEY,
                embedder_id TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Clears the collection if it was built with a different embedder.
    /// Returns `true` when stale vectors were dropped.
    pub async fn ensure_embedder(&self) -> Result<bool, AppError> {
        let stored: Option<String> =
            sqlx::query_scalar("SELECT embedder_id FROM index_meta WHERE collection = ?1")
                .bind(&self.collection)
                .fetch_optional(&self.pool)
                .await?;

        let current = self.embedder.id();
        let stale = matches!(&stored, Some(id) if id != current);

        if stale {
            warn!(
                "Embedding model changed ({} -> {}), clearing collection '{}'",
                stored.as_deref().unwrap_or_default(),
                current,
                self.collection
            );
            sqlx::query("DELETE FROM attribute_examples WHERE collection = ?1")
                .bind(&self.collection)
                .execute(&self.pool)
                .await?;
        }

        if stored.as_deref() != Some(current) {
            self.record_embedder().await?;
        }

        Ok(stale)
    }

    async fn record_embedder(&self) -> Result<(), AppError> {
        sqlx::query("INSERT OR REPLACE INTO index_meta (collection, embedder_id) VALUES (?1, ?2)")
            .bind(&self.collection)
            .bind(self.embedder.id())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Embeds and inserts or replaces records by id.
    pub async fn upsert(&self, records: &[AttributeRecord]) -> Result<(), AppError> {
        if records.is_empty() {
            return Ok(());
        }

        let names: Vec<&str> = records.iter().map(|r| r.attribute_name.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&names).await?;

        let mut tx = self.pool.begin().await?;
        for (record, embedding) in records.iter().zip(&embeddings) {
            sqlx::query(
                "INSERT OR REPLACE INTO attribute_examples
                    (collection, id, attribute_name, prompt, system_role, original_id, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(&self.collection)
            .bind(&record.id)
            .bind(&record.attribute_name)
            .bind(&record.prompt)
            .bind(&record.system_role)
            .bind(&record.original_id)
            .bind(serialize_embedding(embedding))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        self.record_embedder().await?;
        info!("Upserted {} documents into attribute index", records.len());
        Ok(())
    }

    /// Nearest stored attributes to `query`, closest first. On equal distance a
    /// row whose name equals `query` (trimmed, case-insensitive) sorts first.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SimilarAttribute>, AppError> {
        let rows = sqlx::query(
            "SELECT attribute_name, prompt, system_role, embedding
             FROM attribute_examples
             WHERE collection = ?1
             ORDER BY rowid",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        let stored: Vec<(SimilarAttribute, Vec<f32>)> = rows
            .into_iter()
            .map(|row| {
                let bytes: Vec<u8> = row.get("embedding");
                let attribute = SimilarAttribute {
                    attribute_name: row.get("attribute_name"),
                    prompt: row.get("prompt"),
                    system_role: row.get("system_role"),
                    distance: 1.0,
                };
                (attribute, deserialize_embedding(&bytes))
            })
            .collect();

        if stored.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;

        let mut scored: Vec<SimilarAttribute> = stored
            .into_iter()
            .map(|(mut attribute, embedding)| {
                attribute.distance = cosine_distance(&query_embedding, &embedding);
                attribute
            })
            .collect();

        let wanted = query.trim().to_lowercase();
        let is_exact = |s: &SimilarAttribute| s.attribute_name.trim().to_lowercase() == wanted;
        scored.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| is_exact(b).cmp(&is_exact(a)))
        });
        scored.truncate(top_k.max(1));
        Ok(scored)
    }

    pub async fn count(&self) -> Result<usize, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM attribute_examples WHERE collection = ?1")
                .bind(&self.collection)
                .fetch_one(&self.pool)
                .await?;
        Ok(count as usize)
    }
}

fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// `1 - cosine similarity`. Mismatched or zero vectors get 1.0.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        1.0
    } else {
        (1.0 - dot / denom).max(0.0)
    }
}
