//! Persistent chunk store backing retrieval.
//!
//! Chunks and their embeddings live in a dedicated SQLite file. Search is a
//! brute-force cosine scan, which is plenty for a corpus of a few hundred
//! chunks.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use tracing::info;

use crate::errors::RagError;

const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS rag_chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT,
    content TEXT NOT NULL,
    embedding_dimension INTEGER NOT NULL,
    embedding BLOB NOT NULL
)";

/// Chunk text with its embedding, ready to insert
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub source: Option<String>,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// Search hit, best match first
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub id: i64,
    pub source: Option<String>,
    pub content: String,
    pub score: f64,
}

#[derive(Debug, FromRow)]
struct ChunkRow {
    id: i64,
    source: Option<String>,
    content: String,
    embedding: Vec<u8>,
}

pub struct VectorStore {
    pool: SqlitePool,
}

impl VectorStore {
    /// Open or create the store at `path`.
    pub async fn open(path: &Path) -> Result<Self, RagError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                RagError::VectorStore(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        sqlx::query(SCHEMA_SQL).execute(&pool).await?;
        info!(path = %path.display(), "Vector store opened");

        Ok(Self { pool })
    }

    pub async fn count(&self) -> Result<i64, RagError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rag_chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Insert all chunks in one transaction.
    pub async fn add_chunks(&self, chunks: &[EmbeddedChunk]) -> Result<u64, RagError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for chunk in chunks {
            validate_embedding(&chunk.embedding)?;
            let result = sqlx::query(
                "INSERT INTO rag_chunks (source, content, embedding_dimension, embedding)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&chunk.source)
            .bind(&chunk.content)
            .bind(chunk.embedding.len() as i64)
            .bind(encode_embedding(&chunk.embedding))
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Return the `limit` chunks most similar to `query`.
    pub async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<ScoredChunk>, RagError> {
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        validate_embedding(query)?;

        let rows = sqlx::query_as::<_, ChunkRow>(
            "SELECT id, source, content, embedding
             FROM rag_chunks
             WHERE embedding_dimension = ?
             ORDER BY id ASC",
        )
        .bind(query.len() as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in rows {
            let candidate = decode_embedding(&row.embedding, query.len())?;
            let Some(score) = cosine_similarity(query, &candidate) else {
                continue;
            };
            hits.push(ScoredChunk {
                id: row.id,
                source: row.source,
                content: row.content,
                score,
            });
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}

fn validate_embedding(vector: &[f32]) -> Result<(), RagError> {
    if vector.is_empty() {
        return Err(RagError::VectorStore("embedding is empty".to_string()));
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(RagError::VectorStore(
            "embedding contains non-finite values".to_string(),
        ));
    }
    Ok(())
}

fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(std::mem::size_of_val(vector));
    for &value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn decode_embedding(blob: &[u8], dimension: usize) -> Result<Vec<f32>, RagError> {
    if blob.len() != dimension * std::mem::size_of::<f32>() {
        return Err(RagError::VectorStore(format!(
            "invalid embedding byte length: expected {}, got {}",
            dimension * std::mem::size_of::<f32>(),
            blob.len()
        )));
    }

    Ok(blob
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return None;
    }
    Some(dot / denom)
}
