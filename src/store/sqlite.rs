//! SQLite-backed [`VectorStore`].
//!
//! Documents, chunks and vectors live in three tables (see
//! [`migrate`](crate::migrate)). Search loads every vector and ranks by
//! cosine similarity in process.

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::config::DbConfig;
use crate::db;
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::migrate;
use crate::models::{Chunk, Document, FileFormat, RetrievedChunk};

use super::{ensure_aligned, rank_order, IndexCounts, VectorStore};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `db.path` and make sure the schema exists.
    pub async fn open(config: &DbConfig) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::run_migrations(&pool)
            .await
            .context("Failed to create index schema")?;
        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn row_to_chunk(row: &SqliteRow) -> Result<Chunk> {
    let format: String = row.try_get("format")?;
    let page: Option<i64> = row.try_get("page")?;
    let row_index: Option<i64> = row.try_get("row_index")?;
    Ok(Chunk {
        id: row.try_get("id")?,
        document_id: row.try_get("document_id")?,
        chunk_index: row.try_get("chunk_index")?,
        text: row.try_get("text")?,
        hash: row.try_get("hash")?,
        path: row.try_get("path")?,
        file_name: row.try_get("file_name")?,
        format: format.parse::<FileFormat>()?,
        page: page.map(|p| p as u32),
        row: row_index.map(|r| r as usize),
    })
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn document_hash(&self, doc_id: &str) -> Result<Option<String>> {
        let hash: Option<String> =
            sqlx::query_scalar("SELECT dedup_hash FROM documents WHERE id = ?")
                .bind(doc_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(hash)
    }

    async fn index_document(
        &self,
        doc: &Document,
        dedup_hash: &str,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
    ) -> Result<()> {
        ensure_aligned(chunks, vectors)?;
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunk_vectors WHERE document_id = ?")
            .bind(&doc.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(&doc.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, path, file_name, format, page, row_index,
                                   modified_at, indexed_at, dedup_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                path = excluded.path,
                file_name = excluded.file_name,
                format = excluded.format,
                page = excluded.page,
                row_index = excluded.row_index,
                modified_at = excluded.modified_at,
                indexed_at = excluded.indexed_at,
                dedup_hash = excluded.dedup_hash
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.path)
        .bind(&doc.file_name)
        .bind(doc.format.as_str())
        .bind(doc.page.map(i64::from))
        .bind(doc.row.map(|r| r as i64))
        .bind(doc.modified_at.timestamp())
        .bind(now)
        .bind(dedup_hash)
        .execute(&mut *tx)
        .await?;

        for (chunk, vector) in chunks.iter().zip(vectors) {
            sqlx::query(
                "INSERT INTO chunks (id, document_id, chunk_index, text, hash) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&chunk.id)
            .bind(&doc.id)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(&chunk.hash)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO chunk_vectors (chunk_id, document_id, dims, embedding) VALUES (?, ?, ?, ?)",
            )
            .bind(&chunk.id)
            .bind(&doc.id)
            .bind(vector.len() as i64)
            .bind(vec_to_blob(vector))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn prune(&self, keep_ids: &HashSet<String>) -> Result<usize> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM documents")
            .fetch_all(&self.pool)
            .await?;
        let stale: Vec<String> = ids.into_iter().filter(|id| !keep_ids.contains(id)).collect();
        if stale.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for id in &stale {
            sqlx::query("DELETE FROM chunk_vectors WHERE document_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM chunks WHERE document_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM documents WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(stale.len())
    }

    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.document_id, c.chunk_index, c.text, c.hash,
                   d.path, d.file_name, d.format, d.page, d.row_index, cv.embedding
            FROM chunk_vectors cv
            JOIN chunks c ON c.id = cv.chunk_id
            JOIN documents d ON d.id = c.document_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut results = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.try_get("embedding")?;
            let score = cosine_similarity(query_vec, &blob_to_vec(&blob));
            results.push(RetrievedChunk {
                chunk: row_to_chunk(row)?,
                score,
            });
        }

        results.sort_by(rank_order);
        results.truncate(k);
        Ok(results)
    }

    async fn counts(&self) -> Result<IndexCounts> {
        let documents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        let chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        let vectors: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunk_vectors")
            .fetch_one(&self.pool)
            .await?;
        Ok(IndexCounts {
            documents: documents as usize,
            chunks: chunks as usize,
            vectors: vectors as usize,
        })
    }

    async fn clear(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunk_vectors")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chunks").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM documents").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }
}
