//! Storage abstraction for the document index.
//!
//! The [`VectorStore`] trait defines every operation the ingest pipeline and
//! retriever need, so the on-disk SQLite index and the in-memory test store
//! are interchangeable behind an `Arc<dyn VectorStore>`.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`document_hash`](VectorStore::document_hash) | Stored dedup hash for change detection |
//! | [`index_document`](VectorStore::index_document) | Atomically replace a document's chunks and vectors |
//! | [`prune`](VectorStore::prune) | Remove documents that disappeared from the data root |
//! | [`search`](VectorStore::search) | Top-k cosine similarity search |
//! | [`counts`](VectorStore::counts) | Document/chunk/vector totals |
//! | [`clear`](VectorStore::clear) | Drop the whole index |

pub mod memory;
pub mod sqlite;

use std::cmp::Ordering;
use std::collections::HashSet;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;

use crate::models::{Chunk, Document, RetrievedChunk};

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// Totals reported by [`VectorStore::counts`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexCounts {
    pub documents: usize,
    pub chunks: usize,
    pub vectors: usize,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Dedup hash recorded when the document was last indexed.
    async fn document_hash(&self, doc_id: &str) -> Result<Option<String>>;

    /// Replace every chunk and vector of `doc` in one step.
    ///
    /// `chunks[i]` is stored with `vectors[i]`; the lengths must match.
    async fn index_document(
        &self,
        doc: &Document,
        dedup_hash: &str,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
    ) -> Result<()>;

    /// Remove every document whose ID is not in `keep_ids`. Returns the number removed.
    async fn prune(&self, keep_ids: &HashSet<String>) -> Result<usize>;

    /// At most `k` chunks, best match first.
    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<RetrievedChunk>>;

    async fn counts(&self) -> Result<IndexCounts>;

    async fn clear(&self) -> Result<()>;
}

pub(crate) fn ensure_aligned(chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<()> {
    if chunks.len() != vectors.len() {
        bail!(
            "chunk/vector count mismatch: {} chunks, {} vectors",
            chunks.len(),
            vectors.len()
        );
    }
    Ok(())
}

/// Score descending, then (path, page, row, chunk_index, id) for a stable order.
pub(crate) fn rank_order(a: &RetrievedChunk, b: &RetrievedChunk) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.chunk.path.cmp(&b.chunk.path))
        .then_with(|| a.chunk.page.cmp(&b.chunk.page))
        .then_with(|| a.chunk.row.cmp(&b.chunk.row))
        .then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
        .then_with(|| a.chunk.id.cmp(&b.chunk.id))
}
