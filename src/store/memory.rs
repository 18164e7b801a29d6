//! In-memory [`VectorStore`] used by tests and dry runs.
//!
//! Uses `HashMap` behind `std::sync::RwLock`. Search is brute-force cosine
//! similarity over every stored vector.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{Chunk, Document, RetrievedChunk};

use super::{ensure_aligned, rank_order, IndexCounts, VectorStore};

struct StoredDoc {
    dedup_hash: String,
    chunks: Vec<(Chunk, Vec<f32>)>,
}

#[derive(Default)]
pub struct InMemoryStore {
    docs: RwLock<HashMap<String, StoredDoc>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, StoredDoc>> {
        self.docs.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, StoredDoc>> {
        self.docs.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn document_hash(&self, doc_id: &str) -> Result<Option<String>> {
        Ok(self.read().get(doc_id).map(|d| d.dedup_hash.clone()))
    }

    async fn index_document(
        &self,
        doc: &Document,
        dedup_hash: &str,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
    ) -> Result<()> {
        ensure_aligned(chunks, vectors)?;
        let stored = StoredDoc {
            dedup_hash: dedup_hash.to_string(),
            chunks: chunks.iter().cloned().zip(vectors.iter().cloned()).collect(),
        };
        self.write().insert(doc.id.clone(), stored);
        Ok(())
    }

    async fn prune(&self, keep_ids: &HashSet<String>) -> Result<usize> {
        let mut docs = self.write();
        let before = docs.len();
        docs.retain(|id, _| keep_ids.contains(id));
        Ok(before - docs.len())
    }

    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        let docs = self.read();
        let mut results: Vec<RetrievedChunk> = docs
            .values()
            .flat_map(|d| d.chunks.iter())
            .map(|(chunk, vector)| RetrievedChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(query_vec, vector),
            })
            .collect();
        results.sort_by(rank_order);
        results.truncate(k);
        Ok(results)
    }

    async fn counts(&self) -> Result<IndexCounts> {
        let docs = self.read();
        let chunks = docs.values().map(|d| d.chunks.len()).sum();
        Ok(IndexCounts {
            documents: docs.len(),
            chunks,
            vectors: chunks,
        })
    }

    async fn clear(&self) -> Result<()> {
        self.write().clear();
        Ok(())
    }
}
