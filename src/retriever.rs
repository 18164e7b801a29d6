//! Query-time retrieval: embed the query, fetch the top-k chunks.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::config::RetrievalConfig;
use crate::embedding::{embed_query, Embedder};
use crate::models::RetrievedChunk;
use crate::store::VectorStore;

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    k: usize,
    min_score: Option<f32>,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            k: config.k,
            min_score: config.min_score,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn embedding_model(&self) -> &str {
        self.embedder.model_name()
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// At most `k` chunks for `query`. A blank query returns nothing and
    /// never reaches the embedder.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>> {
        let query = query.trim();
        if query.is_empty() || self.k == 0 {
            return Ok(Vec::new());
        }

        let vector = embed_query(self.embedder.as_ref(), query).await?;
        let mut results = self.store.search(&vector, self.k).await?;
        if let Some(min) = self.min_score {
            results.retain(|r| r.score >= min);
        }
        results.truncate(self.k);

        debug!(
            results = results.len(),
            top_score = results.first().map(|r| r.score),
            "retrieved"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::TextSplitter;
    use crate::models::{Document, FileFormat};
    use crate::store::InMemoryStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        fn model_name(&self) -> &str {
            "fixed"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    async fn populated_store(n: usize) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        let splitter = TextSplitter::new(800, 150);
        for i in 0..n {
            let doc = Document {
                id: format!("d{}", i),
                path: format!("doc{}.txt", i),
                file_name: format!("doc{}.txt", i),
                format: FileFormat::Txt,
                page: None,
                row: None,
                content: format!("document number {}", i),
                modified_at: Utc::now(),
            };
            let chunks = splitter.split_document(&doc);
            let vectors = vec![vec![1.0, i as f32 * 0.1]; chunks.len()];
            store.index_document(&doc, "h", &chunks, &vectors).await.unwrap();
        }
        store
    }

    fn config(k: usize, min_score: Option<f32>) -> RetrievalConfig {
        RetrievalConfig { k, min_score }
    }

    #[tokio::test]
    async fn results_bounded_by_k() {
        let embedder = Arc::new(FixedEmbedder {
            calls: AtomicUsize::new(0),
        });
        let store = populated_store(10).await;
        let retriever = Retriever::new(embedder, store, &config(3, None));
        let results = retriever.retrieve("leave policy").await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].chunk.path, "doc0.txt");
    }

    #[tokio::test]
    async fn blank_query_skips_embedding() {
        let embedder = Arc::new(FixedEmbedder {
            calls: AtomicUsize::new(0),
        });
        let store = populated_store(2).await;
        let retriever = Retriever::new(embedder.clone(), store, &config(5, None));
        assert!(retriever.retrieve("   ").await.unwrap().is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn min_score_filters_weak_matches() {
        let embedder = Arc::new(FixedEmbedder {
            calls: AtomicUsize::new(0),
        });
        let store = populated_store(10).await;
        let retriever = Retriever::new(embedder, store, &config(10, Some(0.99)));
        let results = retriever.retrieve("q").await.unwrap();
        assert!(!results.is_empty());
        assert!(results.len() < 10);
        assert!(results.iter().all(|r| r.score >= 0.99));
    }
}
