//! Ingestion pipeline orchestration.
//!
//! Coordinates the indexing flow: loader → chunking → embedding → storage.
//! Unchanged documents are detected by their dedup hash and skipped; an
//! embedding failure leaves that document's previous index state in place.

use std::collections::HashSet;

use anyhow::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::chunk::TextSplitter;
use crate::config::{ChunkingConfig, Config};
use crate::embedding::{embed_batched, Embedder};
use crate::loader;
use crate::models::Document;
use crate::store::VectorStore;

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Clear the index and re-embed everything.
    pub full: bool,
    /// Load and chunk only; nothing is embedded or written.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub files_loaded: usize,
    pub files_skipped: usize,
    pub documents: usize,
    pub indexed: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub chunks_written: usize,
    pub pruned: usize,
    /// Chunk count the loaded documents would produce (dry run only).
    pub estimated_chunks: usize,
}

pub async fn ingest(
    config: &Config,
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    options: IngestOptions,
) -> Result<IngestReport> {
    let loaded = loader::load_documents(&config.data)?;
    let splitter = TextSplitter::new(config.chunking.chunk_size, config.chunking.chunk_overlap);

    let mut report = IngestReport {
        files_loaded: loaded.files_loaded,
        files_skipped: loaded.skipped.len(),
        documents: loaded.documents.len(),
        ..IngestReport::default()
    };

    if options.dry_run {
        report.estimated_chunks = loaded
            .documents
            .iter()
            .map(|doc| splitter.split_document(doc).len())
            .sum();
        return Ok(report);
    }

    if options.full {
        info!("full ingest requested, clearing index");
        store.clear().await?;
    }

    let model = embedder.model_name().to_string();
    let mut keep_ids = HashSet::with_capacity(loaded.documents.len());

    for doc in &loaded.documents {
        keep_ids.insert(doc.id.clone());
        let hash = dedup_hash(doc, &model, &config.chunking);

        if !options.full && store.document_hash(&doc.id).await?.as_deref() == Some(hash.as_str())
        {
            debug!(path = %doc.path, page = ?doc.page, row = ?doc.row, "unchanged, skipping");
            report.unchanged += 1;
            continue;
        }

        let chunks = splitter.split_document(doc);
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

        let vectors =
            match embed_batched(embedder, &texts, config.embedding.batch_size).await {
                Ok(v) => v,
                Err(e) => {
                    warn!(path = %doc.path, page = ?doc.page, row = ?doc.row, error = %e, "embedding failed, keeping previous index state");
                    report.failed += 1;
                    continue;
                }
            };

        store.index_document(doc, &hash, &chunks, &vectors).await?;
        info!(path = %doc.path, page = ?doc.page, row = ?doc.row, chunks = chunks.len(), "indexed");
        report.indexed += 1;
        report.chunks_written += chunks.len();
    }

    report.pruned = store.prune(&keep_ids).await?;

    info!(
        documents = report.documents,
        indexed = report.indexed,
        unchanged = report.unchanged,
        failed = report.failed,
        chunks = report.chunks_written,
        pruned = report.pruned,
        "ingest complete"
    );

    Ok(report)
}

/// Hash of everything that affects a document's chunks and vectors.
pub fn dedup_hash(doc: &Document, model: &str, chunking: &ChunkingConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update(doc.path.as_bytes());
    hasher.update([0u8]);
    hasher.update(doc.page.map(i64::from).unwrap_or(-1).to_le_bytes());
    hasher.update(doc.row.map(|r| r as i64).unwrap_or(-1).to_le_bytes());
    hasher.update(doc.content.as_bytes());
    hasher.update([0u8]);
    hasher.update(model.as_bytes());
    hasher.update([0u8]);
    hasher.update((chunking.chunk_size as u64).to_le_bytes());
    hasher.update((chunking.chunk_overlap as u64).to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// Print the report in the CLI's summary format.
pub fn print_report(report: &IngestReport, options: IngestOptions) {
    if options.dry_run {
        println!("ingest (dry-run)");
        println!("  files loaded: {}", report.files_loaded);
        println!("  files skipped: {}", report.files_skipped);
        println!("  documents: {}", report.documents);
        println!("  estimated chunks: {}", report.estimated_chunks);
        return;
    }
    println!("ingest{}", if options.full { " (full)" } else { "" });
    println!("  files loaded: {}", report.files_loaded);
    println!("  files skipped: {}", report.files_skipped);
    println!("  documents: {}", report.documents);
    println!("  indexed: {}", report.indexed);
    println!("  unchanged: {}", report.unchanged);
    println!("  failed: {}", report.failed);
    println!("  chunks written: {}", report.chunks_written);
    println!("  pruned: {}", report.pruned);
    println!("ok");
}
