//! Data-root and index statistics.
//!
//! Summarizes what is on disk (files per extension) and what is indexed
//! (documents, chunks, vectors) along with the active retrieval settings.
//! Printed by `isearch stats` and shown in the chat debug panel.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;
use tracing::error;
use walkdir::WalkDir;

use crate::config::Config;
use crate::store::{IndexCounts, VectorStore};

/// Label for files that have no extension.
pub const NO_EXTENSION: &str = "(none)";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileStats {
    pub total_files: usize,
    /// Lower-case extension → file count.
    pub by_extension: BTreeMap<String, usize>,
}

/// Count every file under `root`. A missing or unreadable root yields zeros.
pub fn file_stats(root: &Path) -> FileStats {
    let mut stats = FileStats::default();
    if !root.exists() {
        error!(root = %root.display(), "data root not found for file statistics");
        return stats;
    }

    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        stats.total_files += 1;
        let ext = entry
            .path()
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| NO_EXTENSION.to_string());
        *stats.by_extension.entry(ext).or_insert(0) += 1;
    }
    stats
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub data_root: PathBuf,
    pub db_path: PathBuf,
    pub db_size: u64,
    pub files: FileStats,
    pub index: IndexCounts,
    pub k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding_model: String,
    pub llm_model: String,
}

pub async fn collect_stats(
    config: &Config,
    store: &dyn VectorStore,
    embedding_model: &str,
    llm_model: &str,
) -> Result<StatsReport> {
    Ok(StatsReport {
        data_root: config.data.root.clone(),
        db_path: config.db.path.clone(),
        db_size: std::fs::metadata(&config.db.path)
            .map(|m| m.len())
            .unwrap_or(0),
        files: file_stats(&config.data.root),
        index: store.counts().await?,
        k: config.retrieval.k,
        chunk_size: config.chunking.chunk_size,
        chunk_overlap: config.chunking.chunk_overlap,
        embedding_model: embedding_model.to_string(),
        llm_model: llm_model.to_string(),
    })
}

impl StatsReport {
    /// Compact `label: value` lines for the debug panel.
    pub fn panel_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Files: {}", self.files.total_files)];
        for (ext, count) in &self.files.by_extension {
            lines.push(format!("  {}: {}", ext, count));
        }
        lines.push(format!("Documents: {}", self.index.documents));
        lines.push(format!("Chunks: {}", self.index.chunks));
        lines.push(format!("k: {}", self.k));
        lines.push(format!("Chunking: {} / {}", self.chunk_size, self.chunk_overlap));
        lines.push(format!("Embedding: {}", self.embedding_model));
        lines.push(format!("LLM: {}", self.llm_model));
        lines
    }
}

pub fn print_stats(report: &StatsReport) {
    println!("inner-search — Index Stats");
    println!("==========================");
    println!();
    println!("  Data root:   {}", report.data_root.display());
    println!("  Files:       {}", report.files.total_files);
    for (ext, count) in &report.files.by_extension {
        println!("    {:<10} {:>6}", ext, count);
    }
    println!();
    println!("  Database:    {}", report.db_path.display());
    println!("  Size:        {}", format_bytes(report.db_size));
    println!("  Documents:   {}", report.index.documents);
    println!("  Chunks:      {}", report.index.chunks);
    println!("  Vectors:     {}", report.index.vectors);
    println!();
    println!("  Retriever:   k={}", report.k);
    println!(
        "  Chunking:    size={} overlap={}",
        report.chunk_size, report.chunk_overlap
    );
    println!("  Embedding:   {}", report.embedding_model);
    println!("  LLM:         {}", report.llm_model);
    println!();
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
