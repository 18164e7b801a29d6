//! Core data models.
//!
//! These types represent the documents, chunks, queries and conversation turns
//! that flow through the ingestion and answering pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Supported source file formats, keyed by lower-case extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Pdf,
    Docx,
    Csv,
    Txt,
}

impl FileFormat {
    /// Map a file extension (with or without the leading dot) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Some(FileFormat::Pdf),
            "docx" => Some(FileFormat::Docx),
            "csv" => Some(FileFormat::Csv),
            "txt" => Some(FileFormat::Txt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Pdf => "pdf",
            FileFormat::Docx => "docx",
            FileFormat::Csv => "csv",
            FileFormat::Txt => "txt",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileFormat::from_extension(s).ok_or_else(|| anyhow::anyhow!("unknown file format: {}", s))
    }
}

/// One loaded unit of text: a whole file, a PDF page, or a CSV row.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    /// Path relative to the data root, `/`-separated.
    pub path: String,
    pub file_name: String,
    pub format: FileFormat,
    /// 1-based page number (PDF only).
    pub page: Option<u32>,
    /// 0-based data row (CSV only).
    pub row: Option<usize>,
    pub content: String,
    pub modified_at: DateTime<Utc>,
}

/// A segment of a document's text, carrying its source metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
    pub path: String,
    pub file_name: String,
    pub format: FileFormat,
    pub page: Option<u32>,
    /// Source CSV row, carried from the document.
    pub row: Option<usize>,
}

/// A chunk returned by the vector store together with its similarity score.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Answering mode selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Show where the relevant documents are.
    #[default]
    Search,
    /// Answer the question from the retrieved passages.
    Qa,
}

impl Mode {
    pub fn toggle(self) -> Self {
        match self {
            Mode::Search => Mode::Qa,
            Mode::Qa => Mode::Search,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mode::Search => "Document search",
            Mode::Qa => "Company Q&A",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Search => f.write_str("search"),
            Mode::Qa => f.write_str("qa"),
        }
    }
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "search" => Ok(Mode::Search),
            "qa" | "q&a" => Ok(Mode::Qa),
            other => anyhow::bail!("Unknown mode: {}. Use search or qa.", other),
        }
    }
}

/// User input plus the mode it was asked in. Created per request.
#[derive(Debug, Clone)]
pub struct Query {
    pub text: String,
    pub mode: Mode,
}

/// A completed query/response pair in the session history.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationTurn {
    pub query: String,
    pub mode: Mode,
    pub response: String,
    pub sources: Vec<String>,
    pub at: DateTime<Utc>,
}
