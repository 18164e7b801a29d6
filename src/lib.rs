//! # inner-search
//!
//! A retrieval-augmented assistant over internal company documents.
//!
//! Files under a data root (PDF, DOCX, CSV, TXT) are split into chunks,
//! embedded through a hosted embedding API and indexed in a local SQLite
//! file. Queries are answered in one of two modes:
//!
//! - **search**: list the documents (and PDF pages) most related to the input;
//! - **Q&A**: answer the question from the retrieved passages with a hosted LLM.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌──────────┐
//! │  Loader  │──▶│ Chunk + Embed │──▶│  SQLite  │
//! │ pdf/docx │   │   (ingest)    │   │  vectors │
//! └──────────┘   └───────────────┘   └────┬─────┘
//!                                         │ top-k
//!                ┌──────────┐        ┌────▼─────┐
//!                │ TUI/CLI  │◀──────▶│ Session  │──▶ Generator (Q&A only)
//!                └──────────┘        └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! isearch init                      # create the index database
//! isearch ingest                    # index ./data/docs
//! isearch search "expense policy"   # where is it?
//! isearch ask "How many leave days do I get?"
//! isearch chat                      # terminal UI
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`loader`] | Data-root walker |
//! | [`extract`] | PDF/DOCX/CSV/TXT text extraction |
//! | [`chunk`] | Recursive character splitter |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector store trait, SQLite and in-memory backends |
//! | [`ingest`] | Indexing pipeline |
//! | [`retriever`] | Query-time top-k retrieval |
//! | [`llm`] | Answer generation backends |
//! | [`session`] | Conversation state and query handling |
//! | [`render`] | Reply formatting |
//! | [`ui`] | Terminal chat UI |

pub mod advisor;
pub mod chunk;
pub mod commands;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod llm;
pub mod loader;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod prompt;
pub mod render;
pub mod retriever;
pub mod session;
pub mod stats;
pub mod store;
pub mod ui;
