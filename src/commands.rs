//! Command implementations behind the `isearch` binary.
//!
//! Each `run_*` function opens what it needs from the config, does its work
//! and prints to stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::{force_rebuild_requested, Config};
use crate::embedding::{create_embedder, DisabledEmbedder};
use crate::ingest::{ingest, print_report, IngestOptions, IngestReport};
use crate::llm::create_generator;
use crate::models::Mode;
use crate::retriever::Retriever;
use crate::session::{Reply, Session};
use crate::stats::{collect_stats, print_stats};
use crate::store::{InMemoryStore, SqliteStore, VectorStore};
use crate::ui;

pub async fn run_init(config: &Config) -> Result<()> {
    let store = SqliteStore::open(&config.db).await?;
    store.close().await;
    println!("Index database initialized at {}", config.db.path.display());
    Ok(())
}

pub async fn run_ingest(config: &Config, options: IngestOptions) -> Result<IngestReport> {
    let report = if options.dry_run {
        // Nothing is embedded on a dry run, so no credentials are needed.
        let store = InMemoryStore::new();
        ingest(config, &DisabledEmbedder, &store, options).await?
    } else {
        let embedder = create_embedder(&config.embedding)?;
        let store = SqliteStore::open(&config.db).await?;
        let report = ingest(config, embedder.as_ref(), &store, options).await?;
        store.close().await;
        report
    };
    print_report(&report, options);
    Ok(report)
}

/// Wire the configured embedder, generator and `store` into a fresh session.
pub fn build_session(config: &Config, store: Arc<dyn VectorStore>, mode: Mode) -> Result<Session> {
    let embedder = create_embedder(&config.embedding)?;
    let generator = create_generator(&config.llm)?;
    let retriever = Retriever::new(embedder, store, &config.retrieval);
    Ok(Session::new(retriever, generator, config.llm.history_turns).with_mode(mode))
}

/// Answer one query in `mode` and print the reply.
pub async fn run_query(config: &Config, query: &str, mode: Mode) -> Result<Reply> {
    let store: Arc<dyn VectorStore> = Arc::new(SqliteStore::open(&config.db).await?);
    let mut session = build_session(config, store, mode)?;
    let reply = session.handle(query).await;

    println!("{}", reply.content);
    if let Some(hint) = &reply.hint {
        println!();
        println!("{}", hint);
    }
    Ok(reply)
}

pub async fn run_chat(config: &Config, mode: Mode) -> Result<()> {
    let store = Arc::new(SqliteStore::open(&config.db).await?);

    let force = force_rebuild_requested();
    let empty = store.counts().await?.chunks == 0;
    if force || empty {
        info!(force, empty, "building index before chat");
        println!("Building the document index...");
        let embedder = create_embedder(&config.embedding)?;
        let options = IngestOptions {
            full: force,
            dry_run: false,
        };
        let report = ingest(config, embedder.as_ref(), store.as_ref(), options)
            .await
            .context("Failed to build the document index")?;
        print_report(&report, options);
    }

    let session = build_session(config, store, mode)?;
    ui::run_chat(config.clone(), session).await
}

pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteStore::open(&config.db).await?;
    let report = collect_stats(
        config,
        &store,
        &model_label(&config.embedding.provider, config.embedding.model.as_deref()),
        &model_label(&config.llm.provider, config.llm.model.as_deref()),
    )
    .await?;
    store.close().await;
    print_stats(&report);
    Ok(())
}

fn model_label(provider: &str, model: Option<&str>) -> String {
    format!("{}:{}", provider, model.unwrap_or("default"))
}
