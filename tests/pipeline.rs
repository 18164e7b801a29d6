//! End-to-end pipeline tests: load → chunk → embed → index → retrieve →
//! answer, using in-process fakes for the hosted APIs.

use std::fs;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tempfile::TempDir;

use inner_search::config::Config;
use inner_search::embedding::Embedder;
use inner_search::ingest::{ingest, IngestOptions};
use inner_search::llm::{GenerationRequest, Generator};
use inner_search::models::Mode;
use inner_search::retriever::Retriever;
use inner_search::session::{ReplyKind, Session};
use inner_search::store::{InMemoryStore, SqliteStore, VectorStore};

const VOCAB: &[&str] = &["leave", "expense", "security", "salary", "office"];

/// Keyword-count embedder. The trailing constant keeps every vector non-zero.
struct KeywordEmbedder {
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }
}

fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let mut v: Vec<f32> = VOCAB
        .iter()
        .map(|w| lower.matches(w).count() as f32)
        .collect();
    v.push(0.1);
    v
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword-test"
    }
    fn dims(&self) -> usize {
        VOCAB.len() + 1
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            bail!("embedding service unavailable");
        }
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }
}

/// Shares the counters of a [`KeywordEmbedder`] so tests can flip failure
/// mode while a retriever holds its own `Arc`.
struct SharedEmbedder(Arc<KeywordEmbedder>);

#[async_trait]
impl Embedder for SharedEmbedder {
    fn model_name(&self) -> &str {
        self.0.model_name()
    }
    fn dims(&self) -> usize {
        self.0.dims()
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.0.embed(texts).await
    }
}

struct CountingGenerator {
    calls: AtomicUsize,
    answer: String,
}

impl CountingGenerator {
    fn new(answer: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            answer: answer.to_string(),
        }
    }
}

#[async_trait]
impl Generator for CountingGenerator {
    fn model_name(&self) -> &str {
        "counting-test"
    }
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(!request.context.is_empty(), "generator called without context");
        Ok(self.answer.clone())
    }
}

fn minimal_docx(paragraphs: &[&str]) -> Vec<u8> {
    use std::io::Write;
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );
    let mut buf = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("word/document.xml", options).unwrap();
        zip.write_all(document.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf.into_inner()
}

fn setup_data() -> (TempDir, Config) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("docs");
    fs::create_dir_all(root.join("hr")).unwrap();
    fs::create_dir_all(root.join("finance")).unwrap();

    fs::write(
        root.join("hr/leave-policy.txt"),
        "Annual leave is 20 days per year. Unused leave carries over for one year.",
    )
    .unwrap();
    fs::write(
        root.join("finance/limits.csv"),
        "category,limit\nexpense travel,50000\nexpense meals,3000\n",
    )
    .unwrap();
    fs::write(
        root.join("it-security.docx"),
        minimal_docx(&[
            "Security guidelines for laptops.",
            "Report security incidents within one hour.",
        ]),
    )
    .unwrap();
    fs::write(root.join("empty.txt"), "  \n").unwrap();

    let mut config = Config::default();
    config.data.root = root;
    config.db.path = tmp.path().join("index.sqlite");
    config.chunking.chunk_size = 60;
    config.chunking.chunk_overlap = 10;
    config.retrieval.k = 3;
    (tmp, config)
}

fn session_over(
    config: &Config,
    embedder: Arc<KeywordEmbedder>,
    store: Arc<dyn VectorStore>,
    generator: Arc<CountingGenerator>,
) -> Session {
    let retriever = Retriever::new(
        Arc::new(SharedEmbedder(embedder)),
        store,
        &config.retrieval,
    );
    Session::new(retriever, generator, config.llm.history_turns)
}

#[tokio::test]
async fn every_non_empty_document_is_chunked_and_indexed() {
    let (_tmp, config) = setup_data();
    let store = InMemoryStore::new();
    let embedder = KeywordEmbedder::new();

    let report = ingest(&config, &embedder, &store, IngestOptions::default())
        .await
        .unwrap();

    assert_eq!(report.files_loaded, 4);
    // 1 text + 2 csv rows + 1 docx; the blank file yields nothing
    assert_eq!(report.documents, 4);
    assert_eq!(report.indexed, 4);
    assert_eq!(report.failed, 0);
    assert!(report.chunks_written >= report.documents);

    let counts = store.counts().await.unwrap();
    assert_eq!(counts.documents, 4);
    assert_eq!(counts.chunks, report.chunks_written);
    assert_eq!(counts.vectors, counts.chunks);
}

#[tokio::test]
async fn second_ingest_is_a_no_op() {
    let (_tmp, config) = setup_data();
    let store = InMemoryStore::new();
    let embedder = KeywordEmbedder::new();

    let first = ingest(&config, &embedder, &store, IngestOptions::default())
        .await
        .unwrap();
    let calls_after_first = embedder.calls.load(Ordering::SeqCst);
    let counts_after_first = store.counts().await.unwrap();

    let second = ingest(&config, &embedder, &store, IngestOptions::default())
        .await
        .unwrap();

    assert_eq!(second.indexed, 0);
    assert_eq!(second.unchanged, first.documents);
    assert_eq!(second.pruned, 0);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), calls_after_first);
    assert_eq!(store.counts().await.unwrap(), counts_after_first);
}

#[tokio::test]
async fn edited_file_is_reindexed_and_deleted_file_pruned() {
    let (_tmp, config) = setup_data();
    let store = InMemoryStore::new();
    let embedder = KeywordEmbedder::new();
    ingest(&config, &embedder, &store, IngestOptions::default())
        .await
        .unwrap();

    fs::write(
        config.data.root.join("hr/leave-policy.txt"),
        "Annual leave is 25 days per year.",
    )
    .unwrap();
    fs::remove_file(config.data.root.join("it-security.docx")).unwrap();

    let report = ingest(&config, &embedder, &store, IngestOptions::default())
        .await
        .unwrap();
    assert_eq!(report.indexed, 1);
    assert_eq!(report.unchanged, 2);
    assert_eq!(report.pruned, 1);
    assert_eq!(store.counts().await.unwrap().documents, 3);
}

#[tokio::test]
async fn chunking_change_rechunks_on_incremental_ingest() {
    let (_tmp, mut config) = setup_data();
    let sentences: Vec<String> = (0..40)
        .map(|i| format!("Office rule {} applies to every floor.", i))
        .collect();
    fs::write(config.data.root.join("rules.txt"), sentences.join(" ")).unwrap();
    config.chunking.chunk_size = 800;
    config.chunking.chunk_overlap = 150;

    let store = InMemoryStore::new();
    let embedder = KeywordEmbedder::new();
    ingest(&config, &embedder, &store, IngestOptions::default())
        .await
        .unwrap();
    let coarse = store.counts().await.unwrap().chunks;

    config.chunking.chunk_size = 100;
    config.chunking.chunk_overlap = 10;
    let report = ingest(&config, &embedder, &store, IngestOptions::default())
        .await
        .unwrap();
    assert_eq!(report.unchanged, 0);
    assert_eq!(report.indexed, report.documents);

    let fresh = InMemoryStore::new();
    ingest(&config, &embedder, &fresh, IngestOptions::default())
        .await
        .unwrap();
    let rechunked = store.counts().await.unwrap().chunks;
    assert_eq!(rechunked, fresh.counts().await.unwrap().chunks);
    assert!(rechunked > coarse);
}

#[tokio::test]
async fn embedding_failure_keeps_previous_index() {
    let (_tmp, config) = setup_data();
    let store = InMemoryStore::new();
    let embedder = KeywordEmbedder::new();
    ingest(&config, &embedder, &store, IngestOptions::default())
        .await
        .unwrap();
    let before = store.counts().await.unwrap();

    fs::write(
        config.data.root.join("hr/leave-policy.txt"),
        "Leave policy rewritten.",
    )
    .unwrap();
    embedder.fail.store(true, Ordering::SeqCst);

    let report = ingest(&config, &embedder, &store, IngestOptions::default())
        .await
        .unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.indexed, 0);
    assert_eq!(report.pruned, 0);
    assert_eq!(store.counts().await.unwrap(), before);
}

#[tokio::test]
async fn full_ingest_reembeds_everything() {
    let (_tmp, config) = setup_data();
    let store = InMemoryStore::new();
    let embedder = KeywordEmbedder::new();
    ingest(&config, &embedder, &store, IngestOptions::default())
        .await
        .unwrap();

    let report = ingest(
        &config,
        &embedder,
        &store,
        IngestOptions {
            full: true,
            dry_run: false,
        },
    )
    .await
    .unwrap();
    assert_eq!(report.unchanged, 0);
    assert_eq!(report.indexed, report.documents);
}

#[tokio::test]
async fn dry_run_writes_nothing() {
    let (_tmp, config) = setup_data();
    let store = InMemoryStore::new();
    let embedder = KeywordEmbedder::new();

    let report = ingest(
        &config,
        &embedder,
        &store,
        IngestOptions {
            full: false,
            dry_run: true,
        },
    )
    .await
    .unwrap();
    assert_eq!(report.documents, 4);
    assert!(report.estimated_chunks >= 4);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.counts().await.unwrap().chunks, 0);
}

#[tokio::test]
async fn search_mode_lists_locations_without_generation() {
    let (_tmp, config) = setup_data();
    let store = Arc::new(InMemoryStore::new());
    let embedder = Arc::new(KeywordEmbedder::new());
    ingest(&config, embedder.as_ref(), store.as_ref(), IngestOptions::default())
        .await
        .unwrap();

    let generator = Arc::new(CountingGenerator::new("unused"));
    let mut session = session_over(&config, embedder, store, generator.clone());

    let reply = session.handle("security incidents").await;
    assert_eq!(reply.kind, ReplyKind::Locations);
    assert_eq!(reply.sources[0], "it-security.docx");
    assert!(reply.content.contains("Main reference: it-security.docx"));
    assert!(reply.sources.len() <= config.retrieval.k);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    assert_eq!(session.history().len(), 1);
}

#[tokio::test]
async fn qa_mode_generates_and_grows_history() {
    let (_tmp, config) = setup_data();
    let store = Arc::new(InMemoryStore::new());
    let embedder = Arc::new(KeywordEmbedder::new());
    ingest(&config, embedder.as_ref(), store.as_ref(), IngestOptions::default())
        .await
        .unwrap();

    let generator = Arc::new(CountingGenerator::new("You get 20 days of leave."));
    let mut session = session_over(&config, embedder, store, generator.clone());
    session.set_mode(Mode::Qa);

    let reply = session.handle("How many leave days?").await;
    assert_eq!(reply.kind, ReplyKind::Answer);
    assert!(reply.content.contains("20 days"));
    assert_eq!(reply.sources[0], "leave-policy.txt");

    session.handle("What about expense limits?").await;
    assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history()[0].mode, Mode::Qa);
}

#[tokio::test]
async fn empty_index_answers_without_generation() {
    let (_tmp, config) = setup_data();
    let store: Arc<dyn VectorStore> = Arc::new(InMemoryStore::new());
    let generator = Arc::new(CountingGenerator::new("unused"));
    let mut session = session_over(&config, Arc::new(KeywordEmbedder::new()), store, generator.clone())
        .with_mode(Mode::Qa);

    let reply = session.handle("How many leave days?").await;
    assert_eq!(reply.kind, ReplyKind::NoResults);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    assert_eq!(session.history().len(), 1);
}

#[tokio::test]
async fn retrieval_failure_is_reported_and_not_recorded() {
    let (_tmp, config) = setup_data();
    let store = Arc::new(InMemoryStore::new());
    let embedder = Arc::new(KeywordEmbedder::new());
    ingest(&config, embedder.as_ref(), store.as_ref(), IngestOptions::default())
        .await
        .unwrap();

    embedder.fail.store(true, Ordering::SeqCst);
    let generator = Arc::new(CountingGenerator::new("unused"));
    let mut session = session_over(&config, embedder, store, generator);

    let reply = session.handle("leave").await;
    assert_eq!(reply.kind, ReplyKind::Error);
    assert!(reply.content.ends_with("Please contact your administrator."));
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn sqlite_index_survives_reopen() {
    let (_tmp, config) = setup_data();
    let embedder = KeywordEmbedder::new();

    let store = SqliteStore::open(&config.db).await.unwrap();
    let first = ingest(&config, &embedder, &store, IngestOptions::default())
        .await
        .unwrap();
    store.close().await;

    let store = SqliteStore::open(&config.db).await.unwrap();
    let second = ingest(&config, &embedder, &store, IngestOptions::default())
        .await
        .unwrap();
    assert_eq!(second.unchanged, first.documents);
    assert_eq!(
        store.counts().await.unwrap().chunks,
        first.chunks_written
    );

    let hits = store.search(&keyword_vector("expense"), 2).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| h.chunk.file_name == "limits.csv"));
    store.close().await;
}
