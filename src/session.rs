//! Conversation session: mode, history, and query handling.
//!
//! A [`Session`] owns everything one conversation needs. The UI and the
//! one-shot CLI commands hold it by value and pass `&mut Session` around;
//! nothing here is global.
//!
//! # Query flow
//!
//! ```text
//! input ─► trim ─► retrieve ─┬─ 0 chunks ─────────────► "no relevant documents"
//!                            ├─ search mode ──────────► location list
//!                            └─ Q&A mode ─► generator ► answer + references
//! ```
//!
//! Every completed query appends exactly one [`ConversationTurn`]. Blank input
//! and failed queries leave the history untouched.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::advisor::suggest_mode;
use crate::error::build_error_message;
use crate::llm::{GenerationRequest, Generator};
use crate::models::{ConversationTurn, Mode, Query};
use crate::render::{
    render_answer, render_locations, unique_sources, ANSWER_ERROR, NO_RELEVANT_DOCS_QA,
    NO_RELEVANT_DOCS_SEARCH, RETRIEVAL_ERROR,
};
use crate::retriever::Retriever;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    /// Blank input; nothing was done.
    Ignored,
    Locations,
    Answer,
    /// Nothing relevant was retrieved, or the model had no answer.
    NoResults,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub kind: ReplyKind,
    pub content: String,
    pub sources: Vec<String>,
    /// Suggestion to switch modes, if the query looks like it belongs in the other one.
    pub hint: Option<String>,
}

impl Reply {
    pub fn ignored() -> Self {
        Self {
            kind: ReplyKind::Ignored,
            content: String::new(),
            sources: Vec::new(),
            hint: None,
        }
    }

    fn new(kind: ReplyKind, content: String, sources: Vec<String>, hint: Option<String>) -> Self {
        Self {
            kind,
            content,
            sources,
            hint,
        }
    }
}

pub struct Session {
    id: Uuid,
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    mode: Mode,
    history: Vec<ConversationTurn>,
    history_window: usize,
}

impl Session {
    pub fn new(retriever: Retriever, generator: Arc<dyn Generator>, history_window: usize) -> Self {
        let id = Uuid::new_v4();
        info!(session = %id, "session started");
        Self {
            id,
            retriever,
            generator,
            mode: Mode::default(),
            history: Vec::new(),
            history_window,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        if mode != self.mode {
            info!(session = %self.id, from = %self.mode, to = %mode, "mode changed");
        }
        self.mode = mode;
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn generator_model(&self) -> &str {
        self.generator.model_name()
    }

    /// End this session and begin a fresh one with empty history.
    pub fn reset(&mut self) {
        let previous = self.id;
        self.id = Uuid::new_v4();
        self.history.clear();
        info!(previous = %previous, session = %self.id, "session reset");
    }

    pub async fn handle(&mut self, input: &str) -> Reply {
        let text = input.trim();
        if text.is_empty() {
            return Reply::ignored();
        }
        let query = Query {
            text: text.to_string(),
            mode: self.mode,
        };
        info!(session = %self.id, mode = %query.mode, query = %query.text, "query received");

        let hint = suggest_mode(&query.text, query.mode);

        let retrieved = match self.retriever.retrieve(&query.text).await {
            Ok(r) => r,
            Err(e) => {
                error!(session = %self.id, error = %format!("{:#}", e), "retrieval failed");
                return Reply::new(
                    ReplyKind::Error,
                    build_error_message(RETRIEVAL_ERROR),
                    Vec::new(),
                    hint,
                );
            }
        };

        let reply = if retrieved.is_empty() {
            let content = match query.mode {
                Mode::Search => NO_RELEVANT_DOCS_SEARCH,
                Mode::Qa => NO_RELEVANT_DOCS_QA,
            };
            Reply::new(ReplyKind::NoResults, content.to_string(), Vec::new(), hint)
        } else {
            let sources = unique_sources(&retrieved);
            match query.mode {
                Mode::Search => Reply::new(
                    ReplyKind::Locations,
                    render_locations(&sources),
                    sources,
                    hint,
                ),
                Mode::Qa => {
                    let request = GenerationRequest {
                        question: query.text.clone(),
                        context: retrieved,
                        history: self.recent_history(),
                    };
                    match self.generator.generate(&request).await {
                        Ok(answer) if answer.contains(NO_RELEVANT_DOCS_QA) || answer.trim().is_empty() => {
                            Reply::new(
                                ReplyKind::NoResults,
                                NO_RELEVANT_DOCS_QA.to_string(),
                                Vec::new(),
                                hint,
                            )
                        }
                        Ok(answer) => Reply::new(
                            ReplyKind::Answer,
                            render_answer(&answer, &sources),
                            sources,
                            hint,
                        ),
                        Err(e) => {
                            error!(session = %self.id, model = %self.generator.model_name(), error = %format!("{:#}", e), "generation failed");
                            return Reply::new(
                                ReplyKind::Error,
                                build_error_message(ANSWER_ERROR),
                                Vec::new(),
                                hint,
                            );
                        }
                    }
                }
            }
        };

        self.record(query, &reply);
        reply
    }

    fn recent_history(&self) -> Vec<ConversationTurn> {
        let start = self.history.len().saturating_sub(self.history_window);
        self.history[start..].to_vec()
    }

    fn record(&mut self, query: Query, reply: &Reply) {
        info!(
            session = %self.id,
            mode = %query.mode,
            user_message = %query.text,
            response = %reply.content,
            source_documents = reply.sources.len(),
            "user interaction"
        );
        self.history.push(ConversationTurn {
            query: query.text,
            mode: query.mode,
            response: reply.content.clone(),
            sources: reply.sources.clone(),
            at: Utc::now(),
        });
    }
}
