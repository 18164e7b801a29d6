//! Chat message construction for Q&A mode.

use serde::{Deserialize, Serialize};

use crate::models::{ConversationTurn, RetrievedChunk};
use crate::render::{format_source, NO_RELEVANT_DOCS_QA};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

pub fn system_prompt() -> String {
    format!(
        "You are the company's internal Q&A assistant. Answer the user's question \
         in detail using only the company documents provided.\n\n\
         Instructions:\n\
         1. Always read the provided documents and use them.\n\
         2. Extract the information in the documents that answers the question.\n\
         3. Give a specific, practical answer.\n\
         4. If the documents contain relevant information, you must use it.\n\
         5. Only if the documents contain no information needed for the answer, \
         reply exactly: \"{}\"",
        NO_RELEVANT_DOCS_QA
    )
}

/// `[n] source\ntext` blocks separated by blank lines.
pub fn format_context(chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return "(no context found)".to_string();
    }
    chunks
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[{}] {}\n{}", i + 1, format_source(&r.chunk), r.chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// System prompt, prior turns as user/assistant pairs, then the question with context.
pub fn build_messages(
    question: &str,
    context: &[RetrievedChunk],
    history: &[ConversationTurn],
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(2 + history.len() * 2);
    messages.push(Message::new("system", system_prompt()));
    for turn in history {
        messages.push(Message::new("user", turn.query.clone()));
        messages.push(Message::new("assistant", turn.response.clone()));
    }
    messages.push(Message::new(
        "user",
        format!(
            "Company documents:\n{}\n\nQuestion: {}",
            format_context(context),
            question
        ),
    ));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, FileFormat, Mode};
    use chrono::Utc;

    fn retrieved(file: &str, text: &str) -> RetrievedChunk {
        RetrievedChunk {
            chunk: Chunk {
                id: "c".to_string(),
                document_id: "d".to_string(),
                chunk_index: 0,
                text: text.to_string(),
                hash: String::new(),
                path: file.to_string(),
                file_name: file.to_string(),
                format: FileFormat::Txt,
                page: None,
                row: None,
            },
            score: 0.9,
        }
    }

    #[test]
    fn context_is_numbered_with_sources() {
        let ctx = format_context(&[
            retrieved("leave.txt", "20 days"),
            retrieved("pay.txt", "monthly"),
        ]);
        assert_eq!(ctx, "[1] leave.txt\n20 days\n\n[2] pay.txt\nmonthly");
    }

    #[test]
    fn messages_include_history_and_question() {
        let turn = ConversationTurn {
            query: "earlier question".to_string(),
            mode: Mode::Qa,
            response: "earlier answer".to_string(),
            sources: vec![],
            at: Utc::now(),
        };
        let msgs = build_messages("How many days?", &[retrieved("leave.txt", "20 days")], &[turn]);
        assert_eq!(msgs.len(), 4);
        assert_eq!(msgs[0].role, "system");
        assert!(msgs[0].content.contains(NO_RELEVANT_DOCS_QA));
        assert_eq!(msgs[1], Message::new("user", "earlier question"));
        assert_eq!(msgs[2], Message::new("assistant", "earlier answer"));
        assert!(msgs[3].content.ends_with("Question: How many days?"));
        assert!(msgs[3].content.contains("[1] leave.txt"));
    }
}
