//! User-facing reply text: source labels, location lists, answers.

use crate::models::{Chunk, FileFormat, RetrievedChunk};

pub const NO_RELEVANT_DOCS_SEARCH: &str = "No documents related to your input were found.";
pub const NO_RELEVANT_DOCS_QA: &str = "The information needed to answer was not found.";

pub const RETRIEVAL_ERROR: &str = "Failed to search the company documents.";
pub const ANSWER_ERROR: &str = "Failed to get an answer from the assistant.";

pub const GREETING: &str = "Hello! I am the internal document assistant. Pick a mode and type your message.\n\n\
- Document search: enter a topic and I will list the documents related to it.\n\
- Company Q&A: ask a question and I will answer it from the company documents.\n\n\
Press Tab to switch modes.";

/// `file_name`, or `file_name (page N)` for a PDF page.
pub fn format_source(chunk: &Chunk) -> String {
    match (chunk.format, chunk.page) {
        (FileFormat::Pdf, Some(page)) => format!("{} (page {})", chunk.file_name, page),
        _ => chunk.file_name.clone(),
    }
}

/// Distinct source labels in retrieval order.
pub fn unique_sources(chunks: &[RetrievedChunk]) -> Vec<String> {
    let mut seen = Vec::new();
    for r in chunks {
        let source = format_source(&r.chunk);
        if !seen.contains(&source) {
            seen.push(source);
        }
    }
    seen
}

pub fn render_locations(sources: &[String]) -> String {
    let Some((main, others)) = sources.split_first() else {
        return NO_RELEVANT_DOCS_SEARCH.to_string();
    };

    let mut out = format!("Related documents\n\nMain reference: {}", main);
    if !others.is_empty() {
        out.push_str("\n\nOther related documents:");
        for (i, source) in others.iter().enumerate() {
            out.push_str(&format!("\n{}. {}", i + 1, source));
        }
    }
    out
}

pub fn render_answer(answer: &str, sources: &[String]) -> String {
    let mut out = format!("Answer:\n{}", answer.trim());
    if !sources.is_empty() {
        out.push_str("\n\nReferenced documents:");
        for (i, source) in sources.iter().enumerate() {
            out.push_str(&format!("\n{}. {}", i + 1, source));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(file: &str, format: FileFormat, page: Option<u32>, idx: i64) -> RetrievedChunk {
        RetrievedChunk {
            chunk: Chunk {
                id: format!("{}-{}", file, idx),
                document_id: file.to_string(),
                chunk_index: idx,
                text: "text".to_string(),
                hash: String::new(),
                path: file.to_string(),
                file_name: file.to_string(),
                format,
                page,
                row: None,
            },
            score: 0.5,
        }
    }

    #[test]
    fn pdf_sources_show_page() {
        let c = chunk("handbook.pdf", FileFormat::Pdf, Some(4), 0);
        assert_eq!(format_source(&c.chunk), "handbook.pdf (page 4)");
        let c = chunk("staff.csv", FileFormat::Csv, None, 0);
        assert_eq!(format_source(&c.chunk), "staff.csv");
    }

    #[test]
    fn sources_deduplicated_in_order() {
        let chunks = vec![
            chunk("b.txt", FileFormat::Txt, None, 0),
            chunk("a.pdf", FileFormat::Pdf, Some(1), 0),
            chunk("b.txt", FileFormat::Txt, None, 1),
            chunk("a.pdf", FileFormat::Pdf, Some(2), 0),
        ];
        assert_eq!(
            unique_sources(&chunks),
            vec!["b.txt", "a.pdf (page 1)", "a.pdf (page 2)"]
        );
    }

    #[test]
    fn locations_list_main_then_others() {
        let text = render_locations(&["a.txt".to_string(), "b.txt".to_string()]);
        assert!(text.starts_with("Related documents"));
        assert!(text.contains("Main reference: a.txt"));
        assert!(text.contains("Other related documents:\n1. b.txt"));

        let single = render_locations(&["a.txt".to_string()]);
        assert!(!single.contains("Other related documents"));
        assert_eq!(render_locations(&[]), NO_RELEVANT_DOCS_SEARCH);
    }

    #[test]
    fn answer_lists_references() {
        let text = render_answer(" Twenty days. ", &["leave.txt".to_string()]);
        assert_eq!(text, "Answer:\nTwenty days.\n\nReferenced documents:\n1. leave.txt");
    }
}
