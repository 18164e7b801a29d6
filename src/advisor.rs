//! Mode suggestions from keyword heuristics.
//!
//! A content-seeking question asked in search mode suggests Q&A, and a
//! location-seeking question asked in Q&A mode suggests search. The advisor
//! only produces a hint; it never switches the mode.

use crate::models::Mode;

const CONTENT_KEYWORDS: &[&str] = &[
    "summarize",
    "summary",
    "explain",
    "tell me",
    "what is",
    "what are",
    "describe",
    "details",
    "how does",
    "how do",
    "why",
    "要約",
    "教えて",
    "説明",
    "内容",
    "どんな",
    "詳細",
    "とは",
    "どのような",
];

const LOCATION_KEYWORDS: &[&str] = &[
    "where",
    "which file",
    "which document",
    "locate",
    "find",
    "file",
    "document",
    "どこ",
    "ありか",
    "場所",
    "ファイル",
    "資料",
    "文書",
    "見つけ",
];

pub fn suggest_mode(query: &str, current: Mode) -> Option<String> {
    let lowered = query.to_lowercase();
    let matches = |keywords: &[&str]| keywords.iter().any(|k| lowered.contains(k));

    match current {
        Mode::Search if matches(CONTENT_KEYWORDS) => Some(format!(
            "Tip: for a question like this, switch to \"{}\" (Tab) to get an answer based on the document contents.",
            Mode::Qa.label()
        )),
        Mode::Qa if matches(LOCATION_KEYWORDS) => Some(format!(
            "Tip: for a question like this, switch to \"{}\" (Tab) to see where the related documents are.",
            Mode::Search.label()
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_question_in_search_mode_suggests_qa() {
        let hint = suggest_mode("Please EXPLAIN the expense policy", Mode::Search).unwrap();
        assert!(hint.contains(Mode::Qa.label()));
        assert!(suggest_mode("有給休暇について教えて", Mode::Search).is_some());
    }

    #[test]
    fn location_question_in_qa_mode_suggests_search() {
        let hint = suggest_mode("Where is the onboarding checklist?", Mode::Qa).unwrap();
        assert!(hint.contains(Mode::Search.label()));
    }

    #[test]
    fn matching_mode_gets_no_hint() {
        assert_eq!(suggest_mode("Where is the onboarding checklist?", Mode::Search), None);
        assert_eq!(suggest_mode("explain the policy", Mode::Qa), None);
        assert_eq!(suggest_mode("leave policy", Mode::Search), None);
    }
}
