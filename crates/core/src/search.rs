use crate::fuzzy::best_match;
use crate::ingest::DocumentIndex;
use crate::models::{
    IndexedDocument, SearchMatch, SearchOptions, SNIPPET_LEAD_CHARS, SNIPPET_WINDOW_CHARS,
};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzySearchEngine {
    options: SearchOptions,
}

impl FuzzySearchEngine {
    pub fn new(options: SearchOptions) -> Self {
        Self { options }
    }

    pub fn threshold(&self) -> u8 {
        self.options.threshold
    }

    pub fn search(&self, index: &DocumentIndex, query: &str) -> Vec<SearchMatch> {
        search(index, query, self.options.threshold)
    }
}

/// One match per document whose best token scores at least `threshold`,
/// in index order. Results are deliberately not ranked across documents.
pub fn search(index: &DocumentIndex, query: &str, threshold: u8) -> Vec<SearchMatch> {
    let snapshot = index.get_all();
    search_documents(&snapshot, query, threshold)
}

pub fn search_documents(
    documents: &[IndexedDocument],
    query: &str,
    threshold: u8,
) -> Vec<SearchMatch> {
    let query = query.to_lowercase();

    let matches: Vec<SearchMatch> = documents
        .iter()
        .filter_map(|document| match_document(document, &query, threshold))
        .collect();

    debug!(
        query = %query,
        threshold,
        documents = documents.len(),
        matches = matches.len(),
        "fuzzy search finished"
    );
    matches
}

fn match_document(document: &IndexedDocument, query: &str, threshold: u8) -> Option<SearchMatch> {
    let (token, score) = best_match(query, document.text.split_whitespace())?;
    if score < threshold {
        return None;
    }

    Some(SearchMatch {
        document_identifier: document.identifier.clone(),
        matched_token: token.to_string(),
        score,
        snippet: highlighted_snippet(&document.text, token),
    })
}

/// A fixed window of text starting a little before the first occurrence of
/// `token`, with every occurrence inside the window wrapped in `**`.
///
/// Offsets are counted in chars. Highlighting is plain substring replacement,
/// so a token that also appears inside a longer word is marked there too.
pub fn highlighted_snippet(text: &str, token: &str) -> String {
    let first = text
        .find(token)
        .map_or(0, |byte_offset| text[..byte_offset].chars().count());
    let start = first.saturating_sub(SNIPPET_LEAD_CHARS);

    let window: String = text.chars().skip(start).take(SNIPPET_WINDOW_CHARS).collect();
    if token.is_empty() {
        return window;
    }
    window.replace(token, &format!("**{token}**"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(documents: &[(&str, &str)]) -> DocumentIndex {
        let index = DocumentIndex::new();
        for (identifier, text) in documents {
            index.put(identifier, text);
        }
        index
    }

    #[test]
    fn finds_and_highlights_term_in_notes() {
        let index = index_with(&[("notes.txt", "python is a great language for scripting")]);

        let matches = search(&index, "python", 80);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].document_identifier, "notes.txt");
        assert_eq!(matches[0].matched_token, "python");
        assert!(matches[0].snippet.contains("**python**"));
    }

    #[test]
    fn exact_token_scores_one_hundred() {
        let index = index_with(&[("a.txt", "tokio runtime internals")]);
        let matches = search(&index, "runtime", 100);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].score, 100);
    }

    #[test]
    fn threshold_above_one_hundred_never_matches() {
        let index = index_with(&[("a.txt", "runtime"), ("b.txt", "runtime runtime")]);
        assert!(search(&index, "runtime", 101).is_empty());
    }

    #[test]
    fn matches_follow_index_order_without_ranking() {
        let index = index_with(&[
            ("first.txt", "pythons everywhere"),
            ("second.txt", "python exactly"),
            ("third.txt", "nothing relevant here"),
        ]);

        let matches = search(&index, "python", 80);
        let ids: Vec<_> = matches.iter().map(|m| m.document_identifier.as_str()).collect();

        assert_eq!(ids, vec!["first.txt", "second.txt"]);
        assert!(matches[0].score < matches[1].score);
    }

    #[test]
    fn removed_documents_disappear_from_results() {
        let index = index_with(&[("a.txt", "python"), ("b.txt", "python")]);
        index.remove("a.txt");

        let matches = search(&index, "python", 90);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].document_identifier, "b.txt");
    }

    #[test]
    fn typo_still_matches_under_lower_threshold() {
        let index = index_with(&[("cv.txt", "experienced python developer")]);
        let matches = search(&index, "pythn", 80);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].matched_token, "python");
        assert_eq!(matches[0].score, 91);
        assert!(search(&index, "pythn", 95).is_empty());
    }

    #[test]
    fn snippet_window_starts_before_first_occurrence() {
        let prefix = "a".repeat(150);
        let suffix = "b".repeat(400);
        let text = format!("{prefix} needle {suffix}");

        let snippet = highlighted_snippet(&text, "needle");

        let expected_start = 151 - SNIPPET_LEAD_CHARS;
        let expected_window: String = text.chars().skip(expected_start).take(300).collect();
        assert_eq!(snippet, expected_window.replace("needle", "**needle**"));
        assert!(snippet.starts_with(&"a".repeat(SNIPPET_LEAD_CHARS - 1)));
    }

    #[test]
    fn snippet_is_clamped_to_text_start_and_counts_chars() {
        let text = "héllo wörld ünïcode needle end";
        let snippet = highlighted_snippet(text, "needle");
        assert_eq!(snippet, "héllo wörld ünïcode **needle** end");
    }

    #[test]
    fn highlighting_is_plain_substring_replacement() {
        let snippet = highlighted_snippet("java and javascript", "java");
        assert_eq!(snippet, "**java** and **java**script");
    }
}
