use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const SNIPPET_LEAD_CHARS: usize = 100;
pub const SNIPPET_WINDOW_CHARS: usize = 300;
pub const DEFAULT_MATCH_THRESHOLD: u8 = 80;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedDocument {
    pub identifier: String,
    pub text: String,
    pub checksum: String,
    pub indexed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchMatch {
    pub document_identifier: String,
    pub matched_token: String,
    pub score: u8,
    pub snippet: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    Document,
    Llm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub source: AnswerSource,
    pub text: String,
    pub matches: Vec<SearchMatch>,
}

/// Listing row for a document currently held in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub identifier: String,
    pub checksum: String,
    pub indexed_at: DateTime<Utc>,
    pub chars: usize,
}

impl From<&IndexedDocument> for DocumentSummary {
    fn from(document: &IndexedDocument) -> Self {
        Self {
            identifier: document.identifier.clone(),
            checksum: document.checksum.clone(),
            indexed_at: document.indexed_at,
            chars: document.text.chars().count(),
        }
    }
}

#[derive(Debug)]
pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct IndexingReport {
    pub indexed: Vec<String>,
    pub skipped: Vec<SkippedDocument>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub threshold: u8,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub search: SearchOptions,
    pub llm_timeout: Duration,
    pub parse_timeout: Duration,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            search: SearchOptions::default(),
            llm_timeout: Duration::from_secs(30),
            parse_timeout: Duration::from_secs(60),
        }
    }
}
