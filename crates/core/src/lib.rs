pub mod error;
pub mod extractor;
pub mod fuzzy;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod search;
pub mod service;
pub mod stores;
pub mod traits;

pub use error::{AnswerError, IngestError};
pub use extractor::{
    parse_bytes, parse_document, DocumentFormat, DocxExtractor, LopdfExtractor, PageText,
    PlainTextExtractor, TextExtractor,
};
pub use fuzzy::{best_match, token_set_ratio};
pub use ingest::{digest_bytes, validate_identifier, DocumentIndex};
pub use llm::{
    ChatCompletionsClient, LlmEndpointConfig, UnconfiguredModel, DEFAULT_CHAT_ENDPOINT,
    DEFAULT_CHAT_MODEL,
};
pub use models::{
    Answer, AnswerSource, DocumentSummary, IndexedDocument, IndexingReport, ResolverOptions,
    SearchMatch, SearchOptions, SkippedDocument, DEFAULT_MATCH_THRESHOLD,
};
pub use normalize::normalize;
pub use orchestrator::AnswerResolver;
pub use search::{search, FuzzySearchEngine};
pub use service::DocumentChatService;
pub use stores::LocalDirectoryStorage;
pub use traits::{DocumentStorage, LanguageModel};
