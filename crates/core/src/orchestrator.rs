use crate::ingest::DocumentIndex;
use crate::models::{Answer, AnswerSource, SearchMatch, SearchOptions};
use crate::search::FuzzySearchEngine;
use crate::traits::LanguageModel;
use crate::AnswerError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Local fuzzy search first, then a single LLM call when nothing in the
/// index is close enough.
pub struct AnswerResolver<L>
where
    L: LanguageModel,
{
    index: Arc<DocumentIndex>,
    llm: L,
    engine: FuzzySearchEngine,
    llm_timeout: Duration,
}

impl<L> AnswerResolver<L>
where
    L: LanguageModel,
{
    pub fn new(
        index: Arc<DocumentIndex>,
        llm: L,
        search: SearchOptions,
        llm_timeout: Duration,
    ) -> Self {
        Self {
            index,
            llm,
            engine: FuzzySearchEngine::new(search),
            llm_timeout,
        }
    }

    pub fn search(&self, query: &str) -> Vec<SearchMatch> {
        self.engine.search(&self.index, query)
    }

    pub async fn answer(&self, question: &str) -> Result<Answer, AnswerError> {
        if question.trim().is_empty() {
            return Err(AnswerError::InvalidInput("question is empty".to_string()));
        }

        let matches = self.search(question);
        if !matches.is_empty() {
            info!(matches = matches.len(), "answered from indexed documents");
            return Ok(Answer {
                source: AnswerSource::Document,
                text: format_matches(&matches),
                matches,
            });
        }

        debug!(
            threshold = self.engine.threshold(),
            "no document match, falling back to llm"
        );
        let reply = tokio::time::timeout(self.llm_timeout, self.llm.complete(question))
            .await
            .map_err(|_| {
                AnswerError::Upstream(format!("llm call timed out after {:?}", self.llm_timeout))
            })?
            .map_err(|error| match error {
                AnswerError::Upstream(details) => AnswerError::Upstream(details),
                other => AnswerError::Upstream(other.to_string()),
            })?;

        info!("answered by llm");
        Ok(Answer {
            source: AnswerSource::Llm,
            text: reply.trim().to_string(),
            matches: Vec::new(),
        })
    }
}

pub fn format_matches(matches: &[SearchMatch]) -> String {
    matches
        .iter()
        .map(|found| format!("Match in {}: ...{}...", found.document_identifier, found.snippet))
        .collect::<Vec<_>>()
        .join("\n\n")
}
