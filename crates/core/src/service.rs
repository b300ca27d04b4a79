use crate::extractor::{parse_bytes, DocumentFormat};
use crate::ingest::{digest_bytes, identifier_of, validate_identifier, DocumentIndex};
use crate::models::{Answer, DocumentSummary, IndexingReport, ResolverOptions, SearchMatch};
use crate::orchestrator::AnswerResolver;
use crate::traits::{DocumentStorage, LanguageModel};
use crate::{AnswerError, IngestError};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// The document chatbot: owns the index, the storage it is built from and
/// the LLM used when documents don't answer a question.
///
/// Upload, delete and rebuild are serialized through one writer lock.
/// Searches and answers only read index snapshots and never wait on it.
pub struct DocumentChatService<L>
where
    L: LanguageModel,
{
    storage: Arc<dyn DocumentStorage>,
    index: Arc<DocumentIndex>,
    resolver: AnswerResolver<L>,
    options: ResolverOptions,
    writer: Mutex<()>,
}

impl<L> DocumentChatService<L>
where
    L: LanguageModel,
{
    /// Builds the service and indexes whatever storage already holds.
    pub fn open(storage: Arc<dyn DocumentStorage>, llm: L, options: ResolverOptions) -> Self {
        let index = Arc::new(DocumentIndex::new());
        let has_entries = storage
            .list_entries()
            .map(|entries| !entries.is_empty())
            .unwrap_or(true);
        if has_entries {
            index.rebuild(storage.as_ref());
        }

        let resolver = AnswerResolver::new(
            Arc::clone(&index),
            llm,
            options.search,
            options.llm_timeout,
        );

        Self {
            storage,
            index,
            resolver,
            options,
            writer: Mutex::new(()),
        }
    }

    pub fn index(&self) -> &DocumentIndex {
        &self.index
    }

    pub fn storage(&self) -> &dyn DocumentStorage {
        self.storage.as_ref()
    }

    pub async fn answer(&self, question: &str) -> Result<Answer, AnswerError> {
        self.resolver.answer(question).await
    }

    pub fn search(&self, query: &str) -> Vec<SearchMatch> {
        self.resolver.search(query)
    }

    pub fn list_documents(&self) -> Vec<DocumentSummary> {
        self.index
            .get_all()
            .iter()
            .map(DocumentSummary::from)
            .collect()
    }

    pub async fn rebuild(&self) -> Result<IndexingReport, IngestError> {
        let _writer = self.writer.lock().await;
        let index = Arc::clone(&self.index);
        self.off_runtime(move |storage| Ok(index.rebuild(storage)))
            .await
            .map_err(IngestError::from)
    }

    /// Stores and indexes `bytes` under `identifier`, replacing any previous
    /// document with that name. Nothing is written unless the content parses.
    pub async fn upload(
        &self,
        identifier: &str,
        bytes: Vec<u8>,
    ) -> Result<DocumentSummary, IngestError> {
        validate_identifier(identifier)?;
        DocumentFormat::from_path(Path::new(identifier))?;

        let (text, bytes) = self.parse_off_thread(identifier, bytes).await?;

        let _writer = self.writer.lock().await;
        let path = self.storage.path_for(identifier);
        let target = path.clone();
        let bytes = self
            .off_runtime(move |storage| storage.write_bytes(&target, &bytes).map(|()| bytes))
            .await?;
        let document = self
            .index
            .put_with_checksum(identifier, &text, digest_bytes(&bytes));

        info!(identifier, path = %path.display(), "document uploaded and indexed");
        Ok(DocumentSummary::from(&document))
    }

    /// Uploads a local file under its own file name.
    pub async fn upload_path(&self, path: &Path) -> Result<DocumentSummary, IngestError> {
        let identifier = identifier_of(path)?;
        DocumentFormat::from_path(path)?;
        let bytes = tokio::fs::read(path).await?;
        self.upload(&identifier, bytes).await
    }

    /// Drops the document from the index and deletes its file. Returns whether
    /// anything existed to remove.
    pub async fn delete(&self, identifier: &str) -> Result<bool, IngestError> {
        validate_identifier(identifier)?;

        let _writer = self.writer.lock().await;
        let from_index = self.index.remove(identifier);
        let path = self.storage.path_for(identifier);
        let from_storage = self.off_runtime(move |storage| storage.delete(&path)).await?;

        info!(identifier, from_index, from_storage, "document deleted");
        Ok(from_index || from_storage)
    }

    /// Runs blocking storage work on the blocking pool.
    async fn off_runtime<T, F>(&self, work: F) -> std::io::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn DocumentStorage) -> std::io::Result<T> + Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || work(storage.as_ref()))
            .await
            .map_err(|error| std::io::Error::other(error.to_string()))?
    }

    async fn parse_off_thread(
        &self,
        identifier: &str,
        bytes: Vec<u8>,
    ) -> Result<(String, Vec<u8>), IngestError> {
        let name = identifier.to_string();
        let task = tokio::task::spawn_blocking(move || {
            let parsed = parse_bytes(&name, &bytes);
            parsed.map(|text| (text, bytes))
        });

        match tokio::time::timeout(self.options.parse_timeout, task).await {
            Ok(Ok(parsed)) => parsed,
            Ok(Err(join_error)) => Err(IngestError::Parse(format!(
                "parser task failed for {identifier}: {join_error}"
            ))),
            Err(_) => Err(IngestError::Parse(format!(
                "parsing {identifier} timed out after {:?}",
                self.options.parse_timeout
            ))),
        }
    }
}
