use crate::AnswerError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Where uploaded documents live. The index only ever sees paths handed out
/// by `list_entries` or built with `path_for`.
pub trait DocumentStorage: Send + Sync {
    fn root(&self) -> &Path;

    /// Regular files directly under the root, sorted by path.
    fn list_entries(&self) -> std::io::Result<Vec<PathBuf>>;

    fn read_bytes(&self, path: &Path) -> std::io::Result<Vec<u8>>;

    /// Replaces `path` atomically: readers see either the old or the new contents.
    fn write_bytes(&self, path: &Path, content: &[u8]) -> std::io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    /// Returns `false` when there was nothing to delete.
    fn delete(&self, path: &Path) -> std::io::Result<bool>;

    fn path_for(&self, identifier: &str) -> PathBuf {
        self.root().join(identifier)
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Single-turn, stateless completion.
    async fn complete(&self, prompt: &str) -> Result<String, AnswerError>;
}

#[async_trait]
impl<T> LanguageModel for std::sync::Arc<T>
where
    T: LanguageModel + ?Sized,
{
    async fn complete(&self, prompt: &str) -> Result<String, AnswerError> {
        (**self).complete(prompt).await
    }
}

#[async_trait]
impl<T> LanguageModel for Box<T>
where
    T: LanguageModel + ?Sized,
{
    async fn complete(&self, prompt: &str) -> Result<String, AnswerError> {
        (**self).complete(prompt).await
    }
}
