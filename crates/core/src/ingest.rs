use crate::extractor::parse_bytes;
use crate::models::{IndexedDocument, IndexingReport, SkippedDocument};
use crate::normalize::normalize;
use crate::traits::DocumentStorage;
use crate::IngestError;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Accepts bare file names only; anything that could escape the storage
/// directory is refused.
pub fn validate_identifier(identifier: &str) -> Result<(), IngestError> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        return Err(IngestError::MissingFileName(identifier.to_string()));
    }
    if identifier.contains(['/', '\\', '\0']) || trimmed != identifier {
        return Err(IngestError::InvalidArgument(format!(
            "document identifier must be a plain file name: {identifier:?}"
        )));
    }
    if identifier.starts_with('.') {
        return Err(IngestError::InvalidArgument(format!(
            "hidden file names are reserved: {identifier:?}"
        )));
    }
    Ok(())
}

pub fn identifier_of(path: &Path) -> Result<String, IngestError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))
}

/// In-memory map from document identifier to normalized text, kept in
/// insertion order.
///
/// Readers take a snapshot (`get_all`) and never block writers for longer than
/// an `Arc` clone. Writers copy the entry list and swap it in.
#[derive(Default)]
pub struct DocumentIndex {
    entries: RwLock<Arc<Vec<IndexedDocument>>>,
}

impl DocumentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_all(&self) -> Arc<Vec<IndexedDocument>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, identifier: &str) -> Option<IndexedDocument> {
        self.get_all()
            .iter()
            .find(|document| document.identifier == identifier)
            .cloned()
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.get_all()
            .iter()
            .map(|document| document.identifier.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.get_all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.get_all().is_empty()
    }

    /// Inserts or overwrites `identifier`. Overwrites keep the original position.
    pub fn put(&self, identifier: &str, text: &str) {
        self.put_with_checksum(identifier, text, digest_bytes(text.as_bytes()));
    }

    pub(crate) fn put_with_checksum(
        &self,
        identifier: &str,
        text: &str,
        checksum: String,
    ) -> IndexedDocument {
        let document = IndexedDocument {
            identifier: identifier.to_string(),
            text: normalize(text),
            checksum,
            indexed_at: Utc::now(),
        };

        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entries = Arc::make_mut(&mut guard);
        match entries
            .iter_mut()
            .find(|existing| existing.identifier == document.identifier)
        {
            Some(existing) => *existing = document.clone(),
            None => entries.push(document.clone()),
        }
        document
    }

    /// Returns whether an entry was removed. Removing an absent identifier is fine.
    pub fn remove(&self, identifier: &str) -> bool {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let Some(position) = guard.iter().position(|doc| doc.identifier == identifier) else {
            return false;
        };
        Arc::make_mut(&mut guard).remove(position);
        true
    }

    /// Re-reads every entry in storage and replaces the index wholesale.
    /// Files that fail to parse are left out and reported, never retried.
    pub fn rebuild(&self, storage: &dyn DocumentStorage) -> IndexingReport {
        let mut report = IndexingReport::default();
        let paths = match storage.list_entries() {
            Ok(paths) => paths,
            Err(error) => {
                warn!(
                    root = %storage.root().display(),
                    %error,
                    "failed to list document directory"
                );
                report.skipped.push(SkippedDocument {
                    path: storage.root().to_path_buf(),
                    reason: error.to_string(),
                });
                return report;
            }
        };

        let mut rebuilt = Vec::with_capacity(paths.len());
        for path in paths {
            let loaded = (|| {
                let identifier = identifier_of(&path)?;
                let bytes = storage.read_bytes(&path)?;
                let text = parse_bytes(&identifier, &bytes)?;
                Ok::<_, IngestError>(IndexedDocument {
                    identifier,
                    text: normalize(&text),
                    checksum: digest_bytes(&bytes),
                    indexed_at: Utc::now(),
                })
            })();

            match loaded {
                Ok(document) => {
                    report.indexed.push(document.identifier.clone());
                    rebuilt.push(document);
                }
                Err(error) => {
                    warn!(path = %path.display(), reason = %error, "skipped document");
                    report.skipped.push(SkippedDocument {
                        path,
                        reason: error.to_string(),
                    });
                }
            }
        }

        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(rebuilt);
        info!(
            indexed = report.indexed.len(),
            skipped = report.skipped.len(),
            "indexed documents"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::LocalDirectoryStorage;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn checksum_is_reproducible() {
        assert_eq!(digest_bytes(b"abc"), digest_bytes(b"abc"));
        assert_ne!(digest_bytes(b"abc"), digest_bytes(b"abd"));
    }

    #[test]
    fn identifiers_must_be_plain_file_names() {
        assert!(validate_identifier("notes.txt").is_ok());
        assert!(validate_identifier("My CV (final).docx").is_ok());
        for bad in [
            "",
            "  ",
            ".",
            "..",
            "../etc/passwd",
            "dir/notes.txt",
            "a\\b.txt",
            ".hidden.txt",
            " padded.txt",
        ] {
            assert!(validate_identifier(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn put_normalizes_and_overwrite_keeps_position() {
        let index = DocumentIndex::new();
        index.put("a.txt", "First   Doc");
        index.put("b.txt", "Second");
        index.put("a.txt", "Replaced, Text");

        assert_eq!(index.identifiers(), vec!["a.txt", "b.txt"]);
        assert_eq!(
            index.get("a.txt").map(|doc| doc.text),
            Some("replaced , text".to_string())
        );
    }

    #[test]
    fn remove_is_idempotent() {
        let index = DocumentIndex::new();
        index.put("a.txt", "alpha");
        assert!(index.remove("a.txt"));
        assert!(!index.remove("a.txt"));
        assert!(index.is_empty());
    }

    #[test]
    fn snapshot_is_unaffected_by_later_writes() {
        let index = DocumentIndex::new();
        index.put("a.txt", "alpha");
        let snapshot = index.get_all();

        index.put("b.txt", "beta");
        index.remove("a.txt");

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].identifier, "a.txt");
        assert_eq!(index.identifiers(), vec!["b.txt"]);
    }

    #[test]
    fn rebuild_skips_unparseable_files_and_replaces_wholesale(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let storage = LocalDirectoryStorage::open(dir.path())?;
        fs::write(dir.path().join("notes.txt"), "Python is a great language")?;
        fs::write(dir.path().join("unreadable.pdf"), b"%PDF-1.4\n%broken")?;
        fs::write(dir.path().join("image.bmp"), b"BM")?;

        let index = DocumentIndex::new();
        index.put("stale.txt", "left over from before");

        let report = index.rebuild(&storage);

        assert_eq!(report.indexed, vec!["notes.txt"]);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(index.identifiers(), vec!["notes.txt"]);
        assert_eq!(
            index.get("notes.txt").map(|doc| doc.text),
            Some("python is a great language".to_string())
        );
        Ok(())
    }
}
