use crate::traits::DocumentStorage;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;
use walkdir::WalkDir;

/// Documents stored as plain files in one flat directory.
pub struct LocalDirectoryStorage {
    root: PathBuf,
}

impl LocalDirectoryStorage {
    pub fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root)?;
            tracing::info!(root = %root.display(), "created document directory");
        }
        Ok(Self { root })
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

impl DocumentStorage for LocalDirectoryStorage {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list_entries(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let entries = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true);
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) if error.depth() == 0 => return Err(std::io::Error::from(error)),
                Err(error) => {
                    warn!(path = ?error.path(), %error, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || is_hidden(entry.path()) {
                continue;
            }
            files.push(entry.into_path());
        }

        files.sort_unstable();
        Ok(files)
    }

    fn read_bytes(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write_bytes(&self, path: &Path, content: &[u8]) -> std::io::Result<()> {
        let parent = path.parent().unwrap_or(&self.root);
        let staging = parent.join(format!(".{}.part", Uuid::new_v4()));

        fs::write(&staging, content)?;
        if let Err(error) = fs::rename(&staging, path) {
            let _ = fs::remove_file(&staging);
            return Err(error);
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn delete(&self, path: &Path) -> std::io::Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(false),
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_missing_directory() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let root = dir.path().join("data").join("uploads");
        let storage = LocalDirectoryStorage::open(&root)?;
        assert!(root.is_dir());
        assert!(storage.list_entries()?.is_empty());
        Ok(())
    }

    #[test]
    fn listing_is_flat_sorted_and_skips_hidden() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let storage = LocalDirectoryStorage::open(dir.path())?;
        fs::write(dir.path().join("b.txt"), "b")?;
        fs::write(dir.path().join("a.pdf"), "a")?;
        fs::write(dir.path().join(".abc.part"), "partial")?;
        fs::create_dir(dir.path().join("nested"))?;
        fs::write(dir.path().join("nested").join("c.txt"), "c")?;

        let names = storage
            .list_entries()?
            .into_iter()
            .filter_map(|path| path.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a.pdf", "b.txt"]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn broken_entry_does_not_hide_the_rest() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let storage = LocalDirectoryStorage::open(dir.path())?;
        fs::write(dir.path().join("notes.txt"), "kept")?;
        std::os::unix::fs::symlink(dir.path().join("gone.txt"), dir.path().join("dangling.txt"))?;

        let entries = storage.list_entries()?;
        assert_eq!(entries, vec![dir.path().join("notes.txt")]);
        Ok(())
    }

    #[test]
    fn missing_root_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let root = dir.path().join("uploads");
        let storage = LocalDirectoryStorage::open(&root)?;
        fs::remove_dir(&root)?;
        assert!(storage.list_entries().is_err());
        Ok(())
    }

    #[test]
    fn write_replaces_without_leaving_staging_files() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let storage = LocalDirectoryStorage::open(dir.path())?;
        let target = storage.path_for("notes.txt");

        storage.write_bytes(&target, b"first")?;
        storage.write_bytes(&target, b"second")?;

        assert_eq!(storage.read_bytes(&target)?, b"second");
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn delete_reports_whether_anything_was_removed() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let storage = LocalDirectoryStorage::open(dir.path())?;
        let target = storage.path_for("notes.txt");
        storage.write_bytes(&target, b"x")?;

        assert!(storage.exists(&target));
        assert!(storage.delete(&target)?);
        assert!(!storage.exists(&target));
        assert!(!storage.delete(&target)?);
        Ok(())
    }
}
