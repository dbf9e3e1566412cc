//! Local file store
//!
//! Treats a text file as the document. The version token is the checksum of
//! the file content, so a write with an expected version acts as a
//! compare-and-swap. The compare and the replace happen under an exclusive
//! advisory lock on a sidecar lock file, and the replace itself is a
//! write-to-temp-then-rename.
//!
//! The sidecar (`.{name}.lock`) stays on disk after a write. Deleting it would
//! let a writer blocked on the old inode and a new writer on a fresh file both
//! hold "the" lock at once.

use crate::checksum::content_version;
use crate::{DocumentStore, ResourceId, Result, Snapshot, StoreError};
use async_trait::async_trait;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Store backed by files on the local filesystem.
///
/// Resource identifiers are file paths, resolved against `root` when relative.
#[derive(Debug, Clone, Default)]
pub struct FileStore {
    root: Option<PathBuf>,
}

impl FileStore {
    /// Resolve relative identifiers against the process working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative identifiers against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, resource: &ResourceId) -> Result<PathBuf> {
        if resource.as_str().trim().is_empty() {
            return Err(StoreError::InvalidResource {
                resource: resource.to_string(),
                reason: "empty path".into(),
            });
        }

        let path = PathBuf::from(resource.as_str());
        Ok(match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        })
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn fetch(&self, resource: &ResourceId) -> Result<Snapshot> {
        let path = self.resolve(resource)?;
        let resource = resource.clone();

        run_blocking(&path, move |path| {
            let body = read_document(path, &resource)?;
            let version = content_version(&body);
            Ok(Snapshot::new(body, Some(version)))
        })
        .await
    }

    async fn write(
        &self,
        resource: &ResourceId,
        body: &str,
        expected_version: Option<&str>,
    ) -> Result<()> {
        let path = self.resolve(resource)?;
        let resource = resource.clone();
        let body = body.to_string();
        let expected = expected_version.map(str::to_string);

        run_blocking(&path, move |path| {
            let lock = acquire_lock(path)?;

            if let Some(expected) = expected.as_deref() {
                let current = read_document(path, &resource)?;
                if content_version(&current) != expected {
                    tracing::debug!(path = %path.display(), "File changed since it was read");
                    return Err(StoreError::Conflict {
                        resource: resource.to_string(),
                    });
                }
            }

            write_atomic(path, body.as_bytes())?;

            fs2::FileExt::unlock(&lock).map_err(|e| StoreError::io(lock_path(path), e))?;
            Ok(())
        })
        .await
    }
}

/// Run filesystem work off the async executor.
async fn run_blocking<T, F>(path: &Path, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Path) -> Result<T> + Send + 'static,
{
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || work(&owned))
        .await
        .map_err(|e| StoreError::transient(path.display().to_string(), e.to_string()))?
}

fn read_document(path: &Path, resource: &ResourceId) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => StoreError::NotFound {
            resource: resource.to_string(),
        },
        ErrorKind::PermissionDenied => StoreError::Forbidden {
            resource: resource.to_string(),
            message: e.to_string(),
        },
        _ => StoreError::io(path, e),
    })
}

fn lock_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.lock", name))
}

fn acquire_lock(path: &Path) -> Result<File> {
    let lock_path = lock_path(path);
    let lock = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| StoreError::io(&lock_path, e))?;

    lock.lock_exclusive()
        .map_err(|e| StoreError::io(&lock_path, e))?;

    Ok(lock)
}

/// Write content with write-to-temp-then-rename so readers never see a
/// partial document. The temp file is removed if any step fails.
fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = path.with_file_name(&temp_name);

    let result = write_and_rename(&temp_path, path, content);
    if result.is_err() && temp_path.exists() {
        if let Err(e) = fs::remove_file(&temp_path) {
            tracing::warn!(path = %temp_path.display(), "Failed to remove temp file: {}", e);
        }
    }
    result
}

fn write_and_rename(temp_path: &Path, path: &Path, content: &[u8]) -> Result<()> {
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)
        .map_err(|e| StoreError::io(temp_path, e))?;

    temp_file
        .write_all(content)
        .map_err(|e| StoreError::io(temp_path, e))?;

    temp_file
        .sync_all()
        .map_err(|e| StoreError::io(temp_path, e))?;

    fs::rename(temp_path, path).map_err(|e| StoreError::io(path, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_path_is_hidden_sibling() {
        let path = Path::new("/tmp/docs/PR.md");
        assert_eq!(lock_path(path), PathBuf::from("/tmp/docs/.PR.md.lock"));
    }

    #[test]
    fn test_resolve_relative_against_root() {
        let store = FileStore::with_root("/work");
        let path = store.resolve(&ResourceId::new("body.md")).unwrap();
        assert_eq!(path, PathBuf::from("/work/body.md"));
    }

    #[test]
    fn test_resolve_rejects_empty() {
        let store = FileStore::new();
        let err = store.resolve(&ResourceId::new("  ")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidResource { .. }));
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("PR.md");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("occupied"), "x").unwrap();

        let err = write_atomic(&target, b"body").unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left: {leftovers:?}");
    }
}
