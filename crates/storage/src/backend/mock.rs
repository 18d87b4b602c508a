use crate::error::{ErrorKind, Result};
use crate::{StorageBackend, validate_path};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// A bundle held in memory, for tests.
///
/// Writes at or below a denied prefix fail with
/// [`PermissionDenied`](ErrorKind::PermissionDenied), so failure paths can be
/// exercised without a real disk.
///
/// ```
/// use sitesnap_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::default().deny_writes("assets");
/// backend.write(Path::new("index.html"), b"<html></html>").await?;
/// assert!(backend.write(Path::new("assets/logo.png"), b"png").await.is_err());
/// assert_eq!(backend.file("index.html").await.as_deref(), Some(&b"<html></html>"[..]));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MockBackend {
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
    dirs: RwLock<BTreeSet<PathBuf>>,
    denied: Vec<PathBuf>,
}
impl MockBackend {
    /// Reject every write, rename or directory creation at or below `prefix`.
    pub fn deny_writes(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.denied.push(prefix.into());
        self
    }

    /// Contents of the file at `path`, if one was written there.
    pub async fn file(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let path = validate_path(path).ok()?;
        self.files.read().await.get(&path).cloned()
    }

    /// Every file currently held, in path order.
    pub async fn files(&self) -> Vec<PathBuf> {
        self.files.read().await.keys().cloned().collect()
    }

    /// Every directory created through
    /// [`create_dir`](StorageBackend::create_dir), in path order.
    pub async fn dirs(&self) -> Vec<PathBuf> {
        self.dirs.read().await.iter().cloned().collect()
    }

    fn check_writable(&self, path: &Path) -> Result<()> {
        if self.denied.iter().any(|prefix| path.starts_with(prefix)) {
            exn::bail!(ErrorKind::PermissionDenied(path.to_path_buf()));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        self.check_writable(&path)?;
        self.files.write().await.insert(path, data.to_vec());
        Ok(())
    }

    async fn create_dir(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        self.check_writable(&path)?;
        self.dirs.write().await.insert(path);
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from = validate_path(from)?;
        let to = validate_path(to)?;
        self.check_writable(&to)?;
        let mut files = self.files.write().await;
        let data = files.remove(&from).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(from)))?;
        files.insert(to, data);
        Ok(())
    }
}
