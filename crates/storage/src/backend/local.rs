use crate::error::{ErrorKind, Result};
use crate::{StorageBackend, validate_path};
use async_trait::async_trait;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// A bundle directory on the local filesystem.
///
/// The root is created by the first [`create_dir`](StorageBackend::create_dir)
/// or [`write`](StorageBackend::write); constructing a backend only checks
/// that the root isn't an existing file.
///
/// ```no_run
/// use sitesnap_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("bundle", "/tmp/snapshots/example-com")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}
impl LocalBackend {
    /// Fails with [`InvalidPath`](ErrorKind::InvalidPath) when `root` is
    /// relative or names something other than a directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() || (root.exists() && !root.is_dir()) {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        Ok(self.root.join(validate_path(path)?))
    }

    async fn ensure_parent(&self, abs_path: &Path, path: &Path) -> Result<()> {
        match abs_path.parent() {
            Some(parent) => Ok(fs::create_dir_all(parent).await.map_err(|e| io_error(e, path))?),
            None => Ok(()),
        }
    }
}

fn io_error(e: std::io::Error, path: &Path) -> ErrorKind {
    match e.kind() {
        IoErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
        IoErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
        _ => ErrorKind::Io(e),
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let abs_path = self.resolve(path)?;
        self.ensure_parent(&abs_path, path).await?;
        tracing::trace!(backend = %self.name, path = %abs_path.display(), bytes = data.len(), "Writing file");
        Ok(fs::write(&abs_path, data).await.map_err(|e| io_error(e, path))?)
    }

    async fn create_dir(&self, path: &Path) -> Result<()> {
        let abs_path = self.resolve(path)?;
        tracing::trace!(backend = %self.name, path = %abs_path.display(), "Ensuring directory exists");
        Ok(fs::create_dir_all(&abs_path).await.map_err(|e| io_error(e, path))?)
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from_path = self.resolve(from)?;
        let to_path = self.resolve(to)?;
        self.ensure_parent(&to_path, to).await?;
        Ok(fs::rename(&from_path, &to_path).await.map_err(|e| io_error(e, from))?)
    }
}
