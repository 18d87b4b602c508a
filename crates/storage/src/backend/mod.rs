//! The filesystem capability a snapshot run writes its bundle through.
//!
//! [`LocalBackend`] is rooted at the run's output directory; `MockBackend`
//! (feature `mock`) keeps everything in memory.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Write access to one bundle directory.
///
/// Asset downloads write their files while other downloads are still in
/// flight, so every operation is async and takes `&self`.
///
/// All paths are relative to the bundle root and are checked with
/// [`validate_path`](crate::validate_path); a path that would leave the root
/// fails with [`InvalidPath`](crate::error::ErrorKind::InvalidPath).
///
/// ```
/// use std::path::Path;
/// use sitesnap_storage::{backend::StorageBackend, error::Result};
///
/// async fn write_stylesheet(backend: &dyn StorageBackend, css: &str) -> Result<()> {
///     backend.create_dir(Path::new("assets")).await?;
///     backend.write(Path::new("styles.css"), css.as_bytes()).await
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the backend, for logging.
    fn name(&self) -> &str;

    /// Create or overwrite a file, creating its parent directories.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Create a directory and all of its parents, the bundle root included.
    /// Creating a directory that already exists succeeds.
    async fn create_dir(&self, path: &Path) -> Result<()>;

    /// Move a file into place, replacing whatever was at `to`.
    ///
    /// Fails with [`NotFound`](crate::error::ErrorKind::NotFound) when `from`
    /// doesn't exist.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;
}
