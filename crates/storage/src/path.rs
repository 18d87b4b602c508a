//! Keeping bundle paths inside the bundle.
//!
//! Asset file names come from remote URLs, so every path handed to a backend
//! goes through [`validate`] first.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path, PathBuf};

/// Normalize a bundle-relative path, refusing anything that would land
/// outside the bundle root.
///
/// `.` components, repeated separators and trailing slashes are dropped and
/// `..` is resolved lexically. A leading `/` is ignored: every path is
/// relative to the root. Paths that are empty after normalization, that climb
/// above the root, or that contain a NUL byte are rejected with
/// [`InvalidPath`](crate::error::ErrorKind::InvalidPath).
///
/// ```
/// use std::path::Path;
/// use sitesnap_storage::validate_path;
///
/// assert_eq!(validate_path("./assets//logo.png").unwrap(), Path::new("assets/logo.png"));
/// assert_eq!(validate_path("assets/../index.html").unwrap(), Path::new("index.html"));
/// assert!(validate_path("../index.html").is_err());
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let invalid = || exn::Exn::from(ErrorKind::InvalidPath(original.to_path_buf()));
    let mut kept = Vec::new();
    for component in original.components() {
        match component {
            // Unix lets NUL through components(); syscalls would truncate at it.
            Component::Normal(name) if name.as_encoded_bytes().contains(&0) => return Err(invalid()),
            Component::Normal(name) => kept.push(name),
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => return Err(invalid()),
            Component::ParentDir => {
                kept.pop().ok_or_else(invalid)?;
            },
        }
    }
    if kept.is_empty() {
        return Err(invalid());
    }
    Ok(kept.into_iter().collect())
}
