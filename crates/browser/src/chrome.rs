use crate::error::{ErrorKind, Result};
use std::path::{Path, PathBuf};

/// Environment variable that overrides executable discovery.
pub const CHROME_ENV: &str = "SITESNAP_CHROME";

/// A Chrome/Chromium executable that can be driven over the DevTools protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chrome {
    path: PathBuf,
}
impl Chrome {
    /// Use an explicit executable path.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            exn::bail!(ErrorKind::ExecutableMissing(path));
        }
        Ok(Self { path })
    }

    /// Find an executable: the [`CHROME_ENV`] override first, then the usual
    /// executable names on `PATH`.
    pub fn discover() -> Result<Self> {
        if let Some(path) = std::env::var_os(CHROME_ENV).filter(|p| !p.is_empty()) {
            tracing::debug!(path = ?path, "Using Chrome executable from {CHROME_ENV}");
            return Self::from_path(path);
        }
        // TODO: What are the executable names on Windows? macOS?
        let executables = ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser", "chrome"];
        for exe in executables {
            if let Ok(path) = which::which(exe) {
                tracing::debug!(path = %path.display(), "Discovered Chrome executable on PATH");
                return Ok(Self { path });
            }
        }
        tracing::info!("Chrome executable not found in PATH");
        exn::bail!(ErrorKind::ChromeNotFound);
    }

    /// Explicit path if one is configured, discovery otherwise.
    pub fn resolve(configured: Option<&Path>) -> Result<Self> {
        match configured {
            Some(path) => Self::from_path(path),
            None => Self::discover(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_path_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("chrome");
        let err = Chrome::from_path(&missing).unwrap_err();
        assert!(matches!(&*err, ErrorKind::ExecutableMissing(p) if p == &missing));
        // Directories aren't executables either.
        assert!(Chrome::from_path(dir.path()).is_err());
    }

    #[test]
    fn from_path_accepts_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let chrome = Chrome::from_path(file.path()).unwrap();
        assert_eq!(chrome.path(), file.path());
    }

    #[test]
    fn resolve_prefers_configured_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let chrome = Chrome::resolve(Some(file.path())).unwrap();
        assert_eq!(chrome.path(), file.path());
    }
}
