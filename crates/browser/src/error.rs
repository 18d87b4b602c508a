//! Browser Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A browser error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for browser operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("chrome/chromium not detected on your system")]
    ChromeNotFound,
    /// An explicitly configured executable does not exist.
    #[display("chrome/chromium executable not found at {}", _0.display())]
    ExecutableMissing(#[error(not(source))] PathBuf),
    /// The browser process could not be started, or refused to open a page.
    #[display("failed to launch browser: {_0}")]
    Launch(#[error(not(source))] String),
    /// Navigation failed before the page finished loading.
    #[display("failed to navigate to {_0}")]
    Navigation(#[error(not(source))] String),
    /// Navigation (or waiting for the page to settle) exceeded its deadline.
    #[display("navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u128 },
    /// A script could not be evaluated in the page.
    #[display("script evaluation failed: {_0}")]
    Evaluation(#[error(not(source))] String),
    /// The rendered markup could not be read back from the page.
    #[display("failed to read rendered document")]
    Content,
    /// A session-level protocol command (viewport, user agent, ...) failed.
    #[display("browser command failed: {_0}")]
    Command(#[error(not(source))] &'static str),
    /// The session could not be shut down cleanly.
    #[display("failed to close browser session")]
    Close,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A page that doesn't settle within its deadline is a hard failure.
        matches!(self, Self::Launch(_) | Self::Close)
    }
}
