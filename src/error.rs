//! Pipeline Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Only fatal failures are represented
//! here; degraded stages log and carry on.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A pipeline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures that abort a snapshot run.
///
/// ### Setup Errors
/// - [`ErrorKind::Config`]
/// - [`ErrorKind::InvalidTarget`]
/// - [`ErrorKind::Client`]
/// - [`ErrorKind::Launch`]
///
/// ### Capture Errors
/// - [`ErrorKind::Navigation`]
/// - [`ErrorKind::Markup`]
/// - [`ErrorKind::Persist`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Configuration could not be loaded.
    #[display("could not load configuration: {_0}")]
    Config(#[error(not(source))] String),
    /// The target could not be turned into an absolute HTTP(S) URL.
    #[display("invalid target URL: {_0}")]
    InvalidTarget(#[error(not(source))] String),
    /// The HTTP client for asset downloads could not be built.
    #[display("could not build HTTP client")]
    Client,
    /// No rendering session could be opened.
    #[display("could not start a rendering session: {_0}")]
    Launch(#[error(not(source))] String),
    /// The page did not load (or did not settle) in time.
    #[display("could not load {url}: {reason}")]
    Navigation { url: String, reason: String },
    /// The rendered document could not be serialized.
    #[display("could not read rendered markup: {_0}")]
    Markup(#[error(not(source))] String),
    /// The bundle could not be written to the output directory.
    #[display("could not write bundle to {}", _0.display())]
    Persist(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Navigation timeouts are final; only a failed launch is worth another go.
        matches!(self, Self::Launch(_))
    }
}
