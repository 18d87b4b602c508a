//! Error types for the [`fetch`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.
//! A fetch error only ever concerns a single asset; the batch carries on.

use derive_more::{Display, Error};

/// A fetch error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for fetch operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The HTTP client could not be configured.
    #[display("could not build HTTP client")]
    Client,
    /// The request never produced a response (DNS, TLS, timeout, reset).
    #[display("request failed")]
    Request,
    /// The server answered with something other than 2xx.
    #[display("unexpected HTTP status {_0}")]
    Status(#[error(not(source))] u16),
    /// The downloaded body could not be written to the bundle.
    #[display("could not store asset")]
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request => true,
            Self::Status(status) => *status == 429 || *status >= 500,
            Self::Client | Self::Storage => false,
        }
    }
}
