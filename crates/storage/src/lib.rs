//! Where a snapshot bundle ends up: a directory on disk, or memory in tests.

pub mod backend;
pub mod error;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::path::validate as validate_path;
