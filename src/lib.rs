//! Capture a live web page into a self-contained offline bundle.
//!
//! A run loads the page in a rendering session, collects its styles,
//! downloads the images it references, rewrites every reference to point at
//! the local copies and writes `index.html`, `styles.css` and `assets/` to
//! the output directory. See [`Replicator`].

mod bundle;
mod consts;
mod discover;
pub mod error;
pub mod fetch;
mod markup;
mod pipeline;
mod rewrite;
mod sanitize;
mod styles;
mod target;
#[cfg(test)]
mod testing;

pub use crate::bundle::{ASSET_DIR, Bundle, BundleWriter, INDEX_FILE, STYLESHEET_FILE};
pub use crate::discover::discover_assets;
#[cfg(feature = "cdp")]
pub use crate::pipeline::replicate;
pub use crate::pipeline::{Replicator, RunResult, Stage};
pub use crate::rewrite::{PLACEHOLDER_IMAGE, rewrite_markup, rewrite_stylesheet};
pub use crate::sanitize::sanitize;
pub use crate::styles::extract_styles;
pub use crate::target::{Target, normalize_url};
pub use sitesnap_browser as browser;
pub use sitesnap_config as config;
pub use sitesnap_storage as storage;
