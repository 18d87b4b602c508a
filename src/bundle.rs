//! Persisting the final bundle.
//!
//! Layout under the output directory:
//!
//! ```text
//! index.html
//! styles.css
//! assets/<downloaded files>
//! ```
//!
//! Markup and stylesheet are written to `*.partial` siblings first and renamed
//! into place, so a failed run never leaves a half-written `index.html`.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sitesnap_storage::StorageBackend;
use std::path::{Path, PathBuf};
use tracing::instrument;

pub const ASSET_DIR: &str = "assets";
pub const INDEX_FILE: &str = "index.html";
pub const STYLESHEET_FILE: &str = "styles.css";
const PARTIAL_SUFFIX: &str = ".partial";
const STYLESHEET_LINK: &str = r#"<link rel="stylesheet" href="styles.css">"#;

/// The rewritten page, ready to be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub html: String,
    pub css: String,
}

pub struct BundleWriter<'a> {
    backend: &'a dyn StorageBackend,
    /// Only used to describe failures.
    output_dir: &'a Path,
}
impl<'a> BundleWriter<'a> {
    pub fn new(backend: &'a dyn StorageBackend, output_dir: &'a Path) -> Self {
        Self { backend, output_dir }
    }

    /// Make sure the output directory and its `assets/` subdirectory exist.
    pub async fn prepare(&self) -> Result<()> {
        self.backend.create_dir(Path::new(ASSET_DIR)).await.or_raise(|| self.failed())
    }

    /// Write `bundle` over whatever the output directory held before.
    ///
    /// Returns the markup as written, stylesheet link included.
    #[instrument(skip_all, fields(backend = self.backend.name(), html = bundle.html.len(), css = bundle.css.len()))]
    pub async fn write(&self, bundle: &Bundle) -> Result<String> {
        self.prepare().await?;
        let html = link_stylesheet(&bundle.html);
        self.write_atomic(INDEX_FILE, html.as_bytes()).await?;
        self.write_atomic(STYLESHEET_FILE, bundle.css.as_bytes()).await?;
        tracing::debug!("Bundle written");
        Ok(html)
    }

    async fn write_atomic(&self, name: &str, data: &[u8]) -> Result<()> {
        let partial = PathBuf::from(format!("{name}{PARTIAL_SUFFIX}"));
        self.backend.write(&partial, data).await.or_raise(|| self.failed())?;
        self.backend.rename(&partial, Path::new(name)).await.or_raise(|| self.failed())
    }

    fn failed(&self) -> ErrorKind {
        ErrorKind::Persist(self.output_dir.to_path_buf())
    }
}

/// Insert the stylesheet link right before `</head`, matched without regard
/// to case. Markup without a closing head tag is returned unchanged.
fn link_stylesheet(html: &str) -> String {
    const NEEDLE: &[u8] = b"</head";
    let position = html.as_bytes().windows(NEEDLE.len()).position(|w| w.eq_ignore_ascii_case(NEEDLE));
    match position {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + STYLESHEET_LINK.len());
            out.push_str(&html[..pos]);
            out.push_str(STYLESHEET_LINK);
            out.push_str(&html[pos..]);
            tracing::debug!(position = pos, "Stylesheet link injected");
            out
        },
        None => {
            tracing::warn!("Stylesheet link not injected; closing head tag not found");
            html.to_string()
        },
    }
}
