//! Pointing asset references at the bundle's local copies.
//!
//! Two passes share one resolution rule: a reference is resolved against the
//! page URL and looked up in the run's [`AssetIndex`]. Downloaded assets are
//! referenced as `./assets/<name>`; anything else is replaced by a
//! placeholder so the bundle never points back at the original site.
//! Inline `data:` URIs, fragment-only references and paths that are already
//! relative (`./`, `../`) are left alone.

mod css;
mod html;

pub use self::css::rewrite_stylesheet;
pub use self::html::rewrite_markup;
use crate::bundle::ASSET_DIR;
use crate::fetch::{AssetIndex, is_data_uri};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::LazyLock;
use url::Url;

const PLACEHOLDER_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="1" height="1" viewBox="0 0 1 1"/>"#;

/// A transparent 1×1 image, inline, for images that couldn't be downloaded.
pub static PLACEHOLDER_IMAGE: LazyLock<String> =
    LazyLock::new(|| format!("data:image/svg+xml;base64,{}", STANDARD.encode(PLACEHOLDER_SVG)));

#[derive(Debug, PartialEq, Eq)]
enum Resolution {
    /// Leave the reference as written.
    Keep,
    /// Bundle-relative path of the downloaded copy.
    Local(String),
    /// Not available locally.
    Missing,
}

fn resolve(reference: &str, base: &Url, index: &AssetIndex) -> Resolution {
    let reference = reference.trim();
    if is_data_uri(reference) || reference.starts_with('#') || reference.starts_with("./") || reference.starts_with("../")
    {
        return Resolution::Keep;
    }
    match base.join(reference).ok().as_ref().and_then(|url| index.local_name(url)) {
        Some(name) => Resolution::Local(format!("./{ASSET_DIR}/{name}")),
        None => Resolution::Missing,
    }
}
