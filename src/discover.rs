//! Finding the images a rendered page depends on.

use crate::consts::CSS_URL_REGEX;
use crate::fetch::is_data_uri;
use serde::Deserialize;
use sitesnap_browser::BrowserSession;
use std::collections::HashSet;
use tracing::instrument;

/// `src` attributes as written (possibly relative) and every computed
/// `background-image` that isn't `none`.
const DISCOVER_ASSETS: &str = r#"(() => {
    const images = Array.from(document.images, (img) => img.getAttribute('src')).filter((src) => !!src);
    const backgrounds = [];
    for (const element of Array.from(document.querySelectorAll('*'))) {
        const value = window.getComputedStyle(element).backgroundImage;
        if (value && value !== 'none') {
            backgrounds.push(value);
        }
    }
    return { images, backgrounds };
})()"#;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Discovered {
    images: Vec<String>,
    backgrounds: Vec<String>,
}

/// Asset URLs referenced by the loaded page, deduplicated in first-seen
/// order: image sources first, then background images. `data:` URIs are
/// excluded. URLs are returned as written and may be relative.
///
/// Never fails; a page that can't be inspected has no assets.
#[instrument(skip_all)]
pub async fn discover_assets(session: &dyn BrowserSession) -> Vec<String> {
    let value = match session.evaluate(DISCOVER_ASSETS).await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %*e, "Asset discovery failed; continuing without assets");
            return Vec::new();
        },
    };
    let discovered: Discovered = match serde_json::from_value(value) {
        Ok(discovered) => discovered,
        Err(e) => {
            tracing::warn!(error = %e, "Asset discovery returned an unexpected shape; continuing without assets");
            return Vec::new();
        },
    };
    let assets = collect(discovered);
    tracing::debug!(assets = assets.len(), "Assets discovered");
    assets
}

fn collect(discovered: Discovered) -> Vec<String> {
    let backgrounds = discovered.backgrounds.iter().flat_map(|value| background_urls(value)).collect::<Vec<_>>();
    let mut seen = HashSet::new();
    discovered
        .images
        .iter()
        .map(|src| src.trim())
        .chain(backgrounds)
        .filter(|url| !url.is_empty() && !is_data_uri(url))
        .filter(|url| seen.insert(*url))
        .map(str::to_string)
        .collect()
}

/// Every `url(...)` reference in a `background-image` value.
fn background_urls(value: &str) -> impl Iterator<Item = &str> {
    CSS_URL_REGEX.captures_iter(value).filter_map(|token| {
        token.get(1).or(token.get(2)).or(token.get(3)).map(|m| m.as_str().trim())
    })
}
