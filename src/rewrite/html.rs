use crate::fetch::AssetIndex;
use crate::markup::{self, Attributes, NodeFilter};
use crate::rewrite::css::rewrite_declarations;
use crate::rewrite::{PLACEHOLDER_IMAGE, Resolution, resolve};
use scraper::node::Element;
use std::borrow::Cow;
use tracing::instrument;
use url::Url;

struct AssetReferences<'a> {
    base: &'a Url,
    index: &'a AssetIndex,
}
impl NodeFilter for AssetReferences<'_> {
    fn attributes<'a>(&self, element: &'a Element) -> Attributes<'a> {
        let mut src = match element.name() {
            "img" => element.attr("src").map(|src| resolve(src, self.base, self.index)),
            _ => None,
        };
        // Responsive candidates would keep pointing at the original site.
        let drop_candidates = matches!(&src, Some(Resolution::Local(_) | Resolution::Missing));
        let mut attributes = Vec::new();
        for (name, value) in markup::attrs(element) {
            let value = match &*name.local {
                "src" => match src.take() {
                    Some(Resolution::Local(path)) => Cow::Owned(path),
                    Some(Resolution::Missing) => Cow::Borrowed(PLACEHOLDER_IMAGE.as_str()),
                    Some(Resolution::Keep) | None => Cow::Borrowed(value),
                },
                "srcset" | "sizes" if drop_candidates => continue,
                "style" => rewrite_declarations(value, self.base, self.index),
                _ => Cow::Borrowed(value),
            };
            attributes.push((name, value));
        }
        attributes
    }

    fn raw_text<'a>(&self, parent: &Element, text: &'a str) -> Cow<'a, str> {
        match parent.name() {
            "style" => rewrite_declarations(text, self.base, self.index),
            _ => Cow::Borrowed(text),
        }
    }
}

/// Rewrite `<img src>` references, inline `style` attributes and `<style>`
/// elements in `html`. On failure the markup is returned as it was.
#[instrument(skip_all, fields(bytes = html.len(), assets = index.len()))]
pub fn rewrite_markup(html: &str, base: &Url, index: &AssetIndex) -> String {
    match markup::rewrite(html, &AssetReferences { base, index }) {
        Ok(rewritten) => rewritten,
        Err(e) => {
            tracing::warn!(error = %e, "Markup rewrite failed; keeping original references");
            html.to_string()
        },
    }
}
