use crate::consts::{BACKGROUND_PROPERTY_REGEX, CSS_URL_REGEX};
use crate::fetch::AssetIndex;
use crate::rewrite::{Resolution, resolve};
use regex::Captures;
use std::borrow::Cow;
use tracing::instrument;
use url::Url;

/// Rewrite `url(...)` references inside `background` and `background-image`
/// declarations. References that aren't available locally become `none`.
#[instrument(skip_all, fields(bytes = css.len()))]
pub fn rewrite_stylesheet(css: &str, base: &Url, index: &AssetIndex) -> String {
    rewrite_declarations(css, base, index).into_owned()
}

/// Same as [`rewrite_stylesheet`], borrowing when nothing changes. Also used
/// for inline `style` attributes and `<style>` elements.
pub(crate) fn rewrite_declarations<'a>(css: &'a str, base: &Url, index: &AssetIndex) -> Cow<'a, str> {
    let mut out = String::new();
    // Everything before `copied` is already in `out`; everything before
    // `scanned` has been looked at.
    let mut copied = 0;
    let mut scanned = 0;
    for property in BACKGROUND_PROPERTY_REGEX.find_iter(css) {
        if property.start() < scanned {
            continue;
        }
        let end = value_end(css, property.end());
        scanned = end;
        if let Cow::Owned(value) = rewrite_urls(&css[property.end()..end], base, index) {
            out.push_str(&css[copied..property.end()]);
            out.push_str(&value);
            copied = end;
        }
    }
    if copied == 0 {
        return Cow::Borrowed(css);
    }
    out.push_str(&css[copied..]);
    Cow::Owned(out)
}

fn rewrite_urls<'a>(value: &'a str, base: &Url, index: &AssetIndex) -> Cow<'a, str> {
    CSS_URL_REGEX.replace_all(value, |token: &Captures| {
        let reference = token.get(1).or(token.get(2)).or(token.get(3)).map_or("", |m| m.as_str());
        match resolve(reference, base, index) {
            Resolution::Keep => token[0].to_string(),
            Resolution::Local(path) => format!("url(\"{path}\")"),
            Resolution::Missing => "none".to_string(),
        }
    })
}

/// Byte offset where the declaration value starting at `start` ends: the
/// first `;` or `}` outside quotes and parentheses, or the end of input.
fn value_end(css: &str, start: usize) -> usize {
    let bytes = css.as_bytes();
    let mut quote = None;
    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        match (quote, bytes[i]) {
            (Some(_), b'\\') => i += 1,
            (Some(q), b) if b == q => quote = None,
            (Some(_), _) => {},
            (None, b @ (b'"' | b'\'')) => quote = Some(b),
            (None, b'(') => depth += 1,
            (None, b')') => depth = depth.saturating_sub(1),
            (None, b';' | b'}') if depth == 0 => return i,
            (None, _) => {},
        }
        i += 1;
    }
    bytes.len()
}
