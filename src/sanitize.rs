//! Stripping active content from the final markup.
//!
//! Three passes run one after the other on the current markup. Each is
//! best-effort: a pass that fails leaves the markup as it found it, and the
//! next pass still runs.

use crate::consts::URL_NOISE_REGEX;
use crate::markup::{self, Attributes, NodeFilter};
use scraper::node::Element;
use std::borrow::Cow;
use tracing::instrument;

const SCRIPT_SCHEME: &str = "javascript:";
const INERT_HREF: &str = "#";

/// Drops `<script>` elements along with their bodies.
struct Scripts;
impl NodeFilter for Scripts {
    fn keep_element(&self, element: &Element) -> bool {
        !element.name().eq_ignore_ascii_case("script")
    }
}

/// Drops `on*` event handler attributes.
struct EventHandlers;
impl NodeFilter for EventHandlers {
    fn attributes<'a>(&self, element: &'a Element) -> Attributes<'a> {
        markup::attrs(element)
            .filter(|(name, _)| !name.local.get(..2).is_some_and(|prefix| prefix.eq_ignore_ascii_case("on")))
            .map(|(name, value)| (name, Cow::Borrowed(value)))
            .collect()
    }
}

/// Neutralizes `javascript:` links, `xlink:href` included.
struct ScriptLinks;
impl NodeFilter for ScriptLinks {
    fn attributes<'a>(&self, element: &'a Element) -> Attributes<'a> {
        markup::attrs(element)
            .map(|(name, value)| match &*name.local {
                "href" if is_script_url(value) => (name, Cow::Borrowed(INERT_HREF)),
                _ => (name, Cow::Borrowed(value)),
            })
            .collect()
    }
}

/// Whether a browser would run `value` as script when followed. Control
/// characters and whitespace anywhere in the value are ignored, as is case.
fn is_script_url(value: &str) -> bool {
    let compact = URL_NOISE_REGEX.replace_all(value, "");
    compact.get(..SCRIPT_SCHEME.len()).is_some_and(|scheme| scheme.eq_ignore_ascii_case(SCRIPT_SCHEME))
}

/// Remove scripts, event handlers and script links from `html`.
#[instrument(skip_all, fields(bytes = html.len()))]
pub fn sanitize(html: &str) -> String {
    let html = apply("scripts", html.to_string(), &Scripts);
    let html = apply("event handlers", html, &EventHandlers);
    apply("script links", html, &ScriptLinks)
}

fn apply(pass: &'static str, html: String, filter: &impl NodeFilter) -> String {
    match markup::rewrite(&html, filter) {
        Ok(sanitized) => {
            tracing::trace!(pass, before = html.len(), after = sanitized.len(), "Sanitizer pass applied");
            sanitized
        },
        Err(e) => {
            tracing::warn!(pass, error = %e, "Sanitizer pass failed; continuing with unsanitized markup");
            html
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use scraper::{Html, Selector};

    #[rstest]
    #[case("javascript:alert(1)", true)]
    #[case("JavaScript:void(0)", true)]
    #[case("  javascript:alert(1)", true)]
    #[case("java\tscript:alert(1)", true)]
    #[case("java\nscr\ript:alert(1)", true)]
    #[case("\u{1}javascript:x", true)]
    #[case("https://example.com/javascript:", false)]
    #[case("/docs/javascript", false)]
    #[case("#", false)]
    #[case("", false)]
    fn test_is_script_url(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(is_script_url(value), expected);
    }

    #[test]
    fn removes_scripts_with_their_bodies() {
        let html = r#"<html><head><script>if (a < b) { document.write("<p>x</p>"); }</script></head>
            <body><p>kept</p><script src="/app.js"></script><SCRIPT type="module">import "<x>";</SCRIPT></body></html>"#;
        let out = sanitize(html);
        assert!(!out.to_ascii_lowercase().contains("<script"));
        assert!(!out.contains("document.write"));
        assert!(!out.contains("import"));
        assert!(out.contains("<p>kept</p>"));
    }

    #[test]
    fn removes_event_handlers() {
        let html = r#"<body onload="boot()"><img onerror="steal()" src="a.png"><button ONCLICK="go()" type="button">b</button><p one="1">x</p></body>"#;
        let out = sanitize(html);
        assert!(out.contains(r#"<body>"#));
        assert!(out.contains(r#"<img src="a.png">"#));
        assert!(out.contains(r#"<button type="button">b</button>"#));
        // Attributes merely starting with the letters are still handlers.
        assert!(!out.contains("one="));
    }

    #[test]
    fn neutralizes_script_links() {
        let html = r#"<a href="javascript:alert(1)">a</a><a href=" JaVa&#x09;ScRiPt:alert(1)">b</a><a href="/ok">c</a>"#;
        let out = sanitize(html);
        assert!(out.contains(r##"<a href="#">a</a>"##));
        assert!(out.contains(r##"<a href="#">b</a>"##));
        assert!(out.contains(r#"<a href="/ok">c</a>"#));
    }

    #[test]
    fn sanitized_markup_has_no_active_content() {
        let html = r#"<!DOCTYPE html><html><head><script>1</script></head><body onload="x()">
            <div onmouseover="y()"><a href="javascript:z()" onclick="w()">link</a></div>
            <svg><script>evil()</script><a xlink:href="javascript:svg()"><text>t</text></a></svg>
            <noscript><script>n()</script><img onerror="e()" src="a.png"></noscript></body></html>"#;
        let sanitized = sanitize(html);
        assert!(sanitized.contains(r#"<noscript><img src="a.png"></noscript>"#), "{sanitized}");
        let document = Html::parse_document(&sanitized);
        let scripts = Selector::parse("script").unwrap();
        assert_eq!(document.select(&scripts).count(), 0);
        let everything = Selector::parse("*").unwrap();
        for element in document.select(&everything) {
            for (name, value) in element.value().attrs() {
                assert!(!name.to_ascii_lowercase().starts_with("on"), "handler {name} survived");
                if name == "href" {
                    assert!(!is_script_url(value), "script link {value} survived");
                }
            }
        }
    }
}
