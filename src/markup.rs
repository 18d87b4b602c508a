//! Parse-filter-serialize for HTML documents.
//!
//! `scraper` parses into an immutable tree, so instead of editing nodes in
//! place every rewrite is expressed as a [`NodeFilter`] consulted while the
//! tree is written back out. Serialization follows the HTML fragment
//! serialization rules: void elements have no end tag, text inside raw text
//! elements is written verbatim, everything else is escaped.
//!
//! Documents are parsed with scripting disabled, the way a browser with
//! JavaScript off sees them: `<noscript>` content is markup, not text.

use html5ever::QualName;
use html5ever::driver::{ParseOpts, parse_document};
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use scraper::node::Element;
use scraper::{ElementRef, Html, HtmlTreeSink, Node};
use std::borrow::Cow;
use std::fmt::{self, Write};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input", "keygen", "link",
    "meta", "param", "source", "track", "wbr",
];
const RAW_TEXT_ELEMENTS: &[&str] =
    &["style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext"];

/// Attributes to write, by qualified name.
pub(crate) type Attributes<'a> = Vec<(&'a QualName, Cow<'a, str>)>;

/// Every attribute of `element`, as parsed.
pub(crate) fn attrs(element: &Element) -> impl Iterator<Item = (&QualName, &str)> {
    element.attrs.iter().map(|(name, value)| (name, &**value))
}

/// Decides what of a parsed document survives serialization.
pub(crate) trait NodeFilter {
    /// Whether `element`, along with its whole subtree, is written at all.
    fn keep_element(&self, _element: &Element) -> bool {
        true
    }

    /// Attributes written for `element`, in order.
    fn attributes<'a>(&self, element: &'a Element) -> Attributes<'a> {
        attrs(element).map(|(name, value)| (name, Cow::Borrowed(value))).collect()
    }

    /// Text content of a raw text element such as `<style>`.
    fn raw_text<'a>(&self, _parent: &Element, text: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(text)
    }
}

/// Writes the document back out unchanged.
#[cfg(test)]
pub(crate) struct Identity;
#[cfg(test)]
impl NodeFilter for Identity {}

/// Parse `markup` as a document and serialize it through `filter`.
pub(crate) fn rewrite(markup: &str, filter: &impl NodeFilter) -> Result<String, fmt::Error> {
    let document = parse(markup);
    let mut out = String::with_capacity(markup.len());
    for child in document.tree.root().children() {
        match child.value() {
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    write_element(&mut out, element, filter)?;
                }
            },
            other => write_leaf(&mut out, other)?,
        }
    }
    Ok(out)
}

fn parse(markup: &str) -> Html {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts { scripting_enabled: false, ..TreeBuilderOpts::default() },
        ..ParseOpts::default()
    };
    parse_document(HtmlTreeSink::new(Html::new_document()), opts).one(markup)
}

fn write_element(out: &mut impl Write, element: ElementRef<'_>, filter: &impl NodeFilter) -> fmt::Result {
    let value = element.value();
    if !filter.keep_element(value) {
        return Ok(());
    }
    let name = value.name();
    write!(out, "<{name}")?;
    for (attr, attr_value) in filter.attributes(value) {
        match &attr.prefix {
            Some(prefix) => write!(out, " {prefix}:{}=\"", attr.local)?,
            None => write!(out, " {}=\"", attr.local)?,
        }
        escape(out, &attr_value, true)?;
        out.write_char('"')?;
    }
    out.write_char('>')?;
    if VOID_ELEMENTS.contains(&name) {
        return Ok(());
    }
    let raw = RAW_TEXT_ELEMENTS.contains(&name);
    for child in element.children() {
        match child.value() {
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    write_element(out, child, filter)?;
                }
            },
            Node::Text(text) if raw => out.write_str(&filter.raw_text(value, text))?,
            other => write_leaf(out, other)?,
        }
    }
    write!(out, "</{name}>")
}

fn write_leaf(out: &mut impl Write, node: &Node) -> fmt::Result {
    match node {
        Node::Doctype(doctype) => write!(out, "<!DOCTYPE {}>", doctype.name()),
        Node::Comment(comment) => write!(out, "<!--{}-->", &**comment),
        Node::Text(text) => escape(out, text, false),
        Node::ProcessingInstruction(pi) => write!(out, "<?{} {}>", pi.target, pi.data),
        Node::Document | Node::Fragment | Node::Element(_) => Ok(()),
    }
}

fn escape(out: &mut impl Write, text: &str, attribute: bool) -> fmt::Result {
    let mut last = 0;
    for (i, c) in text.char_indices() {
        let replacement = match c {
            '&' => "&amp;",
            '\u{a0}' => "&nbsp;",
            '"' if attribute => "&quot;",
            '<' if !attribute => "&lt;",
            '>' if !attribute => "&gt;",
            _ => continue,
        };
        out.write_str(&text[last..i])?;
        out.write_str(replacement)?;
        last = i + c.len_utf8();
    }
    out.write_str(&text[last..])
}
