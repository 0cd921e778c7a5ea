//! Lenient HTML parser built on quick-xml.
//!
//! quick-xml is an XML tokenizer, so a few HTML rules are applied on top:
//! void elements never take children, self-closing syntax is ignored on other
//! elements, end tags close the nearest matching open element (stray ones are
//! dropped), block elements close an open `<p>`, attributes may be unquoted or
//! valueless, `<script>`/`<style>` bodies are raw text and a `<` that cannot
//! start a tag is plain text.

#![allow(clippy::unused_self)] // Unit struct methods have &self for API consistency

use std::borrow::Cow;
use std::io::BufRead;
use std::sync::LazyLock;

use quick_xml::errors::IllFormedError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::{Captures, Regex};

use crate::entities::decode_reference;
use crate::error::ParseError;
use crate::tree::TreeNode;

/// HTML elements that never have content or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// HTML elements whose content is raw text.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Elements whose start tag closes an open `<p>`.
const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "article", "aside", "blockquote", "center", "dd", "details", "dialog", "dir", "div",
    "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hgroup", "hr", "li", "listing", "main", "menu", "nav", "ol", "p", "plaintext",
    "pre", "search", "section", "summary", "table", "ul", "xmp",
];

/// Elements that stop the search for an open `<p>` (button scope).
const PARAGRAPH_SCOPE_BOUNDARIES: &[&str] = &[
    "applet", "button", "caption", "html", "marquee", "object", "table", "td", "template", "th",
];

/// Sections passed to the tokenizer as they are: comments, CDATA and
/// raw-text elements (groups 1-3 for `script`, 4-6 for `style`).
static VERBATIM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let raw_text = |tag: &str| {
        format!(r#"(<{tag}\b(?:"[^"]*"|'[^']*'|[^'">])*>)(.*?)(</{tag}\s*>)"#)
    };
    Regex::new(&format!(
        r"(?is)<!--.*?-->|<!\[CDATA\[.*?\]\]>|{}|{}",
        raw_text("script"),
        raw_text("style")
    ))
    .expect("invalid verbatim section regex")
});

/// Character references inside attribute values.
static REFERENCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#?[A-Za-z0-9]+);").expect("invalid reference regex"));

/// Whether `tag` is an HTML void element.
pub(crate) fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

/// Whether `tag` holds raw (unescaped) text.
pub(crate) fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

/// Parse HTML into a [`TreeNode`] document.
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new parser.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse an HTML document or fragment.
    ///
    /// Tag names are lowercased. Comments and doctypes are kept as markup
    /// nodes; XML declarations and processing instructions are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the tokenizer rejects the input (for example an
    /// unterminated tag at the end of input).
    pub fn parse(&self, html: &str) -> Result<TreeNode, ParseError> {
        let prepared = prepare(html);
        let mut reader = Reader::from_str(&prepared);
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.allow_dangling_amp = true;

        let mut builder = TreeBuilder::default();
        let mut buf = Vec::new();

        loop {
            let event = match reader.read_event_into(&mut buf) {
                Ok(event) => event,
                // Unclosed elements at end of input are closed by the builder
                Err(quick_xml::Error::IllFormed(IllFormedError::MissingEndTag(_))) => break,
                Err(e) => return Err(e.into()),
            };
            match event {
                Event::Start(e) => {
                    let node = self.decode_element(&reader, &e)?;
                    builder.start(node);
                }
                Event::Empty(e) => {
                    let mut node = self.decode_element(&reader, &e)?;
                    // In `<a href=/x/>` the slash is part of the unquoted value
                    if ends_in_unquoted_value(&reader.decoder().decode(&e)?)
                        && let Some((_, value)) = node.attrs.last_mut()
                    {
                        value.push('/');
                    }
                    builder.start(node);
                }
                Event::End(e) => {
                    let tag = self.decode_name(&reader, e.name().as_ref())?;
                    builder.close(&tag);
                }
                Event::Text(e) => {
                    let text = reader.decoder().decode(&e)?;
                    builder.text(&text);
                }
                Event::GeneralRef(e) => {
                    let name = reader.decoder().decode(&e)?;
                    builder.text(&decode_reference(&name));
                }
                Event::CData(e) => {
                    builder.text(&String::from_utf8_lossy(&e));
                }
                Event::Comment(e) => {
                    let comment = reader.decoder().decode(&e)?;
                    builder.append(TreeNode::markup(format!("<!--{comment}-->")));
                }
                Event::DocType(e) => {
                    let doctype = reader.decoder().decode(&e)?;
                    builder.append(TreeNode::markup(format!("<!DOCTYPE {}>", doctype.trim())));
                }
                Event::Decl(_) | Event::PI(_) => {}
                Event::Eof => break,
            }
            buf.clear();
        }

        Ok(builder.finish())
    }

    fn decode_element<R: BufRead>(
        &self,
        reader: &Reader<R>,
        e: &BytesStart,
    ) -> Result<TreeNode, ParseError> {
        let mut node = TreeNode::new(self.decode_name(reader, e.name().as_ref())?);
        for attr in e.html_attributes().flatten() {
            let key = reader.decoder().decode(attr.key.as_ref())?.into_owned();
            let raw = reader.decoder().decode(&attr.value)?;
            node.attrs.push((key, unescape_references(&raw).into_owned()));
        }
        Ok(node)
    }

    fn decode_name<R: BufRead>(
        &self,
        reader: &Reader<R>,
        name: &[u8],
    ) -> Result<String, ParseError> {
        Ok(reader.decoder().decode(name)?.to_ascii_lowercase())
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Incremental tree construction with an explicit stack of open elements.
#[derive(Default)]
struct TreeBuilder {
    root: TreeNode,
    open: Vec<TreeNode>,
}

impl TreeBuilder {
    fn current(&mut self) -> &mut TreeNode {
        self.open.last_mut().unwrap_or(&mut self.root)
    }

    /// Handle a start tag. Void elements are appended, others opened.
    fn start(&mut self, node: TreeNode) {
        if CLOSES_PARAGRAPH.contains(&node.tag.as_str()) {
            self.close_paragraph();
        }
        if is_void_element(&node.tag) {
            self.append(node);
        } else {
            self.open.push(node);
        }
    }

    fn append(&mut self, node: TreeNode) {
        self.current().children.push(node);
    }

    fn text(&mut self, text: &str) {
        let node = self.current();
        if let Some(last_child) = node.children.last_mut() {
            last_child.tail.push_str(text);
        } else {
            node.text.push_str(text);
        }
    }

    /// Close the nearest open element named `tag`, implicitly closing any
    /// elements opened inside it. Unmatched end tags are ignored, except
    /// `</p>`, which yields an empty paragraph.
    fn close(&mut self, tag: &str) {
        if let Some(pos) = self.open.iter().rposition(|node| node.tag == tag) {
            self.close_to(pos);
        } else if tag == "p" {
            self.append(TreeNode::new("p"));
        }
    }

    /// Close an open `<p>` unless a scope boundary sits above it.
    fn close_paragraph(&mut self) {
        let found = self.open.iter().rposition(|node| {
            node.tag == "p" || PARAGRAPH_SCOPE_BOUNDARIES.contains(&node.tag.as_str())
        });
        if let Some(pos) = found
            && self.open[pos].tag == "p"
        {
            self.close_to(pos);
        }
    }

    fn close_to(&mut self, pos: usize) {
        while self.open.len() > pos {
            self.close_current();
        }
    }

    fn close_current(&mut self) {
        if let Some(node) = self.open.pop() {
            self.append(node);
        }
    }

    fn finish(mut self) -> TreeNode {
        self.close_to(0);
        self.root
    }
}

/// Rewrite `html` so the XML tokenizer reads it the way a browser would.
///
/// Comments and CDATA pass through. `<script>` and `<style>` bodies are
/// wrapped in CDATA so `<` and `&` survive. Everywhere else a `<` that cannot
/// start a tag is escaped.
fn prepare(html: &str) -> String {
    let mut out = String::with_capacity(html.len() + 64);
    let mut last = 0;
    for caps in VERBATIM_PATTERN.captures_iter(html) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        escape_stray_lt(&html[last..whole.start()], &mut out);
        let open = caps.get(1).or_else(|| caps.get(4));
        let body = caps.get(2).or_else(|| caps.get(5));
        let close = caps.get(3).or_else(|| caps.get(6));
        match (open, body, close) {
            (Some(open), Some(body), Some(close)) if !body.as_str().is_empty() => {
                let escaped = body.as_str().replace("]]>", "]]]]><![CDATA[>");
                out.push_str(open.as_str());
                out.push_str("<![CDATA[");
                out.push_str(&escaped);
                out.push_str("]]>");
                out.push_str(close.as_str());
            }
            _ => out.push_str(whole.as_str()),
        }
        last = whole.end();
    }
    escape_stray_lt(&html[last..], &mut out);
    out
}

/// Copy `text`, escaping every `<` not followed by a tag name, `/`, `!` or `?`.
fn escape_stray_lt(text: &str, out: &mut String) {
    for (i, ch) in text.char_indices() {
        let starts_tag = ch == '<'
            && text[i + 1..].starts_with(|next: char| {
                next.is_ascii_alphabetic() || matches!(next, '/' | '!' | '?')
            });
        if ch == '<' && !starts_tag {
            out.push_str("&lt;");
        } else {
            out.push(ch);
        }
    }
}

/// Whether a tag's content (name and attributes, without the final `/`) ends
/// inside an unquoted attribute value.
fn ends_in_unquoted_value(content: &str) -> bool {
    let mut quote = None;
    let mut after_eq = false;
    let mut unquoted = false;
    for ch in content.chars() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
        } else if unquoted {
            unquoted = !ch.is_whitespace();
        } else if after_eq {
            match ch {
                '"' | '\'' => {
                    quote = Some(ch);
                    after_eq = false;
                }
                c if c.is_whitespace() => {}
                _ => {
                    unquoted = true;
                    after_eq = false;
                }
            }
        } else {
            after_eq = ch == '=';
        }
    }
    unquoted
}

/// Decode character references in an attribute value.
fn unescape_references(value: &str) -> Cow<'_, str> {
    if !value.contains('&') {
        return Cow::Borrowed(value);
    }
    REFERENCE_PATTERN.replace_all(value, |caps: &Captures| decode_reference(&caps[1]))
}
