//! HTML serializer for [`TreeNode`] documents.

#![allow(clippy::unused_self)] // Unit struct methods have &self for API consistency

use std::fmt::Write;

use crate::parser::{is_raw_text_element, is_void_element};
use crate::tree::{NodeKind, TreeNode};

/// Serialize a [`TreeNode`] document back to HTML.
pub struct HtmlSerializer;

impl HtmlSerializer {
    /// Create a new serializer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Serialize a document to an HTML string.
    ///
    /// The root itself has no tag; its text and children are written in order.
    pub fn serialize(&self, document: &TreeNode) -> String {
        let mut out = String::with_capacity(4096);
        out.push_str(&escape_html(&document.text));
        for child in &document.children {
            serialize_node(child, &mut out);
        }
        out
    }
}

impl Default for HtmlSerializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize a single node recursively.
fn serialize_node(node: &TreeNode, out: &mut String) {
    match &node.kind {
        NodeKind::Markup(html) => out.push_str(html),
        NodeKind::Element => {
            out.push('<');
            out.push_str(&node.tag);
            for (key, value) in &node.attrs {
                write!(out, r#" {}="{}""#, key, escape_attr(value)).unwrap();
            }
            out.push('>');

            let is_void = is_void_element(&node.tag);
            if !(is_void && node.text.is_empty() && node.children.is_empty()) {
                if is_raw_text_element(&node.tag) {
                    out.push_str(&node.text);
                } else {
                    out.push_str(&escape_html(&node.text));
                }
                for child in &node.children {
                    serialize_node(child, out);
                }
                write!(out, "</{}>", node.tag).unwrap();
            }
        }
    }

    out.push_str(&escape_html(&node.tail));
}

/// Escape text content for HTML.
#[must_use]
pub fn escape_html(text: &str) -> String {
    escape(text, false)
}

/// Escape an attribute value, including double quotes.
pub(crate) fn escape_attr(text: &str) -> String {
    escape(text, true)
}

fn escape(text: &str, escape_quotes: bool) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' if escape_quotes => result.push_str("&quot;"),
            _ => result.push(ch),
        }
    }
    result
}
