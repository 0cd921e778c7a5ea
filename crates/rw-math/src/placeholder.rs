//! Math placeholder recognition.
//!
//! Two placeholder forms are recognized:
//!
//! - Inline: `<a href="/$/">x^2</a>`, whose text content is the math source
//! - Script: `<script type="math/tex">E=mc^2</script>`, whose payload is the
//!   math source and whose context decides the display mode

use std::fmt;

use crate::consts::{DEFAULT_INLINE_HREF, DEFAULT_SCRIPT_TYPE, PARAGRAPH_TAG};
use crate::tree::{Ancestors, TreeNode};

/// Placeholder form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    /// Link-like inline placeholder.
    Inline,
    /// Script-tagged placeholder.
    Script,
}

impl fmt::Display for PlaceholderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline => f.write_str("inline"),
            Self::Script => f.write_str("script"),
        }
    }
}

/// Markers identifying placeholder elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    /// Exact `href` value of inline placeholders.
    pub inline_href: String,
    /// Exact `type` value of script placeholders (ASCII case-insensitive).
    pub script_type: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            inline_href: DEFAULT_INLINE_HREF.to_owned(),
            script_type: DEFAULT_SCRIPT_TYPE.to_owned(),
        }
    }
}

impl Markers {
    /// Whether `node` is an inline placeholder.
    #[must_use]
    pub fn is_inline(&self, node: &TreeNode) -> bool {
        node.is_tag("a") && node.attr("href") == Some(self.inline_href.as_str())
    }

    /// Whether `node` is a script placeholder.
    #[must_use]
    pub fn is_script(&self, node: &TreeNode) -> bool {
        node.is_tag("script")
            && node
                .attr("type")
                .is_some_and(|value| value.eq_ignore_ascii_case(&self.script_type))
    }
}

/// Display mode for a script placeholder: display unless inside a paragraph.
#[must_use]
pub fn script_display_mode(ancestors: Ancestors<'_>) -> bool {
    !ancestors.closest(PARAGRAPH_TAG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::HtmlParser;

    fn script(type_attr: &str) -> TreeNode {
        TreeNode::new("script").with_attr("type", type_attr).with_text("x")
    }

    #[test]
    fn test_inline_exact_href() {
        let markers = Markers::default();

        assert!(markers.is_inline(&TreeNode::new("a").with_attr("href", "/$/")));
        assert!(!markers.is_inline(&TreeNode::new("a").with_attr("href", "/$")));
        assert!(!markers.is_inline(&TreeNode::new("a").with_attr("href", "/other")));
        assert!(!markers.is_inline(&TreeNode::new("a")));
        assert!(!markers.is_inline(&TreeNode::new("span").with_attr("href", "/$/")));
    }

    #[test]
    fn test_script_type_matching() {
        let markers = Markers::default();

        assert!(markers.is_script(&script("math/tex")));
        assert!(markers.is_script(&script("Math/TeX")));
        assert!(!markers.is_script(&script("math/tex; mode=display")));
        assert!(!markers.is_script(&script(" math/tex")));
        assert!(!markers.is_script(&script("text/javascript")));
        assert!(!markers.is_script(&TreeNode::new("script")));
        assert!(!markers.is_script(&TreeNode::new("div").with_attr("type", "math/tex")));
    }

    #[test]
    fn test_custom_markers() {
        let markers = Markers {
            inline_href: "#math".to_owned(),
            script_type: "text/x-latex".to_owned(),
        };

        assert!(markers.is_inline(&TreeNode::new("a").with_attr("href", "#math")));
        assert!(!markers.is_inline(&TreeNode::new("a").with_attr("href", "/$/")));
        assert!(markers.is_script(&script("text/x-latex")));
        assert!(!markers.is_script(&script("math/tex")));
    }

    #[test]
    fn test_display_mode_from_context() {
        let markers = Markers::default();
        let doc = HtmlParser::new()
            .parse(
                r#"<div><script type="math/tex">a</script></div>
                   <p>x <script type="math/tex">b</script></p>
                   <p><span><script type="math/tex">c</script></span></p>
                   <p>y<div><script type="math/tex">d</script></div>"#,
            )
            .unwrap();

        let display = doc.find_elements(|node, ancestors| {
            markers.is_script(node) && script_display_mode(ancestors)
        });
        let inline = doc.find_elements(|node, ancestors| {
            markers.is_script(node) && !script_display_mode(ancestors)
        });

        let texts = |paths: &[crate::tree::NodePath]| -> Vec<String> {
            paths.iter().map(|p| doc.node(p).unwrap().text.clone()).collect()
        };
        assert_eq!(texts(&display), vec!["a", "d"]);
        assert_eq!(texts(&inline), vec!["b", "c"]);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(PlaceholderKind::Inline.to_string(), "inline");
        assert_eq!(PlaceholderKind::Script.to_string(), "script");
    }
}
