//! Owned HTML document tree.
//!
//! [`TreeNode`] follows the element/text/tail layout: an element owns the text
//! before its first child, and each child owns the text that follows it inside
//! the parent. Replacing a child therefore only has to carry its tail over to
//! keep the surrounding text in place.

/// Kind of a tree node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NodeKind {
    /// Regular element with tag, attributes and children.
    #[default]
    Element,
    /// Verbatim markup emitted as-is (comments, doctypes, rendered fragments).
    Markup(String),
}

/// Node in a parsed HTML tree.
///
/// The document root is an element with an empty tag; only its text and
/// children are serialized.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TreeNode {
    /// Node kind.
    pub kind: NodeKind,
    /// Element tag name (lowercase for parsed documents, empty for the root).
    pub tag: String,
    /// Attributes in source order.
    pub attrs: Vec<(String, String)>,
    /// Text before the first child.
    pub text: String,
    /// Text after this node, inside the parent.
    pub tail: String,
    /// Child nodes.
    pub children: Vec<TreeNode>,
}

/// Handle to an element: child indices leading from the root to the node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    /// Child indices from the root.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

/// Tags of the elements enclosing a node, outermost first.
#[derive(Debug, Clone, Copy)]
pub struct Ancestors<'a>(&'a [&'a str]);

impl Ancestors<'_> {
    /// Whether any enclosing element has the given tag (`Element.closest`).
    #[must_use]
    pub fn closest(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Number of enclosing elements, not counting the document root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl TreeNode {
    /// Create a new element with the given tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Create an empty document root.
    #[must_use]
    pub fn document() -> Self {
        Self::default()
    }

    /// Create a verbatim markup node.
    #[must_use]
    pub fn markup(html: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Markup(html.into()),
            ..Default::default()
        }
    }

    /// Set text content.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set tail content.
    #[must_use]
    pub fn with_tail(mut self, tail: impl Into<String>) -> Self {
        self.tail = tail.into();
        self
    }

    /// Append an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Set children.
    #[must_use]
    pub fn with_children(mut self, children: Vec<TreeNode>) -> Self {
        self.children = children;
        self
    }

    /// Whether this node is an element (not verbatim markup).
    #[must_use]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Whether this node is an element with the given tag (ASCII case-insensitive).
    #[must_use]
    pub fn is_tag(&self, tag: &str) -> bool {
        self.is_element() && self.tag.eq_ignore_ascii_case(tag)
    }

    /// Value of the first attribute with the given name (ASCII case-insensitive).
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Concatenated text of this node and all descendants (`Node.textContent`).
    ///
    /// The node's own tail is not included; markup nodes contribute only
    /// their tails.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if self.is_element() {
            out.push_str(&self.text);
            for child in &self.children {
                child.collect_text(out);
                out.push_str(&child.tail);
            }
        }
    }

    /// Find all elements matching `predicate`, in document order.
    ///
    /// The predicate receives each element together with the tags of its
    /// ancestors. The root itself is never matched. The returned paths are a
    /// snapshot; mutating the tree may invalidate them.
    pub fn find_elements<F>(&self, mut predicate: F) -> Vec<NodePath>
    where
        F: FnMut(&TreeNode, Ancestors<'_>) -> bool,
    {
        let mut found = Vec::new();
        let mut path = Vec::new();
        let mut ancestors = Vec::new();
        collect_matches(self, &mut predicate, &mut path, &mut ancestors, &mut found);
        found
    }

    /// Node at `path`, if it exists.
    #[must_use]
    pub fn node(&self, path: &NodePath) -> Option<&TreeNode> {
        path.0
            .iter()
            .try_fold(self, |node, &index| node.children.get(index))
    }

    /// Mutable node at `path`, if it exists.
    pub fn node_mut(&mut self, path: &NodePath) -> Option<&mut TreeNode> {
        path.0
            .iter()
            .try_fold(self, |node, &index| node.children.get_mut(index))
    }

    /// Replace the node at `path` with verbatim markup (`Element.outerHTML = html`).
    ///
    /// The replaced node's tail is kept, so following text stays where it was.
    /// Sibling indices do not change. Returns `false` if the path does not
    /// resolve to a child node.
    pub fn replace_with_markup(&mut self, path: &NodePath, html: impl Into<String>) -> bool {
        let Some((&index, parent_path)) = path.0.split_last() else {
            return false;
        };
        let parent = NodePath(parent_path.to_vec());
        let Some(slot) = self
            .node_mut(&parent)
            .and_then(|parent| parent.children.get_mut(index))
        else {
            return false;
        };
        let tail = std::mem::take(&mut slot.tail);
        *slot = TreeNode::markup(html).with_tail(tail);
        true
    }

    /// Number of verbatim markup nodes in the subtree.
    #[must_use]
    pub fn markup_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| usize::from(!child.is_element()) + child.markup_count())
            .sum()
    }
}

fn collect_matches<'a, F>(
    node: &'a TreeNode,
    predicate: &mut F,
    path: &mut Vec<usize>,
    ancestors: &mut Vec<&'a str>,
    found: &mut Vec<NodePath>,
) where
    F: FnMut(&TreeNode, Ancestors<'_>) -> bool,
{
    for (index, child) in node.children.iter().enumerate() {
        if !child.is_element() {
            continue;
        }
        path.push(index);
        if predicate(child, Ancestors(ancestors.as_slice())) {
            found.push(NodePath(path.clone()));
        }
        ancestors.push(&child.tag);
        collect_matches(child, predicate, path, ancestors, found);
        ancestors.pop();
        path.pop();
    }
}
