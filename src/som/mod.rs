//! Structured Object Model: a parsed markup tree annotated with exact byte
//! spans into the original source buffer.
//!
//! The SOM never re-serializes markup. Every extraction is a literal slice of
//! the source text, and every rewrite goes through [`crate::splice::Splice`]
//! against the recorded spans, so untouched formatting survives byte-for-byte.

pub mod parser;

use indexmap::IndexMap;

/// Handle into the node arena. Integer handles instead of parent/child
/// pointers keep the tree free of aliasing hazards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A markup element with a tag name and an insertion-ordered attribute
    /// table (duplicates dropped at parse time).
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    /// Text, comment, or doctype fragment. Present in the arena so inner
    /// content can be located, but invisible to selectors and keyless.
    Text,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Span [byte_start, byte_end) into the owning source buffer. A node's
    /// span always fully contains every descendant's span.
    pub byte_start: usize,
    pub byte_end: usize,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Per-build document-order sequence number, used only to keep
    /// synthesized keys unique for structurally identical siblings.
    pub(crate) seq: u32,
}

/// A parsed document: the source buffer, the node arena, and a
/// document-ordered key index over the element nodes.
#[derive(Debug, Clone)]
pub struct Som {
    source: String,
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    keys: IndexMap<String, NodeId>,
}

impl Som {
    /// Parse `text` into a SOM. Never fails: malformed markup degrades to
    /// text fragments or auto-closed elements.
    ///
    /// The sequence counter resets per build, so building twice from the same
    /// text yields identical keys.
    pub fn build(text: impl Into<String>) -> Self {
        let source = text.into();
        let parsed = parser::parse(&source);

        let mut som = Som {
            source,
            nodes: parsed.nodes,
            roots: parsed.roots,
            keys: IndexMap::new(),
        };

        let mut seq = 0u32;
        let mut stack: Vec<NodeId> = som.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if let NodeKind::Element { tag, attrs } = &som.nodes[id.index()].kind {
                let key = synthesize_key(tag, attrs, seq);
                som.nodes[id.index()].seq = seq;
                som.keys.insert(key, id);
                seq += 1;
            }
            stack.extend(som.nodes[id.index()].children.iter().rev());
        }

        som
    }

    /// The original source buffer, untouched.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Top-level nodes in document order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    /// Synthesized keys of all element nodes, in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<NodeId> {
        self.keys.get(key).copied()
    }

    /// Element tag name, or `None` for text fragments.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.index()].kind {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            NodeKind::Text => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id.index()].kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            NodeKind::Text => None,
        }
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// The node's literal source text, byte-identical to the substring
    /// delimited by its recorded span.
    pub fn node_html(&self, id: NodeId) -> &str {
        let node = &self.nodes[id.index()];
        &self.source[node.byte_start..node.byte_end]
    }

    /// The literal source text between a node's first child's start and its
    /// last child's terminal offset. A node with no children yields `""`.
    pub fn node_inner_html(&self, id: NodeId) -> &str {
        let children = &self.nodes[id.index()].children;
        let (Some(&first), Some(&last)) = (children.first(), children.last()) else {
            return "";
        };
        let start = self.nodes[first.index()].byte_start;
        let end = self.terminal_end(last);
        &self.source[start..end]
    }

    /// Deepest end offset reachable through the last-child chain.
    fn terminal_end(&self, id: NodeId) -> usize {
        let node = &self.nodes[id.index()];
        match node.children.last() {
            Some(&last) => node.byte_end.max(self.terminal_end(last)),
            None => node.byte_end,
        }
    }

    /// Walk from a node up to the document root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            som: self,
            next: self.nodes[id.index()].parent,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

pub struct Ancestors<'a> {
    som: &'a Som,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.som.nodes[current.index()].parent;
        Some(current)
    }
}

fn synthesize_key(tag: &str, attrs: &[(String, String)], seq: u32) -> String {
    let mut key = String::from(tag);
    for (name, value) in attrs {
        key.push(' ');
        key.push_str(name);
        if !value.is_empty() {
            key.push_str("=\"");
            key.push_str(value);
            key.push('"');
        }
    }
    key.push_str(&format!(" N<{seq}>"));
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_unique_for_identical_siblings() {
        let som = Som::build("<div class=\"a\"></div><div class=\"a\"></div>");
        let keys: Vec<_> = som.keys().collect();
        assert_eq!(keys.len(), 2);
        assert_ne!(keys[0], keys[1]);
        assert!(keys[0].starts_with("div class=\"a\" N<"));
    }

    #[test]
    fn rebuilding_yields_identical_keys() {
        let src = "<div><p>a</p><p>a</p></div><span id=\"s\">b</span>";
        let a: Vec<String> = Som::build(src).keys().map(String::from).collect();
        let b: Vec<String> = Som::build(src).keys().map(String::from).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn node_html_round_trips() {
        let src = "  <div attr=\"v\"> <b>x</b> </div>  ";
        let som = Som::build(src);
        let key = som.keys().next().unwrap().to_string();
        let div = som.get(&key).unwrap();
        let node = som.node(div);
        assert_eq!(som.node_html(div), &src[node.byte_start..node.byte_end]);
        assert_eq!(som.node_html(div), "<div attr=\"v\"> <b>x</b> </div>");
    }

    #[test]
    fn inner_html_spans_first_to_last_child() {
        let som = Som::build("<div>lead<b>x</b><i>y</i>tail</div>");
        let div = som.roots()[0];
        assert_eq!(som.node_inner_html(div), "lead<b>x</b><i>y</i>tail");
    }

    #[test]
    fn inner_html_of_childless_node_is_empty() {
        let som = Som::build("<div></div>");
        assert_eq!(som.node_inner_html(som.roots()[0]), "");
    }

    #[test]
    fn inner_html_with_nested_last_child() {
        let som = Som::build("<div><p><b>deep</b></p></div>");
        let div = som.roots()[0];
        assert_eq!(som.node_inner_html(div), "<p><b>deep</b></p>");
    }

    #[test]
    fn parent_span_contains_children() {
        let som = Som::build("<a><b><c>x</c></b>y</a>");
        for id in (0..som.len()).map(|i| NodeId(i as u32)) {
            let node = som.node(id);
            for &child in som.children(id) {
                let c = som.node(child);
                assert!(node.byte_start <= c.byte_start && c.byte_end <= node.byte_end);
            }
        }
    }

    #[test]
    fn ancestors_walk_to_root() {
        let som = Som::build("<a><b><c>x</c></b></a>");
        let a = som.roots()[0];
        let b = som.children(a)[0];
        let c = som.children(b)[0];
        let chain: Vec<_> = som.ancestors(c).collect();
        assert_eq!(chain, vec![b, a]);
    }

    #[test]
    fn attr_lookup() {
        let som = Som::build("<slot name=\"title\" merge>v</slot>");
        let slot = som.roots()[0];
        assert_eq!(som.attr(slot, "name"), Some("title"));
        assert!(som.has_attr(slot, "merge"));
        assert!(!som.has_attr(slot, "theirs"));
    }
}
