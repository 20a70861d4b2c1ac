//! Tolerant markup scanner.
//!
//! Single forward pass over the source buffer producing a flat node arena
//! with exact byte spans. Malformed markup never fails: stray close tags
//! become text fragments, unclosed elements are closed at the enclosing
//! close tag or end of input, and a bare `<` is literal text.

use super::{Node, NodeId, NodeKind};

/// Elements that never have children or a close tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is scanned as raw text up to the matching close tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub(crate) struct ParseOutput {
    pub nodes: Vec<Node>,
    pub roots: Vec<NodeId>,
}

pub(crate) fn parse(source: &str) -> ParseOutput {
    Scanner::new(source).run()
}

struct Scanner<'s> {
    src: &'s str,
    bytes: &'s [u8],
    pos: usize,
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    open: Vec<NodeId>,
}

impl<'s> Scanner<'s> {
    fn new(src: &'s str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            nodes: Vec::new(),
            roots: Vec::new(),
            open: Vec::new(),
        }
    }

    fn run(mut self) -> ParseOutput {
        let len = self.bytes.len();
        let mut text_start = 0;

        while self.pos < len {
            if self.bytes[self.pos] == b'<' && self.markup_ahead() {
                self.flush_text(text_start, self.pos);

                match self.bytes.get(self.pos + 1) {
                    Some(b'!') => self.scan_comment_or_decl(),
                    Some(b'/') => self.scan_close_tag(),
                    _ => self.scan_open_tag(),
                }

                text_start = self.pos;
            } else {
                self.pos += 1;
            }
        }

        self.flush_text(text_start, len);

        // Unclosed elements end at EOF
        while let Some(id) = self.open.pop() {
            self.nodes[id.index()].byte_end = len;
        }

        ParseOutput {
            nodes: self.nodes,
            roots: self.roots,
        }
    }

    /// A `<` only opens markup when followed by `!`, a tag name, or `/name`.
    fn markup_ahead(&self) -> bool {
        match self.bytes.get(self.pos + 1) {
            Some(b'!') => true,
            Some(b'/') => matches!(self.bytes.get(self.pos + 2), Some(c) if c.is_ascii_alphabetic()),
            Some(c) => c.is_ascii_alphabetic(),
            None => false,
        }
    }

    fn flush_text(&mut self, start: usize, end: usize) {
        if end > start {
            self.push_node(NodeKind::Text, start, end);
        }
    }

    fn push_node(&mut self, kind: NodeKind, byte_start: usize, byte_end: usize) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let parent = self.open.last().copied();
        self.nodes.push(Node {
            kind,
            byte_start,
            byte_end,
            parent,
            children: Vec::new(),
            seq: 0,
        });
        match parent {
            Some(p) => self.nodes[p.index()].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    fn scan_comment_or_decl(&mut self) {
        let start = self.pos;
        let end = if self.src[self.pos..].starts_with("<!--") {
            match find(self.bytes, self.pos + 4, b"-->") {
                Some(idx) => idx + 3,
                None => self.bytes.len(),
            }
        } else {
            // <!DOCTYPE ...> and friends
            match self.bytes[self.pos + 2..].iter().position(|&b| b == b'>') {
                Some(idx) => self.pos + 2 + idx + 1,
                None => self.bytes.len(),
            }
        };
        self.push_node(NodeKind::Text, start, end);
        self.pos = end;
    }

    fn scan_close_tag(&mut self) {
        let start = self.pos;
        let name_start = self.pos + 2;
        let name_end = scan_name(self.bytes, name_start);
        let name = self.src[name_start..name_end].to_ascii_lowercase();

        let tag_end = match self.bytes[name_end..].iter().position(|&b| b == b'>') {
            Some(idx) => name_end + idx + 1,
            None => self.bytes.len(),
        };

        let matches_open = self
            .open
            .iter()
            .any(|&id| self.element_tag(id) == Some(name.as_str()));

        if matches_open {
            // Close intermediates at the close tag's start, the match after it
            while let Some(id) = self.open.pop() {
                if self.element_tag(id) == Some(name.as_str()) {
                    self.nodes[id.index()].byte_end = tag_end;
                    break;
                }
                self.nodes[id.index()].byte_end = start;
            }
        } else {
            // Stray close tag, kept as a raw fragment
            self.push_node(NodeKind::Text, start, tag_end);
        }

        self.pos = tag_end;
    }

    fn scan_open_tag(&mut self) {
        let start = self.pos;
        let name_start = self.pos + 1;
        let name_end = scan_name(self.bytes, name_start);
        let tag = self.src[name_start..name_end].to_ascii_lowercase();
        self.pos = name_end;

        let (attrs, self_closing) = self.scan_attributes();

        let is_void = VOID_ELEMENTS.contains(&tag.as_str());
        let is_raw = RAW_TEXT_ELEMENTS.contains(&tag.as_str());
        let kind = NodeKind::Element { tag: tag.clone(), attrs };
        let id = self.push_node(kind, start, self.pos);

        if self_closing || is_void || self.pos >= self.bytes.len() {
            return;
        }

        self.open.push(id);

        if is_raw {
            // Raw content runs to the matching close tag, or EOF
            let close = format!("</{tag}");
            match find_ignore_case(self.bytes, self.pos, close.as_bytes()) {
                Some(idx) => {
                    self.flush_text(self.pos, idx);
                    self.pos = idx;
                }
                None => {
                    self.flush_text(self.pos, self.bytes.len());
                    self.pos = self.bytes.len();
                }
            }
        }
    }

    /// Scan attributes up to the end of the open tag. Returns the ordered
    /// attribute table (first occurrence wins) and the self-closing flag.
    fn scan_attributes(&mut self) -> (Vec<(String, String)>, bool) {
        let len = self.bytes.len();
        let mut attrs: Vec<(String, String)> = Vec::new();

        loop {
            while self.pos < len && self.bytes[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            if self.pos >= len {
                return (attrs, false);
            }

            match self.bytes[self.pos] {
                b'>' => {
                    self.pos += 1;
                    return (attrs, false);
                }
                b'/' => {
                    if self.bytes.get(self.pos + 1) == Some(&b'>') {
                        self.pos += 2;
                        return (attrs, true);
                    }
                    self.pos += 1;
                }
                _ => {
                    let name_start = self.pos;
                    while self.pos < len
                        && !self.bytes[self.pos].is_ascii_whitespace()
                        && !matches!(self.bytes[self.pos], b'=' | b'>' | b'/')
                    {
                        self.pos += 1;
                    }
                    let name = self.src[name_start..self.pos].to_ascii_lowercase();
                    if name.is_empty() {
                        // Unparseable byte inside the tag, skip it
                        self.pos += 1;
                        continue;
                    }

                    while self.pos < len && self.bytes[self.pos].is_ascii_whitespace() {
                        self.pos += 1;
                    }

                    let value = if self.pos < len && self.bytes[self.pos] == b'=' {
                        self.pos += 1;
                        while self.pos < len && self.bytes[self.pos].is_ascii_whitespace() {
                            self.pos += 1;
                        }
                        self.scan_attribute_value()
                    } else {
                        String::new()
                    };

                    if !attrs.iter().any(|(n, _)| n == &name) {
                        attrs.push((name, value));
                    }
                }
            }
        }
    }

    fn scan_attribute_value(&mut self) -> String {
        let len = self.bytes.len();
        if self.pos >= len {
            return String::new();
        }

        match self.bytes[self.pos] {
            quote @ (b'"' | b'\'') => {
                let value_start = self.pos + 1;
                match self.bytes[value_start..].iter().position(|&b| b == quote) {
                    Some(idx) => {
                        let value = self.src[value_start..value_start + idx].to_string();
                        self.pos = value_start + idx + 1;
                        value
                    }
                    None => {
                        let value = self.src[value_start..].to_string();
                        self.pos = len;
                        value
                    }
                }
            }
            _ => {
                let value_start = self.pos;
                while self.pos < len
                    && !self.bytes[self.pos].is_ascii_whitespace()
                    && self.bytes[self.pos] != b'>'
                {
                    self.pos += 1;
                }
                self.src[value_start..self.pos].to_string()
            }
        }
    }

    fn element_tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.index()].kind {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            NodeKind::Text => None,
        }
    }
}

fn scan_name(bytes: &[u8], start: usize) -> usize {
    let mut pos = start;
    while pos < bytes.len()
        && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'-' || bytes[pos] == b'_')
    {
        pos += 1;
    }
    pos
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|idx| from + idx)
}

fn find_ignore_case(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() || needle.is_empty() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
        .map(|idx| from + idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element_tags(out: &ParseOutput) -> Vec<String> {
        out.nodes
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::Element { tag, .. } => Some(tag.clone()),
                NodeKind::Text => None,
            })
            .collect()
    }

    #[test]
    fn spans_cover_exact_source() {
        let src = r#"<div class="box"><p>hi</p></div>"#;
        let out = parse(src);

        let div = &out.nodes[out.roots[0].index()];
        assert_eq!(&src[div.byte_start..div.byte_end], src);

        let p = &out.nodes[div.children[0].index()];
        assert_eq!(&src[p.byte_start..p.byte_end], "<p>hi</p>");
    }

    #[test]
    fn text_between_elements_is_kept() {
        let src = "<div>  <p>a</p>tail</div>";
        let out = parse(src);
        let div = &out.nodes[out.roots[0].index()];
        assert_eq!(div.children.len(), 3);

        let first = &out.nodes[div.children[0].index()];
        assert!(matches!(first.kind, NodeKind::Text));
        assert_eq!(&src[first.byte_start..first.byte_end], "  ");

        let tail = &out.nodes[div.children[2].index()];
        assert_eq!(&src[tail.byte_start..tail.byte_end], "tail");
    }

    #[test]
    fn unclosed_element_ends_at_enclosing_close() {
        let src = "<ul><li>a<li>b</ul>";
        let out = parse(src);
        let ul = &out.nodes[out.roots[0].index()];
        assert_eq!(&src[ul.byte_start..ul.byte_end], src);

        // Second <li> is nested under the first (no implied close), both end
        // at the </ul> close tag.
        let li1 = &out.nodes[ul.children[0].index()];
        assert_eq!(&src[li1.byte_start..li1.byte_end], "<li>a<li>b");
    }

    #[test]
    fn unclosed_at_eof_ends_at_eof() {
        let src = "<div><p>dangling";
        let out = parse(src);
        let div = &out.nodes[out.roots[0].index()];
        assert_eq!(div.byte_end, src.len());
    }

    #[test]
    fn stray_close_tag_is_text() {
        let src = "<div>a</span>b</div>";
        let out = parse(src);
        let div = &out.nodes[out.roots[0].index()];
        assert_eq!(&src[div.byte_start..div.byte_end], src);
        assert_eq!(element_tags(&out), vec!["div"]);
    }

    #[test]
    fn bare_lt_is_text() {
        let src = "<p>1 < 2</p>";
        let out = parse(src);
        assert_eq!(element_tags(&out), vec!["p"]);
    }

    #[test]
    fn attributes_preserve_order_and_drop_duplicates() {
        let src = r#"<slot name="title" merge name="other">x</slot>"#;
        let out = parse(src);
        let slot = &out.nodes[out.roots[0].index()];
        match &slot.kind {
            NodeKind::Element { attrs, .. } => {
                assert_eq!(
                    attrs,
                    &vec![
                        ("name".to_string(), "title".to_string()),
                        ("merge".to_string(), String::new()),
                    ]
                );
            }
            NodeKind::Text => panic!("expected element"),
        }
    }

    #[test]
    fn unquoted_and_single_quoted_values() {
        let src = "<a href=/x title='q'>y</a>";
        let out = parse(src);
        let a = &out.nodes[out.roots[0].index()];
        match &a.kind {
            NodeKind::Element { attrs, .. } => {
                assert_eq!(attrs[0], ("href".to_string(), "/x".to_string()));
                assert_eq!(attrs[1], ("title".to_string(), "q".to_string()));
            }
            NodeKind::Text => panic!("expected element"),
        }
    }

    #[test]
    fn comments_and_doctype_are_fragments() {
        let src = "<!DOCTYPE html><!-- note --><p>x</p>";
        let out = parse(src);
        assert_eq!(element_tags(&out), vec!["p"]);
        assert_eq!(out.roots.len(), 3);
    }

    #[test]
    fn script_content_is_raw() {
        let src = "<script>if (a < b) { f(\"<div>\"); }</script><p>x</p>";
        let out = parse(src);
        assert_eq!(element_tags(&out), vec!["script", "p"]);

        let script = &out.nodes[out.roots[0].index()];
        assert_eq!(
            &src[script.byte_start..script.byte_end],
            "<script>if (a < b) { f(\"<div>\"); }</script>"
        );
    }

    #[test]
    fn void_elements_take_no_children() {
        let src = "<div><br><img src=x.png><p>y</p></div>";
        let out = parse(src);
        let div = &out.nodes[out.roots[0].index()];
        assert_eq!(div.children.len(), 3);
        let br = &out.nodes[div.children[0].index()];
        assert!(br.children.is_empty());
    }

    #[test]
    fn empty_input() {
        let out = parse("");
        assert!(out.nodes.is_empty());
        assert!(out.roots.is_empty());
    }
}
