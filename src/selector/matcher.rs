//! Level-by-level selector evaluation.
//!
//! Each compound token is matched against the strict descendants of the
//! previous token's matches, so `X Y` means "any Y below an X match" without
//! ancestor back-tracking. Two behaviors are load-bearing and must not be
//! "fixed":
//!
//! - a token that matches nothing leaves the previous candidate set in place
//!   for the next token (the query result is still the final token's own
//!   match set, so a miss on the last token returns empty);
//! - `:not(...)` excludes a node only when *every* negated clause holds
//!   against it, not when any one does.

use crate::selector::parse::{AttrPredicate, CompoundToken, Selector};
use crate::som::{NodeId, Som};
use indexmap::IndexSet;

/// Evaluate a parsed selector, returning matches in document order.
///
/// `scope` limits matching to the strict descendants of the given node;
/// `None` scans the whole document.
pub fn find_all(som: &Som, selector: &Selector, scope: Option<NodeId>) -> Vec<NodeId> {
    // Scanning starts *at* the initial nodes (they are themselves candidates
    // for the first token), but strictly *below* subsequent matches.
    let mut candidates: Vec<NodeId> = match scope {
        Some(id) => som.children(id).to_vec(),
        None => som.roots().to_vec(),
    };
    let mut at_candidates = true;
    let mut result: IndexSet<NodeId> = IndexSet::new();

    for token in &selector.tokens {
        let mut matches: IndexSet<NodeId> = IndexSet::new();
        for &start in &candidates {
            if at_candidates {
                scan(som, start, token, &mut matches);
            } else {
                for &child in som.children(start) {
                    scan(som, child, token, &mut matches);
                }
            }
        }

        result = matches;
        if !result.is_empty() {
            candidates = result.iter().copied().collect();
            at_candidates = false;
        }
    }

    result.into_iter().collect()
}

/// First match in document order, if any.
pub fn find(som: &Som, selector: &Selector, scope: Option<NodeId>) -> Option<NodeId> {
    find_all(som, selector, scope).into_iter().next()
}

/// Depth-first scan collecting token matches. A short-circuit token stops
/// descent inside a matched branch; sibling branches are still scanned.
fn scan(som: &Som, id: NodeId, token: &CompoundToken, out: &mut IndexSet<NodeId>) {
    if token_matches(som, id, token) {
        out.insert(id);
        if token.short_circuit {
            return;
        }
    }
    for &child in som.children(id) {
        scan(som, child, token, out);
    }
}

fn token_matches(som: &Som, id: NodeId, token: &CompoundToken) -> bool {
    let Some(tag) = som.tag(id) else {
        return false;
    };

    if let Some(want) = &token.tag {
        if !tag.eq_ignore_ascii_case(want) {
            return false;
        }
    }

    if let Some(want) = &token.id {
        if som.attr(id, "id") != Some(want.as_str()) {
            return false;
        }
    }

    if !token.classes.is_empty() {
        let class_attr = som.attr(id, "class").unwrap_or("");
        if !token
            .classes
            .iter()
            .all(|c| class_attr.split_whitespace().any(|have| have == c))
        {
            return false;
        }
    }

    if !token
        .attrs
        .iter()
        .all(|pred| attr_predicate_holds(som, id, pred))
    {
        return false;
    }

    // Negation counting: only a full house of satisfied :not clauses excludes
    let negations = token.negation_count();
    if negations > 0 {
        let mut satisfied = 0;
        for not_tag in &token.not_tags {
            if tag.eq_ignore_ascii_case(not_tag) {
                satisfied += 1;
            }
        }
        for not_class in &token.not_classes {
            let class_attr = som.attr(id, "class").unwrap_or("");
            if class_attr.split_whitespace().any(|have| have == not_class) {
                satisfied += 1;
            }
        }
        for not_id in &token.not_ids {
            if som.attr(id, "id") == Some(not_id.as_str()) {
                satisfied += 1;
            }
        }
        for pred in &token.not_attrs {
            if attr_predicate_holds(som, id, pred) {
                satisfied += 1;
            }
        }
        if satisfied == negations {
            return false;
        }
    }

    true
}

fn attr_predicate_holds(som: &Som, id: NodeId, pred: &AttrPredicate) -> bool {
    match pred {
        AttrPredicate::Present(name) => som.has_attr(id, name),
        AttrPredicate::Substring { name, needle } => som
            .attr(id, name)
            .map(|value| value.contains(needle.as_str()))
            .unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::parse::Selector;

    fn query(src: &str, selector: &str) -> Vec<String> {
        let som = Som::build(src);
        let sel = Selector::parse(selector).unwrap();
        find_all(&som, &sel, None)
            .into_iter()
            .map(|id| som.node_html(id).to_string())
            .collect()
    }

    #[test]
    fn class_precision() {
        let src = r#"<div class="a b">1</div><div class="a">2</div>"#;
        assert_eq!(query(src, "div.b"), vec![r#"<div class="a b">1</div>"#]);
        assert_eq!(query(src, "div:not(.b)"), vec![r#"<div class="a">2</div>"#]);
    }

    #[test]
    fn descendant_chain_requires_nesting() {
        let src = "<div><p>in</p></div><p>out</p>";
        assert_eq!(query(src, "div p"), vec!["<p>in</p>"]);
        // A div below a div: none here
        assert!(query(src, "div div").is_empty());
    }

    #[test]
    fn empty_mid_chain_keeps_candidates() {
        // "nav p": no <nav> matches, so "p" is evaluated against the same
        // candidate set and still finds both paragraphs.
        let src = "<div><p>1</p></div><p>2</p>";
        assert_eq!(query(src, "nav p"), vec!["<p>1</p>", "<p>2</p>"]);
    }

    #[test]
    fn miss_on_final_token_returns_empty() {
        let src = "<div><p>1</p></div>";
        assert!(query(src, "div span").is_empty());
        assert!(query(src, "span").is_empty());
    }

    #[test]
    fn short_circuit_first_match_per_branch() {
        let src = "<x id=\"outer\"><x id=\"inner\">a</x></x><x id=\"side\">b</x>";
        assert_eq!(query(src, "x").len(), 3);

        let flagged = query(src, "x !");
        assert_eq!(flagged.len(), 2);
        assert!(flagged[0].contains("outer"));
        assert!(flagged[1].contains("side"));
    }

    #[test]
    fn negation_requires_all_clauses() {
        let src = r#"<div class="a b">both</div><div class="a">one</div><div>none</div>"#;
        // Excluded only when .a AND .b both hold
        let got = query(src, "div:not(.a):not(.b)");
        assert_eq!(got, vec![r#"<div class="a">one</div>"#, "<div>none</div>"]);
    }

    #[test]
    fn attr_predicates() {
        let src = r#"<a data-kind="primary nav">1</a><a data-kind="footer">2</a><a>3</a>"#;
        assert_eq!(query(src, "a[data-kind]").len(), 2);
        assert_eq!(query(src, "a[data-kind*=nav]"), vec![r#"<a data-kind="primary nav">1</a>"#]);
        assert_eq!(query(src, "a:not([data-kind])"), vec!["<a>3</a>"]);
    }

    #[test]
    fn id_match() {
        let src = r#"<p id="x">1</p><p>2</p>"#;
        assert_eq!(query(src, "#x"), vec![r#"<p id="x">1</p>"#]);
        assert_eq!(query(src, "p#x"), vec![r#"<p id="x">1</p>"#]);
    }

    #[test]
    fn scoped_search_is_strict_descendants() {
        let som = Som::build("<div id=\"a\"><div id=\"b\"><p>x</p></div></div>");
        let sel = Selector::parse("div").unwrap();
        let outer = som.roots()[0];
        let scoped = find_all(&som, &sel, Some(outer));
        assert_eq!(scoped.len(), 1);
        assert_eq!(som.attr(scoped[0], "id"), Some("b"));
    }

    #[test]
    fn duplicates_collapse_across_nested_candidates() {
        // Both divs are candidates after "div"; the inner p is reachable from
        // each but reported once.
        let src = "<div><div><p>x</p></div></div>";
        assert_eq!(query(src, "div p"), vec!["<p>x</p>"]);
    }

    #[test]
    fn document_order_is_preserved() {
        let src = "<b>1</b><i>x</i><b>2</b><b>3</b>";
        assert_eq!(query(src, "b"), vec!["<b>1</b>", "<b>2</b>", "<b>3</b>"]);
    }
}
