//! Span harvesting shared by store finalization and page composition.
//!
//! Each helper runs one selector query over a freshly built SOM and returns
//! the byte spans to rewrite. Nested matches collapse into their outermost
//! container so one splice batch never overlaps itself. Anything at or below
//! an element carrying an `ignore` attribute is left untouched.

use crate::selector;
use crate::som::{NodeId, Som};
use crate::splice::Splice;
use std::collections::HashSet;

/// A `slot[name]` declaration: its harvested value and the splice deleting it.
pub(crate) struct SlotDeclaration {
    pub name: String,
    pub value: String,
    pub splice: Splice,
}

/// A raw `<template>key</template>` reference awaiting resolution.
pub(crate) struct TemplateReference {
    pub key: String,
    pub byte_start: usize,
    pub byte_end: usize,
    pub original: String,
}

/// An unnamed `slot` usage: a variable key plus its merge flags.
pub(crate) struct SlotUsage {
    pub key: String,
    pub merge: bool,
    pub theirs: bool,
    pub byte_start: usize,
    pub byte_end: usize,
    pub original: String,
}

pub(crate) fn is_ignored(som: &Som, id: NodeId) -> bool {
    som.has_attr(id, "ignore") || som.ancestors(id).any(|a| som.has_attr(a, "ignore"))
}

/// Drop matches contained inside another match.
fn outermost(som: &Som, matches: Vec<NodeId>) -> Vec<NodeId> {
    let set: HashSet<NodeId> = matches.iter().copied().collect();
    matches
        .into_iter()
        .filter(|&id| !som.ancestors(id).any(|a| set.contains(&a)))
        .collect()
}

pub(crate) fn slot_declarations(som: &Som) -> Vec<SlotDeclaration> {
    let named: Vec<NodeId> = selector::find_all(som, "slot", None)
        .into_iter()
        .filter(|&id| som.has_attr(id, "name") && !is_ignored(som, id))
        .collect();

    outermost(som, named)
        .into_iter()
        .map(|id| {
            let node = som.node(id);
            SlotDeclaration {
                name: som.attr(id, "name").unwrap_or_default().to_string(),
                value: som.node_inner_html(id).to_string(),
                splice: Splice::new(node.byte_start, node.byte_end, "", som.node_html(id)),
            }
        })
        .collect()
}

pub(crate) fn template_references(som: &Som) -> Vec<TemplateReference> {
    let refs: Vec<NodeId> = selector::find_all(som, "template", None)
        .into_iter()
        .filter(|&id| !is_ignored(som, id))
        .collect();

    outermost(som, refs)
        .into_iter()
        .map(|id| {
            let node = som.node(id);
            TemplateReference {
                key: som.node_inner_html(id).trim().to_string(),
                byte_start: node.byte_start,
                byte_end: node.byte_end,
                original: som.node_html(id).to_string(),
            }
        })
        .collect()
}

pub(crate) fn slot_usages(som: &Som) -> Vec<SlotUsage> {
    let unnamed: Vec<NodeId> = selector::find_all(som, "slot", None)
        .into_iter()
        .filter(|&id| !som.has_attr(id, "name") && !is_ignored(som, id))
        .collect();

    outermost(som, unnamed)
        .into_iter()
        .map(|id| {
            let node = som.node(id);
            SlotUsage {
                key: som.node_inner_html(id).trim().to_string(),
                merge: som.has_attr(id, "merge"),
                theirs: som.has_attr(id, "theirs"),
                byte_start: node.byte_start,
                byte_end: node.byte_end,
                original: som.node_html(id).to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_and_usages_are_distinguished_by_name() {
        let som = Som::build("<slot name=\"title\">My Site</slot><slot>title</slot>");
        let decls = slot_declarations(&som);
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name, "title");
        assert_eq!(decls[0].value, "My Site");

        let usages = slot_usages(&som);
        assert_eq!(usages.len(), 1);
        assert_eq!(usages[0].key, "title");
        assert!(!usages[0].merge);
    }

    #[test]
    fn usage_flags() {
        let som = Som::build("<slot merge theirs>nav</slot>");
        let usages = slot_usages(&som);
        assert!(usages[0].merge);
        assert!(usages[0].theirs);
    }

    #[test]
    fn references_trim_their_key() {
        let som = Som::build("<template>\n  header\n</template>");
        let refs = template_references(&som);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].key, "header");
    }

    #[test]
    fn ignore_attribute_shields_subtree() {
        let src = "<div ignore><template>a</template><slot name=\"x\">v</slot></div>\
                   <template>b</template>";
        let som = Som::build(src);
        let refs = template_references(&som);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].key, "b");
        assert!(slot_declarations(&som).is_empty());
    }

    #[test]
    fn ignore_on_the_reference_itself() {
        let som = Som::build("<template ignore>a</template>");
        assert!(template_references(&som).is_empty());
    }

    #[test]
    fn nested_matches_collapse_to_outermost() {
        let som = Som::build("<slot name=\"a\">x<slot name=\"b\">y</slot></slot>");
        let decls = slot_declarations(&som);
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name, "a");
    }
}
