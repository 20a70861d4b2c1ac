//! Compact selector queries over a [`Som`].
//!
//! The string-level API mirrors the tolerant posture of the rest of the
//! pipeline: a selector that fails to parse produces an empty match set
//! (logged at debug), never an error.

pub mod errors;
pub mod matcher;
pub mod parse;

pub use errors::SelectorError;
pub use parse::{AttrPredicate, CompoundToken, Selector};

use crate::som::{NodeId, Som};

/// All matches for `selector` in document order. Malformed selectors match
/// nothing.
pub fn find_all(som: &Som, selector: &str, scope: Option<NodeId>) -> Vec<NodeId> {
    match Selector::parse(selector) {
        Ok(parsed) => matcher::find_all(som, &parsed, scope),
        Err(error) => {
            tracing::debug!(selector, %error, "unparseable selector, matching nothing");
            Vec::new()
        }
    }
}

/// First match for `selector` in document order, if any.
pub fn find(som: &Som, selector: &str, scope: Option<NodeId>) -> Option<NodeId> {
    find_all(som, selector, scope).into_iter().next()
}
