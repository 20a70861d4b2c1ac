//! Two-tier slot variable resolution.
//!
//! The default tier is harvested once from the template library and lives as
//! long as the store; the page tier is rebuilt for every composed page and
//! dies with it. "ours" is the default tier, "theirs" the page tier.

use indexmap::IndexMap;

pub struct VarScope<'a> {
    defaults: &'a IndexMap<String, String>,
    page: IndexMap<String, String>,
}

impl<'a> VarScope<'a> {
    pub fn new(defaults: &'a IndexMap<String, String>) -> Self {
        Self {
            defaults,
            page: IndexMap::new(),
        }
    }

    /// Record a page-level declaration. A later declaration of the same name
    /// wins.
    pub fn declare(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.page.insert(name.into(), value.into());
    }

    /// Resolve a slot usage.
    ///
    /// Without `merge`, a present page value wins outright over a default
    /// value; a key absent from both tiers is the empty string. With `merge`,
    /// both tiers are joined by a line break, default tier first unless
    /// `theirs` flips the order.
    pub fn resolve(&self, key: &str, merge: bool, theirs: bool) -> String {
        let ours = self.defaults.get(key);
        let page = self.page.get(key);

        if merge {
            match (ours, page) {
                (Some(d), Some(p)) => {
                    if theirs {
                        format!("{p}\n{d}")
                    } else {
                        format!("{d}\n{p}")
                    }
                }
                (Some(d), None) => d.clone(),
                (None, Some(p)) => p.clone(),
                (None, None) => String::new(),
            }
        } else {
            page.or(ours).cloned().unwrap_or_default()
        }
    }
}
