//! Process-wide template cache with full-invalidation reload.
//!
//! Templates are loaded once, finalized (default slots harvested, nested
//! references spliced flat), then served read-only to every page
//! composition. `reload` builds a complete replacement store and swaps it in
//! only on success; `&mut self` is the single-writer boundary, so a rebuild
//! can never interleave with a `process()` call.

pub mod errors;
pub(crate) mod loader;

pub use errors::StoreError;

use crate::compose::passes;
use crate::som::Som;
use crate::splice::Splice;
use indexmap::IndexMap;
use std::path::Path;
use tracing::{debug, warn};

/// Bound on finalization/resolution passes. A reference chain still raw
/// after this many passes is a cycle.
pub const MAX_RESOLVE_PASSES: usize = 32;

/// A loaded template fragment. The SOM owns the fragment text.
#[derive(Debug, Clone)]
pub struct Template {
    key: String,
    som: Som,
}

impl Template {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn text(&self) -> &str {
        self.som.source()
    }

    pub fn som(&self) -> &Som {
        &self.som
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: IndexMap<String, Template>,
    defaults: IndexMap<String, String>,
}

impl TemplateStore {
    /// Load and finalize a template directory. I/O and JSON failures abort
    /// with the offending path; a reference cycle aborts with the offending
    /// key.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let raw = loader::load_tree(root.as_ref())?;

        let mut store = TemplateStore {
            templates: raw
                .templates
                .into_iter()
                .map(|(key, text)| {
                    let template = Template {
                        key: key.clone(),
                        som: Som::build(text),
                    };
                    (key, template)
                })
                .collect(),
            defaults: raw.defaults,
        };

        store.finalize()?;
        Ok(store)
    }

    /// Full-invalidation reload. On any failure the previous store is left
    /// intact.
    pub fn reload(&mut self, root: impl AsRef<Path>) -> Result<(), StoreError> {
        let fresh = Self::load(root)?;
        *self = fresh;
        debug!("template store reloaded");
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Template> {
        self.templates.get(key)
    }

    /// The default variable tier, harvested from template-level slot
    /// declarations and sibling `.json` files.
    pub fn defaults(&self) -> &IndexMap<String, String> {
        &self.defaults
    }

    pub fn templates(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Closest known key to `key`, for "did you mean" reporting.
    pub fn suggest(&self, key: &str) -> Option<&str> {
        self.templates
            .keys()
            .map(|known| (known, strsim::normalized_levenshtein(key, known)))
            .filter(|(_, score)| *score >= 0.5)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(known, _)| known.as_str())
    }

    /// Harvest template-level slot declarations into the default tier and
    /// splice nested references flat, re-running until quiescent.
    fn finalize(&mut self) -> Result<(), StoreError> {
        let keys: Vec<String> = self.templates.keys().cloned().collect();

        for _ in 0..MAX_RESOLVE_PASSES {
            let mut changed = false;

            for key in &keys {
                if self.harvest_template_slots(key)? {
                    changed = true;
                }
            }

            for key in &keys {
                if self.resolve_template_references(key)? {
                    changed = true;
                }
            }

            if !changed {
                return Ok(());
            }
        }

        let key = keys
            .iter()
            .find(|key| !passes::template_references(self.templates[key.as_str()].som()).is_empty())
            .cloned()
            .unwrap_or_default();
        Err(StoreError::TemplateCycle { key })
    }

    fn harvest_template_slots(&mut self, key: &str) -> Result<bool, StoreError> {
        let som = self.templates[key].som();
        let declarations = passes::slot_declarations(som);
        if declarations.is_empty() {
            return Ok(false);
        }

        let mut splices = Vec::with_capacity(declarations.len());
        for decl in declarations {
            debug!(template = key, name = %decl.name, "harvested default slot");
            self.defaults.insert(decl.name, decl.value);
            splices.push(decl.splice);
        }

        let text = Splice::apply_all(self.templates[key].text(), splices)?;
        self.templates[key].som = Som::build(text);
        Ok(true)
    }

    fn resolve_template_references(&mut self, key: &str) -> Result<bool, StoreError> {
        let som = self.templates[key].som();
        let refs = passes::template_references(som);
        if refs.is_empty() {
            return Ok(false);
        }

        let mut splices = Vec::with_capacity(refs.len());
        for r in refs {
            // A template splicing itself in can only recurse
            if r.key == key {
                return Err(StoreError::TemplateCycle {
                    key: key.to_string(),
                });
            }
            let replacement = match self.templates.get(&r.key) {
                Some(referenced) => {
                    debug!(template = key, reference = %r.key, "resolved nested template");
                    referenced.text().to_string()
                }
                None => {
                    match self.suggest(&r.key) {
                        Some(close) => warn!(
                            template = key,
                            reference = %r.key,
                            "unknown template reference removed (closest is '{close}')"
                        ),
                        None => warn!(
                            template = key,
                            reference = %r.key,
                            "unknown template reference removed"
                        ),
                    }
                    String::new()
                }
            };
            splices.push(Splice::new(r.byte_start, r.byte_end, replacement, &r.original));
        }

        let text = Splice::apply_all(self.templates[key].text(), splices)?;
        self.templates[key].som = Som::build(text);
        Ok(true)
    }
}
