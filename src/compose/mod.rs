//! Page composition: template inclusion plus slot resolution.
//!
//! `process` is a pure text-in/text-out transform. Each phase re-parses the
//! current buffer so every recorded span is valid for exactly one splice
//! batch; all rewriting happens bottom-to-top against the original bytes.

pub mod errors;
pub(crate) mod passes;
pub mod vars;

pub use errors::ComposeError;
pub use vars::VarScope;

use crate::som::Som;
use crate::splice::Splice;
use crate::store::{TemplateStore, MAX_RESOLVE_PASSES};
use tracing::{debug, warn};

pub struct Compositor<'a> {
    store: &'a TemplateStore,
}

impl<'a> Compositor<'a> {
    pub fn new(store: &'a TemplateStore) -> Self {
        Self { store }
    }

    /// Compose one page. The page-scoped variable tier lives and dies inside
    /// this call; composing the same text twice against an unchanged store
    /// yields byte-identical output.
    pub fn process(&self, page_text: &str) -> Result<String, ComposeError> {
        let text = self.resolve_references(page_text.to_string())?;
        let (text, scope) = self.harvest_page_slots(text)?;
        let text = self.substitute_usages(text, &scope)?;
        Ok(text)
    }

    /// Phase 1: splice template bodies over their reference nodes. The store
    /// is finalized, so one pass normally suffices; the bound guards against
    /// a reference chain that keeps producing raw references.
    fn resolve_references(&self, mut text: String) -> Result<String, ComposeError> {
        for _ in 0..MAX_RESOLVE_PASSES {
            let som = Som::build(text.clone());
            let refs = passes::template_references(&som);
            if refs.is_empty() {
                return Ok(text);
            }

            let splices = refs
                .into_iter()
                .map(|r| {
                    let replacement = match self.store.get(&r.key) {
                        Some(template) => {
                            debug!(key = %r.key, "resolved template reference");
                            template.text().to_string()
                        }
                        None => {
                            match self.store.suggest(&r.key) {
                                Some(close) => warn!(
                                    key = %r.key,
                                    "unknown template reference removed (closest is '{close}')"
                                ),
                                None => warn!(key = %r.key, "unknown template reference removed"),
                            }
                            String::new()
                        }
                    };
                    Splice::new(r.byte_start, r.byte_end, replacement, &r.original)
                })
                .collect();

            text = Splice::apply_all(&text, splices)?;
        }

        let som = Som::build(text);
        let key = passes::template_references(&som)
            .into_iter()
            .next()
            .map(|r| r.key)
            .unwrap_or_default();
        Err(ComposeError::TemplateCycle { key })
    }

    /// Phase 2: move `slot[name]` declarations into the page tier and delete
    /// them from the text.
    fn harvest_page_slots(&self, text: String) -> Result<(String, VarScope<'a>), ComposeError> {
        let mut scope = VarScope::new(self.store.defaults());

        let som = Som::build(text);
        let declarations = passes::slot_declarations(&som);

        let mut splices = Vec::with_capacity(declarations.len());
        for decl in declarations {
            debug!(name = %decl.name, "harvested page slot");
            scope.declare(decl.name, decl.value);
            splices.push(decl.splice);
        }

        let text = Splice::apply_all(som.source(), splices)?;
        Ok((text, scope))
    }

    /// Phase 3: replace unnamed slot usages with their resolved values in one
    /// bottom-to-top batch.
    fn substitute_usages(&self, text: String, scope: &VarScope<'_>) -> Result<String, ComposeError> {
        let som = Som::build(text);
        let splices = passes::slot_usages(&som)
            .into_iter()
            .map(|usage| {
                let value = scope.resolve(&usage.key, usage.merge, usage.theirs);
                Splice::new(usage.byte_start, usage.byte_end, value, &usage.original)
            })
            .collect();

        Ok(Splice::apply_all(som.source(), splices)?)
    }
}
