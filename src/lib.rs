//! Weft: static-site compositor with byte-span template and slot resolution
//!
//! Pages are assembled from a library of reusable layout fragments through
//! slot substitution, driven by a custom markup tree (the SOM) that records
//! exact byte spans into the original source text.
//!
//! # Architecture
//!
//! All rewriting compiles down to a single primitive: [`Splice`], a verified
//! byte-span replacement applied bottom-to-top against the original buffer.
//! Intelligence lives in span acquisition (the SOM and the selector engine),
//! not in the application logic, so untouched source formatting survives
//! byte-for-byte.
//!
//! # Pipeline
//!
//! - [`Som::build`] parses markup tolerantly into a span-annotated tree.
//! - [`selector`] evaluates compact descendant queries against a SOM.
//! - [`TemplateStore::load`] caches a template directory, harvests default
//!   slot values, and splices nested template references flat.
//! - [`Compositor::process`] composes one page: references resolved, page
//!   slots harvested, usages substituted by tier precedence.
//!
//! # Example
//!
//! ```no_run
//! use weft::{Compositor, TemplateStore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = TemplateStore::load("templates")?;
//! let compositor = Compositor::new(&store);
//!
//! let page = "<template>header</template><h1><slot>title</slot></h1>";
//! let html = compositor.process(page)?;
//! println!("{html}");
//! # Ok(())
//! # }
//! ```

pub mod compose;
pub mod config;
pub mod selector;
pub mod som;
pub mod splice;
pub mod store;

// Re-exports
pub use compose::{ComposeError, Compositor, VarScope};
pub use config::{load_from_path, ConfigError, SiteConfig};
pub use selector::{find, find_all, Selector, SelectorError};
pub use som::{Node, NodeId, NodeKind, Som};
pub use splice::{Splice, SpliceError, SpliceVerification};
pub use store::{StoreError, Template, TemplateStore, MAX_RESOLVE_PASSES};
