//! Module specialization (parameter elaboration) for the Veld design graph.
//!
//! Turns a hierarchical design containing parameterized module templates,
//! compile-time generate constructs, and parameterized interface bindings
//! into a fully monomorphic graph: every live cell ends up referencing a
//! concrete, parameter-free module. Identical specializations are
//! deduplicated design-wide, recursive instantiation is depth-bounded, and
//! cells targeting precompiled hierarchical blocks are substituted from the
//! supplied catalog instead of cloned.
//!
//! # Usage
//!
//! ```ignore
//! let catalog = HierBlockCatalog::new();
//! specialize(&mut design, &catalog, &config.specialize, &interner, &sink)?;
//! ```
//!
//! The graph is mutated in place. User-facing problems are emitted to
//! `sink` and processing continues to maximize diagnostics; only internal
//! contract violations return `Err`.

#![warn(missing_docs)]

pub mod clone;
pub mod context;
pub mod errors;
pub mod fold;
pub mod generate;
pub mod hier;
pub mod naming;
pub mod unroll;
pub mod visitor;

use veld_common::{Interner, VeldResult};
use veld_config::SpecializeConfig;
use veld_diagnostics::DiagnosticSink;
use veld_ir::Design;

use context::SpecializeContext;
pub use hier::HierBlockCatalog;

/// Runs the specialization pass over a design.
///
/// Modules are processed from the top down in non-decreasing hierarchy-level
/// order; templates made unreferenced by specialization are left in place
/// for a later liveness pass.
pub fn specialize(
    design: &mut Design,
    catalog: &HierBlockCatalog,
    config: &SpecializeConfig,
    interner: &Interner,
    sink: &DiagnosticSink,
) -> VeldResult<()> {
    let mut ctx = SpecializeContext::new(design, catalog, config.clone(), interner, sink);
    visitor::run(&mut ctx)
}
