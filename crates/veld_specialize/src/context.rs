//! Mutable pass state threaded through the specialization traversal.
//!
//! All traversal-scoped and pass-scoped mutable state lives here, never in
//! ambient globals and never on graph nodes: the processed/constified flags
//! and per-cell generate qualifiers are side tables keyed by ID, and the
//! worklist keys carry (level, insertion sequence) so modules come off in
//! non-decreasing level order with ties broken by insertion.

use std::collections::{BTreeMap, HashMap, HashSet};

use veld_common::Interner;
use veld_config::SpecializeConfig;
use veld_diagnostics::DiagnosticSink;
use veld_ir::{CellId, DeclId, Design, ModuleId};

use crate::clone::SpecializationCache;
use crate::fold::Folder;
use crate::hier::HierBlockCatalog;
use crate::naming::NamingEngine;
use crate::unroll::BoundedUnroller;

/// Everything the specialization pass reads and mutates.
pub struct SpecializeContext<'a> {
    /// The design graph being mutated in place.
    pub design: &'a mut Design,
    /// The shared string interner.
    pub interner: &'a Interner,
    /// User-error destination; siblings keep processing after an emit.
    pub sink: &'a DiagnosticSink,
    /// Pass configuration.
    pub config: SpecializeConfig,
    /// The constant-folding collaborator.
    pub folder: Folder,
    /// The loop-unrolling collaborator.
    pub unroller: BoundedUnroller,
    /// Naming state for the whole run.
    pub naming: NamingEngine,
    /// The specialization cache, alive for the whole pass.
    pub cache: SpecializationCache,
    /// The read-only replacement library.
    pub catalog: &'a HierBlockCatalog,

    /// One-shot processed flags, keyed by module.
    processed: HashSet<ModuleId>,
    /// One-shot constified flags, keyed by (module, declaration).
    constified: HashSet<(ModuleId, DeclId)>,
    /// Worklist ordered by (level, insertion sequence).
    worklist: BTreeMap<(u32, u64), ModuleId>,
    next_seq: u64,

    /// The generate-hierarchy qualifier accumulated during the body walk.
    pub gen_hier_name: String,
    /// Nesting depth of function/task scopes during the body walk.
    pub function_depth: u32,
    /// Cells discovered by the body walk, in declaration order.
    pub pending_cells: Vec<CellId>,
    /// Write-once generate qualifiers per discovered cell; cleared after
    /// each module's cell waves.
    pub cell_scope: HashMap<CellId, String>,
}

impl<'a> SpecializeContext<'a> {
    /// Creates the pass context.
    pub fn new(
        design: &'a mut Design,
        catalog: &'a HierBlockCatalog,
        config: SpecializeConfig,
        interner: &'a Interner,
        sink: &'a DiagnosticSink,
    ) -> Self {
        let naming = NamingEngine::new(&config, design, interner);
        let unroller = BoundedUnroller::new(config.max_generate_iterations);
        Self {
            design,
            interner,
            sink,
            config,
            folder: Folder,
            unroller,
            naming,
            cache: SpecializationCache::new(),
            catalog,
            processed: HashSet::new(),
            constified: HashSet::new(),
            worklist: BTreeMap::new(),
            next_seq: 0,
            gen_hier_name: String::new(),
            function_depth: 0,
            pending_cells: Vec::new(),
            cell_scope: HashMap::new(),
        }
    }

    /// Adds a module to the worklist at its current level.
    ///
    /// Duplicate enqueues are harmless; the processed flag keeps a module
    /// from being walked twice.
    pub fn enqueue(&mut self, module: ModuleId) {
        let level = self.design.modules[module].level;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.worklist.insert((level, seq), module);
    }

    /// Pops the lowest-level unprocessed module, marking it processed.
    pub fn pop_next(&mut self) -> Option<ModuleId> {
        loop {
            let key = *self.worklist.keys().next()?;
            let Some(module) = self.worklist.remove(&key) else {
                continue;
            };
            if self.design.modules[module].is_dead {
                continue;
            }
            if self.processed.insert(module) {
                return Some(module);
            }
        }
    }

    /// Returns `true` if a module has already been processed.
    pub fn is_processed(&self, module: ModuleId) -> bool {
        self.processed.contains(&module)
    }

    /// One-shot constified transition for a declaration. Returns `true`
    /// exactly once per (module, declaration).
    pub fn mark_constified(&mut self, module: ModuleId, decl: DeclId) -> bool {
        self.constified.insert((module, decl))
    }

    /// Saves the generate-hierarchy name, runs `f`, and restores it.
    pub fn with_scope_name<R>(
        &mut self,
        suffix: &str,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let saved = self.gen_hier_name.clone();
        self.gen_hier_name.push('.');
        self.gen_hier_name.push_str(suffix);
        let result = f(self);
        self.gen_hier_name = saved;
        result
    }
}
