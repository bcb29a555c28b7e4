//! Specialization cache and deep module cloning.
//!
//! A clone is a whole-module copy into a fresh arena slot. Module-local IDs
//! (declarations, cells, body references) are preserved by construction, so
//! every internal reference resolves within the clone untouched; the only
//! fixups are self-referential cross-module fields, which are retargeted
//! from the source module's ID to the clone's.

use std::collections::HashMap;

use veld_common::{Ident, InternalError, VeldResult};
use veld_ir::{
    BindValue, DeclId, DeclKind, Design, Expr, GenItem, IfaceVia, Module, ModuleId, ParamBinding,
    PortBinding,
};

/// A cached specialization: the concrete clone plus the declaration remap
/// that instantiating cells rewrite their pins through.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cloned (or reused) template.
    pub module: ModuleId,
    /// Old declaration → new declaration, restricted to the externally
    /// referenced set (ports, interface ports, parameters, type parameters).
    pub remap: HashMap<DeclId, DeclId>,
}

/// Insert-only map from resolved specialization name to cache entry, alive
/// for the whole pass.
///
/// The resolved name is the injective materialization of the specialization
/// key (template identity plus ordered resolved arguments and interface
/// identities): the naming engine guarantees distinct keys never produce
/// equal names within a run.
#[derive(Debug, Default)]
pub struct SpecializationCache {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

impl SpecializationCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Probes the cache, counting the outcome.
    pub fn probe(&mut self, name: &str) -> Option<CacheEntry> {
        match self.entries.get(name) {
            Some(entry) => {
                self.hits += 1;
                Some(entry.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Inserts a fresh entry. Insert-only: a name is never remapped.
    ///
    /// # Panics
    ///
    /// Panics if the name is already present; the caller must probe first.
    pub fn insert(&mut self, name: String, entry: CacheEntry) {
        let prev = self.entries.insert(name, entry);
        assert!(prev.is_none(), "specialization cache is insert-only");
    }

    /// Returns (hit, miss) counters, for determinism checks in tests.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    /// Returns the number of cached specializations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Deep-clones `src` into a fresh template named `new_name`.
///
/// The clone keeps the source's declaration/cell IDs, body, flags, and
/// inherited hierarchy name; its recursion marker is cleared and
/// self-referential interface and scoped references are retargeted so the
/// clone is internally self-contained.
pub fn deep_clone_module(design: &mut Design, src: ModuleId, new_name: Ident) -> ModuleId {
    let mut module = design.modules[src].clone();
    let new_id = design.modules.next_id();
    module.id = new_id;
    module.name = new_name;
    module.is_recursive = false;
    retarget_module_refs(&mut module, src, new_id);
    design.modules.alloc(module)
}

/// Builds the old-declaration → new-declaration remap between a source
/// module and its clone, restricted to externally referenced declarations.
pub fn build_decl_remap(
    design: &Design,
    src: ModuleId,
    clone: ModuleId,
) -> VeldResult<HashMap<DeclId, DeclId>> {
    let src_mod = &design.modules[src];
    let clone_mod = &design.modules[clone];
    let mut remap = HashMap::new();
    for (old_id, old_decl) in src_mod.decls.iter() {
        if !old_decl.is_externally_referenced() {
            continue;
        }
        let new_id = clone_mod.find_decl(old_decl.name).ok_or_else(|| {
            InternalError::new("clone is missing an externally referenced declaration")
        })?;
        remap.insert(old_id, new_id);
    }
    Ok(remap)
}

/// Rewrites a cell's pin declaration references through a remap.
///
/// A pin whose declaration is absent from the remap indicates an upstream
/// contract violation.
pub fn relink_pins(
    pbinds: &mut [ParamBinding],
    portbinds: &mut [PortBinding],
    remap: &HashMap<DeclId, DeclId>,
) -> VeldResult<()> {
    for pb in pbinds.iter_mut() {
        if let Some(old) = pb.decl {
            let new = remap
                .get(&old)
                .ok_or_else(|| InternalError::new("missing remap entry for parameter pin"))?;
            pb.decl = Some(*new);
        }
    }
    for pb in portbinds.iter_mut() {
        if let Some(old) = pb.decl {
            let new = remap
                .get(&old)
                .ok_or_else(|| InternalError::new("missing remap entry for port pin"))?;
            pb.decl = Some(*new);
        }
    }
    Ok(())
}

/// Rewrites a cell's pin declaration references by name against a
/// replacement module that was never cloned from the source (the
/// hierarchical-block path).
pub fn relink_pins_by_name(
    design: &Design,
    replacement: ModuleId,
    pbinds: &mut [ParamBinding],
    portbinds: &mut [PortBinding],
) -> VeldResult<()> {
    let module = &design.modules[replacement];
    let mut by_name: HashMap<veld_common::Ident, DeclId> = HashMap::new();
    for (id, decl) in module.decls.iter() {
        if decl.is_externally_referenced() {
            by_name.insert(decl.name, id);
        }
    }
    for pb in pbinds.iter_mut() {
        if pb.decl.is_some() {
            let new = by_name
                .get(&pb.name)
                .ok_or_else(|| InternalError::new("pin not found in replacement module"))?;
            pb.decl = Some(*new);
        }
    }
    for pb in portbinds.iter_mut() {
        if pb.decl.is_some() {
            let new = by_name
                .get(&pb.name)
                .ok_or_else(|| InternalError::new("port not found in replacement module"))?;
            pb.decl = Some(*new);
        }
    }
    Ok(())
}

/// Retargets every cross-module reference to `old` inside the module so it
/// points at `new` instead: via-cell interface references and resolved
/// scoped references.
fn retarget_module_refs(module: &mut Module, old: ModuleId, new: ModuleId) {
    for (_, decl) in module.decls.iter_mut() {
        match &mut decl.kind {
            DeclKind::InterfacePort { iface, .. } | DeclKind::InterfaceInstance { iface } => {
                if let IfaceVia::Cell { module: m, .. } = &mut iface.via {
                    if *m == old {
                        *m = new;
                    }
                }
            }
            DeclKind::ValueParam {
                default: Some(expr),
                ..
            }
            | DeclKind::Local {
                init: Some(expr), ..
            } => retarget_expr(expr, old, new),
            _ => {}
        }
    }
    for (_, cell) in module.cells.iter_mut() {
        for pb in &mut cell.param_binds {
            if let Some(BindValue::Expr(expr)) = &mut pb.value {
                retarget_expr(expr, old, new);
            }
        }
        for pb in &mut cell.port_binds {
            if let Some(expr) = &mut pb.expr {
                retarget_expr(expr, old, new);
            }
        }
    }
    retarget_items(&mut module.body, old, new);
}

fn retarget_items(items: &mut [GenItem], old: ModuleId, new: ModuleId) {
    for item in items {
        match item {
            GenItem::Cell(_) | GenItem::Decl(_) => {}
            GenItem::Assign(a) => retarget_expr(&mut a.value, old, new),
            GenItem::If(g) => {
                retarget_expr(&mut g.cond, old, new);
                retarget_items(&mut g.then_items, old, new);
                retarget_items(&mut g.else_items, old, new);
            }
            GenItem::Case(g) => {
                retarget_expr(&mut g.selector, old, new);
                for arm in &mut g.items {
                    for label in &mut arm.labels {
                        retarget_expr(label, old, new);
                    }
                    retarget_items(&mut arm.body, old, new);
                }
            }
            GenItem::For(g) => {
                retarget_expr(&mut g.init, old, new);
                retarget_expr(&mut g.cond, old, new);
                retarget_expr(&mut g.step, old, new);
                retarget_items(&mut g.body, old, new);
            }
            GenItem::Scope(s) => retarget_items(&mut s.items, old, new),
            GenItem::Function(f) => retarget_items(&mut f.items, old, new),
        }
    }
}

fn retarget_expr(expr: &mut Expr, old: ModuleId, new: ModuleId) {
    match expr {
        Expr::ScopedRef {
            resolved: Some(target),
            ..
        } => {
            if target.module == old {
                target.module = new;
            }
        }
        Expr::Literal(_) | Expr::Ref(_) | Expr::ScopedRef { resolved: None, .. } => {}
        Expr::Unary { operand, .. } => retarget_expr(operand, old, new),
        Expr::Binary { lhs, rhs, .. } => {
            retarget_expr(lhs, old, new);
            retarget_expr(rhs, old, new);
        }
        Expr::Cond {
            cond,
            then_expr,
            else_expr,
        } => {
            retarget_expr(cond, old, new);
            retarget_expr(then_expr, old, new);
            retarget_expr(else_expr, old, new);
        }
        Expr::Clog2(operand) => retarget_expr(operand, old, new),
        Expr::Aggregate(items) => {
            for item in items {
                retarget_expr(item, old, new);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veld_common::Interner;
    use veld_ir::{Cell, CellId, Decl, InterfaceRef, PortDirection, TypeId};
    use veld_source::Span;

    fn design_with_iface_module(interner: &Interner) -> (Design, ModuleId) {
        let mut design = Design::new();
        let mid = design.modules.next_id();
        let mut module = Module::new(mid, interner.get_or_intern("wrapper"), 1, Span::DUMMY);

        // A cell instantiating some interface, and an instance handle whose
        // reference goes via that cell (a self-referential cross-module ref).
        let cid = module.cells.next_id();
        module.cells.alloc(Cell {
            id: cid,
            name: interner.get_or_intern("bus_i"),
            module: ModuleId::from_raw(99),
            param_binds: Vec::new(),
            port_binds: Vec::new(),
            is_recursive: false,
            span: Span::DUMMY,
        });
        let did = module.decls.next_id();
        module.decls.alloc(Decl {
            id: did,
            name: interner.get_or_intern("bus_i"),
            kind: DeclKind::InterfaceInstance {
                iface: InterfaceRef {
                    via: IfaceVia::Cell { module: mid, cell: cid },
                    iface: None,
                    iface_name: interner.get_or_intern("bus_if"),
                },
            },
            span: Span::DUMMY,
        });
        design.modules.alloc(module);
        design.top = mid;
        (design, mid)
    }

    #[test]
    fn clone_retargets_self_iface_refs() {
        let interner = Interner::new();
        let (mut design, src) = design_with_iface_module(&interner);
        let clone = deep_clone_module(&mut design, src, interner.get_or_intern("wrapper_W8"));
        assert_ne!(clone, src);

        let cloned_decl = design.modules[clone]
            .find_decl(interner.get_or_intern("bus_i"))
            .unwrap();
        let iref = design.modules[clone].decls[cloned_decl].iface_ref().unwrap();
        match iref.via {
            IfaceVia::Cell { module, cell } => {
                assert_eq!(module, clone, "via-cell must point inside the clone");
                assert_eq!(cell, CellId::from_raw(0));
            }
            IfaceVia::Port => panic!("expected via-cell reference"),
        }
        // The original is untouched
        let orig_decl = design.modules[src]
            .find_decl(interner.get_or_intern("bus_i"))
            .unwrap();
        match design.modules[src].decls[orig_decl].iface_ref().unwrap().via {
            IfaceVia::Cell { module, .. } => assert_eq!(module, src),
            IfaceVia::Port => panic!("expected via-cell reference"),
        }
    }

    #[test]
    fn clone_clears_recursion_marker() {
        let interner = Interner::new();
        let (mut design, src) = design_with_iface_module(&interner);
        design.modules[src].is_recursive = true;
        let clone = deep_clone_module(&mut design, src, interner.get_or_intern("w2"));
        assert!(!design.modules[clone].is_recursive);
        assert!(design.modules[src].is_recursive);
    }

    #[test]
    fn remap_covers_external_decls_only() {
        let interner = Interner::new();
        let mut design = Design::new();
        let mid = design.modules.next_id();
        let mut module = Module::new(mid, interner.get_or_intern("m"), 1, Span::DUMMY);
        let port = module.decls.next_id();
        module.decls.alloc(Decl {
            id: port,
            name: interner.get_or_intern("clk"),
            kind: DeclKind::Port {
                direction: PortDirection::Input,
                ty: TypeId::from_raw(0),
            },
            span: Span::DUMMY,
        });
        let local = module.decls.next_id();
        module.decls.alloc(Decl {
            id: local,
            name: interner.get_or_intern("tmp"),
            kind: DeclKind::Local {
                ty: TypeId::from_raw(0),
                init: None,
            },
            span: Span::DUMMY,
        });
        design.modules.alloc(module);

        let clone = deep_clone_module(&mut design, mid, interner.get_or_intern("m_2"));
        let remap = build_decl_remap(&design, mid, clone).unwrap();
        assert_eq!(remap.len(), 1);
        assert_eq!(remap.get(&port), Some(&port));
        assert!(!remap.contains_key(&local));
    }

    #[test]
    fn relink_missing_entry_is_internal_error() {
        let mut pbinds = vec![ParamBinding {
            name: Ident::from_raw(0),
            decl: Some(DeclId::from_raw(7)),
            value: None,
            span: Span::DUMMY,
        }];
        let err = relink_pins(&mut pbinds, &mut [], &HashMap::new());
        assert!(err.is_err());
    }

    #[test]
    fn cache_probe_counts_hits_and_misses() {
        let mut cache = SpecializationCache::new();
        assert!(cache.probe("fifo_W8").is_none());
        cache.insert(
            "fifo_W8".to_string(),
            CacheEntry {
                module: ModuleId::from_raw(3),
                remap: HashMap::new(),
            },
        );
        assert!(cache.probe("fifo_W8").is_some());
        assert_eq!(cache.stats(), (1, 1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    #[should_panic(expected = "insert-only")]
    fn cache_rejects_reinsert() {
        let mut cache = SpecializationCache::new();
        let entry = CacheEntry {
            module: ModuleId::from_raw(0),
            remap: HashMap::new(),
        };
        cache.insert("x".to_string(), entry.clone());
        cache.insert("x".to_string(), entry);
    }
}
