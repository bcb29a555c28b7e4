//! Top-level design container.

use crate::arena::Arena;
use crate::decl::{IfaceVia, InterfaceRef};
use crate::ids::ModuleId;
use crate::module::Module;
use crate::types::TypeDb;
use serde::{Deserialize, Serialize};
use veld_common::Ident;

/// A complete hardware design.
///
/// Owns every module template plus the shared type database. The
/// specialization pass mutates it in place: clones join the module arena,
/// cells are retargeted, dead templates stay flagged for a later liveness
/// pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Design {
    /// All module templates, keyed by [`ModuleId`].
    pub modules: Arena<ModuleId, Module>,
    /// The top-level module.
    pub top: ModuleId,
    /// Global type definitions shared across all modules.
    pub types: TypeDb,
}

impl Design {
    /// Creates an empty design with a placeholder top.
    pub fn new() -> Self {
        Self {
            modules: Arena::new(),
            top: ModuleId::from_raw(0),
            types: TypeDb::new(),
        }
    }

    /// Returns a reference to the top-level module.
    pub fn top_module(&self) -> &Module {
        &self.modules[self.top]
    }

    /// Returns the number of module templates in the design.
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Finds a module by current name.
    pub fn find_module(&self, name: Ident) -> Option<ModuleId> {
        self.modules
            .iter()
            .find(|(_, m)| m.name == name)
            .map(|(id, _)| id)
    }

    /// Resolves an interface reference to its concrete interface module.
    ///
    /// Via-cell references read the instantiating cell's current target, so
    /// the answer tracks that cell's specialization; via-port references
    /// return the directly recorded interface, if any.
    pub fn iface_concrete(&self, iref: &InterfaceRef) -> Option<ModuleId> {
        match iref.via {
            IfaceVia::Cell { module, cell } => Some(self.modules[module].cells[cell].module),
            IfaceVia::Port => iref.iface,
        }
    }
}

impl Default for Design {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use crate::ids::CellId;
    use veld_source::Span;

    fn design_with_two_modules() -> Design {
        let mut design = Design::new();
        let top = design.modules.next_id();
        design
            .modules
            .alloc(Module::new(top, Ident::from_raw(1), 1, Span::DUMMY));
        let sub = design.modules.next_id();
        design
            .modules
            .alloc(Module::new(sub, Ident::from_raw(2), 2, Span::DUMMY));
        design.top = top;
        design
    }

    #[test]
    fn top_module_access() {
        let design = design_with_two_modules();
        assert_eq!(design.module_count(), 2);
        assert_eq!(design.top_module().name, Ident::from_raw(1));
    }

    #[test]
    fn find_module_by_name() {
        let design = design_with_two_modules();
        assert!(design.find_module(Ident::from_raw(2)).is_some());
        assert!(design.find_module(Ident::from_raw(9)).is_none());
    }

    #[test]
    fn iface_concrete_via_cell_tracks_cell() {
        let mut design = design_with_two_modules();
        let top = design.top;
        let iface_mod = ModuleId::from_raw(1);
        let cid = design.modules[top].cells.next_id();
        design.modules[top].cells.alloc(Cell {
            id: cid,
            name: Ident::from_raw(10),
            module: iface_mod,
            param_binds: Vec::new(),
            port_binds: Vec::new(),
            is_recursive: false,
            span: Span::DUMMY,
        });

        let iref = InterfaceRef {
            via: IfaceVia::Cell {
                module: top,
                cell: cid,
            },
            iface: None,
            iface_name: Ident::from_raw(2),
        };
        assert_eq!(design.iface_concrete(&iref), Some(iface_mod));

        // Retargeting the cell changes the answer
        design.modules[top].cells[cid].module = ModuleId::from_raw(0);
        assert_eq!(design.iface_concrete(&iref), Some(ModuleId::from_raw(0)));
    }

    #[test]
    fn iface_concrete_via_port() {
        let design = design_with_two_modules();
        let iref = InterfaceRef {
            via: IfaceVia::Port,
            iface: Some(ModuleId::from_raw(1)),
            iface_name: Ident::from_raw(2),
        };
        assert_eq!(design.iface_concrete(&iref), Some(ModuleId::from_raw(1)));

        let unresolved = InterfaceRef {
            via: IfaceVia::Port,
            iface: None,
            iface_name: Ident::from_raw(2),
        };
        assert_eq!(design.iface_concrete(&unresolved), None);
    }

    #[test]
    fn serde_roundtrip() {
        let design = design_with_two_modules();
        let json = serde_json::to_string(&design).unwrap();
        let back: Design = serde_json::from_str(&json).unwrap();
        assert_eq!(back.module_count(), 2);
        assert_eq!(back.top, design.top);
    }
}
