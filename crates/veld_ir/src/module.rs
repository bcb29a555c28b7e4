//! Module templates — the primary organizational unit of the design graph.

use crate::arena::Arena;
use crate::cell::Cell;
use crate::decl::Decl;
use crate::generate::GenItem;
use crate::ids::{CellId, DeclId, ModuleId};
use serde::{Deserialize, Serialize};
use veld_common::Ident;
use veld_source::Span;

/// A module template, possibly still parameterized.
///
/// Owns its declarations and cell instances in module-local arenas and its
/// body as an ordered item list. Specialization clones whole templates; a
/// clone is always a new template, never an alias.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    /// The unique ID of this template in the design.
    pub id: ModuleId,
    /// The current (possibly specialized) name.
    pub name: Ident,
    /// The name the template was declared with, before specialization
    /// renaming. Hierarchical-block catalogs match on this.
    pub origin_name: Ident,
    /// Hierarchy level; strictly increases parent to child.
    pub level: u32,
    /// The source span of the module declaration.
    pub span: Span,
    /// All declarations, in declaration order.
    pub decls: Arena<DeclId, Decl>,
    /// All cell instances, in declaration order.
    pub cells: Arena<CellId, Cell>,
    /// The module body, including unresolved generate constructs.
    pub body: Vec<GenItem>,
    /// This template is an interface definition.
    pub is_interface: bool,
    /// This template participates in recursive instantiation.
    pub is_recursive: bool,
    /// This template is backed by a precompiled hierarchical block.
    pub is_hier_block: bool,
    /// Marked unreferenced by an upstream pass; skipped entirely.
    pub is_dead: bool,
    /// Dotted hierarchy name for diagnostics; established during
    /// specialization.
    pub hier_name: String,
}

impl Module {
    /// Creates an empty template with the given identity and level.
    pub fn new(id: ModuleId, name: Ident, level: u32, span: Span) -> Self {
        Self {
            id,
            name,
            origin_name: name,
            level,
            span,
            decls: Arena::new(),
            cells: Arena::new(),
            body: Vec::new(),
            is_interface: false,
            is_recursive: false,
            is_hier_block: false,
            is_dead: false,
            hier_name: String::new(),
        }
    }

    /// Finds a declaration by name.
    pub fn find_decl(&self, name: Ident) -> Option<DeclId> {
        self.decls
            .iter()
            .find(|(_, d)| d.name == name)
            .map(|(id, _)| id)
    }

    /// Finds a cell by instance name.
    pub fn find_cell(&self, name: Ident) -> Option<CellId> {
        self.cells
            .iter()
            .find(|(_, c)| c.name == name)
            .map(|(id, _)| id)
    }

    /// Returns `true` if any declaration is a not-yet-overridden parameter
    /// with no literal value — i.e., the template is still parameterized.
    pub fn has_free_params(&self) -> bool {
        self.decls.values().any(|d| match &d.kind {
            crate::decl::DeclKind::ValueParam { default, .. } => {
                !matches!(default, Some(crate::expr::Expr::Literal(_)))
            }
            crate::decl::DeclKind::TypeParam { default, .. } => default.is_none(),
            _ => false,
        })
    }
}
