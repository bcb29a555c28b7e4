//! Cell instances — the edges of the module hierarchy.
//!
//! A [`Cell`] instantiates another module template and carries two ordered
//! binding lists: parameter pins (consumed and discarded by specialization)
//! and port pins (rewritten to the winning template's declarations).

use crate::expr::Expr;
use crate::ids::{CellId, DeclId, ModuleId, TypeId};
use serde::{Deserialize, Serialize};
use veld_common::Ident;
use veld_source::Span;

/// The value side of a parameter binding: an expression for value
/// parameters, a type for type parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BindValue {
    /// A value-parameter binding expression.
    Expr(Expr),
    /// A type-parameter binding.
    Type(TypeId),
}

/// A parameter-binding pin on a cell.
///
/// `decl` points at the parameter declaration in the target module; `None`
/// means name resolution failed upstream and the name alone is retained for
/// diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamBinding {
    /// The bound parameter's name as written at the instantiation.
    pub name: Ident,
    /// The parameter declaration in the target module.
    pub decl: Option<DeclId>,
    /// The bound value; `None` is an explicit no-connect.
    pub value: Option<BindValue>,
    /// The source span of the binding.
    pub span: Span,
}

/// A port-binding pin on a cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortBinding {
    /// The bound port's name as written at the instantiation.
    pub name: Ident,
    /// The port declaration in the target module.
    pub decl: Option<DeclId>,
    /// The connected expression; `None` is an unconnected port.
    pub expr: Option<Expr>,
    /// The source span of the binding.
    pub span: Span,
}

/// A cell instance within a module template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    /// This cell's ID within its module.
    pub id: CellId,
    /// The instance name.
    pub name: Ident,
    /// The instantiated module template. Mutable: specialization retargets
    /// this to the concrete clone or hierarchical-block replacement.
    pub module: ModuleId,
    /// Ordered parameter bindings. Emptied once specialization has consumed
    /// them.
    pub param_binds: Vec<ParamBinding>,
    /// Ordered port bindings.
    pub port_binds: Vec<PortBinding>,
    /// Marks a recursive self-instantiation; such cells always clone.
    pub is_recursive: bool,
    /// The source span of the instantiation.
    pub span: Span,
}

impl Cell {
    /// Looks up a parameter binding by target declaration.
    pub fn param_bind_for(&self, decl: DeclId) -> Option<&ParamBinding> {
        self.param_binds.iter().find(|p| p.decl == Some(decl))
    }
}
