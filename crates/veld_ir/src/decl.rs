//! Declarations — ports, parameters, and locals owned by a module template.

use crate::expr::Expr;
use crate::ids::{CellId, DeclId, ModuleId, TypeId};
use serde::{Deserialize, Serialize};
use veld_common::Ident;
use veld_source::Span;

/// The direction of a port on a module boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// An input port.
    Input,
    /// An output port.
    Output,
    /// A bidirectional port.
    InOut,
}

/// How an interface reference finds its concrete interface module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IfaceVia {
    /// Resolved through the cell that instantiates the interface. The
    /// reference tracks whatever module that cell currently targets, so it
    /// follows the cell through specialization automatically.
    Cell {
        /// The module containing the instantiating cell.
        module: ModuleId,
        /// The instantiating cell.
        cell: CellId,
    },
    /// Resolved through the enclosing module's port; the concrete interface
    /// becomes known only once the enclosing module's own instantiation is
    /// specialized.
    Port,
}

/// A reference to an interface definition carried by an interface port.
///
/// The concrete interface is finalized lazily: via-cell references read the
/// cell's current target, via-port references use `iface` once the parent
/// binding has been propagated down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRef {
    /// How the concrete interface is found.
    pub via: IfaceVia,
    /// The interface module, when directly known.
    pub iface: Option<ModuleId>,
    /// The declared interface name, for mismatch diagnostics.
    pub iface_name: Ident,
}

/// The kind of a declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeclKind {
    /// A data port.
    Port {
        /// Direction of data flow.
        direction: PortDirection,
        /// The port type.
        ty: TypeId,
    },
    /// An interface port.
    InterfacePort {
        /// Direction of data flow.
        direction: PortDirection,
        /// The carried interface reference.
        iface: InterfaceRef,
    },
    /// A value parameter. `default` is the initializer (or, after an
    /// override is written in, the overriding literal).
    ValueParam {
        /// The parameter type.
        ty: TypeId,
        /// The initializer, replaced by the override during specialization.
        default: Option<Expr>,
        /// Set once an instantiation has overridden this parameter.
        overridden: bool,
    },
    /// A type parameter.
    TypeParam {
        /// The default type, replaced by the override during specialization.
        default: Option<TypeId>,
        /// Set once an instantiation has overridden this parameter.
        overridden: bool,
    },
    /// A module-local signal or variable.
    Local {
        /// The declared type.
        ty: TypeId,
        /// Optional initializer.
        init: Option<Expr>,
    },
    /// The handle for an interface instantiated inside this module. Port
    /// expressions connect interface cells to child interface ports through
    /// a reference to this declaration.
    InterfaceInstance {
        /// The carried interface reference (always via the instantiating
        /// cell).
        iface: InterfaceRef,
    },
    /// A generate-loop variable.
    Genvar,
}

/// A declaration owned by a module template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decl {
    /// This declaration's ID within its module.
    pub id: DeclId,
    /// The declared name.
    pub name: Ident,
    /// What is being declared.
    pub kind: DeclKind,
    /// The source span of the declaration.
    pub span: Span,
}

impl Decl {
    /// Returns `true` for value and type parameters.
    pub fn is_param(&self) -> bool {
        matches!(
            self.kind,
            DeclKind::ValueParam { .. } | DeclKind::TypeParam { .. }
        )
    }

    /// Returns `true` for declarations that instantiating modules reference
    /// through pins: ports, interface ports, and parameters. Only these ever
    /// appear in a specialization remap.
    pub fn is_externally_referenced(&self) -> bool {
        matches!(
            self.kind,
            DeclKind::Port { .. }
                | DeclKind::InterfacePort { .. }
                | DeclKind::ValueParam { .. }
                | DeclKind::TypeParam { .. }
        )
    }

    /// Returns the interface reference if this is an interface port or an
    /// interface-instance handle.
    pub fn iface_ref(&self) -> Option<&InterfaceRef> {
        match &self.kind {
            DeclKind::InterfacePort { iface, .. } | DeclKind::InterfaceInstance { iface } => {
                Some(iface)
            }
            _ => None,
        }
    }
}
