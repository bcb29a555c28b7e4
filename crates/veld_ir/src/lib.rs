//! The Veld design graph — the in-memory IR shared by elaboration stages.
//!
//! A [`Design`] owns module templates in a dense arena; each [`Module`] owns
//! its declarations, cell instances, and body items in arenas of its own.
//! Cross-references are opaque IDs: module-local IDs survive whole-module
//! cloning verbatim, cross-module references pair a [`ModuleId`] with a local
//! ID. The module-specialization pass mutates this graph in place.

#![warn(missing_docs)]

pub mod arena;
pub mod cell;
pub mod const_value;
pub mod decl;
pub mod design;
pub mod expr;
pub mod generate;
pub mod ids;
pub mod module;
pub mod types;

pub use arena::Arena;
pub use cell::{BindValue, Cell, ParamBinding, PortBinding};
pub use const_value::ConstValue;
pub use decl::{Decl, DeclKind, IfaceVia, InterfaceRef, PortDirection};
pub use design::Design;
pub use expr::{BinaryOp, Expr, ScopedTarget, UnaryOp};
pub use generate::{
    AssignStmt, FunctionScope, GenCase, GenCaseItem, GenFor, GenIf, GenItem, GenScope,
};
pub use ids::{CellId, DeclId, ModuleId, TypeId};
pub use module::Module;
pub use types::{Type, TypeDb};
