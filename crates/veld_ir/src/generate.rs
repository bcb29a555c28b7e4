//! Module body items, including unresolved generate constructs.
//!
//! A module body is an ordered list of [`GenItem`]s. Before specialization
//! the list may contain compile-time conditionals, selects, and loops; after
//! specialization only concrete items remain. Items reference cells and
//! declarations by module-local ID rather than owning them, so whole-module
//! cloning keeps bodies consistent for free.

use crate::expr::Expr;
use crate::ids::{CellId, DeclId};
use serde::{Deserialize, Serialize};
use veld_common::Ident;
use veld_source::Span;

/// An explicit initial assignment.
///
/// Synthesized by specialization for parameters whose initializer does not
/// fold to a scalar literal; later elaboration machinery evaluates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignStmt {
    /// The assigned declaration.
    pub target: DeclId,
    /// The assigned value.
    pub value: Expr,
    /// The source span of the originating initializer.
    pub span: Span,
}

/// A compile-time conditional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenIf {
    /// The condition; must fold to a constant.
    pub cond: Expr,
    /// Items kept when the condition is non-zero.
    pub then_items: Vec<GenItem>,
    /// Items kept when the condition is zero.
    pub else_items: Vec<GenItem>,
    /// The source span of the construct.
    pub span: Span,
}

/// One arm of a compile-time multi-way select.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenCaseItem {
    /// Candidate labels, tested left to right. Empty for the default arm.
    pub labels: Vec<Expr>,
    /// Whether this is the default arm.
    pub is_default: bool,
    /// The arm's body.
    pub body: Vec<GenItem>,
    /// The source span of the arm.
    pub span: Span,
}

/// A compile-time multi-way select.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenCase {
    /// The selector; must fold to a constant.
    pub selector: Expr,
    /// Arms in declaration order.
    pub items: Vec<GenCaseItem>,
    /// The source span of the construct.
    pub span: Span,
}

/// A compile-time loop.
///
/// Always appears as the sole item of a genvar-carrying [`GenScope`]; the
/// specialization pass treats a bare loop as an upstream contract violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenFor {
    /// The loop variable, declared in the wrapping scope.
    pub var: DeclId,
    /// The initial value expression.
    pub init: Expr,
    /// The continuation condition.
    pub cond: Expr,
    /// The per-iteration next-value expression (in terms of `var`).
    pub step: Expr,
    /// The loop body.
    pub body: Vec<GenItem>,
    /// The source span of the construct.
    pub span: Span,
}

/// A named scope.
///
/// Scope names accumulate as dotted qualifiers on the generate hierarchy
/// string and disambiguate cell identity across loop iterations. A scope
/// wrapping a loop holds the loop variable in `genvar`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenScope {
    /// The scope name.
    pub name: Ident,
    /// The loop variable, for scopes wrapping a [`GenFor`].
    pub genvar: Option<DeclId>,
    /// The scope's items.
    pub items: Vec<GenItem>,
    /// The source span of the scope.
    pub span: Span,
}

/// A function or task scope.
///
/// Declarations inside it are subject to the no-complex-parameter-assign
/// restriction: there is no safe statement position for a synthesized
/// initial assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionScope {
    /// The function name.
    pub name: Ident,
    /// The function's items.
    pub items: Vec<GenItem>,
    /// The source span of the function.
    pub span: Span,
}

/// One item in a module body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GenItem {
    /// A cell instance, by module-local ID.
    Cell(CellId),
    /// A declaration, by module-local ID.
    Decl(DeclId),
    /// An explicit initial assignment.
    Assign(AssignStmt),
    /// A compile-time conditional.
    If(GenIf),
    /// A compile-time multi-way select.
    Case(GenCase),
    /// A compile-time loop (only valid inside a genvar scope).
    For(GenFor),
    /// A named scope.
    Scope(GenScope),
    /// A function/task scope.
    Function(FunctionScope),
}
