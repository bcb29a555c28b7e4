//! Expression trees for parameter defaults, bindings, and generate controls.
//!
//! Expressions are a closed variant; the constant folder dispatches on the
//! tag, never on runtime type tests. Declaration references are module-local
//! [`DeclId`]s, so a whole-module clone keeps every internal reference valid.

use crate::const_value::ConstValue;
use crate::ids::{DeclId, ModuleId};
use serde::{Deserialize, Serialize};
use veld_common::Ident;

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Bitwise complement.
    BitNot,
    /// Logical not.
    LogicNot,
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
    /// Modulo.
    Mod,
    /// Exponentiation.
    Pow,
    /// Left shift.
    Shl,
    /// Right shift.
    Shr,
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Less-than.
    Lt,
    /// Less-or-equal.
    Le,
    /// Greater-than.
    Gt,
    /// Greater-or-equal.
    Ge,
    /// Bitwise and.
    BitAnd,
    /// Bitwise or.
    BitOr,
    /// Bitwise xor.
    BitXor,
    /// Logical and.
    LogicAnd,
    /// Logical or.
    LogicOr,
}

/// The resolved target of a dotted cross-scope reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopedTarget {
    /// The module owning the referenced declaration.
    pub module: ModuleId,
    /// The referenced declaration.
    pub decl: DeclId,
}

/// A compile-time expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A folded literal.
    Literal(ConstValue),
    /// A reference to a declaration in the enclosing module.
    Ref(DeclId),
    /// A dotted reference crossing a scope boundary (`scope.name`).
    ///
    /// `resolved` is `None` until the specialization pass rebinds it; a
    /// reference that cannot be resolved stays `None` and is reported by a
    /// later stage.
    ScopedRef {
        /// The dotted prefix naming the scope being crossed into.
        scope: Ident,
        /// The member name within that scope.
        name: Ident,
        /// The rebound target, once resolution succeeds.
        resolved: Option<ScopedTarget>,
    },
    /// A unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<Expr>,
    },
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// A conditional (`cond ? then : else`). Only the selected arm is folded.
    Cond {
        /// The selector.
        cond: Box<Expr>,
        /// Value when the selector is true.
        then_expr: Box<Expr>,
        /// Value when the selector is false.
        else_expr: Box<Expr>,
    },
    /// Ceiling log-base-2 builtin.
    Clog2(Box<Expr>),
    /// An aggregate (array) initializer. Never folds to a scalar literal;
    /// parameters initialized this way are deferred to an explicit initial
    /// assignment.
    Aggregate(Vec<Expr>),
}

impl Expr {
    /// Returns the literal value if this expression is already folded.
    pub fn as_literal(&self) -> Option<&ConstValue> {
        match self {
            Expr::Literal(v) => Some(v),
            _ => None,
        }
    }

    /// Returns `true` for aggregate initializers.
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Expr::Aggregate(_))
    }

    /// Rewrites every declaration reference through `map`.
    ///
    /// Used when body items are duplicated into fresh arena slots (loop
    /// unrolling) and local references must follow their copies. References
    /// absent from the map are left unchanged.
    pub fn remap_decls(&mut self, map: &std::collections::HashMap<DeclId, DeclId>) {
        match self {
            Expr::Ref(decl) => {
                if let Some(new) = map.get(decl) {
                    *decl = *new;
                }
            }
            Expr::Literal(_) | Expr::ScopedRef { .. } => {}
            Expr::Unary { operand, .. } => operand.remap_decls(map),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.remap_decls(map);
                rhs.remap_decls(map);
            }
            Expr::Cond {
                cond,
                then_expr,
                else_expr,
            } => {
                cond.remap_decls(map);
                then_expr.remap_decls(map);
                else_expr.remap_decls(map);
            }
            Expr::Clog2(operand) => operand.remap_decls(map),
            Expr::Aggregate(items) => {
                for item in items {
                    item.remap_decls(map);
                }
            }
        }
    }

    /// Replaces every reference to `target` with the given literal.
    ///
    /// Loop unrolling uses this to substitute the genvar with each
    /// iteration's constant.
    pub fn replace_ref(&mut self, target: DeclId, value: &ConstValue) {
        match self {
            Expr::Ref(decl) if *decl == target => {
                *self = Expr::Literal(value.clone());
            }
            Expr::Ref(_) | Expr::Literal(_) | Expr::ScopedRef { .. } => {}
            Expr::Unary { operand, .. } => operand.replace_ref(target, value),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.replace_ref(target, value);
                rhs.replace_ref(target, value);
            }
            Expr::Cond {
                cond,
                then_expr,
                else_expr,
            } => {
                cond.replace_ref(target, value);
                then_expr.replace_ref(target, value);
                else_expr.replace_ref(target, value);
            }
            Expr::Clog2(operand) => operand.replace_ref(target, value),
            Expr::Aggregate(items) => {
                for item in items {
                    item.replace_ref(target, value);
                }
            }
        }
    }
}
