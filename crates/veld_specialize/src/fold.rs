//! Constant expression folding for the specialization pass.
//!
//! The pass consumes folding through the [`ConstFolder`] trait; [`Folder`] is
//! the default implementation. Folding is pure — it never mutates the graph
//! and never emits diagnostics itself. Callers decide whether a
//! [`FoldError`] is a user error (a generate condition that must be
//! constant) or expected (a probe that may fail).
//!
//! Conditionals fold the selector first and descend only the selected arm,
//! so an ill-formed untaken arm never produces an error.

use std::collections::HashMap;

use veld_diagnostics::DiagnosticSink;
use veld_ir::{
    BinaryOp, ConstValue, Decl, DeclId, DeclKind, Design, Expr, ModuleId, Type, UnaryOp,
};
use veld_source::Span;

use crate::errors;

/// A transient overlay mapping declarations to values, layered over the
/// module's constified parameters. Loop unrolling uses it to bind genvars.
pub type ConstEnv = HashMap<DeclId, ConstValue>;

/// The ways a fold can fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FoldError {
    /// The expression references something with no compile-time value.
    #[error("expression is not constant")]
    NotConstant,
    /// Division or modulo by zero.
    #[error("division by zero in constant expression")]
    DivideByZero,
    /// The operand types do not support the operation.
    #[error("unsupported operand in constant expression")]
    Unsupported,
}

/// The folding service consumed by the specialization pass.
pub trait ConstFolder {
    /// Folds an expression to a literal, or reports why it cannot.
    fn fold(
        &self,
        design: &Design,
        module: ModuleId,
        env: &ConstEnv,
        expr: &Expr,
    ) -> Result<ConstValue, FoldError>;

    /// Resolves the bit width of an expression against the type database.
    ///
    /// With `suppress_errors` set, unresolvable widths are silent; otherwise
    /// a diagnostic is emitted at `span`. Used with suppression on generate
    /// conditions, whose untaken arm may be ill-formed.
    fn resolve_width(
        &self,
        design: &Design,
        module: ModuleId,
        expr: &Expr,
        span: Span,
        suppress_errors: bool,
        sink: &DiagnosticSink,
    ) -> Option<u32>;
}

/// The default constant folder.
pub struct Folder;

impl Folder {
    fn decl_value(&self, decl: &Decl) -> Result<ConstValue, FoldError> {
        match &decl.kind {
            DeclKind::ValueParam {
                default: Some(Expr::Literal(v)),
                ..
            } => Ok(v.clone()),
            DeclKind::Local {
                init: Some(Expr::Literal(v)),
                ..
            } => Ok(v.clone()),
            _ => Err(FoldError::NotConstant),
        }
    }

    fn fold_unary(&self, op: UnaryOp, operand: ConstValue) -> Result<ConstValue, FoldError> {
        match op {
            UnaryOp::Neg => match operand {
                ConstValue::Real(f) => Ok(ConstValue::Real(-f)),
                other => {
                    let n = other.as_i64().ok_or(FoldError::Unsupported)?;
                    Ok(ConstValue::Int(n.wrapping_neg()))
                }
            },
            UnaryOp::BitNot => {
                let n = operand.as_i64().ok_or(FoldError::Unsupported)?;
                Ok(ConstValue::Int(!n))
            }
            UnaryOp::LogicNot => Ok(ConstValue::Bool(!operand.is_truthy())),
        }
    }

    fn fold_binary(
        &self,
        op: BinaryOp,
        lhs: ConstValue,
        rhs: ConstValue,
    ) -> Result<ConstValue, FoldError> {
        use BinaryOp::*;

        // String comparisons are textual; anything else on strings fails.
        if let (ConstValue::String(a), ConstValue::String(b)) = (&lhs, &rhs) {
            return match op {
                Eq => Ok(ConstValue::Bool(a == b)),
                Ne => Ok(ConstValue::Bool(a != b)),
                _ => Err(FoldError::Unsupported),
            };
        }

        let real_mode = matches!(lhs, ConstValue::Real(_)) || matches!(rhs, ConstValue::Real(_));
        if real_mode {
            let a = as_f64(&lhs).ok_or(FoldError::Unsupported)?;
            let b = as_f64(&rhs).ok_or(FoldError::Unsupported)?;
            return match op {
                Add => Ok(ConstValue::Real(a + b)),
                Sub => Ok(ConstValue::Real(a - b)),
                Mul => Ok(ConstValue::Real(a * b)),
                Div => {
                    if b == 0.0 {
                        Err(FoldError::DivideByZero)
                    } else {
                        Ok(ConstValue::Real(a / b))
                    }
                }
                Pow => Ok(ConstValue::Real(a.powf(b))),
                Eq => Ok(ConstValue::Bool(a == b)),
                Ne => Ok(ConstValue::Bool(a != b)),
                Lt => Ok(ConstValue::Bool(a < b)),
                Le => Ok(ConstValue::Bool(a <= b)),
                Gt => Ok(ConstValue::Bool(a > b)),
                Ge => Ok(ConstValue::Bool(a >= b)),
                _ => Err(FoldError::Unsupported),
            };
        }

        let a = lhs.as_i64().ok_or(FoldError::Unsupported)?;
        let b = rhs.as_i64().ok_or(FoldError::Unsupported)?;
        match op {
            Add => Ok(ConstValue::Int(a.wrapping_add(b))),
            Sub => Ok(ConstValue::Int(a.wrapping_sub(b))),
            Mul => Ok(ConstValue::Int(a.wrapping_mul(b))),
            Div => {
                if b == 0 {
                    Err(FoldError::DivideByZero)
                } else {
                    Ok(ConstValue::Int(a / b))
                }
            }
            Mod => {
                if b == 0 {
                    Err(FoldError::DivideByZero)
                } else {
                    Ok(ConstValue::Int(a % b))
                }
            }
            Pow => {
                if b < 0 {
                    Ok(ConstValue::Int(0))
                } else {
                    Ok(ConstValue::Int(a.wrapping_pow(b.min(u32::MAX as i64) as u32)))
                }
            }
            Shl => Ok(ConstValue::Int(if (0..64).contains(&b) { a << b } else { 0 })),
            Shr => Ok(ConstValue::Int(if (0..64).contains(&b) {
                ((a as u64) >> b) as i64
            } else {
                0
            })),
            Eq => Ok(ConstValue::Bool(a == b)),
            Ne => Ok(ConstValue::Bool(a != b)),
            Lt => Ok(ConstValue::Bool(a < b)),
            Le => Ok(ConstValue::Bool(a <= b)),
            Gt => Ok(ConstValue::Bool(a > b)),
            Ge => Ok(ConstValue::Bool(a >= b)),
            BitAnd => Ok(ConstValue::Int(a & b)),
            BitOr => Ok(ConstValue::Int(a | b)),
            BitXor => Ok(ConstValue::Int(a ^ b)),
            LogicAnd | LogicOr => unreachable!("short-circuited before operand fold"),
        }
    }

    fn width_of(&self, design: &Design, module: ModuleId, expr: &Expr) -> Option<u32> {
        match expr {
            Expr::Literal(v) => match v {
                ConstValue::Int(_) => Some(32),
                ConstValue::Real(_) => Some(64),
                ConstValue::Logic(lv) => Some(lv.width()),
                ConstValue::Bool(_) => Some(1),
                ConstValue::String(_) => None,
            },
            Expr::Ref(decl) => self.decl_width(design, &design.modules[module].decls[*decl]),
            Expr::ScopedRef { resolved, .. } => resolved.as_ref().and_then(|t| {
                self.decl_width(design, &design.modules[t.module].decls[t.decl])
            }),
            Expr::Unary { op, operand } => match op {
                UnaryOp::LogicNot => Some(1),
                _ => self.width_of(design, module, operand),
            },
            Expr::Binary { op, lhs, rhs } => {
                use BinaryOp::*;
                match op {
                    Eq | Ne | Lt | Le | Gt | Ge | LogicAnd | LogicOr => Some(1),
                    Shl | Shr => self.width_of(design, module, lhs),
                    _ => {
                        let l = self.width_of(design, module, lhs)?;
                        let r = self.width_of(design, module, rhs)?;
                        Some(l.max(r))
                    }
                }
            }
            Expr::Cond {
                then_expr,
                else_expr,
                ..
            } => {
                let t = self.width_of(design, module, then_expr)?;
                let e = self.width_of(design, module, else_expr)?;
                Some(t.max(e))
            }
            Expr::Clog2(_) => Some(32),
            Expr::Aggregate(_) => None,
        }
    }

    fn decl_width(&self, design: &Design, decl: &Decl) -> Option<u32> {
        match &decl.kind {
            DeclKind::Port { ty, .. }
            | DeclKind::ValueParam { ty, .. }
            | DeclKind::Local { ty, .. } => match design.types.get(*ty) {
                Type::Integer => Some(32),
                Type::Real => Some(64),
                _ => design.types.bit_width(*ty),
            },
            DeclKind::Genvar => Some(32),
            _ => None,
        }
    }
}

impl ConstFolder for Folder {
    fn fold(
        &self,
        design: &Design,
        module: ModuleId,
        env: &ConstEnv,
        expr: &Expr,
    ) -> Result<ConstValue, FoldError> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Ref(decl) => {
                if let Some(v) = env.get(decl) {
                    return Ok(v.clone());
                }
                self.decl_value(&design.modules[module].decls[*decl])
            }
            Expr::ScopedRef { resolved, .. } => match resolved {
                Some(target) => self.decl_value(&design.modules[target.module].decls[target.decl]),
                None => Err(FoldError::NotConstant),
            },
            Expr::Unary { op, operand } => {
                let v = self.fold(design, module, env, operand)?;
                self.fold_unary(*op, v)
            }
            Expr::Binary { op, lhs, rhs } => {
                // Logical operators short-circuit: the untaken side may be
                // ill-formed without failing the fold.
                match op {
                    BinaryOp::LogicAnd => {
                        let l = self.fold(design, module, env, lhs)?;
                        if !l.is_truthy() {
                            return Ok(ConstValue::Bool(false));
                        }
                        let r = self.fold(design, module, env, rhs)?;
                        Ok(ConstValue::Bool(r.is_truthy()))
                    }
                    BinaryOp::LogicOr => {
                        let l = self.fold(design, module, env, lhs)?;
                        if l.is_truthy() {
                            return Ok(ConstValue::Bool(true));
                        }
                        let r = self.fold(design, module, env, rhs)?;
                        Ok(ConstValue::Bool(r.is_truthy()))
                    }
                    _ => {
                        let l = self.fold(design, module, env, lhs)?;
                        let r = self.fold(design, module, env, rhs)?;
                        self.fold_binary(*op, l, r)
                    }
                }
            }
            Expr::Cond {
                cond,
                then_expr,
                else_expr,
            } => {
                let c = self.fold(design, module, env, cond)?;
                if c.is_truthy() {
                    self.fold(design, module, env, then_expr)
                } else {
                    self.fold(design, module, env, else_expr)
                }
            }
            Expr::Clog2(operand) => {
                let v = self.fold(design, module, env, operand)?;
                let n = v.as_i64().ok_or(FoldError::Unsupported)?;
                Ok(ConstValue::Int(clog2(n)))
            }
            Expr::Aggregate(_) => Err(FoldError::NotConstant),
        }
    }

    fn resolve_width(
        &self,
        design: &Design,
        module: ModuleId,
        expr: &Expr,
        span: Span,
        suppress_errors: bool,
        sink: &DiagnosticSink,
    ) -> Option<u32> {
        let width = self.width_of(design, module, expr);
        if width.is_none() && !suppress_errors {
            sink.emit(errors::error_width_unresolvable(span));
        }
        width
    }
}

fn as_f64(v: &ConstValue) -> Option<f64> {
    match v {
        ConstValue::Int(n) => Some(*n as f64),
        ConstValue::Real(f) => Some(*f),
        ConstValue::Bool(b) => Some(f64::from(u8::from(*b))),
        ConstValue::Logic(lv) => lv.to_u64().map(|u| u as f64),
        ConstValue::String(_) => None,
    }
}

/// Computes the ceiling of log-base-2 for a non-negative integer.
///
/// - `clog2(0) = 0`
/// - `clog2(1) = 0`
/// - `clog2(2) = 1`
/// - `clog2(3) = 2`
fn clog2(n: i64) -> i64 {
    if n <= 1 {
        return 0;
    }
    let mut result = 0i64;
    let mut val = n - 1;
    while val > 0 {
        result += 1;
        val >>= 1;
    }
    result
}
