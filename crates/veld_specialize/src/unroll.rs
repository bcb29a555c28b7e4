//! Bounded generate-loop unrolling.
//!
//! The generate elaborator validates the trip count, then delegates
//! expansion to the [`Unroller`] collaborator. Each iteration becomes a
//! uniquely named scope copy with the loop variable substituted by that
//! iteration's constant. Cells and declarations referenced by the loop body
//! are duplicated into fresh arena slots, with body-local references
//! remapped into each copy.

use std::collections::HashMap;

use veld_common::{Interner, VeldResult};
use veld_ir::{
    BindValue, ConstValue, DeclId, DeclKind, Design, Expr, GenFor, GenItem, GenScope, ModuleId,
};

use crate::fold::{ConstEnv, ConstFolder, Folder};

/// The loop-expansion service consumed by the generate elaborator.
pub trait Unroller {
    /// Produces one uniquely named scope copy per value in `values`, with
    /// the loop variable substituted by the successive constants.
    fn unroll(
        &self,
        design: &mut Design,
        module: ModuleId,
        for_: &GenFor,
        scope_base: &str,
        values: &[ConstValue],
        interner: &Interner,
    ) -> VeldResult<Vec<GenScope>>;
}

/// The default unroller, bounded by the configured iteration limit.
pub struct BoundedUnroller {
    max_iterations: i64,
}

impl BoundedUnroller {
    /// Creates an unroller with the given iteration bound.
    pub fn new(max_iterations: i64) -> Self {
        Self { max_iterations }
    }

    /// Simulates the init/cond/step chain and returns the successive loop
    /// variable values, without descending into the body.
    ///
    /// Fails with a description when the chain does not fold or the trip
    /// count exceeds the bound.
    pub fn plan(
        &self,
        design: &Design,
        module: ModuleId,
        folder: &Folder,
        for_: &GenFor,
    ) -> Result<Vec<ConstValue>, String> {
        let mut values = Vec::new();
        let mut env = ConstEnv::new();
        let mut current = folder
            .fold(design, module, &env, &for_.init)
            .map_err(|e| format!("initial value: {e}"))?;
        loop {
            env.insert(for_.var, current.clone());
            let cond = folder
                .fold(design, module, &env, &for_.cond)
                .map_err(|e| format!("condition: {e}"))?;
            if !cond.is_truthy() {
                break;
            }
            values.push(current.clone());
            if values.len() as i64 > self.max_iterations {
                return Err(format!(
                    "trip count exceeds the limit of {} iterations",
                    self.max_iterations
                ));
            }
            current = folder
                .fold(design, module, &env, &for_.step)
                .map_err(|e| format!("step: {e}"))?;
        }
        Ok(values)
    }
}

impl Unroller for BoundedUnroller {
    fn unroll(
        &self,
        design: &mut Design,
        module: ModuleId,
        for_: &GenFor,
        scope_base: &str,
        values: &[ConstValue],
        interner: &Interner,
    ) -> VeldResult<Vec<GenScope>> {
        let mut scopes = Vec::with_capacity(values.len());
        for value in values {
            let mut remap = HashMap::new();
            let items = copy_items(design, module, &for_.body, &mut remap, for_.var, value);
            let label = match value.as_i64() {
                Some(n) => n.to_string(),
                None => format!("{value:?}"),
            };
            let name = interner.get_or_intern(&format!("{scope_base}[{label}]"));
            scopes.push(GenScope {
                name,
                genvar: None,
                items,
                span: for_.span,
            });
        }
        Ok(scopes)
    }
}

/// Rewrites an expression for one iteration copy: body-local references
/// follow their duplicated declarations, then the loop variable becomes the
/// iteration constant.
fn rewrite(expr: &mut Expr, remap: &HashMap<DeclId, DeclId>, genvar: DeclId, value: &ConstValue) {
    expr.remap_decls(remap);
    expr.replace_ref(genvar, value);
}

fn copy_items(
    design: &mut Design,
    module: ModuleId,
    items: &[GenItem],
    remap: &mut HashMap<DeclId, DeclId>,
    genvar: DeclId,
    value: &ConstValue,
) -> Vec<GenItem> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            GenItem::Cell(cid) => {
                let mut cell = design.modules[module].cells[*cid].clone();
                for pb in &mut cell.param_binds {
                    if let Some(BindValue::Expr(expr)) = &mut pb.value {
                        rewrite(expr, remap, genvar, value);
                    }
                }
                for pb in &mut cell.port_binds {
                    if let Some(expr) = &mut pb.expr {
                        rewrite(expr, remap, genvar, value);
                    }
                }
                let new_id = design.modules[module].cells.next_id();
                cell.id = new_id;
                design.modules[module].cells.alloc(cell);
                out.push(GenItem::Cell(new_id));
            }
            GenItem::Decl(did) => {
                let mut decl = design.modules[module].decls[*did].clone();
                match &mut decl.kind {
                    DeclKind::ValueParam {
                        default: Some(expr),
                        ..
                    }
                    | DeclKind::Local {
                        init: Some(expr), ..
                    } => rewrite(expr, remap, genvar, value),
                    _ => {}
                }
                let new_id = design.modules[module].decls.next_id();
                decl.id = new_id;
                design.modules[module].decls.alloc(decl);
                remap.insert(*did, new_id);
                out.push(GenItem::Decl(new_id));
            }
            GenItem::Assign(a) => {
                let mut a = a.clone();
                if let Some(new) = remap.get(&a.target) {
                    a.target = *new;
                }
                rewrite(&mut a.value, remap, genvar, value);
                out.push(GenItem::Assign(a));
            }
            GenItem::If(g) => {
                let mut cond = g.cond.clone();
                rewrite(&mut cond, remap, genvar, value);
                let then_items = copy_items(design, module, &g.then_items, remap, genvar, value);
                let else_items = copy_items(design, module, &g.else_items, remap, genvar, value);
                out.push(GenItem::If(veld_ir::GenIf {
                    cond,
                    then_items,
                    else_items,
                    span: g.span,
                }));
            }
            GenItem::Case(g) => {
                let mut selector = g.selector.clone();
                rewrite(&mut selector, remap, genvar, value);
                let mut arms = Vec::with_capacity(g.items.len());
                for arm in &g.items {
                    let mut labels = arm.labels.clone();
                    for label in &mut labels {
                        rewrite(label, remap, genvar, value);
                    }
                    arms.push(veld_ir::GenCaseItem {
                        labels,
                        is_default: arm.is_default,
                        body: copy_items(design, module, &arm.body, remap, genvar, value),
                        span: arm.span,
                    });
                }
                out.push(GenItem::Case(veld_ir::GenCase {
                    selector,
                    items: arms,
                    span: g.span,
                }));
            }
            GenItem::For(g) => {
                let mut inner = g.clone();
                if let Some(new) = remap.get(&inner.var) {
                    inner.var = *new;
                }
                rewrite(&mut inner.init, remap, genvar, value);
                rewrite(&mut inner.cond, remap, genvar, value);
                rewrite(&mut inner.step, remap, genvar, value);
                inner.body = copy_items(design, module, &g.body, remap, genvar, value);
                out.push(GenItem::For(inner));
            }
            GenItem::Scope(s) => {
                let mut scope = s.clone();
                if let Some(var) = scope.genvar {
                    if let Some(new) = remap.get(&var) {
                        scope.genvar = Some(*new);
                    }
                }
                scope.items = copy_items(design, module, &s.items, remap, genvar, value);
                out.push(GenItem::Scope(scope));
            }
            GenItem::Function(f) => {
                let mut func = f.clone();
                func.items = copy_items(design, module, &f.items, remap, genvar, value);
                out.push(GenItem::Function(func));
            }
        }
    }
    out
}
