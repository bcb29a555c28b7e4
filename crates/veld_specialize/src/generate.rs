//! Generate-construct elaboration over a module body.
//!
//! The walk resolves compile-time conditionals, selects, and loops away,
//! discovers cells (recording the generate qualifier current at discovery),
//! and constifies parameter declarations. Pruning is never done mid-visit:
//! the replacement item list is built first, substituted into the parent
//! list, and the walk restarts at the splice index.

use std::mem;

use veld_common::{InternalError, VeldResult};
use veld_ir::{
    BindValue, CellId, ConstValue, DeclId, DeclKind, Design, Expr, GenItem, IfaceVia, ModuleId,
    ScopedTarget,
};

use crate::context::SpecializeContext;
use crate::errors;
use crate::fold::{ConstEnv, ConstFolder};
use crate::unroll::Unroller;

/// Runs the generate elaborator over one module's body.
pub fn elaborate_module_body(ctx: &mut SpecializeContext, module: ModuleId) -> VeldResult<()> {
    let mut body = mem::take(&mut ctx.design.modules[module].body);
    let result = elaborate_items(ctx, module, &mut body);
    ctx.design.modules[module].body = body;
    result
}

/// Shallow classification so the item borrow ends before the list is edited.
enum Visit {
    Cell(CellId),
    Decl(DeclId),
    Assign,
    If,
    Case,
    BareFor,
    LoopScope,
    PlainScope,
    Function,
}

fn classify(item: &GenItem) -> Visit {
    match item {
        GenItem::Cell(cid) => Visit::Cell(*cid),
        GenItem::Decl(did) => Visit::Decl(*did),
        GenItem::Assign(_) => Visit::Assign,
        GenItem::If(_) => Visit::If,
        GenItem::Case(_) => Visit::Case,
        GenItem::For(_) => Visit::BareFor,
        GenItem::Scope(s) if s.genvar.is_some() => Visit::LoopScope,
        GenItem::Scope(_) => Visit::PlainScope,
        GenItem::Function(_) => Visit::Function,
    }
}

fn elaborate_items(
    ctx: &mut SpecializeContext,
    module: ModuleId,
    items: &mut Vec<GenItem>,
) -> VeldResult<()> {
    let mut i = 0;
    while i < items.len() {
        match classify(&items[i]) {
            Visit::Cell(cid) => {
                resolve_cell_refs(ctx, module, cid);
                ctx.cell_scope.insert(cid, ctx.gen_hier_name.clone());
                ctx.pending_cells.push(cid);
                i += 1;
            }
            Visit::Decl(did) => {
                if let Some(assign) = constify_decl(ctx, module, did)? {
                    items.insert(i + 1, GenItem::Assign(assign));
                }
                i += 1;
            }
            Visit::Assign => {
                let GenItem::Assign(a) = &mut items[i] else {
                    unreachable!()
                };
                resolve_scoped_refs(ctx.design, module, &mut a.value);
                i += 1;
            }
            Visit::If => {
                let (folded, span) = {
                    let GenItem::If(g) = &mut items[i] else {
                        unreachable!()
                    };
                    resolve_scoped_refs(ctx.design, module, &mut g.cond);
                    // The untaken branch may be ill-formed, so widthing the
                    // condition must stay silent.
                    ctx.folder
                        .resolve_width(ctx.design, module, &g.cond, g.span, true, ctx.sink);
                    let folded = ctx
                        .folder
                        .fold(ctx.design, module, &ConstEnv::new(), &g.cond);
                    (folded, g.span)
                };
                match folded {
                    Ok(v) => {
                        let taken = {
                            let GenItem::If(g) = &mut items[i] else {
                                unreachable!()
                            };
                            if v.is_truthy() {
                                mem::take(&mut g.then_items)
                            } else {
                                mem::take(&mut g.else_items)
                            }
                        };
                        items.splice(i..i + 1, taken);
                        // Restart on the replacement
                    }
                    Err(_) => {
                        ctx.sink.emit(errors::error_generate_not_const("if condition", span));
                        items.remove(i);
                    }
                }
            }
            Visit::Case => {
                elaborate_case(ctx, module, items, i);
            }
            Visit::BareFor => {
                return Err(InternalError::new(
                    "generate loop not wrapped in a genvar scope",
                ));
            }
            Visit::LoopScope => {
                let GenItem::Scope(scope) = items.remove(i) else {
                    unreachable!()
                };
                let base = ctx.interner.resolve(scope.name).to_string();
                if scope.items.len() != 1 {
                    return Err(InternalError::new("malformed generate loop scope"));
                }
                let Some(GenItem::For(mut for_)) = scope.items.into_iter().next() else {
                    return Err(InternalError::new("genvar scope does not wrap a loop"));
                };
                resolve_scoped_refs(ctx.design, module, &mut for_.init);
                resolve_scoped_refs(ctx.design, module, &mut for_.cond);
                resolve_scoped_refs(ctx.design, module, &mut for_.step);
                // Width-resolve the bound; the body is untouched here.
                ctx.folder.resolve_width(
                    ctx.design,
                    module,
                    &for_.cond,
                    for_.span,
                    true,
                    ctx.sink,
                );
                match ctx.unroller.plan(ctx.design, module, &ctx.folder, &for_) {
                    Ok(values) => {
                        let scopes = ctx.unroller.unroll(
                            ctx.design,
                            module,
                            &for_,
                            &base,
                            &values,
                            ctx.interner,
                        )?;
                        items.splice(i..i, scopes.into_iter().map(GenItem::Scope));
                        // Restart on the expansion
                    }
                    Err(detail) => {
                        ctx.sink.emit(errors::error_bad_trip_count(&detail, for_.span));
                    }
                }
            }
            Visit::PlainScope => {
                let (name, mut sub) = {
                    let GenItem::Scope(s) = &mut items[i] else {
                        unreachable!()
                    };
                    (
                        ctx.interner.resolve(s.name).to_string(),
                        mem::take(&mut s.items),
                    )
                };
                let result = ctx.with_scope_name(&name, |ctx| {
                    elaborate_items(ctx, module, &mut sub)
                });
                let GenItem::Scope(s) = &mut items[i] else {
                    unreachable!()
                };
                s.items = sub;
                result?;
                i += 1;
            }
            Visit::Function => {
                let mut sub = {
                    let GenItem::Function(f) = &mut items[i] else {
                        unreachable!()
                    };
                    mem::take(&mut f.items)
                };
                ctx.function_depth += 1;
                let result = elaborate_items(ctx, module, &mut sub);
                ctx.function_depth -= 1;
                let GenItem::Function(f) = &mut items[i] else {
                    unreachable!()
                };
                f.items = sub;
                result?;
                i += 1;
            }
        }
    }
    Ok(())
}

/// Resolves a multi-way select in place at `items[i]`.
///
/// Arms are evaluated in declaration order; within an arm, labels are tested
/// left to right and the first equal label wins; the first matching arm wins
/// overall, falling back to the default arm, else the construct resolves to
/// nothing. Every unfoldable label is reported, match or no match.
fn elaborate_case(
    ctx: &mut SpecializeContext,
    module: ModuleId,
    items: &mut Vec<GenItem>,
    i: usize,
) {
    let selector = {
        let GenItem::Case(g) = &mut items[i] else {
            unreachable!()
        };
        resolve_scoped_refs(ctx.design, module, &mut g.selector);
        for arm in &mut g.items {
            for label in &mut arm.labels {
                resolve_scoped_refs(ctx.design, module, label);
            }
        }
        ctx.folder
            .resolve_width(ctx.design, module, &g.selector, g.span, true, ctx.sink);
        ctx.folder
            .fold(ctx.design, module, &ConstEnv::new(), &g.selector)
    };

    let selector = match selector {
        Ok(v) => v,
        Err(_) => {
            let GenItem::Case(g) = &items[i] else {
                unreachable!()
            };
            ctx.sink
                .emit(errors::error_generate_not_const("case selector", g.span));
            items.remove(i);
            return;
        }
    };

    let mut chosen: Option<usize> = None;
    {
        let GenItem::Case(g) = &items[i] else {
            unreachable!()
        };
        for (idx, arm) in g.items.iter().enumerate() {
            if arm.is_default {
                continue;
            }
            for label in &arm.labels {
                match ctx.folder.fold(ctx.design, module, &ConstEnv::new(), label) {
                    Ok(v) => {
                        if chosen.is_none() && const_matches(&selector, &v) {
                            chosen = Some(idx);
                        }
                    }
                    Err(_) => {
                        ctx.sink.emit(errors::error_case_label_not_const(arm.span));
                    }
                }
            }
        }
        if chosen.is_none() {
            chosen = g.items.iter().position(|arm| arm.is_default);
        }
    }

    let replacement = match chosen {
        Some(idx) => {
            let GenItem::Case(g) = &mut items[i] else {
                unreachable!()
            };
            mem::take(&mut g.items[idx].body)
        }
        None => Vec::new(),
    };
    items.splice(i..i + 1, replacement);
}

/// Numeric label equality: integral values compare by value, everything
/// else structurally.
fn const_matches(selector: &ConstValue, label: &ConstValue) -> bool {
    match (selector.as_i64(), label.as_i64()) {
        (Some(a), Some(b)) => a == b,
        _ => selector == label,
    }
}

/// One-shot parameter constification.
///
/// Parameters must hold a literal before first use. A non-literal
/// initializer becomes an explicit initial assignment spliced after the
/// declaration, deferring evaluation; inside a function scope that has no
/// safe statement position and is reported instead.
fn constify_decl(
    ctx: &mut SpecializeContext,
    module: ModuleId,
    did: DeclId,
) -> VeldResult<Option<veld_ir::AssignStmt>> {
    if !ctx.mark_constified(module, did) {
        return Ok(None);
    }
    enum Kind {
        ParamWithoutValue,
        Param,
        LocalWithInit,
        Other,
    }

    let (name, span, kind) = {
        let decl = &ctx.design.modules[module].decls[did];
        let kind = match &decl.kind {
            DeclKind::ValueParam { default: None, .. } => Kind::ParamWithoutValue,
            DeclKind::ValueParam { .. } => Kind::Param,
            DeclKind::Local { init: Some(_), .. } => Kind::LocalWithInit,
            _ => Kind::Other,
        };
        (decl.name, decl.span, kind)
    };

    match kind {
        Kind::ParamWithoutValue => {
            let name = ctx.interner.resolve(name).to_string();
            ctx.sink.emit(errors::error_param_no_value(&name, span));
            Ok(None)
        }
        Kind::Param => {
            let mut expr = take_param_default(ctx.design, module, did)
                .ok_or_else(|| InternalError::new("parameter default vanished"))?;
            resolve_scoped_refs(ctx.design, module, &mut expr);
            let folded = ctx.folder.fold(ctx.design, module, &ConstEnv::new(), &expr);
            match folded {
                Ok(v) => {
                    put_param_default(ctx.design, module, did, Expr::Literal(v));
                    Ok(None)
                }
                Err(_) => {
                    let assign = veld_ir::AssignStmt {
                        target: did,
                        value: expr.clone(),
                        span,
                    };
                    put_param_default(ctx.design, module, did, expr);
                    if ctx.function_depth > 0 {
                        let name = ctx.interner.resolve(name).to_string();
                        ctx.sink
                            .emit(errors::error_param_complex_in_function(&name, span));
                    }
                    Ok(Some(assign))
                }
            }
        }
        Kind::LocalWithInit => {
            let mut expr = take_local_init(ctx.design, module, did)
                .ok_or_else(|| InternalError::new("local initializer vanished"))?;
            resolve_scoped_refs(ctx.design, module, &mut expr);
            put_local_init(ctx.design, module, did, expr);
            Ok(None)
        }
        Kind::Other => Ok(None),
    }
}

fn take_param_default(design: &mut Design, module: ModuleId, did: DeclId) -> Option<Expr> {
    match &mut design.modules[module].decls[did].kind {
        DeclKind::ValueParam { default, .. } => default.take(),
        _ => None,
    }
}

fn put_param_default(design: &mut Design, module: ModuleId, did: DeclId, expr: Expr) {
    if let DeclKind::ValueParam { default, .. } = &mut design.modules[module].decls[did].kind {
        *default = Some(expr);
    }
}

fn take_local_init(design: &mut Design, module: ModuleId, did: DeclId) -> Option<Expr> {
    match &mut design.modules[module].decls[did].kind {
        DeclKind::Local { init, .. } => init.take(),
        _ => None,
    }
}

fn put_local_init(design: &mut Design, module: ModuleId, did: DeclId, expr: Expr) {
    if let DeclKind::Local { init, .. } = &mut design.modules[module].decls[did].kind {
        *init = Some(expr);
    }
}

/// Resolves dotted cross-scope references in a cell's binding expressions.
fn resolve_cell_refs(ctx: &mut SpecializeContext, module: ModuleId, cid: CellId) {
    let mut pbinds = mem::take(&mut ctx.design.modules[module].cells[cid].param_binds);
    let mut portbinds = mem::take(&mut ctx.design.modules[module].cells[cid].port_binds);
    for pb in &mut pbinds {
        if let Some(BindValue::Expr(expr)) = &mut pb.value {
            resolve_scoped_refs(ctx.design, module, expr);
        }
    }
    for pb in &mut portbinds {
        if let Some(expr) = &mut pb.expr {
            resolve_scoped_refs(ctx.design, module, expr);
        }
    }
    let cell = &mut ctx.design.modules[module].cells[cid];
    cell.param_binds = pbinds;
    cell.port_binds = portbinds;
}

/// What a dotted reference resolved to.
enum Resolution {
    /// Rebind the reference to an interface member declaration.
    Rebind(ScopedTarget),
    /// Substitute a pending parameter-binding pin's expression in place.
    Inline(Expr),
}

/// Resolves every unresolved [`Expr::ScopedRef`] in an expression tree.
///
/// A dotted reference crossing into an interface walks enclosing scopes
/// upward from the reference: the dotted prefix must name an interface-typed
/// port or an interface cell before a template boundary is hit. An in-module
/// interface cell's pending parameter-binding pins are consulted first (a
/// pin match substitutes its expression in place), then the interface's
/// member declarations by name (a declaration match rebinds the reference).
/// Anything else is left unresolved for downstream reporting.
pub fn resolve_scoped_refs(design: &Design, module: ModuleId, expr: &mut Expr) {
    if let Expr::ScopedRef {
        scope,
        name,
        resolved: None,
    } = expr
    {
        let (scope, name) = (*scope, *name);
        match resolve_one(design, module, scope, name) {
            Some(Resolution::Rebind(target)) => {
                if let Expr::ScopedRef { resolved, .. } = expr {
                    *resolved = Some(target);
                }
            }
            Some(Resolution::Inline(inlined)) => *expr = inlined,
            None => {}
        }
        return;
    }
    match expr {
        Expr::Literal(_) | Expr::Ref(_) | Expr::ScopedRef { .. } => {}
        Expr::Unary { operand, .. } => resolve_scoped_refs(design, module, operand),
        Expr::Binary { lhs, rhs, .. } => {
            resolve_scoped_refs(design, module, lhs);
            resolve_scoped_refs(design, module, rhs);
        }
        Expr::Cond {
            cond,
            then_expr,
            else_expr,
        } => {
            resolve_scoped_refs(design, module, cond);
            resolve_scoped_refs(design, module, then_expr);
            resolve_scoped_refs(design, module, else_expr);
        }
        Expr::Clog2(operand) => resolve_scoped_refs(design, module, operand),
        Expr::Aggregate(items) => {
            for item in items {
                resolve_scoped_refs(design, module, item);
            }
        }
    }
}

fn resolve_one(
    design: &Design,
    module: ModuleId,
    scope: veld_common::Ident,
    name: veld_common::Ident,
) -> Option<Resolution> {
    let m = &design.modules[module];

    // Locate the interface the dotted prefix names, and the instantiating
    // cell when there is one.
    let mut iface: Option<ModuleId> = None;
    let mut pin_cell: Option<(ModuleId, CellId)> = None;
    if let Some(did) = m.find_decl(scope) {
        if let Some(iref) = m.decls[did].iface_ref() {
            iface = design.iface_concrete(iref);
            if let IfaceVia::Cell { module: cm, cell } = iref.via {
                pin_cell = Some((cm, cell));
            }
        }
    }
    if iface.is_none() {
        if let Some(cid) = m.find_cell(scope) {
            let target = m.cells[cid].module;
            if design.modules[target].is_interface {
                iface = Some(target);
                pin_cell = Some((module, cid));
            }
        }
    }
    // Template boundary: the prefix names nothing interface-shaped here.
    let iface = iface?;

    // An interface instantiated in this module still carries its pending
    // parameter-binding pins; those hold the instance's values and take
    // precedence over the template's member declarations.
    if let Some((cm, cid)) = pin_cell {
        if let Some(pb) = design.modules[cm].cells[cid]
            .param_binds
            .iter()
            .find(|p| p.name == name)
        {
            if let Some(BindValue::Expr(e)) = &pb.value {
                return Some(Resolution::Inline(e.clone()));
            }
        }
    }
    if let Some(did) = design.modules[iface].find_decl(name) {
        if matches!(
            design.modules[iface].decls[did].kind,
            DeclKind::ValueParam { .. }
        ) {
            return Some(Resolution::Rebind(ScopedTarget {
                module: iface,
                decl: did,
            }));
        }
    }
    None
}
