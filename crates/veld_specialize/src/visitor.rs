//! The module specializer: level-ordered worklist orchestration and
//! per-cell specialization.
//!
//! Modules come off the worklist in non-decreasing hierarchy-level order.
//! Each module's body is generate-elaborated, then its discovered cells are
//! specialized in two ordered waves — interface-template cells first, then
//! the rest — because a non-interface cell's port bindings may need an
//! already-finalized interface cell's concrete identity from the same
//! module. Within a wave, cells go in declaration order.

use std::mem;

use veld_common::{InternalError, VeldResult};
use veld_ir::{
    BindValue, CellId, ConstValue, DeclId, DeclKind, Expr, IfaceVia, InterfaceRef, ModuleId,
    ParamBinding, PortBinding,
};
use veld_source::Span;

use crate::clone::{
    build_decl_remap, deep_clone_module, relink_pins, relink_pins_by_name, CacheEntry,
};
use crate::context::SpecializeContext;
use crate::errors;
use crate::fold::{ConstEnv, ConstFolder};
use crate::generate::elaborate_module_body;
use crate::hier::{check_supported_bindings, MatchOutcome};
use crate::naming::{const_ascii, encode_const, encode_type};

/// Runs the whole pass: seeds the worklist with the top module and drains
/// it in level order.
pub fn run(ctx: &mut SpecializeContext) -> VeldResult<()> {
    let top = ctx.design.top;
    ctx.enqueue(top);
    while let Some(module) = ctx.pop_next() {
        process_module(ctx, module)?;
    }
    Ok(())
}

/// Processes one module: establishes its diagnostic hierarchy name, runs
/// the generate elaborator, then specializes the discovered cells in two
/// waves.
fn process_module(ctx: &mut SpecializeContext, module: ModuleId) -> VeldResult<()> {
    if ctx.design.modules[module].hier_name.is_empty() {
        let origin = ctx.design.modules[module].origin_name;
        ctx.design.modules[module].hier_name = ctx.interner.resolve(origin).to_string();
    }

    ctx.gen_hier_name.clear();
    ctx.function_depth = 0;
    ctx.pending_cells.clear();
    ctx.cell_scope.clear();

    elaborate_module_body(ctx, module)?;

    let cells = mem::take(&mut ctx.pending_cells);
    for wave in 0..2 {
        for &cid in &cells {
            let target = ctx.design.modules[module].cells[cid].module;
            let is_iface = ctx.design.modules[target].is_interface;
            let in_wave = if wave == 0 { is_iface } else { !is_iface };
            if !in_wave {
                continue;
            }
            let mut full_name = ctx.design.modules[module].hier_name.clone();
            if let Some(qualifier) = ctx.cell_scope.get(&cid) {
                full_name.push_str(qualifier);
            }
            visit_cell(ctx, module, cid, &full_name)?;
        }
    }
    ctx.cell_scope.clear();
    Ok(())
}

/// Specializes one cell instance.
///
/// Always runs, even with no parameter bindings: interface identity and
/// recursion markers must be handled regardless.
fn visit_cell(
    ctx: &mut SpecializeContext,
    parent: ModuleId,
    cid: CellId,
    hier_name: &str,
) -> VeldResult<()> {
    let src = ctx.design.modules[parent].cells[cid].module;
    let cell_name = ctx.design.modules[parent].cells[cid].name;
    let cell_span = ctx.design.modules[parent].cells[cid].span;
    let cell_recursive = ctx.design.modules[parent].cells[cid].is_recursive;
    let cell_name_str = ctx.interner.resolve(cell_name).to_string();

    // The instantiated template's diagnostic name; a later clone inherits it.
    ctx.design.modules[src].hier_name = format!("{hier_name}.{cell_name_str}");

    let mut pbinds = mem::take(&mut ctx.design.modules[parent].cells[cid].param_binds);
    let mut portbinds = mem::take(&mut ctx.design.modules[parent].cells[cid].port_binds);

    constify_bindings(ctx, parent, &cell_name_str, &mut pbinds);

    let src_base = ctx.interner.resolve(ctx.design.modules[src].name).to_string();
    let mut longname = format!("{src_base}_");
    // A recursive self-reference always clones.
    let mut any_overrides = cell_recursive;

    collect_param_overrides(
        ctx,
        src,
        &cell_name_str,
        &pbinds,
        &mut longname,
        &mut any_overrides,
    );

    let iface_rebinds = collect_iface_rebinds(
        ctx,
        parent,
        src,
        &portbinds,
        &mut longname,
        &mut any_overrides,
    );

    let mut abandoned = false;
    if any_overrides {
        let origin = ctx
            .interner
            .resolve(ctx.design.modules[src].origin_name)
            .to_string();
        let mut handled = false;

        if ctx.design.modules[src].is_hier_block {
            match ctx.catalog.find_replacement(
                ctx.design,
                &origin,
                &pbinds,
                src,
                ctx.interner,
                ctx.sink,
                cell_span,
            )? {
                MatchOutcome::Matched(replacement) => {
                    ctx.design.modules[parent].cells[cid].module = replacement;
                    ctx.design.modules[replacement].is_dead = false;
                    relink_pins_by_name(ctx.design, replacement, &mut pbinds, &mut portbinds)?;
                    handled = true;
                }
                MatchOutcome::NoMatch => {
                    ctx.sink.emit(errors::error_no_hier_variant(&origin, cell_span));
                    handled = true;
                }
                MatchOutcome::Unsupported => {
                    handled = true;
                }
                MatchOutcome::NotCataloged => {}
            }
        }

        if !handled {
            let is_hier = ctx.design.modules[src].is_hier_block;
            let hier_seed = hier_digest_seed(ctx, &pbinds);
            let newname = ctx
                .naming
                .resolve_name(&longname, &src_base, is_hier, &hier_seed);

            let entry = match ctx.cache.probe(&newname) {
                Some(entry) => entry,
                None => {
                    let entry = make_clone(
                        ctx,
                        parent,
                        src,
                        &newname,
                        &origin,
                        &pbinds,
                        &iface_rebinds,
                        cell_span,
                        &mut abandoned,
                    )?;
                    ctx.cache.insert(newname.clone(), entry.clone());
                    ctx.naming.register_name(&newname);
                    entry
                }
            };

            relink_pins(&mut pbinds, &mut portbinds, &entry.remap)?;
            ctx.design.modules[parent].cells[cid].module = entry.module;
        }
    }

    // Parameter pins are irrelevant post-specialization: detach and discard.
    drop(pbinds);
    let cell = &mut ctx.design.modules[parent].cells[cid];
    cell.port_binds = portbinds;
    cell.is_recursive = false;

    let winner = ctx.design.modules[parent].cells[cid].module;
    if !ctx.is_processed(winner) && !abandoned {
        ctx.enqueue(winner);
    }
    Ok(())
}

/// Reduces every value binding to a literal (aggregates element-wise),
/// reporting and zeroing anything that will not fold.
fn constify_bindings(
    ctx: &mut SpecializeContext,
    parent: ModuleId,
    cell_name: &str,
    pbinds: &mut [ParamBinding],
) {
    for pb in pbinds.iter_mut() {
        let Some(BindValue::Expr(expr)) = &mut pb.value else {
            continue;
        };
        match expr {
            Expr::Literal(_) => {}
            Expr::Aggregate(elements) => {
                let mut failed = false;
                for element in elements.iter_mut() {
                    if element.as_literal().is_some() {
                        continue;
                    }
                    match ctx
                        .folder
                        .fold(ctx.design, parent, &ConstEnv::new(), element)
                    {
                        Ok(v) => *element = Expr::Literal(v),
                        Err(_) => {
                            *element = Expr::Literal(ConstValue::Int(0));
                            failed = true;
                        }
                    }
                }
                if failed {
                    let name = ctx.interner.resolve(pb.name).to_string();
                    ctx.sink
                        .emit(errors::error_binding_not_const(&name, cell_name, pb.span));
                }
            }
            _ => {
                match ctx.folder.fold(ctx.design, parent, &ConstEnv::new(), expr) {
                    Ok(v) => *expr = Expr::Literal(v),
                    Err(_) => {
                        let name = ctx.interner.resolve(pb.name).to_string();
                        ctx.sink
                            .emit(errors::error_binding_not_const(&name, cell_name, pb.span));
                        // Error recovery: later stages still see a constant.
                        *expr = Expr::Literal(ConstValue::Int(0));
                    }
                }
            }
        }
    }
}

/// Walks the parameter pins in order, appending a short code plus value
/// encoding for every pin whose binding is not structurally identical to
/// the declaration's own default.
fn collect_param_overrides(
    ctx: &mut SpecializeContext,
    src: ModuleId,
    cell_name: &str,
    pbinds: &[ParamBinding],
    longname: &mut String,
    any_overrides: &mut bool,
) {
    for pb in pbinds.iter() {
        let Some(value) = &pb.value else {
            continue; // no-connect
        };
        let Some(did) = pb.decl else {
            let name = ctx.interner.resolve(pb.name).to_string();
            ctx.sink
                .emit(errors::error_unknown_param_pin(&name, cell_name, pb.span));
            continue;
        };

        enum Part {
            Skip,
            Plain(String),
            Token(Vec<u8>, String),
        }

        let part = {
            let decl = &ctx.design.modules[src].decls[did];
            let decl_name = ctx.interner.resolve(decl.name).to_string();
            match (&decl.kind, value) {
                (DeclKind::ValueParam { default, ty, .. }, BindValue::Expr(expr)) => {
                    match expr {
                        Expr::Aggregate(elements) => {
                            if ctx.design.types.is_array(*ty) {
                                let mut bytes = Vec::new();
                                for element in elements {
                                    if let Some(v) = element.as_literal() {
                                        bytes.extend(encode_const(v));
                                    }
                                }
                                Part::Token(bytes, decl_name)
                            } else {
                                ctx.sink.emit(errors::error_binding_not_const(
                                    &decl_name, cell_name, pb.span,
                                ));
                                Part::Skip
                            }
                        }
                        Expr::Literal(v) => {
                            let matches_default =
                                matches!(default, Some(d) if d == expr || d.as_literal() == Some(v));
                            if matches_default {
                                Part::Skip
                            } else if let Some(plain) = v.plain_encoding() {
                                Part::Plain(plain)
                            } else {
                                Part::Token(encode_const(v), decl_name)
                            }
                        }
                        // constify_bindings left only literals and aggregates
                        _ => Part::Skip,
                    }
                }
                (DeclKind::TypeParam { default, .. }, BindValue::Type(ty)) => {
                    if *default == Some(*ty) {
                        Part::Skip
                    } else {
                        Part::Token(encode_type(*ty), decl_name)
                    }
                }
                (DeclKind::ValueParam { .. }, BindValue::Type(_))
                | (DeclKind::TypeParam { .. }, BindValue::Expr(_)) => {
                    ctx.sink.emit(errors::error_param_kind_mismatch(
                        &decl_name, cell_name, pb.span,
                    ));
                    Part::Skip
                }
                _ => {
                    ctx.sink.emit(errors::error_non_param_binding(
                        &decl_name, cell_name, pb.span,
                    ));
                    Part::Skip
                }
            }
        };

        match part {
            Part::Skip => {}
            Part::Plain(text) => {
                let code = ctx.naming.short_code(ctx.design, src, did, ctx.interner);
                longname.push('_');
                longname.push_str(&code);
                longname.push_str(&text);
                *any_overrides = true;
            }
            Part::Token(bytes, key) => {
                let code = ctx.naming.short_code(ctx.design, src, did, ctx.interner);
                let token = ctx.naming.value_token(&bytes, &key);
                longname.push('_');
                longname.push_str(&code);
                longname.push_str(&token);
                *any_overrides = true;
            }
        }
    }
}

/// Scans port bindings for interface ports whose concrete interface differs
/// from the template's own, contributing name tokens and recording the
/// rebind for the clone fixup.
fn collect_iface_rebinds(
    ctx: &mut SpecializeContext,
    parent: ModuleId,
    src: ModuleId,
    portbinds: &[PortBinding],
    longname: &mut String,
    any_overrides: &mut bool,
) -> Vec<(DeclId, InterfaceRef)> {
    let mut rebinds = Vec::new();
    for pb in portbinds {
        let Some(did) = pb.decl else {
            continue;
        };
        let port_iref = {
            let decl = &ctx.design.modules[src].decls[did];
            match decl.iface_ref() {
                Some(iref) => *iref,
                None => continue,
            }
        };

        let pin_iref = pb
            .expr
            .as_ref()
            .and_then(|expr| iface_ref_of_expr(ctx, parent, expr));
        let Some(pin_iref) = pin_iref else {
            let port = ctx
                .interner
                .resolve(ctx.design.modules[src].decls[did].name)
                .to_string();
            ctx.sink.emit(errors::error_iface_not_connected(&port, pb.span));
            continue;
        };

        let port_concrete = ctx.design.iface_concrete(&port_iref);
        let pin_concrete = ctx.design.iface_concrete(&pin_iref);
        if port_concrete == pin_concrete {
            continue;
        }

        let key = match pin_concrete {
            Some(m) => ctx
                .interner
                .resolve(ctx.design.modules[m].name)
                .to_string(),
            None => ctx.interner.resolve(pin_iref.iface_name).to_string(),
        };
        let code = ctx.naming.short_code(ctx.design, src, did, ctx.interner);
        let token = ctx.naming.value_token(key.as_bytes(), &key);
        longname.push('_');
        longname.push_str(&code);
        longname.push_str(&token);
        *any_overrides = true;
        rebinds.push((did, pin_iref));

        if port_iref.iface_name != pin_iref.iface_name {
            let port = ctx
                .interner
                .resolve(ctx.design.modules[src].decls[did].name)
                .to_string();
            let expected = ctx.interner.resolve(port_iref.iface_name).to_string();
            let actual = ctx.interner.resolve(pin_iref.iface_name).to_string();
            ctx.sink
                .emit(errors::error_iface_mismatch(&port, &expected, &actual, pb.span));
        }
    }
    rebinds
}

/// Extracts the interface reference carried by a port-binding expression.
fn iface_ref_of_expr(
    ctx: &SpecializeContext,
    parent: ModuleId,
    expr: &Expr,
) -> Option<InterfaceRef> {
    match expr {
        Expr::Ref(did) => ctx.design.modules[parent].decls[*did].iface_ref().copied(),
        Expr::ScopedRef {
            resolved: Some(target),
            ..
        } => ctx.design.modules[target.module].decls[target.decl]
            .iface_ref()
            .copied(),
        _ => None,
    }
}

/// Collects (parameter name, literal text) pairs for the hierarchical-block
/// digest.
fn hier_digest_seed(ctx: &SpecializeContext, pbinds: &[ParamBinding]) -> Vec<(String, String)> {
    let mut seed = Vec::new();
    for pb in pbinds {
        if pb.decl.is_none() {
            continue;
        }
        if let Some(BindValue::Expr(expr)) = &pb.value {
            if let Some(v) = expr.as_literal() {
                seed.push((
                    ctx.interner.resolve(pb.name).to_string(),
                    const_ascii(v),
                ));
            }
        }
    }
    seed
}

/// Produces the fresh clone for a cache miss: deep copy, level fixup,
/// recursion-depth check, declaration remap, interface rewrites, and
/// override write-back.
#[allow(clippy::too_many_arguments)]
fn make_clone(
    ctx: &mut SpecializeContext,
    parent: ModuleId,
    src: ModuleId,
    newname: &str,
    origin: &str,
    pbinds: &[ParamBinding],
    iface_rebinds: &[(DeclId, InterfaceRef)],
    cell_span: Span,
    abandoned: &mut bool,
) -> VeldResult<CacheEntry> {
    let new_ident = ctx.interner.get_or_intern(newname);
    let clone = deep_clone_module(ctx.design, src, new_ident);

    // Levels strictly increase parent to child; recursion may need fixups.
    let parent_level = ctx.design.modules[parent].level;
    if ctx.design.modules[clone].level <= parent_level {
        ctx.design.modules[clone].level = parent_level + 1;
    }
    let depth = ctx.design.modules[clone].level - ctx.design.modules[src].level;
    if depth + 2 >= ctx.config.max_recursion_depth {
        ctx.sink
            .emit(errors::error_recursion_depth(ctx.config.max_recursion_depth, cell_span));
        *abandoned = true;
    }

    let remap = build_decl_remap(ctx.design, src, clone)?;

    // Rewire interface ports that the instantiation rebinds: the clone's
    // port now names the concrete interface directly.
    for (port_did, pin_iref) in iface_rebinds {
        let concrete = ctx.design.iface_concrete(pin_iref);
        let new_did = *remap
            .get(port_did)
            .ok_or_else(|| InternalError::new("interface port missing from remap"))?;
        if let DeclKind::InterfacePort { iface, .. } =
            &mut ctx.design.modules[clone].decls[new_did].kind
        {
            iface.via = IfaceVia::Port;
            iface.iface = concrete;
        }
    }

    // Write every override into the clone's own declarations, replacing the
    // prior default.
    for pb in pbinds {
        let Some(did) = pb.decl else { continue };
        let Some(value) = &pb.value else { continue };
        let Some(new_did) = remap.get(&did).copied() else {
            continue; // bad pin, already reported
        };
        match (
            &mut ctx.design.modules[clone].decls[new_did].kind,
            value,
        ) {
            (
                DeclKind::ValueParam {
                    default, overridden, ..
                },
                BindValue::Expr(expr),
            ) => {
                *default = Some(expr.clone());
                *overridden = true;
            }
            (DeclKind::TypeParam { default, overridden }, BindValue::Type(ty)) => {
                *default = Some(*ty);
                *overridden = true;
            }
            _ => {} // kind mismatch, already reported
        }
    }

    // A clone that is itself a hierarchical block keeps the library
    // restrictions on its parameters.
    if ctx.design.modules[clone].is_hier_block {
        check_supported_bindings(ctx.design, origin, pbinds, src, ctx.sink, cell_span);
    }

    Ok(CacheEntry {
        module: clone,
        remap,
    })
}
