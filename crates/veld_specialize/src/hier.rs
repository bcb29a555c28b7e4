//! Hierarchical-block catalog and numeric-coercion-aware matching.
//!
//! A hierarchical block is a module pre-built into an external replacement
//! library. Instead of cloning such a template, the pass looks up the
//! replacement whose recorded parameter values equal the cell's resolved
//! bindings, substituting it wholesale. Equality is coercion-aware: the
//! catalog's literals were width-resolved when the library was built, while
//! the cell's values are fresh out of constant folding, so integers are
//! extended to the catalog's declared width before the bit-exact compare.

use veld_common::{InternalError, Interner, LogicVec, VeldResult};
use veld_diagnostics::DiagnosticSink;
use veld_ir::{BindValue, ConstValue, DeclKind, Design, ModuleId, ParamBinding};
use veld_source::Span;

use crate::errors;

/// One precompiled variant of a hierarchical block.
#[derive(Debug, Clone)]
pub struct HierBlockVariant {
    /// The original (pre-specialization) module name this variant replaces.
    pub orig_name: String,
    /// The name of the replacement module present in the design.
    pub mangled_name: String,
    /// Required parameter values, parsed from the library description.
    pub params: Vec<(String, ConstValue)>,
}

/// The outcome of a replacement lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The cell's original module name has no catalog entries; the normal
    /// clone path applies.
    NotCataloged,
    /// The first fully matching variant, in registration order.
    Matched(ModuleId),
    /// The cell's bindings cannot be expressed by a precompiled library
    /// (type parameter or non-constant value); diagnostics already emitted.
    Unsupported,
    /// Catalog entries exist but none matches the resolved bindings.
    NoMatch,
}

/// The read-only replacement library supplied at pass start.
#[derive(Debug, Default)]
pub struct HierBlockCatalog {
    variants: Vec<HierBlockVariant>,
}

impl HierBlockCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no variants are registered.
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Registers a variant. Parameter values are textual literals from the
    /// library description and are parsed here, once.
    ///
    /// Registration order is match order.
    pub fn register(
        &mut self,
        orig_name: &str,
        mangled_name: &str,
        params: &[(&str, &str)],
    ) -> VeldResult<()> {
        let mut parsed = Vec::with_capacity(params.len());
        for (name, literal) in params {
            let value = parse_param_literal(literal).ok_or_else(|| {
                InternalError::new(format!(
                    "`{literal}` is not a valid parameter literal for `{orig_name}`.`{name}`"
                ))
            })?;
            parsed.push((name.to_string(), value));
        }
        self.variants.push(HierBlockVariant {
            orig_name: orig_name.to_string(),
            mangled_name: mangled_name.to_string(),
            params: parsed,
        });
        Ok(())
    }

    /// Finds the replacement module for a cell's resolved parameter
    /// bindings.
    ///
    /// `origin_name` is the target template's original name. Every binding
    /// must be a folded literal; every bound parameter must be declared by
    /// the winning variant, and every variant-declared parameter must be
    /// bound.
    pub fn find_replacement(
        &self,
        design: &Design,
        origin_name: &str,
        pbinds: &[ParamBinding],
        target: ModuleId,
        interner: &Interner,
        sink: &DiagnosticSink,
        span: Span,
    ) -> VeldResult<MatchOutcome> {
        if !self.variants.iter().any(|v| v.orig_name == origin_name) {
            return Ok(MatchOutcome::NotCataloged);
        }

        if !check_supported_bindings(design, origin_name, pbinds, target, sink, span) {
            return Ok(MatchOutcome::Unsupported);
        }

        // Collect (name, value) of every bound parameter, in pin order.
        let mut bound: Vec<(&str, &ConstValue)> = Vec::new();
        for pb in pbinds {
            let Some(BindValue::Expr(expr)) = &pb.value else {
                continue;
            };
            let Some(value) = expr.as_literal() else {
                continue;
            };
            if pb.decl.is_some() {
                bound.push((interner.resolve(pb.name), value));
            }
        }

        for variant in self.variants.iter().filter(|v| v.orig_name == origin_name) {
            let mut matched = 0usize;
            let mut found = true;
            for (name, value) in &bound {
                match variant.params.iter().find(|(n, _)| n == name) {
                    Some((_, catalog_value)) if values_match(value, catalog_value) => {
                        matched += 1;
                    }
                    _ => {
                        found = false;
                        break;
                    }
                }
            }
            if found && matched == variant.params.len() {
                let mangled = interner.get_or_intern(&variant.mangled_name);
                let module = design.find_module(mangled).ok_or_else(|| {
                    InternalError::new(format!(
                        "hierarchical block replacement `{}` is not in the design",
                        variant.mangled_name
                    ))
                })?;
                return Ok(MatchOutcome::Matched(module));
            }
        }
        Ok(MatchOutcome::NoMatch)
    }
}

/// Checks that every binding is expressible by a precompiled library:
/// no type parameters, no aggregate or otherwise non-constant values.
/// Emits diagnostics and returns `false` on violation.
pub fn check_supported_bindings(
    design: &Design,
    origin_name: &str,
    pbinds: &[ParamBinding],
    target: ModuleId,
    sink: &DiagnosticSink,
    span: Span,
) -> bool {
    let mut ok = true;
    for pb in pbinds {
        let Some(value) = &pb.value else { continue };
        match value {
            BindValue::Type(_) => {
                sink.emit(errors::error_hier_block_type_param(origin_name, span));
                ok = false;
            }
            BindValue::Expr(expr) => {
                let supported = matches!(
                    expr.as_literal(),
                    Some(
                        ConstValue::Int(_)
                            | ConstValue::Real(_)
                            | ConstValue::String(_)
                            | ConstValue::Bool(_)
                            | ConstValue::Logic(_)
                    )
                );
                if !supported {
                    sink.emit(errors::error_hier_block_param_unsupported(origin_name, span));
                    ok = false;
                }
            }
        }
        // A pin linked to a type parameter is unsupported even when the
        // bound value side looks plain.
        if let Some(did) = pb.decl {
            if matches!(
                design.modules[target].decls[did].kind,
                DeclKind::TypeParam { .. }
            ) && !matches!(value, BindValue::Type(_))
            {
                sink.emit(errors::error_hier_block_type_param(origin_name, span));
                ok = false;
            }
        }
    }
    ok
}

/// Compares a cell's resolved value against a catalog literal.
///
/// Strings compare textually. A floating catalog value casts the cell side
/// to floating (integer-to-real if needed) and compares with epsilon
/// tolerance. An integral catalog value rounds a floating cell value to the
/// nearest integer, sign-extends a signed cell value to the catalog's
/// declared width (zero-extends otherwise), then compares bit-exactly.
pub fn values_match(cell: &ConstValue, catalog: &ConstValue) -> bool {
    match catalog {
        ConstValue::String(c) => matches!(cell, ConstValue::String(s) if s == c),
        ConstValue::Real(c) => {
            let cell_real = match cell {
                ConstValue::Real(f) => Some(*f),
                ConstValue::Int(n) => Some(*n as f64),
                ConstValue::Bool(b) => Some(f64::from(u8::from(*b))),
                ConstValue::Logic(lv) => lv.to_u64().map(|u| u as f64),
                ConstValue::String(_) => None,
            };
            match cell_real {
                Some(f) => epsilon_equal(f, *c),
                None => false,
            }
        }
        ConstValue::Logic(c) => {
            let width = c.width();
            match coerce_to_bits(cell, width) {
                Some(bits) => bits == *c,
                None => false,
            }
        }
        ConstValue::Int(c) => match coerce_to_bits(cell, 64) {
            Some(bits) => bits == LogicVec::from_i64(*c, 64),
            None => false,
        },
        ConstValue::Bool(c) => match cell {
            ConstValue::Bool(b) => b == c,
            other => other.as_i64() == Some(i64::from(*c)),
        },
    }
}

/// Coerces a cell value onto `width` bits: floating rounds to nearest,
/// signed integers sign-extend, everything else zero-extends.
fn coerce_to_bits(cell: &ConstValue, width: u32) -> Option<LogicVec> {
    match cell {
        ConstValue::Real(f) => Some(LogicVec::from_i64(f.round() as i64, width)),
        ConstValue::Int(n) => Some(LogicVec::from_i64(*n, width)),
        ConstValue::Bool(b) => Some(LogicVec::from_u64(u64::from(*b), width)),
        ConstValue::Logic(lv) => {
            if lv.has_unknown() {
                None
            } else {
                Some(lv.resized_unsigned(width))
            }
        }
        ConstValue::String(_) => None,
    }
}

/// Relative epsilon comparison for floating parameter values.
fn epsilon_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs()).max(1.0)
}

/// Parses a library parameter literal: quoted strings, reals, plain
/// decimals, and sized/based integers like `32'd8` and `8'hFF`.
pub fn parse_param_literal(text: &str) -> Option<ConstValue> {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix('"') {
        return stripped
            .strip_suffix('"')
            .map(|s| ConstValue::String(s.to_string()));
    }

    if let Some(tick) = text.find('\'') {
        let width: u32 = text[..tick].replace('_', "").parse().ok()?;
        let mut rest = &text[tick + 1..];
        if let Some(r) = rest.strip_prefix(['s', 'S']) {
            rest = r;
        }
        let (radix, digits) = match rest.as_bytes().first()? {
            b'b' | b'B' => (2, &rest[1..]),
            b'o' | b'O' => (8, &rest[1..]),
            b'd' | b'D' => (10, &rest[1..]),
            b'h' | b'H' => (16, &rest[1..]),
            _ => return None,
        };
        let clean = digits.replace('_', "");
        let value = u64::from_str_radix(&clean, radix).ok()?;
        return Some(ConstValue::Logic(LogicVec::from_u64(value, width)));
    }

    if text.contains(['.', 'e', 'E']) {
        if let Ok(f) = text.parse::<f64>() {
            return Some(ConstValue::Real(f));
        }
    }
    text.replace('_', "")
        .parse::<i64>()
        .ok()
        .map(ConstValue::Int)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_and_sized_literals() {
        assert_eq!(parse_param_literal("8"), Some(ConstValue::Int(8)));
        assert_eq!(parse_param_literal("-3"), Some(ConstValue::Int(-3)));
        assert_eq!(parse_param_literal("1_000"), Some(ConstValue::Int(1000)));
        assert_eq!(
            parse_param_literal("32'd8"),
            Some(ConstValue::Logic(LogicVec::from_u64(8, 32)))
        );
        assert_eq!(
            parse_param_literal("8'hFF"),
            Some(ConstValue::Logic(LogicVec::from_u64(0xFF, 8)))
        );
        assert_eq!(
            parse_param_literal("4'b1010"),
            Some(ConstValue::Logic(LogicVec::from_u64(0b1010, 4)))
        );
        assert_eq!(
            parse_param_literal("16'sh10"),
            Some(ConstValue::Logic(LogicVec::from_u64(0x10, 16)))
        );
    }

    #[test]
    fn parse_real_and_string_literals() {
        assert_eq!(parse_param_literal("1.5"), Some(ConstValue::Real(1.5)));
        assert_eq!(parse_param_literal("2e3"), Some(ConstValue::Real(2000.0)));
        assert_eq!(
            parse_param_literal("\"fast\""),
            Some(ConstValue::String("fast".to_string()))
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_param_literal("abc"), None);
        assert_eq!(parse_param_literal("8'q12"), None);
    }

    #[test]
    fn string_match_is_exact() {
        assert!(values_match(
            &ConstValue::String("fast".into()),
            &ConstValue::String("fast".into())
        ));
        assert!(!values_match(
            &ConstValue::String("fast".into()),
            &ConstValue::String("slow".into())
        ));
        assert!(!values_match(
            &ConstValue::Int(1),
            &ConstValue::String("1".into())
        ));
    }

    #[test]
    fn floating_catalog_casts_integer() {
        assert!(values_match(&ConstValue::Int(2), &ConstValue::Real(2.0)));
        assert!(!values_match(&ConstValue::Int(2), &ConstValue::Real(2.5)));
        assert!(values_match(
            &ConstValue::Real(0.1 + 0.2),
            &ConstValue::Real(0.3)
        ));
    }

    #[test]
    fn integral_catalog_zero_extends() {
        // WIDTH overridden to 8, catalog declares a 32-bit slot storing 8
        let catalog = ConstValue::Logic(LogicVec::from_u64(8, 32));
        assert!(values_match(&ConstValue::Int(8), &catalog));
        assert!(!values_match(&ConstValue::Int(9), &catalog));
        let narrow = ConstValue::Logic(LogicVec::from_u64(8, 8));
        assert!(values_match(&narrow, &catalog));
    }

    #[test]
    fn integral_catalog_sign_extends_signed() {
        let catalog = ConstValue::Logic(LogicVec::from_i64(-1, 32));
        assert!(values_match(&ConstValue::Int(-1), &catalog));
        // An unsigned 8-bit all-ones pattern zero-extends and does not match
        let unsigned_ff = ConstValue::Logic(LogicVec::from_u64(0xFF, 8));
        assert!(!values_match(&unsigned_ff, &catalog));
    }

    #[test]
    fn integral_catalog_rounds_floating() {
        let catalog = ConstValue::Logic(LogicVec::from_u64(3, 32));
        assert!(values_match(&ConstValue::Real(2.6), &catalog));
        assert!(values_match(&ConstValue::Real(3.4), &catalog));
        assert!(!values_match(&ConstValue::Real(3.6), &catalog));
    }

    #[test]
    fn four_state_cell_value_never_matches() {
        let catalog = ConstValue::Logic(LogicVec::from_u64(2, 4));
        let cell = ConstValue::Logic(LogicVec::from_binary_str("001X").unwrap());
        assert!(!values_match(&cell, &catalog));
    }

    #[test]
    fn register_rejects_bad_literal() {
        let mut catalog = HierBlockCatalog::new();
        let err = catalog.register("mult", "mult_abc", &[("WIDTH", "not a number")]);
        assert!(err.is_err());
    }

    #[test]
    fn registration_order_preserved() {
        let mut catalog = HierBlockCatalog::new();
        catalog.register("mult", "mult_a", &[("W", "8")]).unwrap();
        catalog.register("mult", "mult_b", &[("W", "16")]).unwrap();
        assert_eq!(catalog.variants.len(), 2);
        assert_eq!(catalog.variants[0].mangled_name, "mult_a");
    }
}
