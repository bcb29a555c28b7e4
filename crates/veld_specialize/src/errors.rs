//! Diagnostic codes and helper functions for specialization errors.
//!
//! Error codes `E300`--`E314` cover module-specialization failures: bad
//! parameter bindings, unresolvable generate constructs, interface
//! mismatches, hierarchical-block restrictions, and the recursion-depth
//! limit.

use veld_diagnostics::{Category, Diagnostic, DiagnosticCode};
use veld_source::Span;

/// Unknown parameter pin (no such parameter in the target module).
pub const E300: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 300,
};

/// Parameter binding targets a non-parameter declaration, or the binding
/// kind does not match the declaration kind.
pub const E301: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 301,
};

/// Parameter binding does not reduce to a constant.
pub const E302: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 302,
};

/// Generate condition or selector does not reduce to a constant.
pub const E303: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 303,
};

/// Generate case label does not reduce to a constant.
pub const E304: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 304,
};

/// Generate loop trip count is not a constant, negative, or exceeds the
/// configured iteration bound.
pub const E305: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 305,
};

/// Parameter without an initial value.
pub const E306: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 306,
};

/// Parameter with a complex initializer inside a function or task.
pub const E307: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 307,
};

/// Interface port is not connected to an interface.
pub const E308: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 308,
};

/// Interface port and connected pin reference different interfaces.
pub const E309: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 309,
};

/// Type parameter bound on a hierarchical block.
pub const E310: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 310,
};

/// Hierarchical-block parameter is not a simple constant.
pub const E311: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 311,
};

/// No precompiled variant matches the cell's parameters.
pub const E312: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 312,
};

/// Recursive instantiation exceeded the configured depth limit.
pub const E313: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 313,
};

/// Expression width cannot be resolved.
pub const E314: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 314,
};

/// Creates a diagnostic for a parameter pin with no matching declaration.
pub fn error_unknown_param_pin(param: &str, cell: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E300,
        format!("parameter `{param}` not found in module instantiated by `{cell}`"),
        span,
    )
}

/// Creates a diagnostic for a parameter binding on a non-parameter.
pub fn error_non_param_binding(param: &str, cell: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E301,
        format!("attempted parameter setting of non-parameter `{param}` of `{cell}`"),
        span,
    )
}

/// Creates a diagnostic for a value bound to a type parameter or vice versa.
pub fn error_param_kind_mismatch(param: &str, cell: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E301,
        format!("binding for parameter `{param}` of `{cell}` does not match the parameter kind"),
        span,
    )
}

/// Creates a diagnostic for a binding that cannot be reduced to a constant.
pub fn error_binding_not_const(param: &str, cell: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E302,
        format!("cannot convert value for parameter `{param}` of `{cell}` to a constant"),
        span,
    )
}

/// Creates a diagnostic for a non-constant generate condition or selector.
pub fn error_generate_not_const(what: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E303, format!("generate {what} must evaluate to a constant"), span)
}

/// Creates a diagnostic for an unfoldable generate case label.
pub fn error_case_label_not_const(span: Span) -> Diagnostic {
    Diagnostic::error(E304, "generate case item does not evaluate to a constant", span)
}

/// Creates a diagnostic for a bad generate loop trip count.
pub fn error_bad_trip_count(detail: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E305, format!("generate loop does not unroll: {detail}"), span)
}

/// Creates a diagnostic for a parameter declared without an initial value.
pub fn error_param_no_value(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E306,
        format!("parameter `{name}` without initial value is never given a value"),
        span,
    )
}

/// Creates a diagnostic for a complex parameter initializer inside a function.
pub fn error_param_complex_in_function(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E307,
        format!("parameter `{name}` with complex initializer is unsupported inside a function"),
        span,
    )
    .with_note("there is no statement position for the deferred assignment in a function body")
}

/// Creates a diagnostic for an interface port whose pin is not an interface.
pub fn error_iface_not_connected(port: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E308,
        format!("interface port `{port}` is not connected to an interface pin expression"),
        span,
    )
}

/// Creates a diagnostic for an interface identity mismatch.
pub fn error_iface_mismatch(port: &str, expected: &str, actual: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E309,
        format!(
            "port `{port}` expects `{expected}` interface but pin connects `{actual}` interface"
        ),
        span,
    )
}

/// Creates a diagnostic for a type parameter bound on a hierarchical block.
pub fn error_hier_block_type_param(module: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E310,
        format!("`{module}` is a hierarchical block, but `parameter type` is not supported"),
        span,
    )
}

/// Creates a diagnostic for a hierarchical-block parameter that is not a
/// simple constant.
pub fn error_hier_block_param_unsupported(module: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E311,
        format!(
            "`{module}` is a hierarchical block; only integer, floating point, and string \
             parameters are supported"
        ),
        span,
    )
}

/// Creates a diagnostic when no precompiled variant matches.
pub fn error_no_hier_variant(module: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E312,
        format!("no matching precompiled variant of `{module}` for these parameters"),
        span,
    )
}

/// Creates a diagnostic for exceeding the recursion-depth limit.
pub fn error_recursion_depth(limit: u32, span: Span) -> Diagnostic {
    Diagnostic::error(
        E313,
        format!("exceeded maximum module recursion depth of {limit}"),
        span,
    )
}

/// Creates a diagnostic for an expression whose width cannot be resolved.
pub fn error_width_unresolvable(span: Span) -> Diagnostic {
    Diagnostic::error(E314, "cannot resolve the width of this expression", span)
}
