//! Structured diagnostics for the Veld toolchain.
//!
//! Compilation stages report user-facing problems as [`Diagnostic`] values
//! emitted into a shared [`DiagnosticSink`]; the driver decides how to render
//! them. Internal compiler bugs use
//! [`InternalError`](veld_common::InternalError) instead and never go through
//! the sink.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod label;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use label::Label;
pub use severity::Severity;
pub use sink::DiagnosticSink;
