//! Secondary source annotations attached to diagnostics.

use serde::{Deserialize, Serialize};
use veld_source::Span;

/// The role of a label in a diagnostic rendering.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum LabelStyle {
    /// The primary location of the problem.
    Primary,
    /// Supporting context at another location.
    Secondary,
}

/// An annotated source span providing context for a diagnostic.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Label {
    /// Whether this is the primary or a secondary annotation.
    pub style: LabelStyle,
    /// The annotated source span.
    pub span: Span,
    /// The annotation text.
    pub message: String,
}

impl Label {
    /// Creates a primary label.
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self {
            style: LabelStyle::Primary,
            span,
            message: message.into(),
        }
    }

    /// Creates a secondary label.
    pub fn secondary(span: Span, message: impl Into<String>) -> Self {
        Self {
            style: LabelStyle::Secondary,
            span,
            message: message.into(),
        }
    }
}
