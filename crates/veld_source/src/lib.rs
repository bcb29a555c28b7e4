//! Source location tracking for the Veld toolchain.
//!
//! Provides [`FileId`] handles and byte-offset [`Span`]s that IR nodes and
//! diagnostics carry back to their origin in source code.

#![warn(missing_docs)]

pub mod file_id;
pub mod span;

pub use file_id::FileId;
pub use span::Span;
