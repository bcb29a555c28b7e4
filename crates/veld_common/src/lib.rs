//! Shared foundational types used across the Veld HDL toolchain.
//!
//! This crate provides core types including interned identifiers, content and
//! value hashing, 4-state logic values, packed logic vectors, and common
//! result types.

#![warn(missing_docs)]

pub mod hash;
pub mod ident;
pub mod logic;
pub mod logic_vec;
pub mod result;

pub use hash::{value_hash, ContentHash};
pub use ident::{Ident, Interner};
pub use logic::Logic;
pub use logic_vec::LogicVec;
pub use result::{InternalError, VeldResult};
