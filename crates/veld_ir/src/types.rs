//! Interned types and the central type database.
//!
//! All types referenced by declarations are interned into a [`TypeDb`], which
//! assigns each unique type a [`TypeId`] for cheap comparison. Type-parameter
//! bindings compare by `TypeId`, so interning doubles as the structural
//! identity check for the specialization default-skip rule.

use crate::ids::TypeId;
use serde::{Deserialize, Serialize};
use veld_common::Ident;

/// A hardware type in the design.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// A single bit.
    Bit,
    /// A bit vector of known width, optionally signed.
    BitVec {
        /// The number of bits.
        width: u32,
        /// Whether the vector is signed.
        signed: bool,
    },
    /// An integer type (for parameters and constants).
    Integer,
    /// A real/floating-point type.
    Real,
    /// A string type.
    Str,
    /// An array of elements.
    Array {
        /// The type of each element.
        element: TypeId,
        /// The number of elements.
        size: u32,
    },
    /// A named user type not structurally resolved by this stage.
    Named(Ident),
    /// A placeholder for types that failed resolution.
    Error,
}

/// Central type database — interned types for cheap comparison.
///
/// Each unique [`Type`] is stored once and referenced by [`TypeId`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeDb {
    types: Vec<Type>,
}

impl TypeDb {
    /// Creates a new, empty type database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a type, returning its [`TypeId`].
    ///
    /// If an identical type already exists, returns the existing ID.
    pub fn intern(&mut self, ty: Type) -> TypeId {
        for (i, existing) in self.types.iter().enumerate() {
            if existing == &ty {
                return TypeId::from_raw(i as u32);
            }
        }
        let id = TypeId::from_raw(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    /// Returns a reference to the type with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID is out of bounds.
    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.as_raw() as usize]
    }

    /// Returns the bit width of a type, if it has a fixed width.
    ///
    /// Returns `None` for types without a fixed bit width (e.g., `Integer`,
    /// `Str`, unresolved named types).
    pub fn bit_width(&self, id: TypeId) -> Option<u32> {
        match self.get(id) {
            Type::Bit => Some(1),
            Type::BitVec { width, .. } => Some(*width),
            Type::Array { element, size } => self.bit_width(*element).map(|w| w * size),
            _ => None,
        }
    }

    /// Returns `true` if the type is an array.
    pub fn is_array(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Array { .. })
    }

    /// Returns the number of interned types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no types have been interned.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
