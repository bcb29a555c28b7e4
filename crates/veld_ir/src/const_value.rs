//! Constant values for parameters and compile-time expressions.
//!
//! [`ConstValue`] represents a fully folded compile-time value. Parameter
//! overrides, generate conditions, and hierarchical-block catalog entries all
//! reduce to this type before the specialization pass compares them.

use serde::{Deserialize, Serialize};
use veld_common::LogicVec;

/// A resolved compile-time constant value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstValue {
    /// An integer constant.
    Int(i64),
    /// A floating-point constant.
    Real(f64),
    /// A sized logic-vector constant (bit pattern, possibly 4-state).
    Logic(LogicVec),
    /// A string constant.
    String(String),
    /// A boolean constant.
    Bool(bool),
}

impl ConstValue {
    /// Coerces the value to an `i64`, if it has a natural integer mapping.
    ///
    /// - `Int(n)` returns `n` directly.
    /// - `Real(f)` truncates toward zero.
    /// - `Bool(b)` returns 1 or 0.
    /// - `Logic` returns its unsigned value when all bits are definite and
    ///   the width fits.
    /// - `String` returns `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConstValue::Int(n) => Some(*n),
            ConstValue::Real(f) => Some(*f as i64),
            ConstValue::Bool(b) => Some(i64::from(*b)),
            ConstValue::Logic(lv) => lv.to_u64().map(|u| u as i64),
            ConstValue::String(_) => None,
        }
    }

    /// Returns `true` if the value is numerically zero (or an empty string).
    pub fn is_zero(&self) -> bool {
        match self {
            ConstValue::Int(n) => *n == 0,
            ConstValue::Real(f) => *f == 0.0,
            ConstValue::Bool(b) => !*b,
            ConstValue::Logic(lv) => lv.to_u64() == Some(0),
            ConstValue::String(s) => s.is_empty(),
        }
    }

    /// Returns the truth value used by generate conditions: non-zero is true.
    pub fn is_truthy(&self) -> bool {
        !self.is_zero()
    }

    /// Returns the plain decimal encoding used directly in specialization
    /// names, or `None` if the value needs a synthesized token instead.
    ///
    /// Only small unsigned integers are encoded in place; reals, strings,
    /// 4-state or unusual-width vectors all go through the naming engine's
    /// value-token table.
    pub fn plain_encoding(&self) -> Option<String> {
        match self {
            ConstValue::Int(n) if *n >= 0 && *n <= i64::from(u32::MAX) => Some(n.to_string()),
            ConstValue::Logic(lv) if lv.width() == 32 && !lv.has_unknown() => {
                lv.to_u64().map(|u| u.to_string())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_i64_coercions() {
        assert_eq!(ConstValue::Int(42).as_i64(), Some(42));
        assert_eq!(ConstValue::Real(3.9).as_i64(), Some(3));
        assert_eq!(ConstValue::Bool(true).as_i64(), Some(1));
        assert_eq!(ConstValue::Bool(false).as_i64(), Some(0));
        assert_eq!(
            ConstValue::Logic(LogicVec::from_u64(9, 8)).as_i64(),
            Some(9)
        );
        assert_eq!(ConstValue::String("x".into()).as_i64(), None);
    }

    #[test]
    fn truthiness() {
        assert!(ConstValue::Int(1).is_truthy());
        assert!(!ConstValue::Int(0).is_truthy());
        assert!(!ConstValue::Logic(LogicVec::all_zero(4)).is_truthy());
        assert!(ConstValue::Bool(true).is_truthy());
    }

    #[test]
    fn plain_encoding_small_unsigned() {
        assert_eq!(ConstValue::Int(8).plain_encoding(), Some("8".to_string()));
        assert_eq!(ConstValue::Int(-8).plain_encoding(), None);
        assert_eq!(ConstValue::Int(i64::from(u32::MAX) + 1).plain_encoding(), None);
        assert_eq!(ConstValue::Real(1.5).plain_encoding(), None);
        assert_eq!(ConstValue::String("a".into()).plain_encoding(), None);
    }

    #[test]
    fn plain_encoding_logic() {
        let v = ConstValue::Logic(LogicVec::from_u64(12, 32));
        assert_eq!(v.plain_encoding(), Some("12".to_string()));
        // Non-32-bit vectors are tokenized, not inlined
        let v = ConstValue::Logic(LogicVec::from_u64(12, 16));
        assert_eq!(v.plain_encoding(), None);
        let v = ConstValue::Logic(LogicVec::from_binary_str("1X").unwrap());
        assert_eq!(v.plain_encoding(), None);
    }

    #[test]
    fn structural_equality() {
        assert_eq!(ConstValue::Int(5), ConstValue::Int(5));
        assert_ne!(ConstValue::Int(5), ConstValue::Int(6));
        // Int and same-valued Logic are structurally distinct
        assert_ne!(
            ConstValue::Int(5),
            ConstValue::Logic(LogicVec::from_u64(5, 32))
        );
    }

    #[test]
    fn serde_roundtrip() {
        let vals = vec![
            ConstValue::Int(-100),
            ConstValue::Real(9.81),
            ConstValue::String("test".to_string()),
            ConstValue::Bool(false),
            ConstValue::Logic(LogicVec::from_u64(0xAB, 8)),
        ];
        for val in vals {
            let json = serde_json::to_string(&val).unwrap();
            let restored: ConstValue = serde_json::from_str(&json).unwrap();
            assert_eq!(val, restored);
        }
    }
}
