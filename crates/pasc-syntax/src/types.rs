use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codegen::Value;

/// The primitive types of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CType {
    Integer,
    Real,
    String,
    Boolean,
}

impl CType {
    pub const ALL: [CType; 4] = [CType::Integer, CType::Real, CType::String, CType::Boolean];

    /// Whether a value of `self` may be used where `target` is expected.
    /// Not symmetric: integers widen to reals, nothing else converts.
    pub fn is_castable_to(self, target: CType) -> bool {
        matches!(
            (self, target),
            (CType::Integer, CType::Integer | CType::Real)
                | (CType::Real, CType::Real)
                | (CType::String, CType::String)
                | (CType::Boolean, CType::Boolean)
        )
    }

    /// The wider of two types. Callers check castability first.
    ///
    /// # Panics
    ///
    /// If neither type is castable to the other.
    pub fn cast(self, other: CType) -> CType {
        assert!(
            self.is_castable_to(other) || other.is_castable_to(self),
            "cannot cast {self} to {other}"
        );
        if self == CType::Real || other == CType::Real {
            CType::Real
        } else {
            self
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, CType::Integer | CType::Real)
    }

    pub fn zero_value(self) -> Value {
        match self {
            CType::Integer => Value::Integer(0),
            CType::Real => Value::Real(0.0),
            CType::String => Value::String(String::new()),
            CType::Boolean => Value::Boolean(false),
        }
    }

    /// Built-in type spelled `name`, ignoring case.
    pub fn from_name(name: &str) -> Option<CType> {
        CType::ALL
            .into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(name))
    }

    pub fn name(self) -> &'static str {
        match self {
            CType::Integer => "integer",
            CType::Real => "real",
            CType::String => "string",
            CType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen, quickcheck};

    impl Arbitrary for CType {
        fn arbitrary(g: &mut Gen) -> Self {
            *g.choose(&CType::ALL).unwrap()
        }
    }

    #[test]
    fn cast_table() {
        use CType::*;
        assert!(Integer.is_castable_to(Real));
        assert!(!Real.is_castable_to(Integer));
        for ty in CType::ALL {
            assert!(ty.is_castable_to(ty));
        }
        for target in [Integer, Real, Boolean] {
            assert!(!String.is_castable_to(target));
        }
        for target in [Integer, Real, String] {
            assert!(!Boolean.is_castable_to(target));
        }
    }

    #[test]
    fn cast_picks_wider_type() {
        assert_eq!(CType::Integer.cast(CType::Real), CType::Real);
        assert_eq!(CType::Real.cast(CType::Integer), CType::Real);
        assert_eq!(CType::Integer.cast(CType::Integer), CType::Integer);
        assert_eq!(CType::String.cast(CType::String), CType::String);
    }

    #[test]
    #[should_panic(expected = "cannot cast")]
    fn cast_rejects_unrelated_types() {
        CType::String.cast(CType::Boolean);
    }

    #[test]
    fn zero_values() {
        assert_eq!(CType::Integer.zero_value(), Value::Integer(0));
        assert_eq!(CType::Real.zero_value(), Value::Real(0.0));
        assert_eq!(CType::String.zero_value(), Value::String(String::new()));
        assert_eq!(CType::Boolean.zero_value(), Value::Boolean(false));
    }

    #[test]
    fn names_resolve_ignoring_case() {
        assert_eq!(CType::from_name("Integer"), Some(CType::Integer));
        assert_eq!(CType::from_name("BOOLEAN"), Some(CType::Boolean));
        assert_eq!(CType::from_name("char"), None);
    }

    quickcheck! {
        fn castable_relation_is_reflexive(ty: CType) -> bool {
            ty.is_castable_to(ty)
        }

        fn castable_both_ways_only_when_equal(a: CType, b: CType) -> bool {
            !(a.is_castable_to(b) && b.is_castable_to(a)) || a == b
        }

        fn name_round_trips(ty: CType) -> bool {
            CType::from_name(ty.name()) == Some(ty)
        }

        fn cast_result_accepts_both_operands(a: CType, b: CType) -> bool {
            if !(a.is_castable_to(b) || b.is_castable_to(a)) {
                return true;
            }
            let wide = a.cast(b);
            a.is_castable_to(wide) && b.is_castable_to(wide)
        }
    }
}
