//! Unit definitions.
//!
//! A [`Unit`] names a conversion to SI base units: `value_SI = factor * value + offset`,
//! with the dimension given as integer exponents of the base units kg, m, s, A, K,
//! mol, cd and rad.
//!
//! # Example
//!
//! ```
//! use fmuvars_core::units::{BaseUnit, Unit};
//!
//! let acceleration = Unit::new("m/s2", BaseUnit::dimensionless().m(1).s(-2));
//! assert_eq!(acceleration.base_unit.exponents(), vec![("m", 1), ("s", -2)]);
//! ```

use serde::{Deserialize, Serialize};

/// Conversion of a unit to SI base units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseUnit {
    pub factor: f64,
    pub offset: f64,
    pub kg: i8,
    pub m: i8,
    pub s: i8,
    #[serde(rename = "A")]
    pub a: i8,
    #[serde(rename = "K")]
    pub k: i8,
    pub mol: i8,
    pub cd: i8,
    pub rad: i8,
}

impl Default for BaseUnit {
    fn default() -> Self {
        Self::dimensionless()
    }
}

macro_rules! exponent_setters {
    ($($field:ident),*) => {
        $(
            #[must_use]
            pub const fn $field(mut self, exponent: i8) -> Self {
                self.$field = exponent;
                self
            }
        )*
    };
}

impl BaseUnit {
    #[must_use]
    pub const fn dimensionless() -> Self {
        Self {
            factor: 1.0,
            offset: 0.0,
            kg: 0,
            m: 0,
            s: 0,
            a: 0,
            k: 0,
            mol: 0,
            cd: 0,
            rad: 0,
        }
    }

    exponent_setters!(kg, m, s, a, k, mol, cd, rad);

    #[must_use]
    pub const fn factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    /// Non-zero exponents, in base unit order, keyed by base unit symbol.
    pub fn exponents(&self) -> Vec<(&'static str, i8)> {
        [
            ("kg", self.kg),
            ("m", self.m),
            ("s", self.s),
            ("A", self.a),
            ("K", self.k),
            ("mol", self.mol),
            ("cd", self.cd),
            ("rad", self.rad),
        ]
        .into_iter()
        .filter(|(_, exponent)| *exponent != 0)
        .collect()
    }
}

/// A named unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub name: String,
    pub base_unit: BaseUnit,
}

impl Unit {
    pub fn new(name: impl Into<String>, base_unit: BaseUnit) -> Self {
        Self {
            name: name.into(),
            base_unit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponents_skip_zero() {
        let unit = BaseUnit::dimensionless().kg(1).m(2).s(-3);
        assert_eq!(unit.exponents(), vec![("kg", 1), ("m", 2), ("s", -3)]);
        assert!(BaseUnit::default().exponents().is_empty());
    }

    #[test]
    fn test_celsius() {
        let celsius = Unit::new("degC", BaseUnit::dimensionless().k(1).offset(273.15));
        assert_eq!(celsius.base_unit.factor, 1.0);
        assert_eq!(celsius.base_unit.offset, 273.15);
        assert_eq!(celsius.base_unit.exponents(), vec![("K", 1)]);
    }
}
