//! Array dimensions of exposed variables.
//!
//! An axis length is either a literal or the current value of another registered
//! variable (usually a structural parameter). The two forms are exclusive, so they
//! are modelled as variants of one enum.
//!
//! Sizes are resolved lazily through a [`SizeLookup`], every time they are needed,
//! so that arrays follow structural parameters changed during configuration.

use crate::errors::{FmuError, FmuResult};
use crate::value::Value;
use crate::variable::ValueReference;
use num::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Length of one array axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    /// A literal axis length.
    Fixed(usize),
    /// The axis length is the current scalar value of the referenced variable.
    Variable(ValueReference),
}

impl Dimension {
    pub fn fixed(length: usize) -> Self {
        Dimension::Fixed(length)
    }

    pub fn variable(reference: ValueReference) -> Self {
        Dimension::Variable(reference)
    }

    /// Resolve the axis length.
    ///
    /// `owner` is the name of the variable the dimension belongs to and is only
    /// used for error messages.
    pub fn size(&self, owner: &str, lookup: &impl SizeLookup) -> FmuResult<usize> {
        match self {
            Dimension::Fixed(length) => Ok(*length),
            Dimension::Variable(reference) => {
                let value = lookup.current_value(*reference)?;
                axis_length(&value).ok_or_else(|| FmuError::InvalidDimension {
                    name: owner.to_string(),
                    reason: format!(
                        "valueReference={} holds {} which is not a non-negative integer",
                        reference,
                        describe(&value)
                    ),
                })
            }
        }
    }
}

/// Read access to the current value of a variable, used to resolve dimensions.
pub trait SizeLookup {
    fn current_value(&self, reference: ValueReference) -> FmuResult<Value>;
}

/// Product of all axis lengths, 1 for a scalar.
pub fn element_count(
    owner: &str,
    dimensions: &[Dimension],
    lookup: &impl SizeLookup,
) -> FmuResult<usize> {
    dimensions.iter().try_fold(1usize, |acc, dim| {
        acc.checked_mul(dim.size(owner, lookup)?)
            .ok_or_else(|| FmuError::InvalidDimension {
                name: owner.to_string(),
                reason: "element count overflows".to_string(),
            })
    })
}

fn axis_length(value: &Value) -> Option<usize> {
    match value {
        Value::Int32(i) => i.to_usize(),
        Value::Int64(i) => i.to_usize(),
        Value::UInt64(i) => i.to_usize(),
        _ => None,
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Int32(i) => i.to_string(),
        Value::Int64(i) => i.to_string(),
        other => other.type_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Lookup(HashMap<ValueReference, Value>);

    impl SizeLookup for Lookup {
        fn current_value(&self, reference: ValueReference) -> FmuResult<Value> {
            self.0
                .get(&reference)
                .cloned()
                .ok_or(FmuError::UnknownReference(reference))
        }
    }

    fn lookup() -> Lookup {
        Lookup(HashMap::from([
            (0, Value::UInt64(3)),
            (1, Value::Int32(-2)),
            (2, Value::Float64(2.0)),
            (3, Value::UInt64(1 << 33)),
        ]))
    }

    #[test]
    fn test_fixed_dimension() {
        assert_eq!(Dimension::fixed(4).size("x", &lookup()).unwrap(), 4);
    }

    #[test]
    fn test_variable_dimension() {
        assert_eq!(Dimension::variable(0).size("x", &lookup()).unwrap(), 3);
        let dimensions = [Dimension::fixed(2), Dimension::variable(0)];
        assert_eq!(element_count("x", &dimensions, &lookup()).unwrap(), 6);
    }

    #[test]
    fn test_scalar_has_one_element() {
        assert_eq!(element_count("x", &[], &lookup()).unwrap(), 1);
    }

    #[test]
    fn test_invalid_sizes() {
        let err = Dimension::variable(1).size("x", &lookup()).unwrap_err();
        assert!(matches!(err, FmuError::InvalidDimension { .. }));
        assert!(err.to_string().contains("-2"));

        let err = Dimension::variable(2).size("x", &lookup()).unwrap_err();
        assert!(matches!(err, FmuError::InvalidDimension { .. }));

        let err = Dimension::variable(9).size("x", &lookup()).unwrap_err();
        assert_eq!(err, FmuError::UnknownReference(9));
    }

    #[test]
    fn test_element_count_overflow() {
        let dimensions = [Dimension::variable(3), Dimension::variable(3)];
        let err = element_count("values", &dimensions, &lookup()).unwrap_err();
        assert_eq!(
            err,
            FmuError::InvalidDimension {
                name: "values".to_string(),
                reason: "element count overflows".to_string(),
            }
        );
    }
}
