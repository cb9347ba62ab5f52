//! Exposed model variables.
//!
//! A [`ModelVariable`] describes one quantity a model exposes to its host: a unique
//! dot-separated name, a [`Causality`], [`Variability`] and [`Initial`] status, and a
//! [`VariableKind`] carrying the kind-specific fields. Only numeric and boolean kinds
//! may have array dimensions; only `Float64` variables can be units, nominals or
//! derivatives of other variables.
//!
//! Variables are built with chained setters and handed to the
//! [`Registry`](crate::registry::Registry), which assigns the value reference and
//! validates the variable.
//!
//! # Example
//!
//! ```
//! use fmuvars_core::variable::{Causality, Initial, ModelVariable, Variability};
//!
//! let x = ModelVariable::float64("x")
//!     .causality(Causality::Output)
//!     .variability(Variability::Continuous)
//!     .initial(Initial::Exact)
//!     .start(1.0);
//!
//! assert!(x.requires_start());
//! assert_eq!(x.value_reference(), None);
//! ```

use crate::dimension::Dimension;
use crate::errors::{FmuError, FmuResult};
use crate::value::{Element, Kind, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable integer key of a registered variable.
pub type ValueReference = u32;

/// Data-flow role of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Causality {
    /// The independent variable, usually time.
    Independent,
    Input,
    Output,
    Parameter,
    Local,
    /// Computed from parameters during initialisation.
    CalculatedParameter,
    /// A parameter that may change the shape of other variables.
    StructuralParameter,
}

impl fmt::Display for Causality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Causality::Independent => "independent",
            Causality::Input => "input",
            Causality::Output => "output",
            Causality::Parameter => "parameter",
            Causality::Local => "local",
            Causality::CalculatedParameter => "calculatedParameter",
            Causality::StructuralParameter => "structuralParameter",
        };
        f.write_str(name)
    }
}

/// How often the value of a variable may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Variability {
    Constant,
    Fixed,
    Tunable,
    Discrete,
    Continuous,
}

impl fmt::Display for Variability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Variability::Constant => "constant",
            Variability::Fixed => "fixed",
            Variability::Tunable => "tunable",
            Variability::Discrete => "discrete",
            Variability::Continuous => "continuous",
        };
        f.write_str(name)
    }
}

/// How the starting value of a variable is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Initial {
    Exact,
    Approx,
    Calculated,
}

impl fmt::Display for Initial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Initial::Exact => "exact",
            Initial::Approx => "approx",
            Initial::Calculated => "calculated",
        };
        f.write_str(name)
    }
}

/// Fields only `Float64` variables carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Float64Attributes {
    pub dimensions: Vec<Dimension>,
    /// This variable is the time derivative of the referenced variable.
    pub derivative: Option<ValueReference>,
    pub unit: Option<String>,
    pub display_unit: Option<String>,
    /// Nominal magnitude, reported to model-exchange hosts for state scaling.
    pub nominal: Option<f64>,
}

/// Kind of a variable together with its kind-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VariableKind {
    Boolean { dimensions: Vec<Dimension> },
    Int32 { dimensions: Vec<Dimension> },
    Int64 { dimensions: Vec<Dimension> },
    UInt64 { dimensions: Vec<Dimension> },
    Float64(Float64Attributes),
    String,
    Enumeration,
}

impl VariableKind {
    pub fn kind(&self) -> Kind {
        match self {
            VariableKind::Boolean { .. } => Kind::Boolean,
            VariableKind::Int32 { .. } => Kind::Int32,
            VariableKind::Int64 { .. } => Kind::Int64,
            VariableKind::UInt64 { .. } => Kind::UInt64,
            VariableKind::Float64(_) => Kind::Float64,
            VariableKind::String => Kind::String,
            VariableKind::Enumeration => Kind::Enumeration,
        }
    }

    /// Array dimensions, empty for scalars and for kinds that cannot be arrays.
    pub fn dimensions(&self) -> &[Dimension] {
        match self {
            VariableKind::Boolean { dimensions }
            | VariableKind::Int32 { dimensions }
            | VariableKind::Int64 { dimensions }
            | VariableKind::UInt64 { dimensions } => dimensions,
            VariableKind::Float64(attrs) => &attrs.dimensions,
            VariableKind::String | VariableKind::Enumeration => &[],
        }
    }

    fn dimensions_mut(&mut self) -> Option<&mut Vec<Dimension>> {
        match self {
            VariableKind::Boolean { dimensions }
            | VariableKind::Int32 { dimensions }
            | VariableKind::Int64 { dimensions }
            | VariableKind::UInt64 { dimensions } => Some(dimensions),
            VariableKind::Float64(attrs) => Some(&mut attrs.dimensions),
            VariableKind::String | VariableKind::Enumeration => None,
        }
    }

    pub fn float64(&self) -> Option<&Float64Attributes> {
        match self {
            VariableKind::Float64(attrs) => Some(attrs),
            _ => None,
        }
    }
}

/// Definition of one exposed variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVariable {
    name: String,
    description: Option<String>,
    value_reference: Option<ValueReference>,
    causality: Option<Causality>,
    variability: Option<Variability>,
    initial: Option<Initial>,
    declared_type: Option<String>,
    start: Option<Value>,
    kind: VariableKind,
    /// Setters applied to a kind that does not support them, reported on registration.
    #[serde(skip)]
    misapplied: Vec<&'static str>,
}

impl ModelVariable {
    fn with_kind(name: impl Into<String>, kind: VariableKind) -> Self {
        Self {
            name: name.into(),
            description: None,
            value_reference: None,
            causality: None,
            variability: None,
            initial: None,
            declared_type: None,
            start: None,
            kind,
            misapplied: vec![],
        }
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::with_kind(name, VariableKind::Boolean { dimensions: vec![] })
    }

    pub fn int32(name: impl Into<String>) -> Self {
        Self::with_kind(name, VariableKind::Int32 { dimensions: vec![] })
    }

    pub fn int64(name: impl Into<String>) -> Self {
        Self::with_kind(name, VariableKind::Int64 { dimensions: vec![] })
    }

    pub fn uint64(name: impl Into<String>) -> Self {
        Self::with_kind(name, VariableKind::UInt64 { dimensions: vec![] })
    }

    pub fn float64(name: impl Into<String>) -> Self {
        Self::with_kind(name, VariableKind::Float64(Float64Attributes::default()))
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::with_kind(name, VariableKind::String)
    }

    /// An enumeration variable; its items come from the declared type.
    pub fn enumeration(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        let mut var = Self::with_kind(name, VariableKind::Enumeration);
        var.declared_type = Some(declared_type.into());
        var
    }

    pub fn causality(mut self, causality: Causality) -> Self {
        self.causality = Some(causality);
        self
    }

    pub fn variability(mut self, variability: Variability) -> Self {
        self.variability = Some(variability);
        self
    }

    pub fn initial(mut self, initial: Initial) -> Self {
        self.initial = Some(initial);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn declared_type(mut self, declared_type: impl Into<String>) -> Self {
        self.declared_type = Some(declared_type.into());
        self
    }

    /// Literal start value. Arrays are given as flat, row-major lists or ndarrays.
    pub fn start(mut self, start: impl Into<Value>) -> Self {
        self.start = Some(start.into());
        self
    }

    /// Append an array dimension. Not available for String and Enumeration variables.
    pub fn dimension(mut self, dimension: Dimension) -> Self {
        match self.kind.dimensions_mut() {
            Some(dimensions) => dimensions.push(dimension),
            None => self.misapplied.push("dimension"),
        }
        self
    }

    /// Mark this variable as the time derivative of `reference`. Float64 only.
    pub fn derivative_of(mut self, reference: ValueReference) -> Self {
        self.update_float64("derivative", |attrs| attrs.derivative = Some(reference));
        self
    }

    /// Float64 only.
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        let unit = unit.into();
        self.update_float64("unit", |attrs| attrs.unit = Some(unit));
        self
    }

    /// Float64 only.
    pub fn display_unit(mut self, unit: impl Into<String>) -> Self {
        let unit = unit.into();
        self.update_float64("displayUnit", |attrs| attrs.display_unit = Some(unit));
        self
    }

    /// Float64 only.
    pub fn nominal(mut self, nominal: f64) -> Self {
        self.update_float64("nominal", |attrs| attrs.nominal = Some(nominal));
        self
    }

    fn update_float64(&mut self, attribute: &'static str, f: impl FnOnce(&mut Float64Attributes)) {
        match &mut self.kind {
            VariableKind::Float64(attrs) => f(attrs),
            _ => self.misapplied.push(attribute),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last segment of the dot-separated name.
    pub fn local_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    pub fn get_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn value_reference(&self) -> Option<ValueReference> {
        self.value_reference
    }

    pub fn get_causality(&self) -> Option<Causality> {
        self.causality
    }

    pub fn get_variability(&self) -> Option<Variability> {
        self.variability
    }

    pub fn get_initial(&self) -> Option<Initial> {
        self.initial
    }

    pub fn get_declared_type(&self) -> Option<&str> {
        self.declared_type.as_deref()
    }

    pub fn get_start(&self) -> Option<&Value> {
        self.start.as_ref()
    }

    pub fn kind(&self) -> Kind {
        self.kind.kind()
    }

    pub fn variable_kind(&self) -> &VariableKind {
        &self.kind
    }

    pub fn dimensions(&self) -> &[Dimension] {
        self.kind.dimensions()
    }

    pub fn is_array(&self) -> bool {
        !self.dimensions().is_empty()
    }

    /// The variable this one is the time derivative of.
    pub fn derivative(&self) -> Option<ValueReference> {
        self.kind.float64().and_then(|attrs| attrs.derivative)
    }

    pub fn get_unit(&self) -> Option<&str> {
        self.kind.float64().and_then(|attrs| attrs.unit.as_deref())
    }

    pub fn get_nominal(&self) -> Option<f64> {
        self.kind.float64().and_then(|attrs| attrs.nominal)
    }

    /// Assign the value reference. A reference can only be assigned once.
    pub fn assign_reference(&mut self, reference: ValueReference) -> FmuResult<()> {
        if let Some(existing) = self.value_reference {
            return Err(FmuError::DuplicateReference {
                name: self.name.clone(),
                existing,
            });
        }
        self.value_reference = Some(reference);
        Ok(())
    }

    /// Set the declared type, keeping an existing one if it has the same name.
    pub(crate) fn assign_declared_type(&mut self, declared_type: &str) -> FmuResult<()> {
        match &self.declared_type {
            Some(existing) if existing != declared_type => Err(FmuError::InvalidVariable {
                name: self.name.clone(),
                reason: format!(
                    "declared type '{}' conflicts with '{}'",
                    declared_type, existing
                ),
            }),
            _ => {
                self.declared_type = Some(declared_type.to_string());
                Ok(())
            }
        }
    }

    /// Whether the variable needs a start value in the model description.
    pub fn requires_start(&self) -> bool {
        matches!(self.initial, Some(Initial::Exact | Initial::Approx))
            || matches!(
                self.causality,
                Some(Causality::Input | Causality::Parameter)
            )
            || self.variability == Some(Variability::Constant)
    }

    /// Replace the start value with a snapshot taken from the model.
    pub(crate) fn set_start(&mut self, start: Value) {
        self.start = Some(start);
    }

    /// Check the invariants that do not depend on other variables.
    ///
    /// Normalises a literal start value to the variable's kind, so that an
    /// integer literal given for a Float64 variable is stored as a float and array
    /// literals are stored flat.
    pub(crate) fn validate(&mut self) -> FmuResult<()> {
        if let Some(attribute) = self.misapplied.first() {
            return Err(FmuError::InvalidVariable {
                name: self.name.clone(),
                reason: format!(
                    "'{}' is not supported for {} variables",
                    attribute,
                    self.kind()
                ),
            });
        }
        if self.kind() == Kind::Enumeration && self.declared_type.is_none() {
            return Err(FmuError::InvalidVariable {
                name: self.name.clone(),
                reason: "enumerations need a declared type".to_string(),
            });
        }
        if let Some(start) = self.start.take() {
            let normalised = self.normalise_start(start)?;
            self.start = Some(normalised);
        }
        Ok(())
    }

    /// Convert a start value to the canonical representation for this kind.
    pub(crate) fn normalise_start(&self, start: Value) -> FmuResult<Value> {
        let invalid = |found: &str| FmuError::InvalidVariable {
            name: self.name.clone(),
            reason: format!("start value {} does not match kind {}", found, self.kind()),
        };
        let found = start.type_name();
        let normalised = match self.kind() {
            Kind::Boolean => conform::<bool>(start, self.is_array()),
            Kind::Int32 => conform::<i32>(start, self.is_array()),
            Kind::Int64 | Kind::Enumeration => conform::<i64>(start, self.is_array()),
            Kind::UInt64 => conform::<u64>(start, self.is_array()),
            Kind::Float64 => conform::<f64>(start, self.is_array()),
            Kind::String => conform::<String>(start, false),
        };
        let normalised = normalised.ok_or_else(|| invalid(found))?;

        if let Some(expected) = self.fixed_element_count()? {
            if self.is_array() && normalised.len() != expected {
                return Err(FmuError::ShapeMismatch {
                    name: self.name.clone(),
                    expected,
                    actual: normalised.len(),
                });
            }
        }
        Ok(normalised)
    }

    /// Element count when every dimension is a literal.
    fn fixed_element_count(&self) -> FmuResult<Option<usize>> {
        let mut count = 1usize;
        for dimension in self.dimensions() {
            match dimension {
                Dimension::Fixed(n) => {
                    count = count
                        .checked_mul(*n)
                        .ok_or_else(|| FmuError::InvalidDimension {
                            name: self.name.clone(),
                            reason: "element count overflows".to_string(),
                        })?;
                }
                Dimension::Variable(_) => return Ok(None),
            }
        }
        Ok(Some(count))
    }
}

fn conform<T: Element>(value: Value, array: bool) -> Option<Value> {
    if array {
        T::into_array(T::flatten(value)?)
    } else if value.is_array() {
        None
    } else {
        T::from_value(&value).map(Element::into_value)
    }
}

impl fmt::Display for ModelVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(name={}", self.kind(), self.name)?;
        if let Some(causality) = self.causality {
            write!(f, ", causality={}", causality)?;
        }
        if let Some(variability) = self.variability {
            write!(f, ", variability={}", variability)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_display_uses_protocol_names() {
        assert_eq!(
            Causality::CalculatedParameter.to_string(),
            "calculatedParameter"
        );
        assert_eq!(
            Causality::StructuralParameter.to_string(),
            "structuralParameter"
        );
        assert_eq!(Variability::Continuous.to_string(), "continuous");
        assert_eq!(Initial::Approx.to_string(), "approx");
    }

    #[test]
    fn test_enum_serialization() {
        let json = serde_json::to_string(&Causality::CalculatedParameter).unwrap();
        assert_eq!(json, "\"calculatedParameter\"");
        let back: Causality = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Causality::CalculatedParameter);
    }

    #[test]
    fn test_local_name() {
        assert_eq!(ModelVariable::float64("ball.h").local_name(), "h");
        assert_eq!(ModelVariable::float64("x").local_name(), "x");
    }

    #[test]
    fn test_reference_assigned_once() {
        let mut var = ModelVariable::int32("n");
        var.assign_reference(3).unwrap();
        assert_eq!(var.value_reference(), Some(3));

        let err = var.assign_reference(4).unwrap_err();
        assert_eq!(
            err,
            FmuError::DuplicateReference {
                name: "n".to_string(),
                existing: 3
            }
        );
        assert_eq!(var.value_reference(), Some(3));
    }

    #[test]
    fn test_requires_start() {
        let plain = || ModelVariable::float64("a");
        assert!(!plain().requires_start());
        assert!(plain().initial(Initial::Exact).requires_start());
        assert!(plain().initial(Initial::Approx).requires_start());
        assert!(!plain().initial(Initial::Calculated).requires_start());
        assert!(plain().causality(Causality::Input).requires_start());
        assert!(plain().causality(Causality::Parameter).requires_start());
        assert!(!plain().causality(Causality::Output).requires_start());
        assert!(plain().variability(Variability::Constant).requires_start());
    }

    #[test]
    fn test_float64_only_attributes() {
        let var = ModelVariable::float64("der_x")
            .derivative_of(1)
            .unit("m/s")
            .nominal(2.0);
        assert_eq!(var.derivative(), Some(1));
        assert_eq!(var.get_unit(), Some("m/s"));
        assert_eq!(var.get_nominal(), Some(2.0));

        let mut var = ModelVariable::int32("n").derivative_of(1);
        assert_eq!(var.derivative(), None);
        let err = var.validate().unwrap_err();
        assert!(matches!(err, FmuError::InvalidVariable { .. }));
        assert!(err.to_string().contains("derivative"));
    }

    #[test]
    fn test_strings_cannot_have_dimensions() {
        let mut var = ModelVariable::string("s").dimension(Dimension::fixed(2));
        assert!(var.dimensions().is_empty());
        assert!(var.validate().is_err());
    }

    #[test]
    fn test_start_is_normalised() {
        let mut var = ModelVariable::float64("x").start(1);
        var.validate().unwrap();
        assert_eq!(var.get_start(), Some(&Value::Float64(1.0)));

        let mut var = ModelVariable::float64("m")
            .dimension(Dimension::fixed(2))
            .dimension(Dimension::fixed(2))
            .start(ndarray::array![[1.0, 2.0], [3.0, 4.0]]);
        var.validate().unwrap();
        assert_eq!(
            var.get_start(),
            Some(&Value::from(vec![1.0, 2.0, 3.0, 4.0]))
        );

        let mut var = ModelVariable::float64("m")
            .dimension(Dimension::fixed(3))
            .start(vec![1.0, 2.0]);
        assert!(matches!(
            var.validate().unwrap_err(),
            FmuError::ShapeMismatch { expected: 3, actual: 2, .. }
        ));

        let mut var = ModelVariable::boolean("b").start(1.5);
        assert!(var.validate().is_err());
    }

    #[test]
    fn test_enumeration_needs_declared_type() {
        let mut var = ModelVariable::enumeration("mode", "Mode").start(2);
        var.validate().unwrap();
        assert_eq!(var.get_declared_type(), Some("Mode"));
        assert_eq!(var.get_start(), Some(&Value::Int64(2)));
    }

    #[test]
    fn test_display() {
        let var = ModelVariable::float64("x")
            .causality(Causality::Output)
            .variability(Variability::Continuous);
        assert_eq!(
            var.to_string(),
            "Float64(name=x, causality=output, variability=continuous)"
        );
    }
}
