//! Ordered registry of exposed variables.
//!
//! # Overview
//!
//! The [`Registry`] owns every [`ModelVariable`] of a model together with its
//! accessors. Variables are registered once, during model construction, and are
//! never removed:
//!
//! - value references are assigned sequentially from 0, so registration order,
//!   reference order and iteration order are the same
//! - names are unique
//! - type definitions and units are collected in tables keyed by name, where
//!   registering an identical definition twice is allowed but a different
//!   definition under an existing name is not
//!
//! Registration stores the requested binding; [`Registry::resolve`] then checks
//! every synthesised accessor against the model in one pass, before the first
//! value is exchanged.
//!
//! # Example
//!
//! ```
//! use fmuvars_core::registry::{Registration, Registry};
//! use fmuvars_core::variable::{Causality, ModelVariable, Variability};
//! use fmuvars_core::Attributes;
//!
//! #[derive(Attributes)]
//! struct Tank {
//!     level: f64,
//! }
//!
//! let mut registry = Registry::<Tank>::new();
//! let level = registry
//!     .register(ModelVariable::float64("level").causality(Causality::Output))
//!     .unwrap();
//! let area = registry
//!     .register(
//!         Registration::new(
//!             ModelVariable::float64("area")
//!                 .causality(Causality::Parameter)
//!                 .variability(Variability::Fixed)
//!                 .start(2.5),
//!         )
//!         .getter(|_tank: &Tank| Ok(2.5.into())),
//!     )
//!     .unwrap();
//!
//! assert_eq!((level, area), (0, 1));
//! registry.resolve(&Tank { level: 1.0 }).unwrap();
//! ```

use crate::binding::{Attributes, AttributePath, Getter, GetterFn, Setter, SetterFn};
use crate::dimension::Dimension;
use crate::errors::{FmuError, FmuResult};
use crate::type_definitions::TypeDefinition;
use crate::units::Unit;
use crate::value::{Kind, Value};
use crate::variable::{ModelVariable, ValueReference, Variability};
use log::{debug, warn};
use std::collections::HashMap;

/// A variable with its accessors.
#[derive(Debug)]
pub struct Entry<M> {
    variable: ModelVariable,
    getter: Getter<M>,
    setter: Option<Setter<M>>,
}

impl<M> Entry<M> {
    pub fn variable(&self) -> &ModelVariable {
        &self.variable
    }

    pub fn getter(&self) -> &Getter<M> {
        &self.getter
    }

    pub fn setter(&self) -> Option<&Setter<M>> {
        self.setter.as_ref()
    }

    pub fn reference(&self) -> ValueReference {
        // Entries only exist for registered variables
        self.variable.value_reference().unwrap_or_default()
    }
}

/// A variable to register plus how it should be bound.
pub struct Registration<M> {
    variable: ModelVariable,
    getter: Option<GetterFn<M>>,
    setter: Option<SetterFn<M>>,
    nested: bool,
    type_definition: Option<TypeDefinition>,
    event_indicator: bool,
}

impl<M> Registration<M> {
    pub fn new(variable: ModelVariable) -> Self {
        Self {
            variable,
            getter: None,
            setter: None,
            nested: true,
            type_definition: None,
            event_indicator: false,
        }
    }

    /// Read the value through `getter` instead of a model attribute.
    pub fn getter(mut self, getter: impl Fn(&M) -> FmuResult<Value> + 'static) -> Self {
        self.getter = Some(Box::new(getter));
        self
    }

    /// Write the value through `setter` instead of a model attribute.
    pub fn setter(mut self, setter: impl Fn(&mut M, Value) -> FmuResult<()> + 'static) -> Self {
        self.setter = Some(Box::new(setter));
        self
    }

    /// Bind dotted names to the attribute named by the last segment on the model
    /// root, instead of walking nested parts.
    pub fn flat(mut self) -> Self {
        self.nested = false;
        self
    }

    /// Register `definition` in the type table and use it as the declared type.
    pub fn with_type(mut self, definition: impl Into<TypeDefinition>) -> Self {
        self.type_definition = Some(definition.into());
        self
    }

    /// Flag the variable as an event indicator.
    pub fn event_indicator(mut self) -> Self {
        self.event_indicator = true;
        self
    }
}

impl<M> From<ModelVariable> for Registration<M> {
    fn from(value: ModelVariable) -> Self {
        Registration::new(value)
    }
}

pub struct Registry<M> {
    entries: Vec<Entry<M>>,
    names: HashMap<String, ValueReference>,
    type_definitions: Vec<TypeDefinition>,
    units: Vec<Unit>,
    event_indicators: Vec<ValueReference>,
}

impl<M> Default for Registry<M> {
    fn default() -> Self {
        Self {
            entries: vec![],
            names: HashMap::new(),
            type_definitions: vec![],
            units: vec![],
            event_indicators: vec![],
        }
    }
}

impl<M> Registry<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a variable and return its value reference.
    ///
    /// Fails if the variable is invalid on its own, already carries a reference,
    /// reuses a name, or brings a type definition that conflicts with the table.
    pub fn register(
        &mut self,
        registration: impl Into<Registration<M>>,
    ) -> FmuResult<ValueReference> {
        let Registration {
            mut variable,
            getter,
            setter,
            nested,
            type_definition,
            event_indicator,
        } = registration.into();

        variable.validate()?;
        if self.names.contains_key(variable.name()) {
            return Err(FmuError::DuplicateVariableName(variable.name().to_string()));
        }
        if event_indicator && variable.kind() != Kind::Float64 {
            return Err(FmuError::InvalidEventIndicator(variable.name().to_string()));
        }
        let constant = variable.get_variability() == Some(Variability::Constant);
        if constant && setter.is_some() {
            return Err(FmuError::InvalidVariable {
                name: variable.name().to_string(),
                reason: "constants cannot have a setter".to_string(),
            });
        }

        let reference = self.next_reference()?;
        variable.assign_reference(reference)?;
        if let Some(definition) = type_definition {
            variable.assign_declared_type(definition.name())?;
            self.add_type_definition(definition)?;
        }

        let path = AttributePath::from_variable_name(variable.name(), nested);
        let getter = match getter {
            Some(f) => Getter::Custom(f),
            None => Getter::Attribute(path.clone()),
        };
        let setter = match setter {
            Some(f) => Some(Setter::Custom(f)),
            None if constant => None,
            None => Some(Setter::Attribute(path)),
        };
        debug!(
            "Registered {} as valueReference={} ({:?}, {:?})",
            variable, reference, getter, setter
        );

        if event_indicator {
            self.event_indicators.push(reference);
        }
        self.names.insert(variable.name().to_string(), reference);
        self.entries.push(Entry {
            variable,
            getter,
            setter,
        });
        Ok(reference)
    }

    fn next_reference(&self) -> FmuResult<ValueReference> {
        ValueReference::try_from(self.entries.len()).map_err(|_| FmuError::InvalidVariable {
            name: format!("#{}", self.entries.len()),
            reason: "value references exhausted".to_string(),
        })
    }

    /// Add a type definition, ignoring exact duplicates.
    pub fn add_type_definition(&mut self, definition: TypeDefinition) -> FmuResult<()> {
        match self
            .type_definitions
            .iter()
            .find(|existing| existing.name() == definition.name())
        {
            Some(existing) if *existing == definition => Ok(()),
            Some(_) => Err(FmuError::DuplicateType(definition.name().to_string())),
            None => {
                self.type_definitions.push(definition);
                Ok(())
            }
        }
    }

    /// Add units to the unit table, ignoring exact duplicates.
    pub fn register_units(&mut self, units: impl IntoIterator<Item = Unit>) -> FmuResult<()> {
        for unit in units {
            let known = self.units.iter().find(|known| known.name == unit.name);
            match known {
                Some(existing) if *existing == unit => {}
                Some(_) => return Err(FmuError::DuplicateUnit(unit.name)),
                None => self.units.push(unit),
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, reference: ValueReference) -> FmuResult<&Entry<M>> {
        usize::try_from(reference)
            .ok()
            .and_then(|index| self.entries.get(index))
            .ok_or(FmuError::UnknownReference(reference))
    }

    pub fn variable(&self, reference: ValueReference) -> FmuResult<&ModelVariable> {
        self.entry(reference).map(Entry::variable)
    }

    pub(crate) fn variable_mut(
        &mut self,
        reference: ValueReference,
    ) -> FmuResult<&mut ModelVariable> {
        usize::try_from(reference)
            .ok()
            .and_then(|index| self.entries.get_mut(index))
            .map(|entry| &mut entry.variable)
            .ok_or(FmuError::UnknownReference(reference))
    }

    pub fn reference_of(&self, name: &str) -> Option<ValueReference> {
        self.names.get(name).copied()
    }

    /// Entries in reference order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry<M>> {
        self.entries.iter()
    }

    /// Variables in reference order.
    pub fn variables(&self) -> impl Iterator<Item = &ModelVariable> {
        self.entries.iter().map(Entry::variable)
    }

    pub fn type_definitions(&self) -> &[TypeDefinition] {
        &self.type_definitions
    }

    pub fn type_definition(&self, name: &str) -> Option<&TypeDefinition> {
        self.type_definitions.iter().find(|t| t.name() == name)
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Event indicators in the order they were flagged.
    pub fn event_indicators(&self) -> &[ValueReference] {
        &self.event_indicators
    }
}

impl<M: Attributes> Registry<M> {
    /// Check cross references and synthesised accessors against `model`.
    ///
    /// Getters whose attribute cannot be found become unresolved markers that fail
    /// on first read. Synthesised setters are dropped when the owner lacks the
    /// attribute. Derivative and dimension references must point at registered
    /// variables.
    pub fn resolve(&mut self, model: &M) -> FmuResult<()> {
        for index in 0..self.entries.len() {
            self.check_references(&self.entries[index].variable)?;

            let entry = &mut self.entries[index];
            let name = entry.variable.name();
            if let Getter::Attribute(path) = &entry.getter {
                if let Err(reason) = path.check(model) {
                    warn!("No getter for variable '{}': {}", name, reason);
                    entry.getter = Getter::Unresolved(reason);
                }
            }
            if let Some(Setter::Attribute(path)) = &entry.setter {
                if path.check(model).is_err() {
                    debug!("Variable '{}' has no settable attribute", name);
                    entry.setter = None;
                }
            }
        }
        Ok(())
    }

    fn check_references(&self, variable: &ModelVariable) -> FmuResult<()> {
        if let Some(target) = variable.derivative() {
            let own = variable.value_reference();
            let valid = self
                .variable(target)
                .map(|t| t.kind() == Kind::Float64 && t.value_reference() != own)
                .unwrap_or(false);
            if !valid {
                return Err(FmuError::InvalidDerivative {
                    name: variable.name().to_string(),
                    target,
                });
            }
        }
        for dimension in variable.dimensions() {
            if let Dimension::Variable(reference) = dimension {
                let unregistered = || FmuError::InvalidDimension {
                    name: variable.name().to_string(),
                    reason: format!("valueReference={} is not registered", reference),
                };
                let size_variable = self.variable(*reference).map_err(|_| unregistered())?;
                let kind = size_variable.kind();
                let integer = matches!(kind, Kind::Int32 | Kind::Int64 | Kind::UInt64);
                if !integer || size_variable.is_array() {
                    return Err(FmuError::InvalidDimension {
                        name: variable.name().to_string(),
                        reason: format!("'{}' is not a scalar integer", size_variable.name()),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_definitions::{EnumerationType, Float64Type};
    use crate::units::BaseUnit;
    use crate::variable::Causality;

    #[derive(Attributes)]
    struct Body {
        mass: f64,
    }

    #[derive(Attributes)]
    struct Model {
        time: f64,
        x: f64,
        n: u64,
        #[attributes(nested)]
        body: Body,
    }

    fn model() -> Model {
        Model {
            time: 0.0,
            x: 1.0,
            n: 2,
            body: Body { mass: 3.0 },
        }
    }

    #[test]
    fn test_references_are_sequential() {
        let mut registry = Registry::<Model>::new();
        let mut refs = vec![];
        for name in ["time", "x", "n"] {
            refs.push(registry.register(ModelVariable::float64(name)).unwrap());
        }
        assert_eq!(refs, vec![0, 1, 2]);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.reference_of("x"), Some(1));
        let names: Vec<&str> = registry.variables().map(|v| v.name()).collect();
        assert_eq!(names, vec!["time", "x", "n"]);
    }

    #[test]
    fn test_duplicate_reference() {
        let mut registry = Registry::<Model>::new();
        let mut var = ModelVariable::float64("x");
        var.assign_reference(7).unwrap();
        let err = registry.register(var).unwrap_err();
        assert_eq!(
            err,
            FmuError::DuplicateReference {
                name: "x".to_string(),
                existing: 7
            }
        );
        assert!(err.is_fatal());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_name() {
        let mut registry = Registry::<Model>::new();
        registry.register(ModelVariable::float64("x")).unwrap();
        assert_eq!(
            registry.register(ModelVariable::float64("x")).unwrap_err(),
            FmuError::DuplicateVariableName("x".to_string())
        );
    }

    #[test]
    fn test_type_definitions() {
        let mut registry = Registry::<Model>::new();
        let length = Float64Type::new("Length").unit("m");
        let x = Registration::new(ModelVariable::float64("x"));
        registry.register(x.with_type(length.clone())).unwrap();
        // The same definition may be supplied again
        let time = Registration::new(ModelVariable::float64("time"));
        registry.register(time.with_type(length)).unwrap();
        assert_eq!(registry.type_definitions().len(), 1);
        assert_eq!(
            registry.variable(0).unwrap().get_declared_type(),
            Some("Length")
        );

        let err = registry
            .register(
                Registration::new(ModelVariable::float64("body.mass"))
                    .with_type(Float64Type::new("Length").unit("km")),
            )
            .unwrap_err();
        assert_eq!(err, FmuError::DuplicateType("Length".to_string()));

        registry
            .add_type_definition(EnumerationType::new("Mode").item("On", 1).into())
            .unwrap();
        assert!(registry.type_definition("Mode").is_some());
    }

    #[test]
    fn test_units() {
        let mut registry = Registry::<Model>::new();
        let metre = Unit::new("m", BaseUnit::dimensionless().m(1));
        registry.register_units([metre.clone(), metre]).unwrap();
        assert_eq!(registry.units().len(), 1);

        let err = registry
            .register_units([Unit::new("m", BaseUnit::dimensionless().s(1))])
            .unwrap_err();
        assert_eq!(err, FmuError::DuplicateUnit("m".to_string()));
    }

    #[test]
    fn test_event_indicators_must_be_float64() {
        let mut registry = Registry::<Model>::new();
        let x = Registration::new(ModelVariable::float64("x"));
        registry.register(x.event_indicator()).unwrap();
        let n = Registration::new(ModelVariable::uint64("n"));
        let err = registry.register(n.event_indicator()).unwrap_err();
        assert_eq!(err, FmuError::InvalidEventIndicator("n".to_string()));
        assert_eq!(registry.event_indicators(), &[0]);
    }

    #[test]
    fn test_resolve_bindings() {
        let mut registry = Registry::<Model>::new();
        registry
            .register(ModelVariable::float64("body.mass"))
            .unwrap();
        registry
            .register(Registration::new(ModelVariable::float64("ball.x")).flat())
            .unwrap();
        registry
            .register(ModelVariable::float64("missing"))
            .unwrap();
        registry
            .register(
                ModelVariable::float64("g")
                    .variability(Variability::Constant)
                    .start(9.81),
            )
            .unwrap();
        registry.resolve(&model()).unwrap();

        let m = model();
        let mass = registry.entry(0).unwrap();
        assert_eq!(
            mass.getter().read("body.mass", &m).unwrap(),
            Value::Float64(3.0)
        );
        assert!(mass.setter().is_some());

        // A flat binding ignores the dotted prefix
        let x = registry.entry(1).unwrap();
        assert_eq!(x.getter().read("ball.x", &m).unwrap(), Value::Float64(1.0));

        let missing = registry.entry(2).unwrap();
        assert!(matches!(missing.getter(), Getter::Unresolved(_)));
        assert!(missing.setter().is_none());

        let constant = registry.entry(3).unwrap();
        assert!(constant.setter().is_none());
    }

    #[test]
    fn test_constant_with_setter_is_rejected() {
        let mut registry = Registry::<Model>::new();
        let constant = ModelVariable::float64("c").variability(Variability::Constant);
        let registration = Registration::new(constant).setter(|_m: &mut Model, _v| Ok(()));
        let err = registry.register(registration).unwrap_err();
        assert!(matches!(err, FmuError::InvalidVariable { .. }));
    }

    #[test]
    fn test_invalid_derivative() {
        let mut registry = Registry::<Model>::new();
        registry.register(ModelVariable::uint64("n")).unwrap();
        registry
            .register(
                ModelVariable::float64("x")
                    .causality(Causality::Local)
                    .derivative_of(0),
            )
            .unwrap();
        let err = registry.resolve(&model()).unwrap_err();
        assert_eq!(
            err,
            FmuError::InvalidDerivative {
                name: "x".to_string(),
                target: 0
            }
        );
    }

    #[test]
    fn test_invalid_dimension_reference() {
        let mut registry = Registry::<Model>::new();
        let x = ModelVariable::float64("x").dimension(Dimension::variable(5));
        registry.register(x).unwrap();
        let err = registry.resolve(&model()).unwrap_err();
        assert!(matches!(err, FmuError::InvalidDimension { .. }));
    }
}
