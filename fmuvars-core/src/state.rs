//! Snapshots of the exposed model state.
//!
//! A [`StateSnapshot`] maps every variable name to its current getter output, with
//! arrays stored flat in row-major order. Entries keep registration order so that
//! structural parameters are restored before the arrays they size. Restoring writes
//! each entry back through the variable's setter; variables without a setter are
//! skipped. Entries whose
//! name matches no variable are written to the model attribute of that name, which
//! lets models carry internal state in a snapshot.

use crate::binding::Attributes;
use crate::errors::{FmuError, FmuResult};
use crate::registry::Registry;
use crate::value::Value;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    values: Vec<(String, Value)>,
}

impl StateSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every registered variable.
    pub fn capture<M: Attributes>(registry: &Registry<M>, model: &M) -> FmuResult<Self> {
        let mut values = Vec::with_capacity(registry.len());
        for entry in registry.entries() {
            let variable = entry.variable();
            let value = entry.getter().read(variable.name(), model)?;
            let value = if value.is_array() {
                let len = value.len();
                value.reshape(&[len]).ok_or_else(|| FmuError::ShapeMismatch {
                    name: variable.name().to_string(),
                    expected: len,
                    actual: len,
                })?
            } else {
                value
            };
            values.push((variable.name().to_string(), value));
        }
        Ok(Self { values })
    }

    /// Write the snapshot back to `model`.
    pub fn restore<M: Attributes>(&self, registry: &Registry<M>, model: &mut M) -> FmuResult<()> {
        for (name, value) in &self.values {
            match registry.reference_of(name) {
                Some(reference) => {
                    let entry = registry.entry(reference)?;
                    match entry.setter() {
                        Some(setter) => setter.write(name, model, value.clone())?,
                        None => debug!("Skipping '{}' on restore, it has no setter", name),
                    }
                }
                None => model.set_attribute(name, value.clone())?,
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// Set the entry for `name`, appending it when it is new.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries in the order they are restored.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter().map(|(name, value)| (name, value))
    }

    pub fn to_bytes(&self) -> FmuResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> FmuResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::Dimension;
    use crate::variable::{ModelVariable, Variability};
    use ndarray::{array, Array2};

    #[derive(Attributes)]
    struct Heater {
        temperature: f64,
        power: Array2<f64>,
        on: bool,
        cycles: i64,
    }

    fn setup() -> (Heater, Registry<Heater>) {
        let heater = Heater {
            temperature: 20.0,
            power: array![[1.0, 2.0], [3.0, 4.0]],
            on: true,
            cycles: 0,
        };
        let mut registry = Registry::<Heater>::new();
        registry
            .register(ModelVariable::float64("temperature"))
            .unwrap();
        registry
            .register(
                ModelVariable::float64("power")
                    .dimension(Dimension::fixed(2))
                    .dimension(Dimension::fixed(2)),
            )
            .unwrap();
        registry
            .register(
                ModelVariable::boolean("on")
                    .variability(Variability::Constant)
                    .start(true),
            )
            .unwrap();
        registry.resolve(&heater).unwrap();
        (heater, registry)
    }

    #[test]
    fn test_capture_and_restore() {
        let (mut heater, registry) = setup();
        let snapshot = StateSnapshot::capture(&registry, &heater).unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(
            snapshot.get("power"),
            Some(&Value::from(vec![1.0, 2.0, 3.0, 4.0]))
        );

        heater.temperature = 50.0;
        heater.power.fill(0.0);
        heater.on = false;
        snapshot.restore(&registry, &mut heater).unwrap();
        assert_eq!(heater.temperature, 20.0);
        assert_eq!(heater.power, array![[1.0, 2.0], [3.0, 4.0]]);
        // Constants have no setter and are left alone
        assert!(!heater.on);
    }

    #[test]
    fn test_unregistered_names_go_to_model_attributes() {
        let (mut heater, registry) = setup();
        let mut snapshot = StateSnapshot::new();
        snapshot.insert("cycles", 12_i64);
        snapshot.restore(&registry, &mut heater).unwrap();
        assert_eq!(heater.cycles, 12);

        snapshot.insert("unknown", 1.0);
        let err = snapshot.restore(&registry, &mut heater).unwrap_err();
        assert_eq!(err, FmuError::UnknownAttribute("unknown".to_string()));
    }

    #[test]
    fn test_bytes_round_trip() {
        let (heater, registry) = setup();
        let snapshot = StateSnapshot::capture(&registry, &heater).unwrap();
        let bytes = snapshot.to_bytes().unwrap();
        assert_eq!(StateSnapshot::from_bytes(&bytes).unwrap(), snapshot);

        let err = StateSnapshot::from_bytes(b"not json").unwrap_err();
        assert!(matches!(err, FmuError::Serialization(_)));
    }
}
