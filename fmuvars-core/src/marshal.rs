//! Typed bulk get/set over the registry.
//!
//! # Overview
//!
//! A vector call names an ordered list of value references and exchanges one flat
//! list of values for all of them. References are processed in the order given and
//! every array variable contributes its elements in row-major order, so the
//! position of each value is fully determined by the references and their current
//! sizes.
//!
//! Calls are not transactional: when a `set` fails, the variables before the
//! failing reference have already been written.

use crate::binding::Attributes;
use crate::dimension::{element_count, SizeLookup};
use crate::errors::{FmuError, FmuResult};
use crate::registry::{Entry, Registry};
use crate::value::{Element, Value};
use crate::variable::ValueReference;
use log::trace;

/// Resolves dimension sizes against the current model state.
struct ModelSizes<'a, M> {
    registry: &'a Registry<M>,
    model: &'a M,
}

impl<M: Attributes> SizeLookup for ModelSizes<'_, M> {
    fn current_value(&self, reference: ValueReference) -> FmuResult<Value> {
        self.registry.read(self.model, reference)
    }
}

impl<M: Attributes> Registry<M> {
    /// Current value of a variable as returned by its getter.
    pub fn read(&self, model: &M, reference: ValueReference) -> FmuResult<Value> {
        let entry = self.entry(reference)?;
        entry.getter().read(entry.variable().name(), model)
    }

    /// Write a value through the variable's setter.
    pub fn write(&self, model: &mut M, reference: ValueReference, value: Value) -> FmuResult<()> {
        let entry = self.entry(reference)?;
        let setter = entry.setter().ok_or_else(|| FmuError::ImmutableVariable {
            name: entry.variable().name().to_string(),
            reference,
        })?;
        setter.write(entry.variable().name(), model, value)
    }

    /// Number of flattened elements of a variable, 1 for scalars.
    pub fn element_count(&self, model: &M, reference: ValueReference) -> FmuResult<usize> {
        let variable = self.variable(reference)?;
        let sizes = ModelSizes {
            registry: self,
            model,
        };
        element_count(variable.name(), variable.dimensions(), &sizes)
    }

    fn typed_entry<T: Element>(&self, reference: ValueReference) -> FmuResult<&Entry<M>> {
        let entry = self.entry(reference)?;
        let actual = entry.variable().kind();
        if !T::accepts(actual) {
            return Err(FmuError::TypeMismatch {
                reference,
                expected: T::KIND,
                actual,
            });
        }
        Ok(entry)
    }

    /// Values of the referenced variables, arrays flattened in place.
    pub fn get<T: Element>(&self, model: &M, references: &[ValueReference]) -> FmuResult<Vec<T>> {
        trace!("get {} {:?}", T::KIND, references);
        let mut values = Vec::with_capacity(references.len());
        for &reference in references {
            let entry = self.typed_entry::<T>(reference)?;
            let variable = entry.variable();
            let value = entry.getter().read(variable.name(), model)?;
            let found = value.type_name();
            let invalid = || FmuError::InvalidValue {
                name: variable.name().to_string(),
                expected: variable.kind(),
                found: found.to_string(),
            };

            if variable.is_array() {
                let expected = self.element_count(model, reference)?;
                let elements = T::flatten(value).ok_or_else(invalid)?;
                if elements.len() != expected {
                    return Err(FmuError::ShapeMismatch {
                        name: variable.name().to_string(),
                        expected,
                        actual: elements.len(),
                    });
                }
                values.extend(elements);
            } else if value.is_array() {
                return Err(invalid());
            } else {
                values.push(T::from_value(&value).ok_or_else(invalid)?);
            }
        }
        Ok(values)
    }

    /// Write a flat list of values to the referenced variables.
    ///
    /// Each reference consumes as many values as it has elements. Fails with
    /// [`FmuError::ValueCountMismatch`] when `values` is too short or has values
    /// left over.
    pub fn set<T: Element>(
        &self,
        model: &mut M,
        references: &[ValueReference],
        values: &[T],
    ) -> FmuResult<()> {
        trace!("set {} {:?}", T::KIND, references);
        let mut offset: usize = 0;
        for &reference in references {
            let entry = self.typed_entry::<T>(reference)?;
            let variable = entry.variable();
            let setter = entry.setter().ok_or_else(|| FmuError::ImmutableVariable {
                name: variable.name().to_string(),
                reference,
            })?;

            let count = if variable.is_array() {
                self.element_count(model, reference)?
            } else {
                1
            };
            let end = offset
                .checked_add(count)
                .ok_or(FmuError::ValueCountMismatch {
                    expected: usize::MAX,
                    actual: values.len(),
                })?;
            let slice = values.get(offset..end).ok_or(FmuError::ValueCountMismatch {
                expected: end,
                actual: values.len(),
            })?;

            let value = if variable.is_array() {
                T::into_array(slice.to_vec()).ok_or_else(|| FmuError::InvalidValue {
                    name: variable.name().to_string(),
                    expected: variable.kind(),
                    found: "array".to_string(),
                })?
            } else {
                slice[0].clone().into_value()
            };
            setter.write(variable.name(), model, value)?;
            offset = end;
        }

        if offset != values.len() {
            return Err(FmuError::ValueCountMismatch {
                expected: offset,
                actual: values.len(),
            });
        }
        Ok(())
    }
}
