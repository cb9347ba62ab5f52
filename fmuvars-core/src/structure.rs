//! Structural relationships derived from the registered variables.
//!
//! The model structure lists, by value reference:
//!
//! - outputs: variables with causality output
//! - continuous-state derivatives: continuous Float64 variables that are the
//!   derivative of another variable
//! - initial unknowns: variables the host has to compute during initialisation
//! - event indicators: flagged variables, in the order they were flagged
//!
//! Two rules for initial unknowns are in use. [`InitialUnknownsRule::Narrow`] takes
//! outputs, calculated parameters and state derivatives that are not `exact`.
//! [`InitialUnknownsRule::Extended`] additionally takes every continuous variable
//! that is not `exact`, except the independent variable.

use crate::variable::{Causality, Initial, ModelVariable, ValueReference, Variability};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialUnknownsRule {
    Narrow,
    #[default]
    Extended,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModelStructure {
    pub outputs: Vec<ValueReference>,
    pub continuous_state_derivatives: Vec<ValueReference>,
    pub initial_unknowns: Vec<ValueReference>,
    pub event_indicators: Vec<ValueReference>,
}

fn not_exact(variable: &ModelVariable) -> bool {
    variable.get_initial() != Some(Initial::Exact)
}

pub fn is_output(variable: &ModelVariable) -> bool {
    variable.get_causality() == Some(Causality::Output)
}

pub fn is_state_derivative(variable: &ModelVariable) -> bool {
    variable.get_variability() == Some(Variability::Continuous)
        && variable.derivative().is_some()
}

fn is_initial_unknown(variable: &ModelVariable, rule: InitialUnknownsRule) -> bool {
    let narrow = (is_output(variable) && not_exact(variable))
        || variable.get_causality() == Some(Causality::CalculatedParameter)
        || (is_state_derivative(variable) && not_exact(variable));
    let extended = rule == InitialUnknownsRule::Extended
        && variable.get_variability() == Some(Variability::Continuous)
        && not_exact(variable)
        && variable.get_causality() != Some(Causality::Independent);
    narrow || extended
}

impl ModelStructure {
    /// Derive the structure from variables in reference order.
    pub fn derive<'a>(
        variables: impl IntoIterator<Item = &'a ModelVariable>,
        event_indicators: &[ValueReference],
        rule: InitialUnknownsRule,
    ) -> Self {
        let mut structure = ModelStructure {
            event_indicators: event_indicators.to_vec(),
            ..Default::default()
        };
        for variable in variables {
            let Some(reference) = variable.value_reference() else {
                continue;
            };
            if is_output(variable) {
                structure.outputs.push(reference);
            }
            if is_state_derivative(variable) {
                structure.continuous_state_derivatives.push(reference);
            }
            if is_initial_unknown(variable, rule) {
                structure.initial_unknowns.push(reference);
            }
        }
        structure
    }
}
