//! Continuous-state evaluation for model-exchange hosts.
//!
//! # Overview
//!
//! A model-exchange host integrates the model itself. It needs the continuous
//! states, their derivatives and the event indicators as flat `f64` vectors. All
//! three are assembled from registered variables:
//!
//! - the state derivatives are the continuous Float64 variables with a
//!   `derivative` reference, in reference order
//! - the states are the variables those derivatives point at, in the same order
//! - the event indicators are the variables flagged at registration, in the order
//!   they were flagged
//!
//! Models opt in by implementing [`ModelExchange`] and returning it from
//! [`Model::as_model_exchange`](crate::model::Model::as_model_exchange).
//!
//! The adapter follows the host through [`Phase`]s. Once the model asked to
//! terminate, every further call fails with [`FmuError::InvalidPhase`].

use crate::errors::{FmuError, FmuResult};
use crate::model::{Model, ModelInstance};
use crate::structure::is_state_derivative;
use crate::variable::ValueReference;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of a discrete-state update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscreteStateUpdate {
    pub discrete_states_need_update: bool,
    pub terminate_simulation: bool,
    pub nominals_of_continuous_states_changed: bool,
    pub values_of_continuous_states_changed: bool,
    pub next_event_time: Option<f64>,
}

/// Operations a model provides to be integrated by the host.
pub trait ModelExchange {
    fn set_time(&mut self, time: f64);

    /// Bring the derivative attributes up to date with the current states.
    ///
    /// Models whose derivatives are computed by their getters need not override
    /// this.
    fn compute_derivatives(&mut self) -> FmuResult<()> {
        Ok(())
    }

    /// Bring the event indicator attributes up to date.
    fn compute_event_indicators(&mut self) -> FmuResult<()> {
        Ok(())
    }

    /// Whether the physical condition behind an event indicator element is active.
    ///
    /// `index` is the position in the flattened indicator vector returned to the
    /// host, so an array indicator with dimensions covers several indices. An
    /// inactive element that sits exactly at zero is moved off zero so the host
    /// does not detect a crossing.
    fn event_condition_active(&self, _index: usize) -> bool {
        true
    }

    fn update_discrete_states(&mut self) -> FmuResult<DiscreteStateUpdate> {
        Ok(DiscreteStateUpdate::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Instantiated,
    TimeSet,
    DerivativesEvaluated,
    EventIndicatorsEvaluated,
    DiscreteStatesUpdated,
    Terminated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl<M: Model> ModelInstance<M> {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn ensure_model_exchange(&self, operation: &str) -> FmuResult<()> {
        if !self.capabilities().model_exchange {
            return Err(FmuError::MissingCapability("model exchange".to_string()));
        }
        if self.phase == Phase::Terminated {
            return Err(FmuError::InvalidPhase {
                operation: operation.to_string(),
                phase: self.phase.to_string(),
            });
        }
        Ok(())
    }

    fn exchange(&mut self) -> FmuResult<&mut dyn ModelExchange> {
        self.model
            .as_model_exchange()
            .ok_or_else(|| FmuError::MissingCapability("model exchange".to_string()))
    }

    /// References of the state derivatives, in reference order.
    pub fn state_derivative_references(&self) -> Vec<ValueReference> {
        self.registry
            .variables()
            .filter(|v| is_state_derivative(v))
            .filter_map(|v| v.value_reference())
            .collect()
    }

    /// References of the states, ordered like their derivatives.
    pub fn continuous_state_references(&self) -> Vec<ValueReference> {
        self.registry
            .variables()
            .filter(|v| is_state_derivative(v))
            .filter_map(|v| v.derivative())
            .collect()
    }

    fn count_elements(&self, references: &[ValueReference]) -> FmuResult<usize> {
        references.iter().try_fold(0usize, |total, &reference| {
            let count = self.registry.element_count(&self.model, reference)?;
            total
                .checked_add(count)
                .ok_or(FmuError::ValueCountMismatch {
                    expected: usize::MAX,
                    actual: total,
                })
        })
    }

    pub fn set_time(&mut self, time: f64) -> FmuResult<()> {
        self.ensure_model_exchange("set_time")?;
        self.exchange()?.set_time(time);
        self.phase = Phase::TimeSet;
        Ok(())
    }

    pub fn get_continuous_states(&self) -> FmuResult<Vec<f64>> {
        self.ensure_model_exchange("get_continuous_states")?;
        self.get_float64(&self.continuous_state_references())
    }

    /// Write the states from one flat vector, each taking as many values as it has
    /// elements.
    pub fn set_continuous_states(&mut self, values: &[f64]) -> FmuResult<()> {
        self.ensure_model_exchange("set_continuous_states")?;
        let references = self.continuous_state_references();
        self.set_float64(&references, values)
    }

    pub fn get_continuous_state_derivatives(&mut self) -> FmuResult<Vec<f64>> {
        self.ensure_model_exchange("get_continuous_state_derivatives")?;
        self.exchange()?.compute_derivatives()?;
        let derivatives = self.get_float64(&self.state_derivative_references())?;
        self.phase = Phase::DerivativesEvaluated;
        Ok(derivatives)
    }

    /// Current event indicators, with inactive exact zeros moved off zero.
    pub fn get_event_indicators(&mut self) -> FmuResult<Vec<f64>> {
        self.ensure_model_exchange("get_event_indicators")?;
        self.exchange()?.compute_event_indicators()?;
        let mut values = self.get_float64(self.registry.event_indicators())?;

        if self.previous_indicators.len() != values.len() {
            self.previous_indicators = vec![0.0; values.len()];
        }
        let exchange = self
            .model
            .as_model_exchange()
            .ok_or_else(|| FmuError::MissingCapability("model exchange".to_string()))?;
        for (index, value) in values.iter_mut().enumerate() {
            if *value == 0.0 && !exchange.event_condition_active(index) {
                let previous = self.previous_indicators[index];
                let nudged = f64::EPSILON.copysign(previous);
                warn!("Event indicator {} is inactive at zero, using {:e}", index, nudged);
                *value = nudged;
            }
            if *value != 0.0 {
                self.previous_indicators[index] = *value;
            }
        }
        self.phase = Phase::EventIndicatorsEvaluated;
        Ok(values)
    }

    /// Nominal value of every state element, 1.0 where none was declared.
    pub fn get_nominals_of_continuous_states(&self) -> FmuResult<Vec<f64>> {
        self.ensure_model_exchange("get_nominals_of_continuous_states")?;
        let mut nominals = vec![];
        for reference in self.continuous_state_references() {
            let variable = self.registry.variable(reference)?;
            let nominal = variable.get_nominal().unwrap_or(1.0);
            let count = self.registry.element_count(&self.model, reference)?;
            nominals.extend(std::iter::repeat(nominal).take(count));
        }
        Ok(nominals)
    }

    pub fn update_discrete_states(&mut self) -> FmuResult<DiscreteStateUpdate> {
        self.ensure_model_exchange("update_discrete_states")?;
        let update = self.exchange()?.update_discrete_states()?;
        self.phase = if update.terminate_simulation {
            debug!("Model requested termination during a discrete-state update");
            Phase::Terminated
        } else {
            Phase::DiscreteStatesUpdated
        };
        Ok(update)
    }

    /// Number of flattened state elements.
    pub fn get_number_of_continuous_states(&self) -> FmuResult<usize> {
        self.count_elements(&self.continuous_state_references())
    }

    /// Number of flattened event indicator elements.
    pub fn get_number_of_event_indicators(&self) -> FmuResult<usize> {
        self.count_elements(self.registry.event_indicators())
    }
}
