//! Models and the instances that expose them.
//!
//! # Overview
//!
//! A [`Model`] is a plain struct holding its state as attributes. It declares the
//! variables it exposes in [`Model::define_variables`] and optionally overrides the
//! co-simulation lifecycle hooks. A [`ModelInstance`] owns the model together with
//! its [`Registry`], metadata, logger and export configuration, and is what a host
//! talks to:
//!
//! 1. construction registers the variables, resolves their bindings and checks the
//!    model's capabilities once
//! 2. typed `get_*`/`set_*` families exchange values by reference
//! 3. [`ModelInstance::model_description`] resolves start values once and builds
//!    the structural description
//!
//! # Example
//!
//! ```
//! use fmuvars_core::model::{Model, ModelInstance};
//! use fmuvars_core::registry::Registry;
//! use fmuvars_core::variable::{Causality, ModelVariable, Variability};
//! use fmuvars_core::errors::FmuResult;
//! use fmuvars_core::Attributes;
//!
//! #[derive(Attributes)]
//! struct Gain {
//!     k: f64,
//!     u: f64,
//!     y: f64,
//! }
//!
//! impl Model for Gain {
//!     fn define_variables(&self, registry: &mut Registry<Self>) -> FmuResult<()> {
//!         registry.register(
//!             ModelVariable::float64("k")
//!                 .causality(Causality::Parameter)
//!                 .variability(Variability::Tunable),
//!         )?;
//!         registry.register(ModelVariable::float64("u").causality(Causality::Input))?;
//!         registry.register(ModelVariable::float64("y").causality(Causality::Output))?;
//!         Ok(())
//!     }
//!
//!     fn do_step(&mut self, _t: f64, _dt: f64) -> FmuResult<fmuvars_core::model::StepResult> {
//!         self.y = self.k * self.u;
//!         Ok(Default::default())
//!     }
//! }
//!
//! let mut instance = ModelInstance::new(Gain { k: 2.0, u: 0.0, y: 0.0 }).unwrap();
//! instance.set_float64(&[1], &[3.0]).unwrap();
//! instance.do_step(0.0, 0.1).unwrap();
//! assert_eq!(instance.get_float64(&[2]).unwrap(), vec![6.0]);
//!
//! let description = instance.model_description().unwrap();
//! assert_eq!(description.metadata.name, "Gain");
//! ```

use crate::binding::{Attributes, Getter};
use crate::config::ExportConfig;
use crate::description::ModelDescription;
use crate::errors::{FmuError, FmuResult};
use crate::logging::{Logger, Status};
use crate::metadata::{short_type_name, ModelMetadata};
use crate::model_exchange::{ModelExchange, Phase};
use crate::registry::Registry;
use crate::state::StateSnapshot;
use crate::structure::ModelStructure;
use crate::value::{Element, Kind, Value};
use crate::variable::{Causality, ModelVariable, ValueReference};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Outcome of a co-simulation step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub event_handling_needed: bool,
    pub terminate_simulation: bool,
    pub early_return: bool,
    /// Only meaningful with `early_return`.
    pub last_successful_time: Option<f64>,
}

/// A simulation model exposing its attributes as variables.
///
/// Every hook except [`Model::define_variables`] has a default that does nothing.
pub trait Model: Attributes + Sized + 'static {
    /// Register the exposed variables, in the order their references are assigned.
    fn define_variables(&self, registry: &mut Registry<Self>) -> FmuResult<()>;

    /// Metadata for the description. Defaults to the type name as model name.
    fn metadata(&self) -> ModelMetadata {
        ModelMetadata::new(short_type_name::<Self>())
    }

    /// Log categories declared in addition to the default ones.
    fn log_categories(&self) -> Vec<(String, String)> {
        vec![]
    }

    fn enter_initialization_mode(&mut self) -> FmuResult<()> {
        Ok(())
    }

    fn exit_initialization_mode(&mut self) -> FmuResult<()> {
        Ok(())
    }

    fn do_step(&mut self, _current_time: f64, _step_size: f64) -> FmuResult<StepResult> {
        Ok(StepResult::default())
    }

    fn terminate(&mut self) -> FmuResult<()> {
        Ok(())
    }

    /// The model-exchange view of the model, for models with that capability.
    fn as_model_exchange(&mut self) -> Option<&mut dyn ModelExchange> {
        None
    }
}

/// Capabilities found when the instance was constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub co_simulation: bool,
    pub model_exchange: bool,
}

/// A model together with everything needed to exchange its variables.
pub struct ModelInstance<M: Model> {
    pub(crate) model: M,
    pub(crate) registry: Registry<M>,
    metadata: ModelMetadata,
    config: ExportConfig,
    logger: Logger,
    capabilities: Capabilities,
    starts_resolved: bool,
    pub(crate) phase: Phase,
    pub(crate) previous_indicators: Vec<f64>,
}

impl<M: Model> ModelInstance<M> {
    pub fn new(model: M) -> FmuResult<Self> {
        Self::with_config(model, ExportConfig::default())
    }

    /// Register and resolve the model's variables.
    ///
    /// Any error here is fatal: the model cannot be instantiated.
    pub fn with_config(mut model: M, config: ExportConfig) -> FmuResult<Self> {
        let mut registry = Registry::new();
        model.define_variables(&mut registry)?;
        registry.resolve(&model)?;

        let capabilities = Capabilities {
            co_simulation: true,
            model_exchange: model.as_model_exchange().is_some(),
        };
        if capabilities.model_exchange
            && !registry
                .variables()
                .any(|v| v.get_causality() == Some(Causality::Independent))
        {
            return Err(FmuError::MissingCapability(
                "model exchange (no independent time variable registered)".to_string(),
            ));
        }

        let mut logger = Logger::new();
        for (name, description) in model.log_categories() {
            logger.add_category(name, description);
        }
        let metadata = model.metadata();
        info!(
            "Instantiated model '{}' with {} variables ({:?})",
            metadata.name,
            registry.len(),
            capabilities
        );

        Ok(Self {
            model,
            registry,
            metadata,
            config,
            logger,
            capabilities,
            starts_resolved: false,
            phase: Phase::Instantiated,
            previous_indicators: vec![],
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Direct access to the model attributes, bypassing the setters.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn registry(&self) -> &Registry<M> {
        &self.registry
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut ModelMetadata {
        &mut self.metadata
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut Logger {
        &mut self.logger
    }

    /// Queue a message for the host, see [`Logger::log`].
    pub fn log(&mut self, message: impl Into<String>, status: Status, category: Option<&str>) {
        self.logger.log(message, status, category, false);
    }

    pub fn variable(&self, reference: ValueReference) -> FmuResult<&ModelVariable> {
        self.registry.variable(reference)
    }

    pub fn reference_of(&self, name: &str) -> Option<ValueReference> {
        self.registry.reference_of(name)
    }

    pub fn get<T: Element>(&self, references: &[ValueReference]) -> FmuResult<Vec<T>> {
        self.registry.get(&self.model, references)
    }

    pub fn set<T: Element>(
        &mut self,
        references: &[ValueReference],
        values: &[T],
    ) -> FmuResult<()> {
        self.registry.set(&mut self.model, references, values)
    }

    pub fn get_boolean(&self, references: &[ValueReference]) -> FmuResult<Vec<bool>> {
        self.get(references)
    }

    pub fn get_int32(&self, references: &[ValueReference]) -> FmuResult<Vec<i32>> {
        self.get(references)
    }

    /// Also used for enumeration variables.
    pub fn get_int64(&self, references: &[ValueReference]) -> FmuResult<Vec<i64>> {
        self.get(references)
    }

    pub fn get_uint64(&self, references: &[ValueReference]) -> FmuResult<Vec<u64>> {
        self.get(references)
    }

    pub fn get_float64(&self, references: &[ValueReference]) -> FmuResult<Vec<f64>> {
        self.get(references)
    }

    pub fn get_string(&self, references: &[ValueReference]) -> FmuResult<Vec<String>> {
        self.get(references)
    }

    pub fn set_boolean(&mut self, references: &[ValueReference], values: &[bool]) -> FmuResult<()> {
        self.set(references, values)
    }

    pub fn set_int32(&mut self, references: &[ValueReference], values: &[i32]) -> FmuResult<()> {
        self.set(references, values)
    }

    /// Also used for enumeration variables.
    pub fn set_int64(&mut self, references: &[ValueReference], values: &[i64]) -> FmuResult<()> {
        self.set(references, values)
    }

    pub fn set_uint64(&mut self, references: &[ValueReference], values: &[u64]) -> FmuResult<()> {
        self.set(references, values)
    }

    pub fn set_float64(&mut self, references: &[ValueReference], values: &[f64]) -> FmuResult<()> {
        self.set(references, values)
    }

    pub fn set_string(
        &mut self,
        references: &[ValueReference],
        values: &[String],
    ) -> FmuResult<()> {
        self.set(references, values)
    }

    pub fn enter_initialization_mode(&mut self) -> FmuResult<()> {
        self.model.enter_initialization_mode()
    }

    pub fn exit_initialization_mode(&mut self) -> FmuResult<()> {
        self.model.exit_initialization_mode()
    }

    pub fn do_step(&mut self, current_time: f64, step_size: f64) -> FmuResult<StepResult> {
        let result = self.model.do_step(current_time, step_size)?;
        if result.terminate_simulation {
            let end = current_time + step_size;
            debug!("Model requested termination at t={}", end);
        }
        Ok(result)
    }

    pub fn terminate(&mut self) -> FmuResult<()> {
        self.phase = Phase::Terminated;
        self.model.terminate()
    }

    pub fn get_state(&self) -> FmuResult<StateSnapshot> {
        StateSnapshot::capture(&self.registry, &self.model)
    }

    pub fn set_state(&mut self, snapshot: &StateSnapshot) -> FmuResult<()> {
        snapshot.restore(&self.registry, &mut self.model)
    }

    pub fn serialize_state(&self) -> FmuResult<Vec<u8>> {
        self.get_state()?.to_bytes()
    }

    pub fn deserialize_state(&self, bytes: &[u8]) -> FmuResult<StateSnapshot> {
        StateSnapshot::from_bytes(bytes)
    }

    /// Outputs, state derivatives, initial unknowns and event indicators.
    pub fn structure(&self) -> ModelStructure {
        ModelStructure::derive(
            self.registry.variables(),
            self.registry.event_indicators(),
            self.config.initial_unknowns,
        )
    }

    /// Bake the current values into the start of every variable that needs one.
    ///
    /// Runs once; later calls keep the first snapshot. The getter wins over a
    /// literal start given at registration. A literal is only kept when the
    /// variable has no bound getter.
    pub fn resolve_start_values(&mut self) -> FmuResult<()> {
        if self.starts_resolved {
            return Ok(());
        }
        let pending: Vec<ValueReference> = self
            .registry
            .entries()
            .filter(|entry| {
                let variable = entry.variable();
                let literal_only = variable.get_start().is_some()
                    && matches!(entry.getter(), Getter::Unresolved(_));
                variable.requires_start() && !literal_only
            })
            .filter_map(|entry| entry.variable().value_reference())
            .collect();
        for reference in pending {
            let start = self.current_start(reference)?;
            let variable = self.registry.variable_mut(reference)?;
            debug!("Start of '{}' resolved to {:?}", variable.name(), start);
            variable.set_start(start);
        }
        self.starts_resolved = true;
        Ok(())
    }

    fn current_start(&self, reference: ValueReference) -> FmuResult<Value> {
        match self.registry.variable(reference)?.kind() {
            Kind::Boolean => self.snapshot::<bool>(reference),
            Kind::Int32 => self.snapshot::<i32>(reference),
            Kind::Int64 | Kind::Enumeration => self.snapshot::<i64>(reference),
            Kind::UInt64 => self.snapshot::<u64>(reference),
            Kind::Float64 => self.snapshot::<f64>(reference),
            Kind::String => self.snapshot::<String>(reference),
        }
    }

    fn snapshot<T: Element>(&self, reference: ValueReference) -> FmuResult<Value> {
        let variable = self.registry.variable(reference)?;
        let unsupported = || FmuError::UnsupportedKind {
            name: variable.name().to_string(),
            kind: variable.kind(),
        };
        let mut values = self.get::<T>(&[reference])?;
        if variable.is_array() {
            T::into_array(values).ok_or_else(unsupported)
        } else {
            values.pop().map(T::into_value).ok_or_else(unsupported)
        }
    }

    /// Resolve start values and describe the model.
    pub fn model_description(&mut self) -> FmuResult<ModelDescription> {
        self.resolve_start_values()?;
        Ok(ModelDescription {
            metadata: self.metadata.clone(),
            model_options: self.config.model_options.clone(),
            model_exchange: self.capabilities.model_exchange,
            units: self.registry.units().to_vec(),
            type_definitions: self.registry.type_definitions().to_vec(),
            log_categories: self.logger.categories().to_vec(),
            default_experiment: self.config.default_experiment.clone(),
            variables: self.registry.variables().cloned().collect(),
            structure: self.structure(),
        })
    }
}
