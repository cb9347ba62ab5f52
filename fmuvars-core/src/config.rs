//! Export configuration.
//!
//! Options that do not belong to a model's variables but end up in its
//! description: capability flags, the initial-unknowns rule and the default
//! experiment. Every field has a default, so an empty document is a valid
//! configuration.
//!
//! # Example
//!
//! ```
//! use fmuvars_core::config::ExportConfig;
//! use fmuvars_core::structure::InitialUnknownsRule;
//!
//! let config = ExportConfig::from_toml_str(
//!     r#"
//!     initial_unknowns = "narrow"
//!
//!     [model_options]
//!     can_get_and_set_fmu_state = true
//!
//!     [default_experiment]
//!     stop_time = 10.0
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.initial_unknowns, InitialUnknownsRule::Narrow);
//! assert!(config.model_options.can_get_and_set_fmu_state);
//! assert!(config.model_options.needs_execution_tool);
//! ```

use crate::errors::FmuResult;
use crate::structure::InitialUnknownsRule;
use serde::{Deserialize, Serialize};

/// Capability flags of the co-simulation interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    pub needs_execution_tool: bool,
    pub can_handle_variable_communication_step_size: bool,
    pub can_be_instantiated_only_once_per_process: bool,
    pub can_get_and_set_fmu_state: bool,
    pub can_serialize_fmu_state: bool,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            needs_execution_tool: true,
            can_handle_variable_communication_step_size: true,
            can_be_instantiated_only_once_per_process: false,
            can_get_and_set_fmu_state: false,
            can_serialize_fmu_state: false,
        }
    }
}

impl ModelOptions {
    /// Flags under their description attribute names, in a fixed order.
    pub fn flags(&self) -> [(&'static str, bool); 5] {
        [
            ("needsExecutionTool", self.needs_execution_tool),
            (
                "canHandleVariableCommunicationStepSize",
                self.can_handle_variable_communication_step_size,
            ),
            (
                "canBeInstantiatedOnlyOncePerProcess",
                self.can_be_instantiated_only_once_per_process,
            ),
            ("canGetAndSetFMUState", self.can_get_and_set_fmu_state),
            ("canSerializeFMUState", self.can_serialize_fmu_state),
        ]
    }
}

/// Suggested simulation settings for hosts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultExperiment {
    pub start_time: Option<f64>,
    pub stop_time: Option<f64>,
    pub step_size: Option<f64>,
    pub tolerance: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub initial_unknowns: InitialUnknownsRule,
    pub model_options: ModelOptions,
    pub default_experiment: Option<DefaultExperiment>,
}

impl ExportConfig {
    pub fn from_toml_str(source: &str) -> FmuResult<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn to_toml_string(&self) -> FmuResult<String> {
        Ok(toml::to_string(self)?)
    }
}
