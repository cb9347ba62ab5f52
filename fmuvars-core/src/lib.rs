//! Variable registry and data-exchange marshaling for simulation models.
//!
//! A model exposes its attributes to a co-simulation or model-exchange host as
//! typed variables addressed by value references. See [`model`] for how a model is
//! defined and instantiated, [`marshal`] for the vector calls and [`description`]
//! for the structural model description.

// Lets the `Attributes` derive refer to this crate by name from within it.
extern crate self as fmuvars_core;

pub mod binding;
pub mod config;
pub mod description;
pub mod dimension;
pub mod example_models;
pub mod logging;
pub mod marshal;
pub mod metadata;
pub mod model;
pub mod model_exchange;
pub mod registry;
pub mod state;
pub mod structure;
pub mod type_definitions;
pub mod units;
pub mod value;
pub mod variable;

pub mod errors;

// Re-export derive macro for convenience
pub use binding::Attributes;
