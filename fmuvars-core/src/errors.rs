use crate::value::Kind;
use crate::variable::ValueReference;
use thiserror::Error;

/// Error type for registry, marshaling and description operations.
///
/// None of these are retried internally. A failed vector call may already have
/// applied the writes for references that precede the failing one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FmuError {
    #[error("Value reference already set for variable '{name}' (existing={existing})")]
    DuplicateReference {
        name: String,
        existing: ValueReference,
    },
    #[error("A different type definition named '{0}' is already registered")]
    DuplicateType(String),
    #[error("A different unit named '{0}' is already registered")]
    DuplicateUnit(String),
    #[error("A variable named '{0}' is already registered")]
    DuplicateVariableName(String),
    #[error("Invalid variable '{name}': {reason}")]
    InvalidVariable { name: String, reason: String },
    #[error("Variable with valueReference={reference} is not of type {expected} (found {actual})")]
    TypeMismatch {
        reference: ValueReference,
        expected: Kind,
        actual: Kind,
    },
    #[error("Variable '{name}' (valueReference={reference}) cannot be set")]
    ImmutableVariable {
        name: String,
        reference: ValueReference,
    },
    #[error("No accessor could be bound for variable '{name}': {reason}")]
    UnresolvedBinding { name: String, reason: String },
    #[error("Cannot resolve a start value of kind {kind} for variable '{name}'")]
    UnsupportedKind { name: String, kind: Kind },
    #[error("Unknown valueReference={0}")]
    UnknownReference(ValueReference),
    #[error("Unknown attribute '{0}'")]
    UnknownAttribute(String),
    #[error("Invalid dimension for variable '{name}': {reason}")]
    InvalidDimension { name: String, reason: String },
    #[error("Variable '{name}' expects {expected} elements, got {actual}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("Expected {expected} values for the referenced variables, got {actual}")]
    ValueCountMismatch { expected: usize, actual: usize },
    #[error("Value for '{name}' is not a valid {expected}: {found}")]
    InvalidValue {
        name: String,
        expected: Kind,
        found: String,
    },
    #[error("Variable '{0}' cannot be used as an event indicator, only Float64 variables can")]
    InvalidEventIndicator(String),
    #[error("Variable '{name}' declares a derivative of valueReference={target} which is not a registered Float64 variable")]
    InvalidDerivative {
        name: String,
        target: ValueReference,
    },
    #[error("Model does not provide the {0} capability")]
    MissingCapability(String),
    #[error("Operation '{operation}' is not allowed in phase {phase}")]
    InvalidPhase { operation: String, phase: String },
    #[error("Serialization failed: {0}")]
    Serialization(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl FmuError {
    /// True for errors that leave a model instance unusable.
    ///
    /// Registration-time failures abort model construction, everything else
    /// only aborts the call that raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FmuError::DuplicateReference { .. }
                | FmuError::DuplicateType(_)
                | FmuError::DuplicateUnit(_)
                | FmuError::DuplicateVariableName(_)
                | FmuError::InvalidVariable { .. }
                | FmuError::UnsupportedKind { .. }
                | FmuError::InvalidEventIndicator(_)
                | FmuError::InvalidDerivative { .. }
        )
    }
}

impl From<serde_json::Error> for FmuError {
    fn from(value: serde_json::Error) -> Self {
        FmuError::Serialization(value.to_string())
    }
}

impl From<toml::de::Error> for FmuError {
    fn from(value: toml::de::Error) -> Self {
        FmuError::Config(value.to_string())
    }
}

impl From<toml::ser::Error> for FmuError {
    fn from(value: toml::ser::Error) -> Self {
        FmuError::Config(value.to_string())
    }
}

/// Convenience type for `Result<T, FmuError>`.
pub type FmuResult<T> = Result<T, FmuError>;
