//! Accessors between registered variables and model attributes.
//!
//! # Overview
//!
//! Every registered variable has a getter and, unless it is constant, a setter.
//! They are either supplied explicitly as closures or synthesised from the
//! variable name:
//!
//! - With nested ownership (the default), a dotted name such as `ball.h` walks
//!   the [`Attributes::child`] chain from the model root (`ball`) and binds to the
//!   leaf attribute (`h`) of the owner found there.
//! - Without nested ownership the owner is the model root and the leaf is the last
//!   segment of the name.
//!
//! Attribute lookup goes through the [`Attributes`] trait, usually implemented with
//! `#[derive(Attributes)]`. A getter whose owner or leaf cannot be found is kept as
//! an unresolved marker and fails with [`FmuError::UnresolvedBinding`] the first
//! time it is read.

use crate::errors::{FmuError, FmuResult};
use crate::value::Value;
use std::fmt;

pub use fmuvars_macros::Attributes;

/// Name-based access to the attributes of a model or one of its parts.
///
/// # Example
///
/// ```
/// use fmuvars_core::binding::Attributes;
/// use fmuvars_core::value::Value;
///
/// #[derive(Attributes)]
/// struct Ball {
///     h: f64,
///     v: f64,
/// }
///
/// #[derive(Attributes)]
/// struct Model {
///     #[attributes(nested)]
///     ball: Ball,
///     #[attributes(skip)]
///     _cache: Vec<String>,
/// }
///
/// let mut model = Model { ball: Ball { h: 1.0, v: 0.0 }, _cache: vec![] };
/// let ball = model.child_mut("ball").unwrap();
/// ball.set_attribute("v", Value::Float64(-2.0)).unwrap();
/// assert_eq!(model.ball.v, -2.0);
/// assert!(!model.has_attribute("_cache"));
/// ```
pub trait Attributes {
    fn get_attribute(&self, name: &str) -> Option<Value>;

    /// Fails with [`FmuError::UnknownAttribute`] for missing attributes and
    /// [`FmuError::InvalidValue`] when the value cannot be converted losslessly.
    fn set_attribute(&mut self, name: &str, value: Value) -> FmuResult<()>;

    fn has_attribute(&self, name: &str) -> bool;

    /// A nested part of this object.
    fn child(&self, _name: &str) -> Option<&dyn Attributes> {
        None
    }

    fn child_mut(&mut self, _name: &str) -> Option<&mut dyn Attributes> {
        None
    }
}

/// Location of an attribute relative to the model root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePath {
    owner: Vec<String>,
    leaf: String,
}

impl AttributePath {
    /// Path for a variable name.
    ///
    /// With `nested` all segments but the last name the owner, otherwise the
    /// owner is the root.
    pub fn from_variable_name(name: &str, nested: bool) -> Self {
        let mut segments: Vec<String> = name.split('.').map(str::to_string).collect();
        let leaf = segments.pop().unwrap_or_default();
        Self {
            owner: if nested { segments } else { vec![] },
            leaf,
        }
    }

    pub fn leaf(&self) -> &str {
        &self.leaf
    }

    pub fn owner(&self) -> &[String] {
        &self.owner
    }

    fn missing(&self, segment: &str) -> String {
        format!("no nested attribute '{}' in '{}'", segment, self)
    }

    fn resolve_owner<'a>(&self, root: &'a dyn Attributes) -> Result<&'a dyn Attributes, String> {
        self.owner.iter().try_fold(root, |owner, segment| {
            owner.child(segment).ok_or_else(|| self.missing(segment))
        })
    }

    fn resolve_owner_mut<'a>(
        &self,
        root: &'a mut dyn Attributes,
    ) -> Result<&'a mut dyn Attributes, String> {
        let mut owner = root;
        for segment in &self.owner {
            owner = owner
                .child_mut(segment)
                .ok_or_else(|| self.missing(segment))?;
        }
        Ok(owner)
    }

    /// Check that the owner exists and has the leaf attribute.
    pub fn check(&self, root: &dyn Attributes) -> Result<(), String> {
        let owner = self.resolve_owner(root)?;
        if owner.has_attribute(&self.leaf) {
            Ok(())
        } else {
            Err(format!("attribute '{}' does not exist", self))
        }
    }

    pub fn read(&self, root: &dyn Attributes) -> Result<Value, String> {
        let owner = self.resolve_owner(root)?;
        owner
            .get_attribute(&self.leaf)
            .ok_or_else(|| format!("attribute '{}' does not exist", self))
    }

    /// Write an attribute, reshaping array values to the shape the attribute has now.
    pub fn write(&self, variable: &str, root: &mut dyn Attributes, value: Value) -> FmuResult<()> {
        let owner = self
            .resolve_owner_mut(root)
            .map_err(|reason| FmuError::UnresolvedBinding {
                name: variable.to_string(),
                reason,
            })?;
        let current = owner.get_attribute(&self.leaf);
        let value = match current.and_then(|current| current.shape()) {
            Some(shape) if value.is_array() => {
                let actual = value.len();
                value.reshape(&shape).ok_or_else(|| FmuError::ShapeMismatch {
                    name: variable.to_string(),
                    expected: shape.iter().product(),
                    actual,
                })?
            }
            _ => value,
        };
        owner.set_attribute(&self.leaf, value)
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.owner {
            write!(f, "{}.", segment)?;
        }
        write!(f, "{}", self.leaf)
    }
}

pub type GetterFn<M> = Box<dyn Fn(&M) -> FmuResult<Value>>;
pub type SetterFn<M> = Box<dyn Fn(&mut M, Value) -> FmuResult<()>>;

/// How a variable's value is read.
pub enum Getter<M> {
    Attribute(AttributePath),
    Custom(GetterFn<M>),
    /// No accessor could be bound; reading reports the reason.
    Unresolved(String),
}

/// How a variable's value is written.
pub enum Setter<M> {
    Attribute(AttributePath),
    Custom(SetterFn<M>),
}

impl<M: Attributes> Getter<M> {
    pub fn read(&self, variable: &str, model: &M) -> FmuResult<Value> {
        let unresolved = |reason: String| FmuError::UnresolvedBinding {
            name: variable.to_string(),
            reason,
        };
        match self {
            Getter::Attribute(path) => path.read(model).map_err(unresolved),
            Getter::Custom(f) => f(model),
            Getter::Unresolved(reason) => Err(unresolved(reason.clone())),
        }
    }
}

impl<M: Attributes> Setter<M> {
    pub fn write(&self, variable: &str, model: &mut M, value: Value) -> FmuResult<()> {
        match self {
            Setter::Attribute(path) => path.write(variable, model, value),
            Setter::Custom(f) => f(model, value),
        }
    }
}

impl<M> fmt::Debug for Getter<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Getter::Attribute(path) => write!(f, "Getter::Attribute({})", path),
            Getter::Custom(_) => write!(f, "Getter::Custom"),
            Getter::Unresolved(reason) => write!(f, "Getter::Unresolved({})", reason),
        }
    }
}

impl<M> fmt::Debug for Setter<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Setter::Attribute(path) => write!(f, "Setter::Attribute({})", path),
            Setter::Custom(_) => write!(f, "Setter::Custom"),
        }
    }
}
