//! Values exchanged between a model and its host.
//!
//! A [`Value`] is what an accessor reads from or writes to a model attribute. Scalars
//! and n-dimensional arrays share one enum so that accessors stay uniform, while
//! [`Kind`] is the fieldless tag used to address the typed vector calls.
//!
//! Conversions between values never truncate. An `Int64` attribute can be read as
//! `UInt64` only when it is non-negative and an integer can be read as `Float64`
//! only when the float represents it exactly.

use ndarray::{Array, ArrayD};
use num::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The value type of an exposed variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Boolean,
    Int32,
    Int64,
    UInt64,
    Float64,
    String,
    Enumeration,
}

impl Kind {
    /// Element name used in the structural description.
    pub fn tag(&self) -> &'static str {
        match self {
            Kind::Boolean => "Boolean",
            Kind::Int32 => "Int32",
            Kind::Int64 => "Int64",
            Kind::UInt64 => "UInt64",
            Kind::Float64 => "Float64",
            Kind::String => "String",
            Kind::Enumeration => "Enumeration",
        }
    }

    /// Whether variables of this kind may carry array dimensions.
    pub fn supports_dimensions(&self) -> bool {
        !matches!(self, Kind::String | Kind::Enumeration)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A scalar or array value read from, or written to, a model attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    UInt64(u64),
    Float64(f64),
    String(String),
    BooleanArray(ArrayD<bool>),
    Int32Array(ArrayD<i32>),
    Int64Array(ArrayD<i64>),
    UInt64Array(ArrayD<u64>),
    Float64Array(ArrayD<f64>),
}

impl Value {
    /// Short description of the held type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "Boolean",
            Value::Int32(_) => "Int32",
            Value::Int64(_) => "Int64",
            Value::UInt64(_) => "UInt64",
            Value::Float64(_) => "Float64",
            Value::String(_) => "String",
            Value::BooleanArray(_) => "Boolean array",
            Value::Int32Array(_) => "Int32 array",
            Value::Int64Array(_) => "Int64 array",
            Value::UInt64Array(_) => "UInt64 array",
            Value::Float64Array(_) => "Float64 array",
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Value::BooleanArray(_)
                | Value::Int32Array(_)
                | Value::Int64Array(_)
                | Value::UInt64Array(_)
                | Value::Float64Array(_)
        )
    }

    /// Shape of an array value, `None` for scalars.
    pub fn shape(&self) -> Option<Vec<usize>> {
        match self {
            Value::BooleanArray(a) => Some(a.shape().to_vec()),
            Value::Int32Array(a) => Some(a.shape().to_vec()),
            Value::Int64Array(a) => Some(a.shape().to_vec()),
            Value::UInt64Array(a) => Some(a.shape().to_vec()),
            Value::Float64Array(a) => Some(a.shape().to_vec()),
            _ => None,
        }
    }

    /// Number of elements, 1 for scalars.
    pub fn len(&self) -> usize {
        self.shape().map(|s| s.iter().product()).unwrap_or(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reshape an array value in row-major order.
    ///
    /// Returns `None` when the element count does not match `shape` or the
    /// value is a scalar.
    pub fn reshape(self, shape: &[usize]) -> Option<Value> {
        fn reshape_array<T: Clone>(a: ArrayD<T>, shape: &[usize]) -> Option<ArrayD<T>> {
            let flat: Vec<T> = a.iter().cloned().collect();
            Array::from_shape_vec(shape.to_vec(), flat).ok()
        }
        match self {
            Value::BooleanArray(a) => reshape_array(a, shape).map(Value::BooleanArray),
            Value::Int32Array(a) => reshape_array(a, shape).map(Value::Int32Array),
            Value::Int64Array(a) => reshape_array(a, shape).map(Value::Int64Array),
            Value::UInt64Array(a) => reshape_array(a, shape).map(Value::UInt64Array),
            Value::Float64Array(a) => reshape_array(a, shape).map(Value::Float64Array),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::UInt64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float64(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl<T: ArrayElement> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        T::wrap(Array::from_vec(value).into_dyn())
    }
}

impl<T: ArrayElement, D: ndarray::Dimension> From<Array<T, D>> for Value {
    fn from(value: Array<T, D>) -> Self {
        T::wrap(value.into_dyn())
    }
}

/// A scalar type that can be exchanged through a typed vector call.
///
/// Implemented for the Rust type backing each [`Kind`]: `bool`, `i32`, `i64`
/// (also used for enumerations), `u64`, `f64` and `String`.
pub trait Element: Clone + Sized {
    /// Kind addressed by vector calls of this element type.
    const KIND: Kind;

    /// Whether a variable of `kind` is exchanged through this element type.
    fn accepts(kind: Kind) -> bool {
        kind == Self::KIND
    }

    /// Lossless conversion of a scalar value.
    fn from_value(value: &Value) -> Option<Self>;

    /// All elements of a value in row-major order. A scalar yields one element.
    fn flatten(value: Value) -> Option<Vec<Self>>;

    fn into_value(self) -> Value;

    /// Wrap a flat list of elements as a one-dimensional array value.
    ///
    /// Returns `None` for element types that cannot form arrays.
    fn into_array(values: Vec<Self>) -> Option<Value>;
}

/// Element types that may be stored in n-dimensional array attributes.
pub trait ArrayElement: Element + 'static {
    fn wrap(array: ArrayD<Self>) -> Value;
    fn unwrap(value: Value) -> Option<ArrayD<Self>>;
}

macro_rules! impl_array_element {
    ($ty:ty, $kind:expr, $scalar:ident, $array:ident, |$v:ident| $convert:expr) => {
        impl Element for $ty {
            const KIND: Kind = $kind;

            fn from_value($v: &Value) -> Option<Self> {
                $convert
            }

            fn flatten(value: Value) -> Option<Vec<Self>> {
                if value.is_array() {
                    Self::unwrap(value).map(|a| a.iter().cloned().collect())
                } else {
                    <Self as Element>::from_value(&value).map(|v| vec![v])
                }
            }

            fn into_value(self) -> Value {
                Value::$scalar(self)
            }

            fn into_array(values: Vec<Self>) -> Option<Value> {
                Some(Value::$array(Array::from_vec(values).into_dyn()))
            }
        }

        impl ArrayElement for $ty {
            fn wrap(array: ArrayD<Self>) -> Value {
                Value::$array(array)
            }

            fn unwrap(value: Value) -> Option<ArrayD<Self>> {
                match value {
                    Value::$array(a) => Some(a),
                    other => {
                        let shape = other.shape()?;
                        let flat = flatten_array_lossless(&other, <Self as Element>::from_value)?;
                        Array::from_shape_vec(shape, flat).ok()
                    }
                }
            }
        }
    };
}

/// Convert every element of a foreign array through `convert`.
fn flatten_array_lossless<T>(
    value: &Value,
    convert: impl Fn(&Value) -> Option<T>,
) -> Option<Vec<T>> {
    match value {
        Value::BooleanArray(a) => a.iter().map(|v| convert(&Value::Boolean(*v))).collect(),
        Value::Int32Array(a) => a.iter().map(|v| convert(&Value::Int32(*v))).collect(),
        Value::Int64Array(a) => a.iter().map(|v| convert(&Value::Int64(*v))).collect(),
        Value::UInt64Array(a) => a.iter().map(|v| convert(&Value::UInt64(*v))).collect(),
        Value::Float64Array(a) => a.iter().map(|v| convert(&Value::Float64(*v))).collect(),
        _ => None,
    }
}

/// Exact integer to float conversion, `None` if the float would round.
fn exact_f64<I: ToPrimitive + PartialEq + Copy>(
    i: I,
    back: impl Fn(f64) -> Option<I>,
) -> Option<f64> {
    let f = i.to_f64()?;
    (back(f)? == i).then_some(f)
}

impl_array_element!(bool, Kind::Boolean, Boolean, BooleanArray, |value| match value {
    Value::Boolean(b) => Some(*b),
    _ => None,
});

impl_array_element!(i32, Kind::Int32, Int32, Int32Array, |value| match value {
    Value::Int32(i) => Some(*i),
    Value::Int64(i) => i.to_i32(),
    Value::UInt64(i) => i.to_i32(),
    _ => None,
});

impl_array_element!(u64, Kind::UInt64, UInt64, UInt64Array, |value| match value {
    Value::UInt64(i) => Some(*i),
    Value::Int32(i) => i.to_u64(),
    Value::Int64(i) => i.to_u64(),
    _ => None,
});

impl_array_element!(f64, Kind::Float64, Float64, Float64Array, |value| match value {
    Value::Float64(f) => Some(*f),
    Value::Int32(i) => Some(f64::from(*i)),
    Value::Int64(i) => exact_f64(*i, |f| f.to_i64()),
    Value::UInt64(i) => exact_f64(*i, |f| f.to_u64()),
    _ => None,
});

impl Element for i64 {
    const KIND: Kind = Kind::Int64;

    /// Enumerations are exchanged through the Int64 calls.
    fn accepts(kind: Kind) -> bool {
        matches!(kind, Kind::Int64 | Kind::Enumeration)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int64(i) => Some(*i),
            Value::Int32(i) => Some(i64::from(*i)),
            Value::UInt64(i) => i.to_i64(),
            _ => None,
        }
    }

    fn flatten(value: Value) -> Option<Vec<Self>> {
        if value.is_array() {
            Self::unwrap(value).map(|a| a.iter().cloned().collect())
        } else {
            <Self as Element>::from_value(&value).map(|v| vec![v])
        }
    }

    fn into_value(self) -> Value {
        Value::Int64(self)
    }

    fn into_array(values: Vec<Self>) -> Option<Value> {
        Some(Value::Int64Array(Array::from_vec(values).into_dyn()))
    }
}

impl ArrayElement for i64 {
    fn wrap(array: ArrayD<Self>) -> Value {
        Value::Int64Array(array)
    }

    fn unwrap(value: Value) -> Option<ArrayD<Self>> {
        match value {
            Value::Int64Array(a) => Some(a),
            other => {
                let shape = other.shape()?;
                let flat = flatten_array_lossless(&other, <Self as Element>::from_value)?;
                Array::from_shape_vec(shape, flat).ok()
            }
        }
    }
}

impl Element for String {
    const KIND: Kind = Kind::String;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn flatten(value: Value) -> Option<Vec<Self>> {
        match value {
            Value::String(s) => Some(vec![s]),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::String(self)
    }

    /// Strings always occupy a single slot and never form arrays.
    fn into_array(_values: Vec<Self>) -> Option<Value> {
        None
    }
}

/// Conversion between a model attribute's Rust type and a [`Value`].
///
/// This is what the `Attributes` derive uses to read and write fields.
pub trait AttributeValue: Sized {
    /// Kind reported when a conversion fails.
    const KIND: Kind;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! impl_attribute_value {
    ($($ty:ty),*) => {
        $(
            impl AttributeValue for $ty {
                const KIND: Kind = <$ty as Element>::KIND;

                fn to_value(&self) -> Value {
                    Element::into_value(self.clone())
                }

                fn from_value(value: Value) -> Option<Self> {
                    <$ty as Element>::from_value(&value)
                }
            }
        )*
    };
}

impl_attribute_value!(bool, i32, i64, u64, f64, String);

impl<A: ArrayElement, D: ndarray::Dimension> AttributeValue for Array<A, D> {
    const KIND: Kind = A::KIND;

    fn to_value(&self) -> Value {
        A::wrap(self.clone().into_dyn())
    }

    fn from_value(value: Value) -> Option<Self> {
        A::unwrap(value)?.into_dimensionality::<D>().ok()
    }
}

impl<A: ArrayElement> AttributeValue for Vec<A> {
    const KIND: Kind = A::KIND;

    fn to_value(&self) -> Value {
        A::wrap(Array::from_vec(self.clone()).into_dyn())
    }

    fn from_value(value: Value) -> Option<Self> {
        A::flatten(value)
    }
}
