//! Named type definitions referenced by variables through their declared type.

use serde::{Deserialize, Serialize};

/// A Float64 type with optional quantity, unit and bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Float64Type {
    pub name: String,
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub display_unit: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub nominal: Option<f64>,
}

impl Float64Type {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: None,
            unit: None,
            display_unit: None,
            min: None,
            max: None,
            nominal: None,
        }
    }

    pub fn quantity(mut self, quantity: impl Into<String>) -> Self {
        self.quantity = Some(quantity.into());
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn display_unit(mut self, unit: impl Into<String>) -> Self {
        self.display_unit = Some(unit.into());
        self
    }

    pub fn bounds(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn nominal(mut self, nominal: f64) -> Self {
        self.nominal = Some(nominal);
        self
    }
}

/// One named value of an enumeration type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerationItem {
    pub name: String,
    pub value: i64,
    pub description: Option<String>,
}

/// An enumeration type. Enumeration variables hold one of the item values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerationType {
    pub name: String,
    pub items: Vec<EnumerationItem>,
}

impl EnumerationType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: vec![],
        }
    }

    pub fn item(mut self, name: impl Into<String>, value: i64) -> Self {
        self.items.push(EnumerationItem {
            name: name.into(),
            value,
            description: None,
        });
        self
    }

    pub fn described_item(
        mut self,
        name: impl Into<String>,
        value: i64,
        description: impl Into<String>,
    ) -> Self {
        self.items.push(EnumerationItem {
            name: name.into(),
            value,
            description: Some(description.into()),
        });
        self
    }

    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.items.iter().find(|i| i.name == name).map(|i| i.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeDefinition {
    Float64(Float64Type),
    Enumeration(EnumerationType),
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Float64(t) => &t.name,
            TypeDefinition::Enumeration(t) => &t.name,
        }
    }
}

impl From<Float64Type> for TypeDefinition {
    fn from(value: Float64Type) -> Self {
        TypeDefinition::Float64(value)
    }
}

impl From<EnumerationType> for TypeDefinition {
    fn from(value: EnumerationType) -> Self {
        TypeDefinition::Enumeration(value)
    }
}
