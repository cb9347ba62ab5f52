//! The structural model description.
//!
//! # Overview
//!
//! A [`ModelDescription`] is a snapshot of everything a host needs to know about a
//! model before exchanging values with it: metadata, capability flags, units, type
//! definitions, log categories, the default experiment, the variables in reference
//! order and the derived [`ModelStructure`].
//!
//! It is built by [`ModelInstance::model_description`](crate::model::ModelInstance::model_description)
//! after start values have been resolved, and serialises to XML with
//! [`ModelDescription::to_xml`]. Sections are written in this order:
//!
//! 1. `ModelExchange` (only for models with the model-exchange capability)
//! 2. `CoSimulation`
//! 3. `UnitDefinitions`, `TypeDefinitions` (only when not empty)
//! 4. `LogCategories`, `DefaultExperiment`
//! 5. `ModelVariables`
//! 6. `ModelStructure`

pub mod format;
pub mod xml;

use crate::config::{DefaultExperiment, ModelOptions};
use crate::dimension::Dimension;
use crate::metadata::ModelMetadata;
use crate::structure::ModelStructure;
use crate::type_definitions::TypeDefinition;
use crate::units::Unit;
use crate::value::Value;
use crate::variable::ModelVariable;
use format::{encode_start, format_float};
use serde::{Deserialize, Serialize};
use xml::XmlElement;

pub const FMI_VERSION: &str = "3.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescription {
    pub metadata: ModelMetadata,
    pub model_options: ModelOptions,
    pub model_exchange: bool,
    pub units: Vec<Unit>,
    pub type_definitions: Vec<TypeDefinition>,
    pub log_categories: Vec<(String, String)>,
    pub default_experiment: Option<DefaultExperiment>,
    pub variables: Vec<ModelVariable>,
    pub structure: ModelStructure,
}

impl ModelDescription {
    pub fn variable(&self, name: &str) -> Option<&ModelVariable> {
        self.variables.iter().find(|v| v.name() == name)
    }

    pub fn to_xml(&self) -> String {
        self.to_element().to_document()
    }

    pub fn to_element(&self) -> XmlElement {
        let metadata = &self.metadata;
        let mut root = XmlElement::new("fmiModelDescription")
            .attr("fmiVersion", FMI_VERSION)
            .attr("modelName", &metadata.name)
            .attr("instantiationToken", metadata.instantiation_token)
            .attr_opt("description", metadata.description.as_ref())
            .attr_opt("author", metadata.author.as_ref())
            .attr_opt("version", metadata.version.as_ref())
            .attr_opt("copyright", metadata.copyright.as_ref())
            .attr_opt("license", metadata.license.as_ref())
            .attr("generationTool", &metadata.generation_tool)
            .attr("generationDateAndTime", metadata.generation_date_string())
            .attr("variableNamingConvention", "structured");

        let identifier = metadata.name.as_str();
        if self.model_exchange {
            let model_exchange = XmlElement::new("ModelExchange")
                .attr("modelIdentifier", identifier);
            root.push(model_exchange);
        }
        let mut co_simulation = XmlElement::new("CoSimulation")
            .attr("modelIdentifier", identifier);
        for (flag, value) in self.model_options.flags() {
            co_simulation = co_simulation.attr(flag, value);
        }
        root.push(co_simulation);

        if !self.units.is_empty() {
            let units = self.units.iter().map(unit_element);
            root.push(XmlElement::new("UnitDefinitions").children_from(units));
        }
        if !self.type_definitions.is_empty() {
            let types = self.type_definitions.iter().map(type_element);
            root.push(XmlElement::new("TypeDefinitions").children_from(types));
        }
        if !self.log_categories.is_empty() {
            root.push(self.log_categories.iter().fold(
                XmlElement::new("LogCategories"),
                |e, (name, description)| {
                    e.child(
                        XmlElement::new("Category")
                            .attr("name", name)
                            .attr("description", description),
                    )
                },
            ));
        }
        if let Some(experiment) = &self.default_experiment {
            root.push(
                XmlElement::new("DefaultExperiment")
                    .attr_opt("startTime", experiment.start_time.map(format_float))
                    .attr_opt("stopTime", experiment.stop_time.map(format_float))
                    .attr_opt("stepSize", experiment.step_size.map(format_float))
                    .attr_opt("tolerance", experiment.tolerance.map(format_float)),
            );
        }

        let variables = self.variables.iter().map(variable_element);
        root.push(XmlElement::new("ModelVariables").children_from(variables));
        root.push(structure_element(&self.structure));
        root
    }
}

fn unit_element(unit: &Unit) -> XmlElement {
    let base = &unit.base_unit;
    let factor = (base.factor != 1.0).then(|| format_float(base.factor));
    let offset = (base.offset != 0.0).then(|| format_float(base.offset));
    let mut base_unit = XmlElement::new("BaseUnit")
        .attr_opt("factor", factor)
        .attr_opt("offset", offset);
    for (symbol, exponent) in base.exponents() {
        base_unit = base_unit.attr(symbol, exponent);
    }
    XmlElement::new("Unit")
        .attr("name", &unit.name)
        .child(base_unit)
}

fn type_element(definition: &TypeDefinition) -> XmlElement {
    match definition {
        TypeDefinition::Float64(t) => XmlElement::new("Float64Type")
            .attr("name", &t.name)
            .attr_opt("quantity", t.quantity.as_ref())
            .attr_opt("unit", t.unit.as_ref())
            .attr_opt("displayUnit", t.display_unit.as_ref())
            .attr_opt("min", t.min.map(format_float))
            .attr_opt("max", t.max.map(format_float))
            .attr_opt("nominal", t.nominal.map(format_float)),
        TypeDefinition::Enumeration(t) => {
            t.items
                .iter()
                .fold(XmlElement::new("EnumerationType").attr("name", &t.name), |e, item| {
                    e.child(
                        XmlElement::new("Item")
                            .attr("name", &item.name)
                            .attr("value", item.value)
                            .attr_opt("description", item.description.as_ref()),
                    )
                })
        }
    }
}

/// The element for one variable, tagged with its kind.
pub fn variable_element(variable: &ModelVariable) -> XmlElement {
    let float64 = variable.variable_kind().float64();
    let start = variable.get_start();
    let attribute_start = start.filter(|s| !matches!(s, Value::String(_)));

    let mut element = XmlElement::new(variable.kind().tag())
        .attr("name", variable.name())
        .attr_opt("valueReference", variable.value_reference())
        .attr_opt("description", variable.get_description())
        .attr_opt("causality", variable.get_causality())
        .attr_opt("variability", variable.get_variability())
        .attr_opt("initial", variable.get_initial())
        .attr_opt("declaredType", variable.get_declared_type())
        .attr_opt("start", attribute_start.map(encode_start))
        .attr_opt("derivative", variable.derivative())
        .attr_opt("unit", variable.get_unit())
        .attr_opt("displayUnit", float64.and_then(|f| f.display_unit.as_ref()))
        .attr_opt("nominal", variable.get_nominal().map(format_float));

    for dimension in variable.dimensions() {
        element.push(match dimension {
            Dimension::Fixed(length) => XmlElement::new("Dimension").attr("start", length),
            Dimension::Variable(reference) => {
                XmlElement::new("Dimension").attr("valueReference", reference)
            }
        });
    }
    if let Some(Value::String(s)) = start {
        element.push(XmlElement::new("Start").attr("value", s));
    }
    element
}

fn structure_element(structure: &ModelStructure) -> XmlElement {
    let sections = [
        ("Output", structure.outputs.as_slice()),
        ("ContinuousStateDerivative", structure.continuous_state_derivatives.as_slice()),
        ("InitialUnknown", structure.initial_unknowns.as_slice()),
        ("EventIndicator", structure.event_indicators.as_slice()),
    ];
    let mut element = XmlElement::new("ModelStructure");
    for (tag, references) in sections {
        for reference in references {
            element.push(XmlElement::new(tag).attr("valueReference", reference));
        }
    }
    element
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_definitions::EnumerationType;
    use crate::variable::{Causality, Initial, Variability};

    fn registered(mut variable: ModelVariable, reference: u32) -> ModelVariable {
        variable.assign_reference(reference).unwrap();
        variable.validate().unwrap();
        variable
    }

    #[test]
    fn test_float64_variable_element() {
        let variable = registered(
            ModelVariable::float64("ball.h")
                .causality(Causality::Output)
                .variability(Variability::Continuous)
                .initial(Initial::Exact)
                .unit("m")
                .start(1),
            1,
        );
        let element = variable_element(&variable);
        assert_eq!(element.tag(), "Float64");
        assert_eq!(element.attribute("name"), Some("ball.h"));
        assert_eq!(element.attribute("valueReference"), Some("1"));
        assert_eq!(element.attribute("causality"), Some("output"));
        assert_eq!(element.attribute("variability"), Some("continuous"));
        assert_eq!(element.attribute("initial"), Some("exact"));
        assert_eq!(element.attribute("start"), Some("1"));
        assert_eq!(element.attribute("unit"), Some("m"));
        assert_eq!(element.attribute("derivative"), None);
    }

    #[test]
    fn test_array_variable_element() {
        let variable = registered(
            ModelVariable::float64("m")
                .dimension(Dimension::fixed(2))
                .dimension(Dimension::variable(0))
                .causality(Causality::Parameter)
                .start(vec![0.5, 1.0 / 3.0]),
            4,
        );
        let element = variable_element(&variable);
        assert_eq!(element.attribute("start"), Some("0.5 0.3333333333333333"));
        let dims: Vec<(Option<&str>, Option<&str>)> = element
            .children()
            .iter()
            .map(|d| (d.attribute("start"), d.attribute("valueReference")))
            .collect();
        assert_eq!(dims, vec![(Some("2"), None), (None, Some("0"))]);
    }

    #[test]
    fn test_string_start_is_a_child() {
        let variable = registered(
            ModelVariable::string("label")
                .causality(Causality::Parameter)
                .start("a \"quoted\" value"),
            0,
        );
        let element = variable_element(&variable);
        assert_eq!(element.attribute("start"), None);
        assert_eq!(element.children().len(), 1);
        assert_eq!(element.children()[0].tag(), "Start");
        assert_eq!(
            element.children()[0].attribute("value"),
            Some("a \"quoted\" value")
        );
    }

    #[test]
    fn test_enumeration_type_element() {
        let mode = EnumerationType::new("Mode").item("Off", 1).item("On", 2);
        let element = type_element(&mode.into());
        assert_eq!(element.tag(), "EnumerationType");
        let items: Vec<Option<&str>> = element
            .children()
            .iter()
            .map(|i| i.attribute("value"))
            .collect();
        assert_eq!(items, vec![Some("1"), Some("2")]);
    }

    #[test]
    fn test_unit_element() {
        use crate::units::BaseUnit;
        let base = BaseUnit::dimensionless().m(1).s(-1).factor(1.0 / 3.6);
        let element = unit_element(&Unit::new("km/h", base));
        let base = &element.children()[0];
        assert_eq!(base.attribute("factor"), Some("0.2777777777777778"));
        assert_eq!(base.attribute("offset"), None);
        assert_eq!(base.attribute("m"), Some("1"));
        assert_eq!(base.attribute("s"), Some("-1"));
        assert_eq!(base.attribute("kg"), None);
    }

    #[test]
    fn test_structure_element() {
        let structure = ModelStructure {
            outputs: vec![1],
            continuous_state_derivatives: vec![2],
            initial_unknowns: vec![1, 2],
            event_indicators: vec![1],
        };
        let element = structure_element(&structure);
        let tags: Vec<(&str, Option<&str>)> = element
            .children()
            .iter()
            .map(|e| (e.tag(), e.attribute("valueReference")))
            .collect();
        assert_eq!(
            tags,
            vec![
                ("Output", Some("1")),
                ("ContinuousStateDerivative", Some("2")),
                ("InitialUnknown", Some("1")),
                ("InitialUnknown", Some("2")),
                ("EventIndicator", Some("1")),
            ]
        );
    }
}
