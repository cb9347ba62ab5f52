//! Small models used by the tests and documentation.

use crate::binding::Attributes;
use crate::dimension::Dimension;
use crate::errors::{FmuError, FmuResult};
use crate::model::Model;
use crate::model_exchange::{DiscreteStateUpdate, ModelExchange};
use crate::registry::{Registration, Registry};
use crate::type_definitions::{EnumerationType, Float64Type};
use crate::units::{BaseUnit, Unit};
use crate::value::{Element, Kind, Value};
use crate::variable::{Causality, Initial, ModelVariable, Variability};
use ndarray::{Array1, Array2};

// ============================================================================
// Dahlquist - dx/dt = -k * x
// ============================================================================

/// Exponential decay, the classic test equation.
///
/// The derivative has no attribute of its own, it is computed by its getter.
#[derive(Debug, Clone, Attributes)]
pub struct Dahlquist {
    pub time: f64,
    pub x: f64,
    pub k: f64,
}

impl Default for Dahlquist {
    fn default() -> Self {
        Self {
            time: 0.0,
            x: 1.0,
            k: 1.0,
        }
    }
}

impl Model for Dahlquist {
    fn define_variables(&self, registry: &mut Registry<Self>) -> FmuResult<()> {
        registry.register(
            ModelVariable::float64("time")
                .causality(Causality::Independent)
                .variability(Variability::Continuous),
        )?;
        let x = registry.register(
            ModelVariable::float64("x")
                .causality(Causality::Output)
                .variability(Variability::Continuous)
                .initial(Initial::Exact),
        )?;
        registry.register(
            Registration::new(
                ModelVariable::float64("derx")
                    .causality(Causality::Local)
                    .variability(Variability::Continuous)
                    .derivative_of(x),
            )
            .getter(|m: &Dahlquist| Ok(Value::Float64(-m.k * m.x))),
        )?;
        registry.register(
            ModelVariable::float64("k")
                .causality(Causality::Parameter)
                .variability(Variability::Fixed),
        )?;
        Ok(())
    }

    fn do_step(
        &mut self,
        _current_time: f64,
        step_size: f64,
    ) -> FmuResult<crate::model::StepResult> {
        // Exact solution over the step
        self.x *= (-self.k * step_size).exp();
        self.time += step_size;
        Ok(Default::default())
    }

    fn as_model_exchange(&mut self) -> Option<&mut dyn ModelExchange> {
        Some(self)
    }
}

impl ModelExchange for Dahlquist {
    fn set_time(&mut self, time: f64) {
        self.time = time;
    }
}

// ============================================================================
// BouncingBall - a state event on the floor
// ============================================================================

/// A ball dropped on the floor, losing energy with every bounce.
///
/// The height doubles as event indicator. Once a bounce is slower than `v_min`
/// the ball comes to rest and gravity is switched off.
#[derive(Debug, Clone, Attributes)]
pub struct BouncingBall {
    pub time: f64,
    pub h: f64,
    pub v: f64,
    pub g: f64,
    pub e: f64,
    pub v_min: f64,
}

impl Default for BouncingBall {
    fn default() -> Self {
        Self {
            time: 0.0,
            h: 1.0,
            v: 0.0,
            g: 9.81,
            e: 0.7,
            v_min: 0.1,
        }
    }
}

impl BouncingBall {
    fn at_rest(&self) -> bool {
        self.v == 0.0 && self.g == 0.0
    }
}

impl Model for BouncingBall {
    fn define_variables(&self, registry: &mut Registry<Self>) -> FmuResult<()> {
        registry.register_units([
            Unit::new("m", BaseUnit::dimensionless().m(1)),
            Unit::new("m/s", BaseUnit::dimensionless().m(1).s(-1)),
            Unit::new("m/s2", BaseUnit::dimensionless().m(1).s(-2)),
        ])?;
        let position = Float64Type::new("Position").quantity("Length").unit("m");

        registry.register(
            ModelVariable::float64("time")
                .causality(Causality::Independent)
                .variability(Variability::Continuous)
                .description("Simulation time"),
        )?;
        let h = registry.register(
            Registration::new(
                ModelVariable::float64("h")
                    .causality(Causality::Output)
                    .variability(Variability::Continuous)
                    .initial(Initial::Exact)
                    .unit("m")
                    .description("Position of the ball"),
            )
            .with_type(position)
            .event_indicator(),
        )?;
        registry.register(
            Registration::new(
                ModelVariable::float64("derh")
                    .causality(Causality::Local)
                    .variability(Variability::Continuous)
                    .derivative_of(h)
                    .unit("m/s"),
            )
            .getter(|m: &BouncingBall| Ok(Value::Float64(m.v))),
        )?;
        let v = registry.register(
            ModelVariable::float64("v")
                .causality(Causality::Output)
                .variability(Variability::Continuous)
                .initial(Initial::Exact)
                .unit("m/s")
                .description("Velocity of the ball"),
        )?;
        registry.register(
            Registration::new(
                ModelVariable::float64("derv")
                    .causality(Causality::Local)
                    .variability(Variability::Continuous)
                    .derivative_of(v)
                    .unit("m/s2"),
            )
            .getter(|m: &BouncingBall| Ok(Value::Float64(-m.g))),
        )?;
        registry.register(
            ModelVariable::float64("g")
                .causality(Causality::Parameter)
                .variability(Variability::Fixed)
                .unit("m/s2")
                .description("Gravity acting on the ball"),
        )?;
        registry.register(
            ModelVariable::float64("e")
                .causality(Causality::Parameter)
                .variability(Variability::Tunable)
                .description("Coefficient of restitution"),
        )?;
        registry.register(
            ModelVariable::float64("v_min")
                .causality(Causality::Parameter)
                .variability(Variability::Fixed)
                .unit("m/s"),
        )?;
        Ok(())
    }

    fn as_model_exchange(&mut self) -> Option<&mut dyn ModelExchange> {
        Some(self)
    }
}

impl ModelExchange for BouncingBall {
    fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    fn event_condition_active(&self, _index: usize) -> bool {
        !self.at_rest()
    }

    fn update_discrete_states(&mut self) -> FmuResult<DiscreteStateUpdate> {
        let mut update = DiscreteStateUpdate::default();
        if self.h <= 0.0 && self.v < 0.0 {
            self.h = 0.0;
            self.v = -self.e * self.v;
            if self.v < self.v_min {
                self.v = 0.0;
                self.g = 0.0;
            }
            update.values_of_continuous_states_changed = true;
        }
        Ok(update)
    }
}

// ============================================================================
// Resizable - arrays sized by structural parameters
// ============================================================================

/// Arrays with literal and variable dimensions.
///
/// `rows` and `cols` are structural parameters. Setting either one resizes
/// `grid`, keeping the values that still fit.
#[derive(Debug, Clone, Attributes)]
pub struct Resizable {
    pub rows: u64,
    pub cols: u64,
    pub grid: Array2<f64>,
    pub fixed: Array2<i32>,
    pub flags: Array1<bool>,
}

impl Default for Resizable {
    fn default() -> Self {
        Self {
            rows: 2,
            cols: 3,
            grid: Array2::zeros((2, 3)),
            fixed: Array2::from_shape_fn((2, 3), |(i, j)| (i * 3 + j) as i32),
            flags: Array1::from_vec(vec![true, false]),
        }
    }
}

impl Resizable {
    fn resize(&mut self, rows: u64, cols: u64) -> FmuResult<()> {
        let shape = |n: u64| {
            usize::try_from(n).map_err(|_| FmuError::InvalidValue {
                name: "grid".to_string(),
                expected: Kind::UInt64,
                found: n.to_string(),
            })
        };
        let (new_rows, new_cols) = (shape(rows)?, shape(cols)?);
        let old = std::mem::replace(&mut self.grid, Array2::zeros((new_rows, new_cols)));
        for ((i, j), value) in old.indexed_iter() {
            if let Some(slot) = self.grid.get_mut((i, j)) {
                *slot = *value;
            }
        }
        self.rows = rows;
        self.cols = cols;
        Ok(())
    }
}

fn structural_size(name: &str, value: &Value) -> FmuResult<u64> {
    <u64 as Element>::from_value(value).ok_or_else(|| FmuError::InvalidValue {
        name: name.to_string(),
        expected: Kind::UInt64,
        found: value.type_name().to_string(),
    })
}

impl Model for Resizable {
    fn define_variables(&self, registry: &mut Registry<Self>) -> FmuResult<()> {
        let structural = |name: &str| {
            ModelVariable::uint64(name)
                .causality(Causality::StructuralParameter)
                .variability(Variability::Fixed)
                .initial(Initial::Exact)
        };
        let rows = registry.register(Registration::new(structural("rows")).setter(
            |m: &mut Resizable, value| {
                let rows = structural_size("rows", &value)?;
                m.resize(rows, m.cols)
            },
        ))?;
        let cols = registry.register(Registration::new(structural("cols")).setter(
            |m: &mut Resizable, value| {
                let cols = structural_size("cols", &value)?;
                m.resize(m.rows, cols)
            },
        ))?;
        registry.register(
            ModelVariable::float64("grid")
                .causality(Causality::Output)
                .variability(Variability::Discrete)
                .dimension(Dimension::variable(rows))
                .dimension(Dimension::variable(cols)),
        )?;
        registry.register(
            ModelVariable::int32("fixed")
                .causality(Causality::Parameter)
                .variability(Variability::Tunable)
                .dimension(Dimension::fixed(2))
                .dimension(Dimension::fixed(3)),
        )?;
        registry.register(
            ModelVariable::boolean("flags")
                .causality(Causality::Input)
                .variability(Variability::Discrete)
                .dimension(Dimension::fixed(2))
                .start(vec![true, false]),
        )?;
        Ok(())
    }
}

// ============================================================================
// AllKinds - one variable of every kind
// ============================================================================

#[derive(Debug, Clone, Attributes)]
pub struct Settings {
    pub level: f64,
}

/// One variable of each kind, plus a nested attribute and a constant.
#[derive(Debug, Clone, Attributes)]
pub struct AllKinds {
    pub flag: bool,
    pub counter: i32,
    pub big: i64,
    pub huge: u64,
    pub real: f64,
    pub label: String,
    pub mode: i64,
    #[attributes(nested)]
    pub settings: Settings,
}

impl Default for AllKinds {
    fn default() -> Self {
        Self {
            flag: true,
            counter: -3,
            big: i64::MIN,
            huge: u64::MAX,
            real: 0.1,
            label: "hello".to_string(),
            mode: 2,
            settings: Settings { level: 0.5 },
        }
    }
}

impl Model for AllKinds {
    fn define_variables(&self, registry: &mut Registry<Self>) -> FmuResult<()> {
        let parameter = |variable: ModelVariable| {
            variable
                .causality(Causality::Parameter)
                .variability(Variability::Tunable)
        };
        registry.register(parameter(ModelVariable::boolean("flag")))?;
        registry.register(parameter(ModelVariable::int32("counter")))?;
        registry.register(parameter(ModelVariable::int64("big")))?;
        registry.register(parameter(ModelVariable::uint64("huge")))?;
        registry.register(parameter(ModelVariable::float64("real")))?;
        registry.register(parameter(ModelVariable::string("label")))?;
        registry.register(
            Registration::new(parameter(ModelVariable::enumeration("mode", "Mode")))
                .with_type(EnumerationType::new("Mode").item("Off", 1).item("On", 2)),
        )?;
        registry.register(
            ModelVariable::float64("settings.level")
                .causality(Causality::Output)
                .initial(Initial::Calculated),
        )?;
        registry.register(
            Registration::new(
                ModelVariable::float64("two_pi")
                    .causality(Causality::Output)
                    .variability(Variability::Constant)
                    .start(std::f64::consts::TAU),
            )
            .getter(|_: &AllKinds| Ok(Value::Float64(std::f64::consts::TAU))),
        )?;
        Ok(())
    }

    fn log_categories(&self) -> Vec<(String, String)> {
        vec![("logEvents".to_string(), "Discrete events".to_string())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelInstance;

    #[test]
    fn test_resize_keeps_overlap() {
        let mut model = Resizable::default();
        model.grid[[1, 2]] = 5.0;
        model.resize(3, 3).unwrap();
        assert_eq!(model.grid.shape(), &[3, 3]);
        assert_eq!(model.grid[[1, 2]], 5.0);
        assert_eq!(model.rows, 3);
    }

    #[test]
    fn test_bouncing_ball_comes_to_rest() {
        let mut ball = BouncingBall {
            h: 0.0,
            v: -0.1,
            ..Default::default()
        };
        ball.update_discrete_states().unwrap();
        assert!(ball.at_rest());
        assert!(!ball.event_condition_active(0));
    }

    #[test]
    fn test_all_models_instantiate() {
        fn count<M: Model>(model: M) -> usize {
            ModelInstance::new(model).unwrap().registry().len()
        }
        assert_eq!(count(Dahlquist::default()), 4);
        assert_eq!(count(BouncingBall::default()), 8);
        assert_eq!(count(Resizable::default()), 5);
        assert_eq!(count(AllKinds::default()), 9);
    }
}
