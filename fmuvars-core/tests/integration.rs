//! Driving the example models through a model-exchange host loop.
//!
//! The host side is played by `ode_solvers`, which only sees the flat state and
//! derivative vectors.

use fmuvars_core::errors::FmuError;
use fmuvars_core::example_models::{BouncingBall, Dahlquist};
use fmuvars_core::model::{Model, ModelInstance};
use fmuvars_core::model_exchange::Phase;
use ode_solvers::{Rk4, System, Vector1, Vector2};
use std::cell::RefCell;

/// Adapts a model instance to an ODE system.
struct Host<'a, M: Model> {
    instance: &'a RefCell<ModelInstance<M>>,
    error: RefCell<Option<FmuError>>,
}

impl<'a, M: Model> Host<'a, M> {
    fn new(instance: &'a RefCell<ModelInstance<M>>) -> Self {
        Self {
            instance,
            error: RefCell::new(None),
        }
    }

    fn derivatives(&self, t: f64, states: &[f64]) -> Result<Vec<f64>, FmuError> {
        let mut instance = self.instance.borrow_mut();
        instance.set_time(t)?;
        instance.set_continuous_states(states)?;
        instance.get_continuous_state_derivatives()
    }

    fn evaluate(&self, t: f64, states: &[f64], dy: &mut [f64]) {
        match self.derivatives(t, states) {
            Ok(derivatives) => dy.copy_from_slice(&derivatives),
            Err(e) => {
                *self.error.borrow_mut() = Some(e);
                dy.fill(f64::NAN);
            }
        }
    }
}

impl System<f64, Vector1<f64>> for Host<'_, Dahlquist> {
    fn system(&self, x: f64, y: &Vector1<f64>, dy: &mut Vector1<f64>) {
        self.evaluate(x, y.as_slice(), dy.as_mut_slice());
    }

    fn solout(&mut self, _x: f64, _y: &Vector1<f64>, _dy: &Vector1<f64>) -> bool {
        self.error.borrow().is_some()
    }
}

impl System<f64, Vector2<f64>> for Host<'_, BouncingBall> {
    fn system(&self, x: f64, y: &Vector2<f64>, dy: &mut Vector2<f64>) {
        self.evaluate(x, y.as_slice(), dy.as_mut_slice());
    }

    fn solout(&mut self, _x: f64, _y: &Vector2<f64>, _dy: &Vector2<f64>) -> bool {
        self.error.borrow().is_some()
    }
}

#[test]
fn test_dahlquist_decays_exponentially() {
    let model = Dahlquist {
        k: 0.5,
        ..Default::default()
    };
    let instance = RefCell::new(ModelInstance::new(model).unwrap());
    let y0 = Vector1::from_row_slice(&instance.borrow().get_continuous_states().unwrap());

    let (x_end, last) = {
        let mut stepper = Rk4::new(Host::new(&instance), 0.0, y0, 2.0, 0.01);
        stepper.integrate().unwrap();
        (
            *stepper.x_out().last().unwrap(),
            stepper.y_out().last().unwrap()[0],
        )
    };
    let expected = (-0.5 * x_end).exp();
    assert!((last - expected).abs() < 1e-8, "{} != {}", last, expected);

    // The instance holds the last state the solver evaluated
    let mut instance = instance.into_inner();
    instance.set_continuous_states(&[last]).unwrap();
    assert_eq!(instance.get_continuous_states().unwrap(), vec![last]);
    assert_eq!(instance.model().x, last);
}

#[test]
fn test_derivative_matches_definition() {
    let model = Dahlquist {
        k: 2.0,
        x: 3.0,
        time: 0.0,
    };
    let mut instance = ModelInstance::new(model).unwrap();
    assert_eq!(instance.get_continuous_states().unwrap(), vec![3.0]);
    assert_eq!(
        instance.get_continuous_state_derivatives().unwrap(),
        vec![-6.0]
    );

    instance.set_continuous_states(&[0.5]).unwrap();
    assert_eq!(instance.get_continuous_states().unwrap(), vec![0.5]);
    assert_eq!(
        instance.get_continuous_state_derivatives().unwrap(),
        vec![-1.0]
    );
}

/// Integrate in short intervals, handling the floor crossing between them.
#[test]
fn test_bouncing_ball_event_loop() {
    let instance = RefCell::new(ModelInstance::new(BouncingBall::default()).unwrap());
    let mut t = 0.0;
    let dt = 0.01;
    let mut bounces = 0;
    let mut previous = instance.borrow_mut().get_event_indicators().unwrap()[0];

    while t < 3.0 {
        let y0 = Vector2::from_row_slice(&instance.borrow().get_continuous_states().unwrap());
        let mut stepper = Rk4::new(Host::new(&instance), t, y0, t + dt, dt);
        stepper.integrate().unwrap();
        let y = *stepper.y_out().last().unwrap();
        t += dt;

        let mut instance = instance.borrow_mut();
        instance.set_time(t).unwrap();
        instance.set_continuous_states(y.as_slice()).unwrap();
        let indicator = instance.get_event_indicators().unwrap()[0];
        assert_eq!(instance.phase(), Phase::EventIndicatorsEvaluated);

        if indicator <= 0.0 && previous > 0.0 {
            let update = instance.update_discrete_states().unwrap();
            assert!(update.values_of_continuous_states_changed);
            bounces += 1;
        }
        previous = instance.get_event_indicators().unwrap()[0];
        assert!(previous >= 0.0);
    }

    assert!(bounces >= 2, "Expected several bounces, got {}", bounces);
    let ball = instance.borrow();
    assert!(ball.model().h >= 0.0);
    assert!(ball.model().h < 1.0);
}
