use fmuvars_core::config::ExportConfig;
use fmuvars_core::errors::{FmuError, FmuResult};
use fmuvars_core::logging::{LogMessage, Status};
use fmuvars_core::model::{Model, ModelInstance, StepResult};
use fmuvars_core::model_exchange::DiscreteStateUpdate;
use fmuvars_core::state::StateSnapshot;
use fmuvars_core::variable::ValueReference;
use log::error;

/// A model instance as seen by a native host.
///
/// Failed calls return a non-`Ok` [`Status`] and queue a message describing the
/// error. After a fatal error every further call returns [`Status::Fatal`].
pub struct Instance<M: Model> {
    inner: ModelInstance<M>,
    fatal: bool,
}

macro_rules! vector_calls {
    ($($get:ident, $set:ident: $ty:ty;)*) => {
        $(
            pub fn $get(&mut self, references: &[ValueReference], values: &mut [$ty]) -> Status {
                self.fill(stringify!($get), values, |i| i.get::<$ty>(references))
            }

            pub fn $set(&mut self, references: &[ValueReference], values: &[$ty]) -> Status {
                self.call(stringify!($set), |i| i.set::<$ty>(references, values)).0
            }
        )*
    };
}

impl<M: Model> Instance<M> {
    /// Construct the model instance.
    ///
    /// A model that fails to register its variables cannot be instantiated; the
    /// returned message carries [`Status::Fatal`].
    pub fn instantiate(model: M, config: ExportConfig) -> Result<Self, LogMessage> {
        ModelInstance::with_config(model, config)
            .map(|inner| Self {
                inner,
                fatal: false,
            })
            .map_err(|e| {
                let status = Status::from(&e);
                error!("Instantiation failed: {}", e);
                LogMessage {
                    status,
                    category: status.category(),
                    message: format!("instantiate: {}", e),
                    debug: false,
                }
            })
    }

    pub fn inner(&self) -> &ModelInstance<M> {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut ModelInstance<M> {
        &mut self.inner
    }

    /// Messages queued since the last call.
    pub fn drain_log(&mut self) -> Vec<LogMessage> {
        self.inner.logger_mut().drain()
    }

    fn call<T>(
        &mut self,
        operation: &str,
        f: impl FnOnce(&mut ModelInstance<M>) -> FmuResult<T>,
    ) -> (Status, Option<T>) {
        if self.fatal {
            self.inner.log(
                format!("{}: instance unusable after a fatal error", operation),
                Status::Fatal,
                None,
            );
            return (Status::Fatal, None);
        }
        match f(&mut self.inner) {
            Ok(value) => (Status::Ok, Some(value)),
            Err(e) => (self.report(operation, &e), None),
        }
    }

    fn report(&mut self, operation: &str, error: &FmuError) -> Status {
        let status = Status::from(error);
        if status == Status::Fatal {
            self.fatal = true;
        }
        let message = format!("{}: {}", operation, error);
        self.inner.log(message, status, None);
        status
    }

    /// Run `f` and copy its values into `out`, which must have exactly the
    /// returned length.
    fn fill<T: Clone>(
        &mut self,
        operation: &str,
        out: &mut [T],
        f: impl FnOnce(&mut ModelInstance<M>) -> FmuResult<Vec<T>>,
    ) -> Status {
        match self.call(operation, f) {
            (status, Some(values)) if values.len() == out.len() => {
                out.clone_from_slice(&values);
                status
            }
            (_, Some(values)) => self.report(
                operation,
                &FmuError::ValueCountMismatch {
                    expected: values.len(),
                    actual: out.len(),
                },
            ),
            (status, None) => status,
        }
    }

    vector_calls! {
        get_boolean, set_boolean: bool;
        get_int32, set_int32: i32;
        get_int64, set_int64: i64;
        get_uint64, set_uint64: u64;
        get_float64, set_float64: f64;
        get_string, set_string: String;
    }

    pub fn enter_initialization_mode(&mut self) -> Status {
        self.call("enter_initialization_mode", |i| {
            i.enter_initialization_mode()
        })
        .0
    }

    pub fn exit_initialization_mode(&mut self) -> Status {
        self.call("exit_initialization_mode", |i| {
            i.exit_initialization_mode()
        })
        .0
    }

    pub fn do_step(&mut self, current_time: f64, step_size: f64) -> (Status, StepResult) {
        let (status, result) = self.call("do_step", |i| i.do_step(current_time, step_size));
        (status, result.unwrap_or_default())
    }

    pub fn terminate(&mut self) -> Status {
        self.call("terminate", |i| i.terminate()).0
    }

    pub fn set_time(&mut self, time: f64) -> Status {
        self.call("set_time", |i| i.set_time(time)).0
    }

    pub fn get_continuous_states(&mut self, states: &mut [f64]) -> Status {
        self.fill("get_continuous_states", states, |i| {
            i.get_continuous_states()
        })
    }

    pub fn set_continuous_states(&mut self, states: &[f64]) -> Status {
        self.call("set_continuous_states", |i| i.set_continuous_states(states))
            .0
    }

    pub fn get_continuous_state_derivatives(&mut self, derivatives: &mut [f64]) -> Status {
        self.fill("get_continuous_state_derivatives", derivatives, |i| {
            i.get_continuous_state_derivatives()
        })
    }

    pub fn get_event_indicators(&mut self, indicators: &mut [f64]) -> Status {
        self.fill("get_event_indicators", indicators, |i| {
            i.get_event_indicators()
        })
    }

    pub fn get_nominals_of_continuous_states(&mut self, nominals: &mut [f64]) -> Status {
        self.fill("get_nominals_of_continuous_states", nominals, |i| {
            i.get_nominals_of_continuous_states()
        })
    }

    pub fn update_discrete_states(&mut self) -> (Status, DiscreteStateUpdate) {
        let (status, update) =
            self.call("update_discrete_states", |i| i.update_discrete_states());
        (status, update.unwrap_or_default())
    }

    pub fn get_number_of_continuous_states(&mut self) -> (Status, usize) {
        let (status, count) = self.call("get_number_of_continuous_states", |i| {
            i.get_number_of_continuous_states()
        });
        (status, count.unwrap_or_default())
    }

    pub fn get_number_of_event_indicators(&mut self) -> (Status, usize) {
        let (status, count) = self.call("get_number_of_event_indicators", |i| {
            i.get_number_of_event_indicators()
        });
        (status, count.unwrap_or_default())
    }

    pub fn get_fmu_state(&mut self) -> (Status, Option<StateSnapshot>) {
        self.call("get_fmu_state", |i| i.get_state())
    }

    pub fn set_fmu_state(&mut self, state: &StateSnapshot) -> Status {
        self.call("set_fmu_state", |i| i.set_state(state)).0
    }

    pub fn serialize_fmu_state(&mut self, state: &StateSnapshot) -> (Status, Vec<u8>) {
        let (status, bytes) = self.call("serialize_fmu_state", |_| state.to_bytes());
        (status, bytes.unwrap_or_default())
    }

    pub fn deserialize_fmu_state(&mut self, bytes: &[u8]) -> (Status, Option<StateSnapshot>) {
        self.call("deserialize_fmu_state", |i| i.deserialize_state(bytes))
    }

    pub fn model_description_xml(&mut self) -> (Status, String) {
        let (status, xml) = self.call("model_description_xml", |i| {
            i.model_description().map(|d| d.to_xml())
        });
        (status, xml.unwrap_or_default())
    }
}
