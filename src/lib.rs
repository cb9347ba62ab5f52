//! Host-facing call surface for models built on `fmuvars-core`.
//!
//! [`Instance`] wraps a [`ModelInstance`](fmuvars_core::model::ModelInstance) and
//! reports every call the way a native host expects: a [`Status`] code, values
//! through caller-provided buffers, and failures as messages in the log queue.

mod instance;

pub use fmuvars_core as core;
pub use fmuvars_core::logging::{LogMessage, Status};
pub use instance::Instance;
