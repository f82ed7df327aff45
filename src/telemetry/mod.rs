//! Telemetry for the broker: structured logging and a metrics facade.
//!
//! Output is stderr or file based. Counter values themselves live in the
//! state store so the front-end can export them; the facade mirrors them
//! for any installed metrics recorder.

mod logging;
mod metrics;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use metrics::{
    record_active_connections, record_message_sent, record_pipe_created, record_queue_event,
};
