//! Ambient operational concerns: metrics export, alert coalescing, and the
//! local control surface.

pub mod alerts;
pub mod control;
pub mod metrics;

pub use alerts::{Alert, AlertSeverity, AlertSink};
pub use control::{send_command, serve as serve_control, ControlCommand};
