//! Observability utilities.

pub mod logging;
mod tracing;

pub use self::tracing::SpanTimer;
