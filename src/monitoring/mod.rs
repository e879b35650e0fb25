/*!
 * Monitoring Module
 * Logging setup and fire path diagnostics
 */

pub mod stats;
pub mod tracer;

pub use stats::{FireCounters, FireStats};
pub use tracer::init_tracing;
