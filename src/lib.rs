/*!
 * USDT Provider Library
 * Runtime-defined userland tracing probes for external system tracers
 *
 * Flow: create a provider, define probes, attach them, enable the
 * provider, then fire. Firing never fails the caller.
 */

pub mod binding;
pub mod config;
pub mod core;
pub mod monitoring;
pub mod probes;

// Re-exports
pub use binding::{FireRequest, ProbeManifest, ProviderManifest};
pub use config::{BackendKind, CoercionPolicy, UsdtConfig};
pub use crate::core::{IdentifierKind, NativeOp, UsdtError, UsdtResult, ARG_MAX};
pub use monitoring::{init_tracing, FireStats};
pub use probes::{
    ArgType, ArgValue, AttachedProbe, Backend, FiredArg, FiredEvent, ProbeDefinition,
    ProbeSelector, Provider, ProviderInfo, ProviderState, SimulationBackend, TracingBackend,
    UsdtRegistry,
};
