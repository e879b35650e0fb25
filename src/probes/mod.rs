/*!
 * Probes Module
 * USDT provider and probe definition, activation and firing
 *
 * Backends:
 * - Native: libusdt, probes visible to DTrace (feature `libusdt`)
 * - Simulation: in-process tracer for tests and unsupported hosts
 */

pub mod attached;
pub mod backend;
pub mod coerce;
pub mod definition;
pub mod events;
#[cfg(feature = "libusdt")]
pub mod native;
pub mod provider;
pub mod registry;
pub mod simulation;
pub mod traits;
pub mod types;

pub use attached::AttachedProbe;
pub use backend::Backend;
pub use coerce::{coerce, coerce_checked, marshal, ArgumentFrame, ArgumentSlot, SlotKind};
pub use definition::ProbeDefinition;
pub use events::{EventCallback, EventCollector, ProbeSelector};
#[cfg(feature = "libusdt")]
pub use native::NativeBackend;
pub use provider::Provider;
pub use registry::UsdtRegistry;
pub use simulation::SimulationBackend;
pub use traits::{ProbeDefHandle, ProbeHandle, ProviderHandle, TracingBackend};
pub use types::{
    ArgKind, ArgType, ArgValue, FiredArg, FiredEvent, ProbeInfo, ProviderInfo, ProviderState,
};
