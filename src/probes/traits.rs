/*!
 * Tracing Backend Traits
 * Platform-agnostic boundary with the native tracing subsystem
 */

use super::coerce::ArgumentFrame;
use super::types::ArgType;
use crate::config::BackendKind;
use crate::core::UsdtResult;
use std::num::NonZeroUsize;

macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(NonZeroUsize);

        impl $name {
            /// Wrap a raw handle; `None` for the null handle
            #[inline]
            pub fn from_raw(raw: usize) -> Option<Self> {
                NonZeroUsize::new(raw).map(Self)
            }

            #[inline]
            pub fn as_raw(self) -> usize {
                self.0.get()
            }
        }
    };
}

opaque_handle!(
    /// Provider allocated by the tracing subsystem
    ProviderHandle
);
opaque_handle!(
    /// Probe definition registered but not yet attached
    ProbeDefHandle
);
opaque_handle!(
    /// Attached probe: the only route to firing or querying enablement
    ProbeHandle
);

/// The native tracing subsystem, one method per primitive
///
/// Setup calls turn non-zero statuses into `NativeSubsystemFailure`.
/// `probe_is_enabled` and `fire_probe` are infallible and must not block;
/// implementations must be safe to call from many threads at once.
pub trait TracingBackend: Send + Sync {
    /// Which subsystem this is
    fn kind(&self) -> BackendKind;

    /// Whether the subsystem can be used in this process
    fn is_supported(&self) -> bool;

    /// Allocate a provider named `provider:module`
    fn create_provider(&self, name: &str, module: &str) -> UsdtResult<ProviderHandle>;

    /// Register a probe signature
    fn create_probe(
        &self,
        function: &str,
        name: &str,
        arg_types: &[ArgType],
    ) -> UsdtResult<ProbeDefHandle>;

    /// Link a definition into a provider, consuming the definition handle
    fn provider_add_probe(
        &self,
        provider: ProviderHandle,
        probe: ProbeDefHandle,
    ) -> UsdtResult<ProbeHandle>;

    /// Make every attached probe visible to external tracers
    fn provider_enable(&self, provider: ProviderHandle) -> UsdtResult<()>;

    /// True when a tracer is listening on this probe
    fn probe_is_enabled(&self, probe: ProbeHandle) -> bool;

    /// Emit one event; best effort
    fn fire_probe(&self, probe: ProbeHandle, args: &ArgumentFrame);

    /// Free a definition that was never attached
    fn release_probe(&self, probe: ProbeDefHandle);

    /// Tear down a provider and every probe attached to it
    fn dispose_provider(&self, provider: ProviderHandle);
}
