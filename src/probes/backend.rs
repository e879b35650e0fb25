/*!
 * Backend Selection
 * Platform-aware dispatch to the native or simulated tracing subsystem
 */

#[cfg(feature = "libusdt")]
use super::native::NativeBackend;
use super::coerce::ArgumentFrame;
use super::simulation::SimulationBackend;
use super::traits::*;
use super::types::ArgType;
use crate::config::{BackendKind, UsdtConfig};
use crate::core::{UsdtError, UsdtResult};
use tracing::info;

/// Unified backend that selects the appropriate implementation
#[derive(Clone)]
pub struct Backend {
    inner: BackendImpl,
}

#[derive(Clone)]
enum BackendImpl {
    #[cfg(feature = "libusdt")]
    Native(NativeBackend),
    Simulation(SimulationBackend),
}

impl Backend {
    /// Build the backend requested by `config`
    pub fn from_config(config: &UsdtConfig) -> UsdtResult<Self> {
        let inner = match config.backend {
            BackendKind::Auto => Self::select_auto(config),
            BackendKind::Native => Self::native()?,
            BackendKind::Simulation => {
                BackendImpl::Simulation(SimulationBackend::with_history(config.event_history))
            }
        };
        let backend = Self { inner };
        info!(backend = ?backend.kind(), "usdt backend selected");
        Ok(backend)
    }

    fn select_auto(config: &UsdtConfig) -> BackendImpl {
        #[cfg(feature = "libusdt")]
        {
            let native = NativeBackend::new();
            if native.is_supported() {
                return BackendImpl::Native(native);
            }
        }

        // Fallback to simulation mode
        BackendImpl::Simulation(SimulationBackend::with_history(config.event_history))
    }

    #[cfg(feature = "libusdt")]
    fn native() -> UsdtResult<BackendImpl> {
        let native = NativeBackend::new();
        if !native.is_supported() {
            return Err(UsdtError::UnsupportedBackend {
                backend: "libusdt (platform)".into(),
            });
        }
        Ok(BackendImpl::Native(native))
    }

    #[cfg(not(feature = "libusdt"))]
    fn native() -> UsdtResult<BackendImpl> {
        Err(UsdtError::UnsupportedBackend {
            backend: "libusdt (feature disabled)".into(),
        })
    }

    /// Force simulation mode (for testing)
    pub fn with_simulation() -> Self {
        Self::from_simulation(SimulationBackend::new())
    }

    /// Wrap an existing simulation so tests can keep a handle to it
    pub fn from_simulation(simulation: SimulationBackend) -> Self {
        Self {
            inner: BackendImpl::Simulation(simulation),
        }
    }

    /// The simulated tracer, when running in simulation mode
    pub fn simulation(&self) -> Option<&SimulationBackend> {
        match &self.inner {
            BackendImpl::Simulation(sim) => Some(sim),
            #[cfg(feature = "libusdt")]
            BackendImpl::Native(_) => None,
        }
    }

    /// True when handles minted by `other` are valid on `self`
    ///
    /// libusdt is process-global, so every native backend is the same one.
    pub fn same_subsystem(&self, other: &Backend) -> bool {
        match (&self.inner, &other.inner) {
            (BackendImpl::Simulation(a), BackendImpl::Simulation(b)) => a.same_instance(b),
            #[cfg(feature = "libusdt")]
            (BackendImpl::Native(_), BackendImpl::Native(_)) => true,
            #[cfg(feature = "libusdt")]
            _ => false,
        }
    }

    /// Check if probes are visible to a real system tracer
    pub fn is_native(&self) -> bool {
        self.kind() == BackendKind::Native
    }
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            inner: Self::select_auto(&UsdtConfig::default()),
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $backend:ident => $call:expr) => {
        match &$self.inner {
            #[cfg(feature = "libusdt")]
            BackendImpl::Native($backend) => $call,
            BackendImpl::Simulation($backend) => $call,
        }
    };
}

impl TracingBackend for Backend {
    fn kind(&self) -> BackendKind {
        dispatch!(self, b => b.kind())
    }

    fn is_supported(&self) -> bool {
        dispatch!(self, b => b.is_supported())
    }

    fn create_provider(&self, name: &str, module: &str) -> UsdtResult<ProviderHandle> {
        dispatch!(self, b => b.create_provider(name, module))
    }

    fn create_probe(
        &self,
        function: &str,
        name: &str,
        arg_types: &[ArgType],
    ) -> UsdtResult<ProbeDefHandle> {
        dispatch!(self, b => b.create_probe(function, name, arg_types))
    }

    fn provider_add_probe(
        &self,
        provider: ProviderHandle,
        probe: ProbeDefHandle,
    ) -> UsdtResult<ProbeHandle> {
        dispatch!(self, b => b.provider_add_probe(provider, probe))
    }

    fn provider_enable(&self, provider: ProviderHandle) -> UsdtResult<()> {
        dispatch!(self, b => b.provider_enable(provider))
    }

    #[inline]
    fn probe_is_enabled(&self, probe: ProbeHandle) -> bool {
        dispatch!(self, b => b.probe_is_enabled(probe))
    }

    #[inline]
    fn fire_probe(&self, probe: ProbeHandle, args: &ArgumentFrame) {
        dispatch!(self, b => b.fire_probe(probe, args))
    }

    fn release_probe(&self, probe: ProbeDefHandle) {
        dispatch!(self, b => b.release_probe(probe))
    }

    fn dispose_provider(&self, provider: ProviderHandle) {
        dispatch!(self, b => b.dispose_provider(provider))
    }
}
