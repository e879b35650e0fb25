/*!
 * Native Backend
 * libusdt bindings: probes become real DTrace USDT probes
 */

use super::coerce::ArgumentFrame;
use super::traits::*;
use super::types::ArgType;
use crate::config::BackendKind;
use crate::core::limits::ARG_MAX;
use crate::core::{NativeOp, UsdtError, UsdtResult};
use libc::{c_char, c_int, c_void, size_t};
use std::ffi::{CStr, CString};
use tracing::{info, warn};

#[cfg(not(target_pointer_width = "64"))]
compile_error!("argument slots must be pointer-sized; libusdt requires a 64-bit target");

#[allow(non_camel_case_types)]
mod ffi {
    use super::*;

    pub type usdt_argtype_t = c_int;

    #[repr(C)]
    pub struct usdt_probe_t {
        pub isenabled_addr: Option<unsafe extern "C" fn() -> c_int>,
        pub probe_addr: *mut c_void,
    }

    // Layout mirrors usdt.h; only `probe` is read from Rust.
    #[repr(C)]
    pub struct usdt_probedef_t {
        pub name: *const c_char,
        pub function: *const c_char,
        pub argc: size_t,
        pub types: [usdt_argtype_t; super::ARG_MAX],
        pub probe: *mut usdt_probe_t,
        pub next: *mut usdt_probedef_t,
        pub refcnt: c_int,
    }

    #[repr(C)]
    pub struct usdt_provider_t {
        _private: [u8; 0],
    }

    #[link(name = "usdt")]
    extern "C" {
        pub fn usdt_create_provider(name: *const c_char, module: *const c_char)
            -> *mut usdt_provider_t;
        pub fn usdt_create_probe(
            func: *const c_char,
            name: *const c_char,
            argc: size_t,
            types: *mut *const c_char,
        ) -> *mut usdt_probedef_t;
        pub fn usdt_provider_add_probe(
            provider: *mut usdt_provider_t,
            probedef: *mut usdt_probedef_t,
        ) -> c_int;
        pub fn usdt_provider_enable(provider: *mut usdt_provider_t) -> c_int;
        pub fn usdt_provider_disable(provider: *mut usdt_provider_t) -> c_int;
        pub fn usdt_provider_free(provider: *mut usdt_provider_t);
        pub fn usdt_probe_release(probedef: *mut usdt_probedef_t);
        pub fn usdt_is_enabled(probe: *mut usdt_probe_t) -> c_int;
        pub fn usdt_fire_probe(probe: *mut usdt_probe_t, argc: size_t, argv: *mut *mut c_void);
        pub fn usdt_errstr(provider: *mut usdt_provider_t) -> *mut c_char;
    }
}

/// libusdt-backed tracing subsystem
///
/// Handles are libusdt pointers stored as integers; every pointer is owned by
/// exactly one `Provider` or `ProbeDefinition`, which frees it on drop.
#[derive(Clone, Default)]
pub struct NativeBackend {
    _private: (),
}

impl NativeBackend {
    pub fn new() -> Self {
        let backend = Self { _private: () };
        if backend.is_supported() {
            info!("libusdt backend initialized");
        } else {
            warn!("libusdt backend not supported on this platform");
        }
        backend
    }

    fn c_string(operation: NativeOp, value: &str) -> UsdtResult<CString> {
        CString::new(value).map_err(|_| UsdtError::NativeSubsystemFailure {
            operation,
            status: -1,
            detail: format!("interior NUL in {:?}", value),
        })
    }

    fn provider_error(
        operation: NativeOp,
        provider: *mut ffi::usdt_provider_t,
        status: c_int,
    ) -> UsdtError {
        // SAFETY: provider is live; usdt_errstr returns a string owned by it.
        let detail = unsafe {
            let raw = ffi::usdt_errstr(provider);
            if raw.is_null() {
                "unknown error".to_string()
            } else {
                CStr::from_ptr(raw).to_string_lossy().into_owned()
            }
        };
        UsdtError::NativeSubsystemFailure {
            operation,
            status,
            detail,
        }
    }

    #[inline]
    fn native_probe(probe: ProbeHandle) -> *mut ffi::usdt_probe_t {
        let def = probe.as_raw() as *const ffi::usdt_probedef_t;
        // SAFETY: the handle came from provider_add_probe and its provider
        // has not been disposed. `probe` stays null until enable.
        unsafe { (*def).probe }
    }
}

impl TracingBackend for NativeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn is_supported(&self) -> bool {
        cfg!(any(
            target_os = "macos",
            target_os = "freebsd",
            target_os = "illumos",
            target_os = "solaris"
        ))
    }

    fn create_provider(&self, name: &str, module: &str) -> UsdtResult<ProviderHandle> {
        let name = Self::c_string(NativeOp::CreateProvider, name)?;
        let module = Self::c_string(NativeOp::CreateProvider, module)?;

        // SAFETY: both strings are valid for the call; libusdt copies them.
        let raw = unsafe { ffi::usdt_create_provider(name.as_ptr(), module.as_ptr()) };
        ProviderHandle::from_raw(raw as usize).ok_or_else(|| UsdtError::NativeSubsystemFailure {
            operation: NativeOp::CreateProvider,
            status: -1,
            detail: "usdt_create_provider returned NULL".to_string(),
        })
    }

    fn create_probe(
        &self,
        function: &str,
        name: &str,
        arg_types: &[ArgType],
    ) -> UsdtResult<ProbeDefHandle> {
        let function = Self::c_string(NativeOp::CreateProbe, function)?;
        let name = Self::c_string(NativeOp::CreateProbe, name)?;
        let tags = arg_types
            .iter()
            .map(|t| Self::c_string(NativeOp::CreateProbe, t.tag()))
            .collect::<UsdtResult<Vec<_>>>()?;
        let mut tag_ptrs: Vec<*const c_char> = tags.iter().map(|t| t.as_ptr()).collect();

        // SAFETY: every pointer outlives the call; libusdt copies the names
        // and only reads the tags to derive argument types.
        let raw = unsafe {
            ffi::usdt_create_probe(
                function.as_ptr(),
                name.as_ptr(),
                tag_ptrs.len(),
                tag_ptrs.as_mut_ptr(),
            )
        };
        ProbeDefHandle::from_raw(raw as usize).ok_or_else(|| UsdtError::NativeSubsystemFailure {
            operation: NativeOp::CreateProbe,
            status: -1,
            detail: "usdt_create_probe returned NULL".to_string(),
        })
    }

    fn provider_add_probe(
        &self,
        provider: ProviderHandle,
        probe: ProbeDefHandle,
    ) -> UsdtResult<ProbeHandle> {
        let provider_ptr = provider.as_raw() as *mut ffi::usdt_provider_t;
        let def_ptr = probe.as_raw() as *mut ffi::usdt_probedef_t;

        // SAFETY: both handles are live and owned by the caller.
        let status = unsafe { ffi::usdt_provider_add_probe(provider_ptr, def_ptr) };
        if status != 0 {
            return Err(Self::provider_error(NativeOp::AddProbe, provider_ptr, status));
        }
        ProbeHandle::from_raw(probe.as_raw()).ok_or_else(|| UsdtError::NativeSubsystemFailure {
            operation: NativeOp::AddProbe,
            status: -1,
            detail: "null probe definition".to_string(),
        })
    }

    fn provider_enable(&self, provider: ProviderHandle) -> UsdtResult<()> {
        let provider_ptr = provider.as_raw() as *mut ffi::usdt_provider_t;
        // SAFETY: provider is live; enable builds and loads the DOF.
        let status = unsafe { ffi::usdt_provider_enable(provider_ptr) };
        if status != 0 {
            return Err(Self::provider_error(NativeOp::Enable, provider_ptr, status));
        }
        Ok(())
    }

    #[inline]
    fn probe_is_enabled(&self, probe: ProbeHandle) -> bool {
        let native = Self::native_probe(probe);
        if native.is_null() {
            return false;
        }
        // SAFETY: native probe is set by enable and freed with the provider.
        unsafe { ffi::usdt_is_enabled(native) != 0 }
    }

    fn fire_probe(&self, probe: ProbeHandle, args: &ArgumentFrame) {
        let native = Self::native_probe(probe);
        if native.is_null() {
            return;
        }
        // SAFETY: `args` owns every string its slots point to and outlives
        // the call; libusdt only reads argv.
        unsafe { ffi::usdt_fire_probe(native, args.len(), args.as_argv()) }
    }

    fn release_probe(&self, probe: ProbeDefHandle) {
        // SAFETY: an unattached definition is owned solely by the caller.
        unsafe { ffi::usdt_probe_release(probe.as_raw() as *mut ffi::usdt_probedef_t) }
    }

    fn dispose_provider(&self, provider: ProviderHandle) {
        let provider_ptr = provider.as_raw() as *mut ffi::usdt_provider_t;
        // SAFETY: called once per provider after all firing has stopped.
        unsafe {
            ffi::usdt_provider_disable(provider_ptr);
            ffi::usdt_provider_free(provider_ptr);
        }
    }
}
