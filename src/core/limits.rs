/*!
 * Probe Limits and Constants
 *
 * Ceilings shared with the native tracing subsystem, plus defaults for the
 * in-process simulation backend.
 *
 * ## Conventions
 * - Values shared with libusdt are marked with [LIBUSDT-COMPAT]
 */

// =============================================================================
// PROBE SIGNATURE LIMITS
// =============================================================================

/// Maximum number of arguments a probe may declare or be fired with (32)
/// [LIBUSDT-COMPAT] Matches USDT_ARG_MAX in usdt.h
pub const ARG_MAX: usize = 32;

/// Maximum number of probes a single provider may hold (1024)
/// [LIBUSDT-COMPAT] DOF probe sections grow linearly; libusdt gives no hard
/// ceiling, so this caps provider size at a value DTrace handles comfortably
pub const MAX_PROBES_PER_PROVIDER: usize = 1024;

/// Maximum length of a provider, module or probe name (64 bytes)
/// [LIBUSDT-COMPAT] DTRACE_PROVNAMELEN, DTRACE_MODNAMELEN and DTRACE_NAMELEN
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Maximum length of a function name (128 bytes)
/// [LIBUSDT-COMPAT] DTRACE_FUNCNAMELEN
pub const MAX_FUNCTION_NAME_LEN: usize = 128;

// =============================================================================
// SIMULATION BACKEND
// =============================================================================

/// Maximum fired events retained by the simulated tracer (10,000 events)
pub const MAX_EVENT_HISTORY: usize = 10_000;

