/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::types::Identifier;

/// Which identifier failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    Provider,
    Module,
    Function,
    Probe,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdentifierKind::Provider => "provider",
            IdentifierKind::Module => "module",
            IdentifierKind::Function => "function",
            IdentifierKind::Probe => "probe",
        };
        f.write_str(name)
    }
}

/// Tracing subsystem primitive that reported a non-zero status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeOp {
    CreateProvider,
    CreateProbe,
    AddProbe,
    Enable,
}

impl fmt::Display for NativeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NativeOp::CreateProvider => "create_provider",
            NativeOp::CreateProbe => "create_probe",
            NativeOp::AddProbe => "provider_add_probe",
            NativeOp::Enable => "provider_enable",
        };
        f.write_str(name)
    }
}

/// Errors raised while defining, attaching, enabling or firing probes
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", rename_all = "snake_case")]
pub enum UsdtError {
    #[error("Invalid {kind} identifier: {value:?}")]
    #[diagnostic(
        code(usdt::invalid_identifier),
        help("Identifiers must be non-empty and printable. Function names hold at most 128 bytes, other names 64.")
    )]
    InvalidIdentifier { kind: IdentifierKind, value: Identifier },

    #[error("Argument count {count} exceeds the limit of {max}")]
    #[diagnostic(
        code(usdt::argument_limit_exceeded),
        help("Probes carry at most ARG_MAX arguments. Split the payload across probes.")
    )]
    ArgumentLimitExceeded { count: usize, max: usize },

    #[error("Probe {function}:{name} is already attached to this provider")]
    #[diagnostic(code(usdt::already_attached))]
    AlreadyAttached { function: Identifier, name: Identifier },

    #[error("Provider {provider} already holds the maximum of {max} probes")]
    #[diagnostic(code(usdt::attachment_limit_exceeded))]
    AttachmentLimitExceeded { provider: Identifier, max: usize },

    #[error("Probe {function}:{name} was defined on a different tracing backend")]
    #[diagnostic(
        code(usdt::foreign_definition),
        help("Create the definition through the registry or backend that owns the provider.")
    )]
    ForeignDefinition { function: Identifier, name: Identifier },

    #[error("Provider {provider}:{module} is already registered")]
    #[diagnostic(
        code(usdt::provider_exists),
        help("Drop the existing provider before registering the same identity again.")
    )]
    ProviderExists { provider: Identifier, module: Identifier },

    #[error("Provider {provider} is already enabled")]
    #[diagnostic(
        code(usdt::already_enabled),
        help("Enable is one-way. Define every probe before enabling the provider.")
    )]
    AlreadyEnabled { provider: Identifier },

    #[error("Tracing subsystem call {operation} failed with status {status}: {detail}")]
    #[diagnostic(code(usdt::native_failure))]
    NativeSubsystemFailure {
        operation: NativeOp,
        status: i32,
        detail: String,
    },

    #[error("Argument {index} expected {expected}, got {found}")]
    #[diagnostic(code(usdt::type_mismatch))]
    TypeMismatch {
        index: usize,
        expected: Identifier,
        found: Identifier,
    },

    #[error("Probe declares {declared} arguments but was fired with {supplied}")]
    #[diagnostic(code(usdt::arity_mismatch))]
    ArityMismatch { declared: usize, supplied: usize },

    #[error("Tracing backend not available: {backend}")]
    #[diagnostic(
        code(usdt::unsupported_backend),
        help("Build with the `libusdt` feature or select the simulation backend.")
    )]
    UnsupportedBackend { backend: Identifier },

    #[error("Registry has been shut down")]
    #[diagnostic(code(usdt::registry_shutdown))]
    RegistryShutdown,

    #[error("Invalid configuration: {reason}")]
    #[diagnostic(code(usdt::config))]
    Config { reason: String },
}

/// Result type for probe operations
pub type UsdtResult<T> = Result<T, UsdtError>;
