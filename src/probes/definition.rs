/*!
 * Probe Definition Builder
 * Immutable probe signatures, registered with the subsystem on creation
 */

use super::backend::Backend;
use super::traits::{ProbeDefHandle, TracingBackend};
use super::types::ArgType;
use crate::core::limits::ARG_MAX;
use crate::core::types::{validate_identifier, Identifier};
use crate::core::{IdentifierKind, UsdtError, UsdtResult};
use std::fmt;
use tracing::debug;

/// A probe signature `function:name(arg_types...)`
///
/// Registered with the tracing subsystem as soon as it is built, so bad
/// signatures fail here rather than at first fire. Attaching consumes it;
/// dropping it unattached releases the registration.
pub struct ProbeDefinition {
    function: Identifier,
    name: Identifier,
    arg_types: Vec<ArgType>,
    handle: ProbeDefHandle,
    consumed: bool,
    backend: Backend,
}

impl ProbeDefinition {
    /// Validate and register a probe signature
    pub fn new<S: AsRef<str>>(
        backend: &Backend,
        function: &str,
        name: &str,
        arg_types: &[S],
    ) -> UsdtResult<Self> {
        let function = validate_identifier(IdentifierKind::Function, function)?;
        let name = validate_identifier(IdentifierKind::Probe, name)?;
        if arg_types.len() > ARG_MAX {
            return Err(UsdtError::ArgumentLimitExceeded {
                count: arg_types.len(),
                max: ARG_MAX,
            });
        }

        let arg_types: Vec<ArgType> = arg_types.iter().map(|t| ArgType::parse(t.as_ref())).collect();
        let handle = backend.create_probe(&function, &name, &arg_types)?;

        debug!(
            function = %function,
            probe = %name,
            argc = arg_types.len(),
            "probe defined"
        );

        Ok(Self {
            function,
            name,
            arg_types,
            handle,
            consumed: false,
            backend: backend.clone(),
        })
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arg_types(&self) -> &[ArgType] {
        &self.arg_types
    }

    pub fn argc(&self) -> usize {
        self.arg_types.len()
    }

    /// The subsystem holding this registration
    pub(crate) fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Hand the registration over to an attachment
    pub(crate) fn into_parts(mut self) -> (Identifier, Identifier, Vec<ArgType>, ProbeDefHandle) {
        self.consumed = true;
        (
            std::mem::take(&mut self.function),
            std::mem::take(&mut self.name),
            std::mem::take(&mut self.arg_types),
            self.handle,
        )
    }
}

impl Drop for ProbeDefinition {
    fn drop(&mut self) {
        if !self.consumed {
            self.backend.release_probe(self.handle);
        }
    }
}

impl fmt::Debug for ProbeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeDefinition")
            .field("function", &self.function)
            .field("name", &self.name)
            .field("arg_types", &self.arg_types)
            .finish()
    }
}
