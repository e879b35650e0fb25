/*!
 * Core Types
 * Identifiers and validation shared by every probe component
 */

use super::errors::{IdentifierKind, UsdtError, UsdtResult};
use super::limits::{MAX_FUNCTION_NAME_LEN, MAX_IDENTIFIER_LEN};
use std::time::{SystemTime, UNIX_EPOCH};

/// Provider, module, function and probe names; short names stay inline
pub type Identifier = smartstring::alias::String;

/// Validate a name handed to the tracing subsystem
///
/// Names end up as C strings in the DOF string table: non-empty, within the
/// DTrace length bound for their kind, printable (no control characters,
/// which also excludes NUL).
pub fn validate_identifier(kind: IdentifierKind, value: &str) -> UsdtResult<Identifier> {
    let max_len = match kind {
        IdentifierKind::Function => MAX_FUNCTION_NAME_LEN,
        _ => MAX_IDENTIFIER_LEN,
    };
    if value.is_empty() || value.len() > max_len || value.chars().any(char::is_control) {
        return Err(UsdtError::InvalidIdentifier {
            kind,
            value: value.into(),
        });
    }
    Ok(value.into())
}

/// Nanoseconds since the Unix epoch, 0 if the clock is before it
#[inline]
pub fn timestamp_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
