/*!
 * Probe Types
 * Argument tags, fire-time values, lifecycle states and snapshots
 */

use crate::core::types::Identifier;
use crate::monitoring::FireStats;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a declared argument is laid out in its slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgKind {
    /// 64-bit signed integer
    Integer,
    /// Pointer to a NUL-terminated string
    String,
    /// Tag the subsystem does not know; slots are filled by runtime type
    Opaque,
}

/// Declared argument type: the tag as written plus its interpretation
///
/// Tags follow libusdt: anything starting with `char *` is a string,
/// anything starting with `int` an integer. Other tags are forwarded as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArgType {
    tag: Identifier,
    kind: ArgKind,
}

impl ArgType {
    pub fn parse(tag: &str) -> Self {
        let kind = if tag.starts_with("char *") {
            ArgKind::String
        } else if tag.starts_with("int") {
            ArgKind::Integer
        } else {
            ArgKind::Opaque
        };
        Self {
            tag: tag.into(),
            kind,
        }
    }

    pub fn integer() -> Self {
        Self::parse("int")
    }

    pub fn string() -> Self {
        Self::parse("char *")
    }

    #[inline]
    pub fn kind(&self) -> ArgKind {
        self.kind
    }

    /// The tag exactly as declared
    #[inline]
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl From<&str> for ArgType {
    fn from(tag: &str) -> Self {
        Self::parse(tag)
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}

/// A fire-time argument value, already decomposed from the host runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ArgValue {
    /// Short name of the runtime type, used in mismatch diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            ArgValue::Null => "null",
            ArgValue::Bool(_) => "bool",
            ArgValue::Int(_) => "int",
            ArgValue::Float(_) => "float",
            ArgValue::Str(_) => "string",
        }
    }

    /// The value as a signed 32-bit integer, if it is exactly representable
    pub fn as_int32(&self) -> Option<i32> {
        match *self {
            ArgValue::Int(i) => i32::try_from(i).ok(),
            ArgValue::Float(f) => {
                let truncated = f as i32;
                // -0.0 is not an int32 in the host runtime
                if truncated as f64 == f && !(f == 0.0 && f.is_sign_negative()) {
                    Some(truncated)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Null => f.write_str("null"),
            ArgValue::Bool(b) => write!(f, "{}", b),
            ArgValue::Int(i) => write!(f, "{}", i),
            ArgValue::Float(v) => write_host_number(f, *v),
            ArgValue::Str(s) => f.write_str(s),
        }
    }
}

/// Format a float the way the host runtime stringifies numbers
///
/// Exponent form outside `[1e-6, 1e21)`, with an explicit `+` on positive
/// exponents; `-0` prints as `0`.
fn write_host_number(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        return f.write_str("NaN");
    }
    if v.is_infinite() {
        return f.write_str(if v > 0.0 { "Infinity" } else { "-Infinity" });
    }
    if v == 0.0 {
        return f.write_str("0");
    }

    let magnitude = v.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let text = format!("{:e}", v);
        match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => write!(f, "{}e+{}", mantissa, exp),
            _ => f.write_str(&text),
        }
    } else {
        write!(f, "{}", v)
    }
}

impl From<i32> for ArgValue {
    fn from(v: i32) -> Self {
        ArgValue::Int(v as i64)
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        ArgValue::Int(v)
    }
}

impl From<u32> for ArgValue {
    fn from(v: u32) -> Self {
        ArgValue::Int(v as i64)
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        ArgValue::Float(v)
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        ArgValue::Bool(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        ArgValue::Str(v.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        ArgValue::Str(v)
    }
}

/// Provider lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderState {
    /// Created, no probes attached yet
    Unregistered,
    /// At least one probe attached, not yet visible to tracers
    Attaching,
    /// Compiled and visible to external tracers; terminal until drop
    Enabled,
}

/// One decoded argument of an emitted event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FiredArg {
    Int(i64),
    Str(String),
}

/// An event as observed by a tracer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiredEvent {
    pub provider: Identifier,
    pub module: Identifier,
    pub function: Identifier,
    pub name: Identifier,
    pub args: Vec<FiredArg>,
    pub timestamp_ns: u64,
}

impl FiredEvent {
    /// DTrace probe description `provider:module:function:name`
    pub fn description(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.provider, self.module, self.function, self.name
        )
    }
}

/// Snapshot of an attached probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeInfo {
    pub function: Identifier,
    pub name: Identifier,
    pub arg_types: Vec<Identifier>,
    pub enabled: bool,
    pub stats: FireStats,
}

/// Snapshot of a provider and its probes in attachment order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: Identifier,
    pub module: Identifier,
    pub state: ProviderState,
    pub probes: Vec<ProbeInfo>,
}
