/*!
 * Host Binding
 * Boundary between dynamically typed host values and probe arguments
 *
 * Host values arrive as `serde_json::Value`. Numbers that fit a signed
 * 32-bit integer become integers; everything else keeps its runtime type
 * and is turned into its string form by the coercion layer when needed.
 */

pub mod manifest;

pub use manifest::{FireRequest, ProbeManifest, ProviderManifest};

use crate::probes::types::ArgValue;
use serde_json::Value;

impl ArgValue {
    /// Convert one host value into a probe argument
    pub fn from_host(value: &Value) -> Self {
        match value {
            Value::Null => ArgValue::Null,
            Value::Bool(b) => ArgValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ArgValue::Int(i),
                None => match n.as_f64() {
                    Some(f) => ArgValue::Float(f),
                    None => ArgValue::Str(n.to_string()),
                },
            },
            Value::String(s) => ArgValue::Str(s.clone()),
            // Composite values travel as their JSON text
            other => ArgValue::Str(other.to_string()),
        }
    }

    /// Convert a host argument array, preserving order
    pub fn from_host_array(values: &[Value]) -> Vec<Self> {
        values.iter().map(Self::from_host).collect()
    }
}

impl From<&Value> for ArgValue {
    fn from(value: &Value) -> Self {
        Self::from_host(value)
    }
}
