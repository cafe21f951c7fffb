//! Raw-string argument coercion against the contract type system
//!
//! Every user-supplied argument arrives as a string. Coercion turns it into
//! a typed [`DynSolValue`] before any call is built, so a malformed value is
//! rejected up front instead of surfacing as a lower-level encoding error
//! (or a wasted transaction). Two policies are load-bearing:
//!
//! - the empty string is the literal zero/empty value of the declared type,
//!   never "argument omitted" - every declared parameter is mandatory;
//! - integer types take decimal strings (`0x` hex also parses; the grammars
//!   cannot collide) and anything else fails coercion.

use std::str::FromStr;

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_json_abi::Param;
use alloy_primitives::{Address, B256, I256, U256};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct CoercionError(pub String);

impl CoercionError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Parse a parameter's declared type into a [`DynSolType`].
///
/// `selector_type()` resolves tuple components into the canonical
/// `(type,…)` form, which the dyn-abi parser understands.
pub fn parse_param_type(param: &Param) -> Result<DynSolType, CoercionError> {
    let canonical = param.selector_type();
    canonical
        .parse::<DynSolType>()
        .map_err(|err| CoercionError::new(format!("unparseable type '{canonical}': {err}")))
}

/// Coerce one raw string to the declared type.
pub fn coerce_value(ty: &DynSolType, raw: &str) -> Result<DynSolValue, CoercionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return zero_value(ty);
    }

    match ty {
        DynSolType::Bool => match trimmed {
            "true" | "1" => Ok(DynSolValue::Bool(true)),
            "false" | "0" => Ok(DynSolValue::Bool(false)),
            _ => Err(CoercionError::new(format!("'{trimmed}' is not a boolean"))),
        },
        DynSolType::Uint(bits) => U256::from_str(trimmed)
            .map(|value| DynSolValue::Uint(value, *bits))
            .map_err(|_| {
                CoercionError::new(format!("'{trimmed}' is not an unsigned integer"))
            }),
        DynSolType::Int(bits) => I256::from_str(trimmed)
            .map(|value| DynSolValue::Int(value, *bits))
            .map_err(|_| CoercionError::new(format!("'{trimmed}' is not an integer"))),
        DynSolType::Address => Address::from_str(trimmed)
            .map(DynSolValue::Address)
            .map_err(|err| CoercionError::new(format!("invalid address '{trimmed}': {err}"))),
        DynSolType::FixedBytes(size) => {
            let bytes = decode_hex(trimmed)?;
            if bytes.len() != *size {
                return Err(CoercionError::new(format!(
                    "expected {size} bytes, got {}",
                    bytes.len()
                )));
            }
            let mut word = B256::ZERO;
            word[..*size].copy_from_slice(&bytes);
            Ok(DynSolValue::FixedBytes(word, *size))
        }
        DynSolType::Bytes => Ok(DynSolValue::Bytes(decode_hex(trimmed)?)),
        DynSolType::String => Ok(DynSolValue::String(raw.to_string())),
        DynSolType::Array(inner) => {
            let elements = json_elements(trimmed)?;
            elements
                .iter()
                .map(|element| coerce_value(inner, element))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::Array)
        }
        DynSolType::FixedArray(inner, len) => {
            let elements = json_elements(trimmed)?;
            if elements.len() != *len {
                return Err(CoercionError::new(format!(
                    "expected {len} array elements, got {}",
                    elements.len()
                )));
            }
            elements
                .iter()
                .map(|element| coerce_value(inner, element))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::FixedArray)
        }
        DynSolType::Tuple(fields) => {
            let elements = json_elements(trimmed)?;
            if elements.len() != fields.len() {
                return Err(CoercionError::new(format!(
                    "expected {} tuple components, got {}",
                    fields.len(),
                    elements.len()
                )));
            }
            fields
                .iter()
                .zip(elements.iter())
                .map(|(field, element)| coerce_value(field, element))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::Tuple)
        }
        other => Err(CoercionError::new(format!(
            "unsupported parameter type '{other}'"
        ))),
    }
}

/// The literal zero/empty value of a type
pub fn zero_value(ty: &DynSolType) -> Result<DynSolValue, CoercionError> {
    match ty {
        DynSolType::Bool => Ok(DynSolValue::Bool(false)),
        DynSolType::Uint(bits) => Ok(DynSolValue::Uint(U256::ZERO, *bits)),
        DynSolType::Int(bits) => Ok(DynSolValue::Int(I256::ZERO, *bits)),
        DynSolType::Address => Ok(DynSolValue::Address(Address::ZERO)),
        DynSolType::FixedBytes(size) => Ok(DynSolValue::FixedBytes(B256::ZERO, *size)),
        DynSolType::Bytes => Ok(DynSolValue::Bytes(Vec::new())),
        DynSolType::String => Ok(DynSolValue::String(String::new())),
        DynSolType::Array(_) => Ok(DynSolValue::Array(Vec::new())),
        DynSolType::FixedArray(inner, len) => {
            let element = zero_value(inner)?;
            Ok(DynSolValue::FixedArray(vec![element; *len]))
        }
        DynSolType::Tuple(fields) => fields
            .iter()
            .map(zero_value)
            .collect::<Result<Vec<_>, _>>()
            .map(DynSolValue::Tuple),
        other => Err(CoercionError::new(format!(
            "unsupported parameter type '{other}'"
        ))),
    }
}

/// Format a decoded value for display
pub fn format_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Bool(value) => value.to_string(),
        DynSolValue::Int(value, _) => value.to_string(),
        DynSolValue::Uint(value, _) => value.to_string(),
        DynSolValue::Address(address) => address.to_string(),
        DynSolValue::FixedBytes(word, size) => {
            format!("0x{}", hex::encode(&word.as_slice()[..(*size).min(32)]))
        }
        DynSolValue::Function(function) => format!("0x{}", hex::encode(function.as_slice())),
        DynSolValue::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
        DynSolValue::String(value) => format!("\"{value}\""),
        DynSolValue::Array(values) | DynSolValue::FixedArray(values) => {
            let items: Vec<String> = values.iter().map(format_value).collect();
            format!("[{}]", items.join(", "))
        }
        DynSolValue::Tuple(fields) => {
            let items: Vec<String> = fields.iter().map(format_value).collect();
            format!("({})", items.join(", "))
        }
    }
}

fn decode_hex(value: &str) -> Result<Vec<u8>, CoercionError> {
    let stripped = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    hex::decode(stripped).map_err(|err| CoercionError::new(format!("invalid hex '{value}': {err}")))
}

/// Split a JSON-array argument (`["a", "b"]`, `[1, 2]`, nested arrays) into
/// the raw strings its elements coerce from.
fn json_elements(raw: &str) -> Result<Vec<String>, CoercionError> {
    let parsed: serde_json::Value = serde_json::from_str(raw)
        .map_err(|err| CoercionError::new(format!("expected a JSON array: {err}")))?;
    let serde_json::Value::Array(values) = parsed else {
        return Err(CoercionError::new("expected a JSON array".to_string()));
    };
    values.iter().map(element_to_string).collect()
}

fn element_to_string(value: &serde_json::Value) -> Result<String, CoercionError> {
    match value {
        serde_json::Value::String(value) => Ok(value.clone()),
        serde_json::Value::Number(value) => Ok(value.to_string()),
        serde_json::Value::Bool(value) => Ok(value.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        compound @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
            serde_json::to_string(compound)
                .map_err(|err| CoercionError::new(format!("unserializable element: {err}")))
        }
    }
}
