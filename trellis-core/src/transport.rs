//! Transport Value Model
//!
//! Components exchange data with the host through a small set of
//! transport-safe kinds: scalars, sequences, and string-keyed mappings.
//! This module defines that value model and the conversions into the
//! host's native representation.
//!
//! # Design
//!
//! Serialization is a single polymorphic function dispatched on the value
//! kind (a tagged variant), not a method grafted onto foreign types. Scalars
//! pass through unchanged, lists convert element-wise, and maps convert
//! value-wise with no keys dropped.
//!
//! Two encodings are provided:
//!
//! - `to_transport_value`: the host-native JSON representation, used when a
//!   rendered tree or props mapping crosses into the host.
//! - `encode`/`decode`: MessagePack framing for crossing a process or
//!   runtime boundary.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A transport-safe value.
///
/// Map keys are strings and insertion order is preserved, although key
/// order is not significant for equality of the transported form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// The absent value. Also the "empty output" of a failed render.
    Null,
    /// A boolean scalar.
    Bool(bool),
    /// An integer scalar.
    Int(i64),
    /// A floating-point scalar.
    Float(f64),
    /// A string scalar.
    Str(String),
    /// An ordered sequence of values.
    List(Vec<Value>),
    /// An ordered string-keyed mapping.
    Map(IndexMap<String, Value>),
}

impl Value {
    /// Returns true for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the string payload, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The integer payload, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The boolean payload, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow the mapping payload, if this is a `Map`.
    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(v: IndexMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

/// Convert a value into the host's native representation.
///
/// Scalars map directly, lists convert element-wise, and maps convert
/// value-wise. Non-finite floats have no native representation and
/// degrade to null.
pub fn to_transport_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => {
            serde_json::Value::Array(items.iter().map(to_transport_value).collect())
        }
        Value::Map(entries) => serde_json::Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), to_transport_value(v)))
                .collect(),
        ),
    }
}

/// Encode a value as MessagePack for the process/runtime boundary.
pub fn encode(value: &Value) -> Result<Vec<u8>, rmp_serde::encode::Error> {
    rmp_serde::to_vec(value)
}

/// Decode a MessagePack-framed value.
pub fn decode(bytes: &[u8]) -> Result<Value, rmp_serde::decode::Error> {
    rmp_serde::from_slice(bytes)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    #[test]
    fn scalars_pass_through() {
        assert_eq!(to_transport_value(&Value::Null), serde_json::Value::Null);
        assert_eq!(to_transport_value(&Value::Bool(true)), serde_json::json!(true));
        assert_eq!(to_transport_value(&Value::Int(7)), serde_json::json!(7));
        assert_eq!(
            to_transport_value(&Value::Str("hi".into())),
            serde_json::json!("hi")
        );
    }

    #[test]
    fn non_finite_float_degrades_to_null() {
        assert_eq!(
            to_transport_value(&Value::Float(f64::NAN)),
            serde_json::Value::Null
        );
        assert_eq!(
            to_transport_value(&Value::Float(1.5)),
            serde_json::json!(1.5)
        );
    }

    #[test]
    fn nested_structures_convert_without_dropping_keys() {
        let value = Value::Map(indexmap! {
            "title".to_string() => Value::Str("dashboard".into()),
            "counts".to_string() => Value::List(vec![Value::Int(1), Value::Int(2)]),
            "meta".to_string() => Value::Map(indexmap! {
                "active".to_string() => Value::Bool(false),
            }),
        });

        let native = to_transport_value(&value);
        assert_eq!(
            native,
            serde_json::json!({
                "title": "dashboard",
                "counts": [1, 2],
                "meta": { "active": false },
            })
        );
    }

    #[test]
    fn messagepack_round_trip_preserves_structure() {
        let value = Value::Map(indexmap! {
            "items".to_string() => Value::List(vec![
                Value::Map(indexmap! {
                    "id".to_string() => Value::Int(1),
                    "label".to_string() => Value::Str("first".into()),
                }),
                Value::Null,
            ]),
            "ratio".to_string() => Value::Float(0.25),
        });

        let bytes = encode(&value).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn from_conversions() {
        assert_eq!(Value::from(3), Value::Int(3));
        assert_eq!(Value::from("x"), Value::Str("x".into()));
        assert_eq!(Value::from(true), Value::Bool(true));
    }
}
