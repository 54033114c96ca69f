//! Raw value storage for header and claim fields
//!
//! Every value held by a [`FieldMap`](crate::FieldMap) is a [`FieldValue`]. JSON numbers
//! keep the widest lossless representation they arrive in: integers that fit an `i64`
//! become [`FieldValue::I64`], larger unsigned integers become [`FieldValue::U64`] and
//! everything else becomes [`FieldValue::F64`]. Only the signed integral kinds take part
//! in automatic numeric conversion.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;

/// Tagged union of every value kind a field can hold
///
/// Equality compares signed integral kinds by value, so `I8(3) == I64(3)`.
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// JSON `null`
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    I64(i64),
    /// 32-bit signed integer
    I32(i32),
    /// 16-bit signed integer
    I16(i16),
    /// 8-bit signed integer
    I8(i8),
    /// Unsigned integer above `i64::MAX`
    U64(u64),
    /// Floating point number
    F64(f64),
    /// Text
    String(String),
    /// Instant, written as seconds since the epoch
    Date(DateTime<Utc>),
    /// Byte sequence, written as unpadded base64url
    Bytes(Vec<u8>),
    /// Ordered sequence
    Seq(Vec<FieldValue>),
    /// Nested object, insertion order preserved
    Map(IndexMap<String, FieldValue>),
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (self.as_integral(), other.as_integral()) {
            return a == b;
        }
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::U64(a), Self::U64(b)) => a == b,
            (Self::F64(a), Self::F64(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Seq(a), Self::Seq(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl FieldValue {
    /// Name of the value kind, used in error messages
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::I64(_) => "i64",
            Self::I32(_) => "i32",
            Self::I16(_) => "i16",
            Self::I8(_) => "i8",
            Self::U64(_) => "u64",
            Self::F64(_) => "f64",
            Self::String(_) => "String",
            Self::Date(_) => "Date",
            Self::Bytes(_) => "Bytes",
            Self::Seq(_) => "Seq",
            Self::Map(_) => "Map",
        }
    }

    /// Borrow the text if this is a string
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Widen any signed integral kind to `i64`
    #[must_use]
    pub fn as_integral(&self) -> Option<i64> {
        match *self {
            Self::I64(v) => Some(v),
            Self::I32(v) => Some(i64::from(v)),
            Self::I16(v) => Some(i64::from(v)),
            Self::I8(v) => Some(i64::from(v)),
            _ => None,
        }
    }

    /// Borrow the elements if this is a sequence
    #[must_use]
    pub fn as_seq(&self) -> Option<&[FieldValue]> {
        match self {
            Self::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// Whether this is [`FieldValue::Null`]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Build a value from decoded JSON
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Self::I64(v)
                } else if let Some(v) = n.as_u64() {
                    Self::U64(v)
                } else {
                    Self::F64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Seq(items.into_iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Render as JSON, applying the wire encoding for dates and bytes
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::I64(_) | Self::I32(_) | Self::I16(_) | Self::I8(_) => {
                Value::from(self.as_integral().unwrap_or_default())
            }
            Self::U64(v) => Value::from(*v),
            Self::F64(v) => serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number),
            Self::String(s) => Value::String(s.clone()),
            Self::Date(d) => Value::from(d.timestamp()),
            Self::Bytes(b) => Value::String(URL_SAFE_NO_PAD.encode(b)),
            Self::Seq(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::I64(v) => serializer.serialize_i64(*v),
            Self::I32(v) => serializer.serialize_i32(*v),
            Self::I16(v) => serializer.serialize_i16(*v),
            Self::I8(v) => serializer.serialize_i8(*v),
            Self::U64(v) => serializer.serialize_u64(*v),
            Self::F64(v) => serializer.serialize_f64(*v),
            Self::String(s) => serializer.serialize_str(s),
            Self::Date(d) => serializer.serialize_i64(d.timestamp()),
            Self::Bytes(b) => serializer.serialize_str(&URL_SAFE_NO_PAD.encode(b)),
            Self::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::I32(value)
    }
}

impl From<i16> for FieldValue {
    fn from(value: i16) -> Self {
        Self::I16(value)
    }
}

impl From<i8> for FieldValue {
    fn from(value: i8) -> Self {
        Self::I8(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        Self::Seq(value.into_iter().map(Self::String).collect())
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(value: Vec<&str>) -> Self {
        Self::Seq(value.into_iter().map(Self::from).collect())
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(value: Vec<FieldValue>) -> Self {
        Self::Seq(value)
    }
}

impl From<IndexMap<String, FieldValue>> for FieldValue {
    fn from(value: IndexMap<String, FieldValue>) -> Self {
        Self::Map(value)
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self::from_json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integral_kinds_compare_by_value() {
        assert_eq!(FieldValue::I8(3), FieldValue::I64(3));
        assert_eq!(FieldValue::I16(-7), FieldValue::I32(-7));
        assert_ne!(FieldValue::I8(3), FieldValue::I64(4));
        assert_ne!(FieldValue::I64(3), FieldValue::F64(3.0));
        assert_ne!(FieldValue::I64(3), FieldValue::from("3"));
        assert_eq!(
            FieldValue::Seq(vec![FieldValue::I8(1), FieldValue::I16(2)]),
            FieldValue::from_json(json!([1, 2]))
        );
    }

    #[test]
    fn test_json_numbers_keep_lossless_kind() {
        assert_eq!(FieldValue::from_json(json!(300)), FieldValue::I64(300));
        assert_eq!(FieldValue::from_json(json!(-5)), FieldValue::I64(-5));
        assert_eq!(
            FieldValue::from_json(json!(u64::MAX)),
            FieldValue::U64(u64::MAX)
        );
        assert_eq!(FieldValue::from_json(json!(1.5)), FieldValue::F64(1.5));
    }

    #[test]
    fn test_dates_and_bytes_use_wire_encoding() {
        let date = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(FieldValue::Date(date).to_json(), json!(1_700_000_000));
        assert_eq!(
            serde_json::to_string(&FieldValue::Date(date)).unwrap(),
            "1700000000"
        );
        assert_eq!(
            FieldValue::Bytes(vec![0xfb, 0xff]).to_json(),
            json!("-_8")
        );
    }

    #[test]
    fn test_nested_objects_preserve_order() {
        let value = FieldValue::from_json(json!({"z": 1, "a": [true, null]}));
        let FieldValue::Map(map) = &value else {
            panic!("expected map");
        };
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["z", "a"]);
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"z":1,"a":[true,null]}"#
        );
    }
}
