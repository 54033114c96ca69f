//! JSON collaborators used to turn field maps into bytes and back

use crate::error::{JoseError, JoseResult};
use crate::value::FieldValue;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;

/// Ordered JSON object as seen by the codec
pub type JsonObject = IndexMap<String, FieldValue>;

/// Encodes a JSON object to UTF-8 bytes
pub trait JsonSerializer: Send + Sync + fmt::Debug {
    /// Serialize `object`
    ///
    /// # Errors
    /// Returns `JoseError::Serialization` if the object cannot be encoded
    fn serialize(&self, object: &JsonObject) -> JoseResult<Vec<u8>>;
}

/// Decodes UTF-8 bytes to a JSON object
pub trait JsonDeserializer: Send + Sync + fmt::Debug {
    /// Deserialize `bytes`, rejecting anything that is not a JSON object
    ///
    /// # Errors
    /// Returns `JoseError::MalformedToken` for invalid JSON or a non-object document
    fn deserialize(&self, bytes: &[u8]) -> JoseResult<JsonObject>;
}

/// `serde_json` backed serializer and deserializer
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeJson;

impl JsonSerializer for SerdeJson {
    fn serialize(&self, object: &JsonObject) -> JoseResult<Vec<u8>> {
        serde_json::to_vec(object).map_err(|e| JoseError::serialization(e.to_string()))
    }
}

impl JsonDeserializer for SerdeJson {
    fn deserialize(&self, bytes: &[u8]) -> JoseResult<JsonObject> {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) => Ok(map
                .into_iter()
                .map(|(k, v)| (k, FieldValue::from_json(v)))
                .collect()),
            Ok(other) => Err(JoseError::malformed(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
            Err(e) => Err(JoseError::malformed(format!("invalid JSON: {e}"))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
