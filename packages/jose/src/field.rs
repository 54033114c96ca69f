//! Typed field definitions and the schemas they compose

use crate::error::{JoseError, JoseResult};
use crate::value::FieldValue;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::hash::{Hash, Hasher};

/// Declared value type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Text
    String,
    /// RFC 7519 NumericDate
    Date,
    /// Ordered set of strings; a lone string is accepted
    StringSet,
    /// Binary value carried as base64url text
    Bytes,
    /// Any JSON-compatible value
    Any,
}

impl FieldKind {
    /// Human readable type name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Date => "Date",
            Self::StringSet => "Set<String>",
            Self::Bytes => "Bytes",
            Self::Any => "Any",
        }
    }
}

/// Conversion applied to every value written to a field
pub type Converter = fn(&Field, FieldValue) -> JoseResult<FieldValue>;

/// A header or claim field: identifier, display name, declared type and converter
///
/// Identity is the `id`; two fields with the same id compare equal.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    id: &'static str,
    name: &'static str,
    kind: FieldKind,
    convert: Converter,
}

impl Field {
    /// Create a field with a custom converter
    #[must_use]
    pub const fn new(
        id: &'static str,
        name: &'static str,
        kind: FieldKind,
        convert: Converter,
    ) -> Self {
        Self {
            id,
            name,
            kind,
            convert,
        }
    }

    /// Text field
    #[must_use]
    pub const fn string(id: &'static str, name: &'static str) -> Self {
        Self::new(id, name, FieldKind::String, convert_string)
    }

    /// NumericDate field
    #[must_use]
    pub const fn date(id: &'static str, name: &'static str) -> Self {
        Self::new(id, name, FieldKind::Date, convert_date)
    }

    /// String set field
    #[must_use]
    pub const fn string_set(id: &'static str, name: &'static str) -> Self {
        Self::new(id, name, FieldKind::StringSet, convert_string_set)
    }

    /// Base64url binary field
    #[must_use]
    pub const fn bytes(id: &'static str, name: &'static str) -> Self {
        Self::new(id, name, FieldKind::Bytes, convert_bytes)
    }

    /// Untyped field
    #[must_use]
    pub const fn any(id: &'static str, name: &'static str) -> Self {
        Self::new(id, name, FieldKind::Any, convert_any)
    }

    /// Wire identifier, e.g. `exp`
    #[must_use]
    pub fn id(&self) -> &'static str {
        self.id
    }

    /// Display name, e.g. `Expiration Time`
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared type
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Coerce a raw value to this field's declared type
    ///
    /// # Errors
    /// Returns `JoseError::Conversion` if the value is incompatible and not coercible
    pub fn convert(&self, raw: FieldValue) -> JoseResult<FieldValue> {
        (self.convert)(self, raw)
    }

    fn reject(&self, raw: &FieldValue, reason: &str) -> JoseError {
        JoseError::conversion(
            self.id,
            self.kind.name(),
            format!("{} value of kind {}: {reason}", self.name, raw.kind_name()),
        )
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Field {}

impl Hash for Field {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

fn convert_string(field: &Field, raw: FieldValue) -> JoseResult<FieldValue> {
    match raw {
        FieldValue::String(_) => Ok(raw),
        other => Err(field.reject(&other, "expected a string")),
    }
}

/// Seconds since the epoch to an instant
pub(crate) fn date_from_seconds(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
}

fn convert_date(field: &Field, raw: FieldValue) -> JoseResult<FieldValue> {
    if let FieldValue::Date(_) = raw {
        return Ok(raw);
    }
    if let Some(seconds) = raw.as_integral() {
        return date_from_seconds(seconds)
            .map(FieldValue::Date)
            .ok_or_else(|| field.reject(&raw, "seconds out of range"));
    }
    if let FieldValue::String(text) = &raw {
        if let Ok(seconds) = text.trim().parse::<i64>() {
            return date_from_seconds(seconds)
                .map(FieldValue::Date)
                .ok_or_else(|| field.reject(&raw, "seconds out of range"));
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(text.trim()) {
            return Ok(FieldValue::Date(parsed.with_timezone(&Utc)));
        }
        return Err(field.reject(&raw, "not numeric seconds or RFC 3339"));
    }
    Err(field.reject(
        &raw,
        "only integral seconds, dates or date strings are accepted",
    ))
}

fn convert_string_set(field: &Field, raw: FieldValue) -> JoseResult<FieldValue> {
    match raw {
        FieldValue::String(s) => Ok(FieldValue::Seq(vec![FieldValue::String(s)])),
        FieldValue::Seq(items) => {
            let mut set: Vec<FieldValue> = Vec::with_capacity(items.len());
            for item in items {
                if !matches!(item, FieldValue::String(_)) {
                    return Err(field.reject(&item, "set elements must be strings"));
                }
                if !set.contains(&item) {
                    set.push(item);
                }
            }
            Ok(FieldValue::Seq(set))
        }
        other => Err(field.reject(&other, "expected a string or array of strings")),
    }
}

fn convert_bytes(field: &Field, raw: FieldValue) -> JoseResult<FieldValue> {
    match raw {
        FieldValue::Bytes(_) => Ok(raw),
        FieldValue::String(ref text) => URL_SAFE_NO_PAD
            .decode(text)
            .map(FieldValue::Bytes)
            .map_err(|e| field.reject(&raw, &format!("invalid base64url: {e}"))),
        other => Err(field.reject(&other, "expected base64url text")),
    }
}

fn convert_any(_field: &Field, raw: FieldValue) -> JoseResult<FieldValue> {
    Ok(raw)
}

/// Ordered set of fields with unique identifiers
#[derive(Debug, Clone)]
pub struct Schema {
    name: &'static str,
    fields: IndexMap<&'static str, Field>,
}

impl Schema {
    /// Create a schema, rejecting duplicate field identifiers
    ///
    /// # Errors
    /// Returns `JoseError::Configuration` if two fields share an id
    pub fn try_new(name: &'static str, fields: impl IntoIterator<Item = Field>) -> JoseResult<Self> {
        let mut map = IndexMap::new();
        for field in fields {
            if map.insert(field.id(), field).is_some() {
                return Err(JoseError::configuration(format!(
                    "{name} schema defines field '{}' more than once",
                    field.id()
                )));
            }
        }
        Ok(Self { name, fields: map })
    }

    /// Schema over fixed built-in field lists, verified unique by unit tests
    pub(crate) fn builtin(name: &'static str, fields: &[Field]) -> Self {
        let map: IndexMap<&'static str, Field> = fields.iter().map(|f| (f.id(), *f)).collect();
        debug_assert_eq!(map.len(), fields.len(), "duplicate field in {name} schema");
        Self { name, fields: map }
    }

    /// Name of the map kind this schema describes, e.g. `JWT Claim`
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Look up a field by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Field> {
        self.fields.get(id)
    }

    /// Whether `id` names a schema field
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.fields.contains_key(id)
    }

    /// Fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }
}
