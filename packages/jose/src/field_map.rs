//! Identifier-keyed field container shared by headers and claims
//!
//! A [`FieldMap`] holds raw [`FieldValue`]s in insertion order. Values written under a
//! schema field id are coerced to that field's declared type; any other key is an
//! extension and is stored untouched. Strict reads go through [`FieldMap::get_as`]:
//!
//! - a value already stored with the requested type is returned as is
//! - a date request converts integral seconds, anything else is a conversion error
//! - signed integral kinds widen or narrow by value, failing instead of truncating
//! - every other mismatch is a [`JoseError::RequiredType`] naming both types

use crate::error::{JoseError, JoseResult};
use crate::field::{Field, Schema, date_from_seconds};
use crate::value::FieldValue;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// Ordered, schema-backed map of raw field values
#[derive(Debug, Clone)]
pub struct FieldMap {
    schema: &'static Schema,
    values: IndexMap<String, FieldValue>,
}

impl PartialEq for FieldMap {
    /// Equal when both hold the same entries, regardless of insertion order
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl FieldMap {
    /// Create an empty map over `schema`
    #[must_use]
    pub fn new(schema: &'static Schema) -> Self {
        Self {
            schema,
            values: IndexMap::new(),
        }
    }

    /// Create a map from existing entries, validating each against `schema`
    ///
    /// # Errors
    /// Returns `JoseError::Conversion` if a schema field holds an incompatible value
    pub fn from_values(
        schema: &'static Schema,
        values: impl IntoIterator<Item = (String, FieldValue)>,
    ) -> JoseResult<Self> {
        let mut map = Self::new(schema);
        for (id, value) in values {
            map.set(id, value)?;
        }
        Ok(map)
    }

    /// Schema backing this map
    #[must_use]
    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Write a value, coercing it when `id` is a schema field
    ///
    /// Writing [`FieldValue::Null`] removes the entry. Returns the previous value.
    ///
    /// # Errors
    /// Returns `JoseError::Conversion` if the value cannot be coerced to the field's type
    pub fn set(
        &mut self,
        id: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> JoseResult<Option<FieldValue>> {
        let id = id.into();
        let value = value.into();
        if value.is_null() {
            return Ok(self.values.shift_remove(&id));
        }
        let value = match self.schema.get(&id) {
            Some(field) => field.convert(value)?,
            None => value,
        };
        Ok(self.values.insert(id, value))
    }

    /// Write a value already known to match `field`'s declared type
    pub(crate) fn put(&mut self, field: &Field, value: FieldValue) {
        debug_assert!(self.schema.contains(field.id()));
        self.values.insert(field.id().to_string(), value);
    }

    /// Raw stored value
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&FieldValue> {
        self.values.get(id)
    }

    /// Strict typed read following the coercion and overflow rules of this module
    ///
    /// # Errors
    /// Returns `JoseError::RequiredType` on type mismatch or unsafe narrowing, and
    /// `JoseError::Conversion` if a date cannot be built from the stored value
    pub fn get_as<T: RequiredType>(&self, id: &str) -> JoseResult<Option<T>> {
        let Some(value) = self.values.get(id) else {
            return Ok(None);
        };
        if let Some(typed) = T::from_idiomatic(value) {
            return Ok(Some(typed));
        }
        T::coerce(id, value).map(Some)
    }

    /// Remove an entry, returning its value
    pub fn remove(&mut self, id: &str) -> Option<FieldValue> {
        self.values.shift_remove(id)
    }

    /// Whether an entry exists for `id`
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.values.contains_key(id)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the map has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Borrow the underlying ordered map
    #[must_use]
    pub fn values(&self) -> &IndexMap<String, FieldValue> {
        &self.values
    }

    /// Take the underlying ordered map
    #[must_use]
    pub fn into_values(self) -> IndexMap<String, FieldValue> {
        self.values
    }

    pub(crate) fn string(&self, field: &Field) -> Option<&str> {
        self.values.get(field.id()).and_then(FieldValue::as_str)
    }

    pub(crate) fn date(&self, field: &Field) -> Option<DateTime<Utc>> {
        match self.values.get(field.id()) {
            Some(FieldValue::Date(d)) => Some(*d),
            _ => None,
        }
    }

    pub(crate) fn string_set(&self, field: &Field) -> Option<Vec<&str>> {
        self.values
            .get(field.id())
            .and_then(FieldValue::as_seq)
            .map(|items| items.iter().filter_map(FieldValue::as_str).collect())
    }

    pub(crate) fn bytes(&self, field: &Field) -> Option<&[u8]> {
        match self.values.get(field.id()) {
            Some(FieldValue::Bytes(b)) => Some(b),
            _ => None,
        }
    }
}

/// Types that can be requested from [`FieldMap::get_as`]
pub trait RequiredType: Sized {
    /// Type name used in error messages
    const NAME: &'static str;

    /// The value when it is already stored with exactly this type
    fn from_idiomatic(value: &FieldValue) -> Option<Self>;

    /// Convert a value stored with a different type
    ///
    /// # Errors
    /// Returns `JoseError::RequiredType` unless a conversion rule applies
    fn coerce(id: &str, value: &FieldValue) -> JoseResult<Self> {
        Err(JoseError::type_mismatch(id, value.kind_name(), Self::NAME))
    }
}

macro_rules! integral_required_type {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl RequiredType for $ty {
                const NAME: &'static str = stringify!($ty);

                fn from_idiomatic(value: &FieldValue) -> Option<Self> {
                    match value {
                        FieldValue::$variant(v) => Some(*v),
                        _ => None,
                    }
                }

                fn coerce(id: &str, value: &FieldValue) -> JoseResult<Self> {
                    let wide = value
                        .as_integral()
                        .ok_or_else(|| JoseError::type_mismatch(id, value.kind_name(), Self::NAME))?;
                    <$ty>::try_from(wide)
                        .map_err(|_| JoseError::numeric_overflow(id, wide, Self::NAME))
                }
            }
        )*
    };
}

integral_required_type!(i64 => I64, i32 => I32, i16 => I16, i8 => I8);

impl RequiredType for DateTime<Utc> {
    const NAME: &'static str = "Date";

    fn from_idiomatic(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    fn coerce(id: &str, value: &FieldValue) -> JoseResult<Self> {
        let seconds = value.as_integral().ok_or_else(|| {
            JoseError::conversion(
                id,
                Self::NAME,
                format!("cannot create a date from a {} value", value.kind_name()),
            )
        })?;
        date_from_seconds(seconds).ok_or_else(|| {
            JoseError::conversion(id, Self::NAME, format!("{seconds} seconds is out of range"))
        })
    }
}

impl RequiredType for String {
    const NAME: &'static str = "String";

    fn from_idiomatic(value: &FieldValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl RequiredType for bool {
    const NAME: &'static str = "bool";

    fn from_idiomatic(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl RequiredType for f64 {
    const NAME: &'static str = "f64";

    fn from_idiomatic(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::F64(v) => Some(*v),
            _ => None,
        }
    }
}

impl RequiredType for Vec<u8> {
    const NAME: &'static str = "Bytes";

    fn from_idiomatic(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Bytes(b) => Some(b.clone()),
            _ => None,
        }
    }
}

impl RequiredType for Vec<String> {
    const NAME: &'static str = "Vec<String>";

    fn from_idiomatic(value: &FieldValue) -> Option<Self> {
        value
            .as_seq()?
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect()
    }
}

impl RequiredType for Vec<FieldValue> {
    const NAME: &'static str = "Seq";

    fn from_idiomatic(value: &FieldValue) -> Option<Self> {
        value.as_seq().map(<[FieldValue]>::to_vec)
    }
}

impl RequiredType for IndexMap<String, FieldValue> {
    const NAME: &'static str = "Map";

    fn from_idiomatic(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Map(map) => Some(map.clone()),
            _ => None,
        }
    }
}

impl RequiredType for FieldValue {
    const NAME: &'static str = "FieldValue";

    fn from_idiomatic(value: &FieldValue) -> Option<Self> {
        Some(value.clone())
    }
}
