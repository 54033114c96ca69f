//! JWT claims set over the registered claim schema

use crate::error::JoseResult;
use crate::field::{Field, Schema};
use crate::field_map::FieldMap;
use crate::value::FieldValue;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::ops::{Deref, DerefMut};

/// `iss` claim
pub const ISSUER: Field = Field::string("iss", "Issuer");
/// `sub` claim
pub const SUBJECT: Field = Field::string("sub", "Subject");
/// `aud` claim
pub const AUDIENCE: Field = Field::string_set("aud", "Audience");
/// `exp` claim
pub const EXPIRATION: Field = Field::date("exp", "Expiration Time");
/// `nbf` claim
pub const NOT_BEFORE: Field = Field::date("nbf", "Not Before");
/// `iat` claim
pub const ISSUED_AT: Field = Field::date("iat", "Issued At");
/// `jti` claim
pub const JWT_ID: Field = Field::string("jti", "JWT ID");

/// Registered claim schema shared by every [`Claims`] instance
pub static CLAIMS_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::builtin(
        "JWT Claim",
        &[
            ISSUER, SUBJECT, AUDIENCE, EXPIRATION, NOT_BEFORE, ISSUED_AT, JWT_ID,
        ],
    )
});

/// JWT claims set
///
/// Dereferences to its [`FieldMap`] for extension claims and strict typed reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims(FieldMap);

impl Claims {
    /// Create an empty claims set
    #[must_use]
    pub fn new() -> Self {
        Self(FieldMap::new(&CLAIMS_SCHEMA))
    }

    /// Create a claims set from decoded entries
    ///
    /// # Errors
    /// Returns `JoseError::Conversion` if a registered claim holds an incompatible value
    pub fn from_values(values: impl IntoIterator<Item = (String, FieldValue)>) -> JoseResult<Self> {
        FieldMap::from_values(&CLAIMS_SCHEMA, values).map(Self)
    }

    /// Issuer
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.0.string(&ISSUER)
    }

    /// Subject
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.0.string(&SUBJECT)
    }

    /// Audience members
    #[must_use]
    pub fn audience(&self) -> Option<Vec<&str>> {
        self.0.string_set(&AUDIENCE)
    }

    /// Expiration time
    #[must_use]
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.0.date(&EXPIRATION)
    }

    /// Not-before time
    #[must_use]
    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.0.date(&NOT_BEFORE)
    }

    /// Issued-at time
    #[must_use]
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.0.date(&ISSUED_AT)
    }

    /// JWT ID
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.0.string(&JWT_ID)
    }

    /// Set the issuer (iss) claim.
    #[must_use]
    pub fn with_issuer(mut self, iss: impl Into<String>) -> Self {
        self.0.put(&ISSUER, FieldValue::String(iss.into()));
        self
    }

    /// Set the subject (sub) claim.
    #[must_use]
    pub fn with_subject(mut self, sub: impl Into<String>) -> Self {
        self.0.put(&SUBJECT, FieldValue::String(sub.into()));
        self
    }

    /// Add an audience member, keeping existing members.
    #[must_use]
    pub fn with_audience(mut self, aud: impl Into<String>) -> Self {
        let aud = FieldValue::String(aud.into());
        let mut members = match self.0.remove(AUDIENCE.id()) {
            Some(FieldValue::Seq(items)) => items,
            _ => Vec::new(),
        };
        if !members.contains(&aud) {
            members.push(aud);
        }
        self.0.put(&AUDIENCE, FieldValue::Seq(members));
        self
    }

    /// Set the expiration (exp) claim. Sub-second precision is dropped.
    #[must_use]
    pub fn with_expiration(mut self, exp: DateTime<Utc>) -> Self {
        self.0.put(&EXPIRATION, FieldValue::Date(whole_seconds(exp)));
        self
    }

    /// Set the not-before (nbf) claim. Sub-second precision is dropped.
    #[must_use]
    pub fn with_not_before(mut self, nbf: DateTime<Utc>) -> Self {
        self.0.put(&NOT_BEFORE, FieldValue::Date(whole_seconds(nbf)));
        self
    }

    /// Set the issued-at (iat) claim. Sub-second precision is dropped.
    #[must_use]
    pub fn with_issued_at(mut self, iat: DateTime<Utc>) -> Self {
        self.0.put(&ISSUED_AT, FieldValue::Date(whole_seconds(iat)));
        self
    }

    /// Set the JWT ID (jti) claim.
    #[must_use]
    pub fn with_id(mut self, jti: impl Into<String>) -> Self {
        self.0.put(&JWT_ID, FieldValue::String(jti.into()));
        self
    }

    /// Add a claim, coercing registered claims to their declared type.
    ///
    /// # Errors
    /// Returns `JoseError::Conversion` if a registered claim cannot take the value
    pub fn with_claim(mut self, id: impl Into<String>, value: impl Into<FieldValue>) -> JoseResult<Self> {
        self.0.set(id, value)?;
        Ok(self)
    }

    /// Unwrap into the underlying field map
    #[must_use]
    pub fn into_field_map(self) -> FieldMap {
        self.0
    }

    /// Entries for serialization, with single-member audiences written as a string
    pub(crate) fn wire_values(&self) -> IndexMap<String, FieldValue> {
        let mut values = self.0.values().clone();
        let single = match values.get(AUDIENCE.id()) {
            Some(FieldValue::Seq(members)) if members.len() == 1 => Some(members[0].clone()),
            _ => None,
        };
        if let Some(only) = single {
            values.insert(AUDIENCE.id().to_string(), only);
        }
        values
    }
}

impl Default for Claims {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Claims {
    type Target = FieldMap;

    fn deref(&self) -> &FieldMap {
        &self.0
    }
}

impl DerefMut for Claims {
    fn deref_mut(&mut self) -> &mut FieldMap {
        &mut self.0
    }
}

fn whole_seconds(instant: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(instant.timestamp(), 0).unwrap_or(instant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Schema;

    #[test]
    fn test_claim_schema_ids_are_unique() {
        let fields = CLAIMS_SCHEMA.fields().copied().collect::<Vec<_>>();
        assert_eq!(fields.len(), 7);
        assert!(Schema::try_new("JWT Claim", fields).is_ok());
    }

    #[test]
    fn test_single_audience_is_written_as_string() {
        let claims = Claims::new().with_audience("api");
        assert_eq!(claims.wire_values().get("aud"), Some(&FieldValue::from("api")));

        let claims = claims.with_audience("web");
        assert_eq!(
            claims.wire_values().get("aud"),
            Some(&FieldValue::from(vec!["api", "web"]))
        );
    }

    #[test]
    fn test_builder_drops_sub_second_precision() {
        let exp = DateTime::from_timestamp(1_700_000_000, 999_000_000).unwrap();
        let claims = Claims::new().with_expiration(exp);
        assert_eq!(claims.expiration().unwrap().timestamp_subsec_nanos(), 0);
    }
}
