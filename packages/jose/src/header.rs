//! JOSE protected header over the registered header schema

use crate::error::JoseResult;
use crate::field::{Field, Schema};
use crate::field_map::FieldMap;
use crate::value::FieldValue;
use once_cell::sync::Lazy;
use std::ops::{Deref, DerefMut};

/// `alg` parameter
pub const ALGORITHM: Field = Field::string("alg", "Algorithm");
/// `typ` parameter
pub const TYPE: Field = Field::string("typ", "Type");
/// `cty` parameter
pub const CONTENT_TYPE: Field = Field::string("cty", "Content Type");
/// `zip` parameter
pub const COMPRESSION: Field = Field::string("zip", "Compression Algorithm");
/// `kid` parameter
pub const KEY_ID: Field = Field::string("kid", "Key ID");
/// `crit` parameter
pub const CRITICAL: Field = Field::string_set("crit", "Critical");
/// `enc` parameter
pub const ENCRYPTION: Field = Field::string("enc", "Encryption Algorithm");
/// `x5t` parameter
pub const X509_SHA1_THUMBPRINT: Field = Field::bytes("x5t", "X.509 Certificate SHA-1 Thumbprint");
/// `x5t#S256` parameter
pub const X509_SHA256_THUMBPRINT: Field =
    Field::bytes("x5t#S256", "X.509 Certificate SHA-256 Thumbprint");
/// `iv` parameter written by AES-GCM key wrapping
pub const INITIALIZATION_VECTOR: Field = Field::bytes("iv", "Initialization Vector");
/// `tag` parameter written by AES-GCM key wrapping
pub const AUTHENTICATION_TAG: Field = Field::bytes("tag", "Authentication Tag");

/// Registered header schema shared by every [`Header`] instance
pub static HEADER_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::builtin(
        "JWT Header",
        &[
            ALGORITHM,
            TYPE,
            CONTENT_TYPE,
            COMPRESSION,
            KEY_ID,
            CRITICAL,
            ENCRYPTION,
            X509_SHA1_THUMBPRINT,
            X509_SHA256_THUMBPRINT,
            INITIALIZATION_VECTOR,
            AUTHENTICATION_TAG,
        ],
    )
});

/// JOSE header
///
/// Dereferences to its [`FieldMap`]; unknown parameters pass through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Header(FieldMap);

impl Header {
    /// Create an empty header
    #[must_use]
    pub fn new() -> Self {
        Self(FieldMap::new(&HEADER_SCHEMA))
    }

    /// Create a header declaring `alg`
    #[must_use]
    pub fn with_alg(alg: impl Into<String>) -> Self {
        Self::new().with_algorithm(alg)
    }

    /// Create a header from decoded entries
    ///
    /// # Errors
    /// Returns `JoseError::Conversion` if a registered parameter holds an incompatible value
    pub fn from_values(values: impl IntoIterator<Item = (String, FieldValue)>) -> JoseResult<Self> {
        FieldMap::from_values(&HEADER_SCHEMA, values).map(Self)
    }

    /// Algorithm (`alg`)
    #[must_use]
    pub fn algorithm(&self) -> Option<&str> {
        self.0.string(&ALGORITHM)
    }

    /// Media type of the complete token (`typ`)
    #[must_use]
    pub fn token_type(&self) -> Option<&str> {
        self.0.string(&TYPE)
    }

    /// Media type of the payload (`cty`)
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.0.string(&CONTENT_TYPE)
    }

    /// Compression algorithm (`zip`)
    #[must_use]
    pub fn compression(&self) -> Option<&str> {
        self.0.string(&COMPRESSION)
    }

    /// Key ID (`kid`)
    #[must_use]
    pub fn key_id(&self) -> Option<&str> {
        self.0.string(&KEY_ID)
    }

    /// Critical parameter names (`crit`)
    #[must_use]
    pub fn critical(&self) -> Option<Vec<&str>> {
        self.0.string_set(&CRITICAL)
    }

    /// Content encryption algorithm (`enc`)
    #[must_use]
    pub fn encryption(&self) -> Option<&str> {
        self.0.string(&ENCRYPTION)
    }

    /// X.509 SHA-1 thumbprint (`x5t`)
    #[must_use]
    pub fn x509_sha1_thumbprint(&self) -> Option<&[u8]> {
        self.0.bytes(&X509_SHA1_THUMBPRINT)
    }

    /// X.509 SHA-256 thumbprint (`x5t#S256`)
    #[must_use]
    pub fn x509_sha256_thumbprint(&self) -> Option<&[u8]> {
        self.0.bytes(&X509_SHA256_THUMBPRINT)
    }

    /// Key wrap initialization vector (`iv`)
    #[must_use]
    pub fn initialization_vector(&self) -> Option<&[u8]> {
        self.0.bytes(&INITIALIZATION_VECTOR)
    }

    /// Key wrap authentication tag (`tag`)
    #[must_use]
    pub fn authentication_tag(&self) -> Option<&[u8]> {
        self.0.bytes(&AUTHENTICATION_TAG)
    }

    /// Set `alg`
    #[must_use]
    pub fn with_algorithm(mut self, alg: impl Into<String>) -> Self {
        self.0.put(&ALGORITHM, FieldValue::String(alg.into()));
        self
    }

    /// Set `typ`
    #[must_use]
    pub fn with_type(mut self, typ: impl Into<String>) -> Self {
        self.0.put(&TYPE, FieldValue::String(typ.into()));
        self
    }

    /// Set `cty`
    #[must_use]
    pub fn with_content_type(mut self, cty: impl Into<String>) -> Self {
        self.0.put(&CONTENT_TYPE, FieldValue::String(cty.into()));
        self
    }

    /// Set `zip`
    #[must_use]
    pub fn with_compression(mut self, zip: impl Into<String>) -> Self {
        self.0.put(&COMPRESSION, FieldValue::String(zip.into()));
        self
    }

    /// Set `kid`
    #[must_use]
    pub fn with_key_id(mut self, kid: impl Into<String>) -> Self {
        self.0.put(&KEY_ID, FieldValue::String(kid.into()));
        self
    }

    /// Set `enc`
    #[must_use]
    pub fn with_encryption(mut self, enc: impl Into<String>) -> Self {
        self.0.put(&ENCRYPTION, FieldValue::String(enc.into()));
        self
    }

    /// Mark extension parameters as critical
    ///
    /// # Errors
    /// Returns `JoseError::Conversion` if the names cannot form a string set
    pub fn with_critical<I, S>(mut self, names: I) -> JoseResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        self.0.set(CRITICAL.id(), names)?;
        Ok(self)
    }

    /// Set `x5t#S256`
    #[must_use]
    pub fn with_x509_sha256_thumbprint(mut self, thumbprint: Vec<u8>) -> Self {
        self.0.put(&X509_SHA256_THUMBPRINT, FieldValue::Bytes(thumbprint));
        self
    }

    /// Add a parameter, coercing registered parameters to their declared type.
    ///
    /// # Errors
    /// Returns `JoseError::Conversion` if a registered parameter cannot take the value
    pub fn with_param(mut self, id: impl Into<String>, value: impl Into<FieldValue>) -> JoseResult<Self> {
        self.0.set(id, value)?;
        Ok(self)
    }

    pub(crate) fn set_key_wrap_params(&mut self, iv: Vec<u8>, tag: Vec<u8>) {
        self.0.put(&INITIALIZATION_VECTOR, FieldValue::Bytes(iv));
        self.0.put(&AUTHENTICATION_TAG, FieldValue::Bytes(tag));
    }

    /// Unwrap into the underlying field map
    #[must_use]
    pub fn into_field_map(self) -> FieldMap {
        self.0
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Header {
    type Target = FieldMap;

    fn deref(&self) -> &FieldMap {
        &self.0
    }
}

impl DerefMut for Header {
    fn deref_mut(&mut self) -> &mut FieldMap {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JoseError;

    #[test]
    fn test_header_schema_ids_are_unique() {
        let fields = HEADER_SCHEMA.fields().copied().collect::<Vec<_>>();
        assert!(Schema::try_new("JWT Header", fields).is_ok());
    }

    #[test]
    fn test_unknown_parameters_pass_through() {
        let header = Header::with_alg("HS256")
            .with_param("b64", false)
            .unwrap();
        assert_eq!(header.get("b64"), Some(&FieldValue::Bool(false)));
        assert_eq!(header.algorithm(), Some("HS256"));
    }

    #[test]
    fn test_registered_parameters_are_typed() {
        let result = Header::new().with_param("kid", 12_i64);
        assert!(matches!(result, Err(JoseError::Conversion { .. })));

        let header = Header::new().with_critical(["exp", "exp"]).unwrap();
        assert_eq!(header.critical(), Some(vec!["exp"]));
    }
}
