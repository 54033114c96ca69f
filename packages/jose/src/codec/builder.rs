//! Compact token construction

use super::config::BuilderConfig;
use super::{Payload, encode_segment};
use crate::claims::Claims;
use crate::error::{JoseError, JoseResult};
use crate::header::Header;
use crate::key::Key;

/// Builds compact JWS and JWE strings
#[derive(Debug, Clone, Default)]
pub struct CompactBuilder {
    config: BuilderConfig,
}

impl CompactBuilder {
    /// Builder over the built-in algorithms
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder with explicit settings
    #[must_use]
    pub fn with_config(config: BuilderConfig) -> Self {
        Self { config }
    }

    /// Settings in use
    #[must_use]
    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Sign `claims` with the algorithm named by the header's `alg`
    ///
    /// # Errors
    /// See [`CompactBuilder::sign`]
    pub fn sign_claims(&self, header: &Header, claims: &Claims, key: &Key) -> JoseResult<String> {
        self.sign_payload(header, PayloadRef::Claims(claims), Some(key))
    }

    /// Build a JWS: `header.payload.signature`
    ///
    /// `key` may be `None` only for `alg: none`, which yields an empty signature segment.
    ///
    /// # Errors
    /// - `JoseError::Configuration` if the header has no `alg`
    /// - `JoseError::UnsupportedAlgorithm` if `alg` or `zip` is not registered
    /// - `JoseError::MissingKey` or `JoseError::InvalidKey` for absent or unusable keys
    /// - `JoseError::Serialization` if the header or claims cannot be serialized
    pub fn sign(&self, header: &Header, payload: &Payload, key: Option<&Key>) -> JoseResult<String> {
        self.sign_payload(header, payload.into(), key)
    }

    fn sign_payload(
        &self,
        header: &Header,
        payload: PayloadRef<'_>,
        key: Option<&Key>,
    ) -> JoseResult<String> {
        let alg = declared(header.algorithm(), "alg")?;
        let algorithm = self.config.registries.signatures().find(alg)?;
        let header = self.with_default_type(header);

        let payload = self.payload_bytes(&header, payload)?;
        let mut token = self.encode_header(&header)?;
        token.push('.');
        token.push_str(&encode_segment(&payload));

        let signature = if algorithm.is_unsecured() {
            Vec::new()
        } else {
            let key = key.ok_or_else(|| {
                JoseError::missing_key(format!("{} signing requires a key", algorithm.id()))
            })?;
            algorithm.sign(key, token.as_bytes())?
        };
        token.push('.');
        token.push_str(&encode_segment(&signature));

        tracing::debug!(algorithm = algorithm.id(), "built JWS");
        Ok(token)
    }

    /// Build a JWE: `header.encrypted_key.iv.ciphertext.tag`
    ///
    /// The encoded protected header is the additional authenticated data.
    ///
    /// # Errors
    /// - `JoseError::Configuration` if the header lacks `alg` or `enc`
    /// - `JoseError::UnsupportedAlgorithm` if `alg`, `enc` or `zip` is not registered
    /// - `JoseError::InvalidKey` if the key does not fit the key management algorithm
    /// - `JoseError::Serialization` if the header or claims cannot be serialized
    pub fn encrypt(&self, header: &Header, payload: &Payload, key: &Key) -> JoseResult<String> {
        let registries = &self.config.registries;
        let key_management = registries
            .key_management()
            .find(declared(header.algorithm(), "alg")?)?;
        let encryption = registries
            .encryption()
            .find(declared(header.encryption(), "enc")?)?;

        let mut header = self.with_default_type(header);
        let wrapped = key_management.wrap(key, &**encryption, &mut header)?;

        let plaintext = self.payload_bytes(&header, payload.into())?;
        let encoded_header = self.encode_header(&header)?;
        let sealed = encryption.encrypt(&wrapped.cek, &plaintext, encoded_header.as_bytes())?;

        tracing::debug!(
            algorithm = key_management.id(),
            encryption = encryption.id(),
            "built JWE"
        );
        Ok([
            encoded_header,
            encode_segment(&wrapped.encrypted_key),
            encode_segment(&sealed.iv),
            encode_segment(&sealed.ciphertext),
            encode_segment(&sealed.tag),
        ]
        .join("."))
    }

    fn with_default_type(&self, header: &Header) -> Header {
        match &self.config.default_type {
            Some(typ) if header.token_type().is_none() => header.clone().with_type(typ.clone()),
            _ => header.clone(),
        }
    }

    fn encode_header(&self, header: &Header) -> JoseResult<String> {
        let json = self.config.serializer.serialize(header.values())?;
        Ok(encode_segment(&json))
    }

    fn payload_bytes(&self, header: &Header, payload: PayloadRef<'_>) -> JoseResult<Vec<u8>> {
        let bytes = match payload {
            PayloadRef::Claims(claims) => self.config.serializer.serialize(&claims.wire_values())?,
            PayloadRef::Bytes(bytes) => bytes.to_vec(),
        };
        let Some(zip) = header.compression() else {
            return Ok(bytes);
        };
        let codec = self.config.registries.compression().find(zip)?;
        let compressed = codec.compress(&bytes)?;
        tracing::trace!(
            codec = codec.id(),
            from = bytes.len(),
            to = compressed.len(),
            "compressed payload"
        );
        Ok(compressed)
    }
}

enum PayloadRef<'a> {
    Claims(&'a Claims),
    Bytes(&'a [u8]),
}

impl<'a> From<&'a Payload> for PayloadRef<'a> {
    fn from(payload: &'a Payload) -> Self {
        match payload {
            Payload::Claims(claims) => Self::Claims(claims),
            Payload::Bytes(bytes) => Self::Bytes(bytes),
        }
    }
}

fn declared<'h>(value: Option<&'h str>, name: &str) -> JoseResult<&'h str> {
    value.ok_or_else(|| JoseError::configuration(format!("header must declare '{name}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jws_layout() {
        let token = CompactBuilder::new()
            .sign_claims(
                &Header::with_alg("HS256"),
                &Claims::new().with_subject("1234567890"),
                &Key::secret(vec![9; 32]),
            )
            .unwrap();
        let segments: Vec<&str> = token.split('.').collect();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], "eyJhbGciOiJIUzI1NiJ9");
        assert_eq!(segments[1], "eyJzdWIiOiIxMjM0NTY3ODkwIn0");
        assert_eq!(segments[2].len(), 43);
        assert!(!token.contains('='));
    }

    #[test]
    fn test_unsecured_has_empty_signature() {
        let token = CompactBuilder::new()
            .sign(&Header::with_alg("none"), &Payload::from(b"hi".to_vec()), None)
            .unwrap();
        assert!(token.ends_with('.'));
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_missing_alg_and_key() {
        let builder = CompactBuilder::new();
        let payload = Payload::from(b"x".to_vec());
        assert!(matches!(
            builder.sign(&Header::new(), &payload, None),
            Err(JoseError::Configuration(_))
        ));
        assert!(matches!(
            builder.sign(&Header::with_alg("HS256"), &payload, None),
            Err(JoseError::MissingKey(_))
        ));
    }

    #[test]
    fn test_default_type_does_not_override() {
        let builder = CompactBuilder::with_config(BuilderConfig::new().with_default_type("JWT"));
        let header = builder.with_default_type(&Header::with_alg("HS256"));
        assert_eq!(header.token_type(), Some("JWT"));
        let header = builder.with_default_type(&Header::with_alg("HS256").with_type("at+jwt"));
        assert_eq!(header.token_type(), Some("at+jwt"));
    }

    #[test]
    fn test_jwe_layout() {
        let header = Header::with_alg("dir").with_encryption("A128GCM");
        let token = CompactBuilder::new()
            .encrypt(&header, &Payload::from(b"secret".to_vec()), &Key::secret(vec![3; 16]))
            .unwrap();
        let segments: Vec<&str> = token.split('.').collect();
        assert_eq!(segments.len(), 5);
        assert!(segments[1].is_empty());
        assert_eq!(segments[2].len(), 16);
        assert_eq!(segments[3].len(), 8);
        assert_eq!(segments[4].len(), 22);
    }
}
