//! Compact token parsing
//!
//! Parsing advances through fixed stages and aborts on the first failure; no partially
//! parsed token is ever returned. The segment count is checked before any decoding or
//! cryptographic work. Signature and decryption failures all surface as the same opaque
//! invalid-token error.

use super::config::ParserConfig;
use super::validation::{validate_expectations, validate_temporal};
use super::{Jwt, Payload, TokenKind};
use crate::claims::Claims;
use crate::error::{JoseError, JoseResult};
use crate::header::Header;
use crate::key::Key;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use std::fmt;

const JWS_SEGMENTS: usize = 3;
const JWE_SEGMENTS: usize = 5;

/// Stage a parse had reached, reported when it fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    /// Splitting into segments
    Split,
    /// Header decoded and deserialized
    HeaderDecoded,
    /// Algorithms resolved and critical parameters checked
    AlgorithmResolved,
    /// Signature verified or content decrypted
    IntegrityVerified,
    /// Payload decompressed
    PayloadDecompressed,
    /// Claims validated
    ClaimsValidated,
}

impl fmt::Display for ParseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Split => "split",
            Self::HeaderDecoded => "header-decoded",
            Self::AlgorithmResolved => "algorithm-resolved",
            Self::IntegrityVerified => "integrity-verified",
            Self::PayloadDecompressed => "payload-decompressed",
            Self::ClaimsValidated => "claims-validated",
        };
        f.write_str(name)
    }
}

/// Parses and validates compact JWS and JWE strings
#[derive(Debug, Clone, Default)]
pub struct CompactParser {
    config: ParserConfig,
}

impl CompactParser {
    /// Parser with the default policy
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parser with explicit settings
    #[must_use]
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Settings in use
    #[must_use]
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse a token, obtaining the key from the configured key locator
    ///
    /// # Errors
    /// - `JoseError::MalformedToken` for a wrong segment count, bad base64url or JSON
    /// - `JoseError::UnsupportedAlgorithm` for unknown or disallowed algorithms
    /// - `JoseError::Security` for `none` without opt-in, unmet `crit` or a failed check
    /// - `JoseError::MissingKey` if no key can be located
    /// - `JoseError::Compression` for an unknown codec or corrupt payload
    /// - `JoseError::Expired`, `JoseError::Premature`, `JoseError::MissingClaim` or
    ///   `JoseError::IncorrectClaim` from claim validation
    pub fn parse(&self, token: &str) -> JoseResult<Jwt> {
        self.run(token, None)
    }

    /// Parse a token using `key` for verification or decryption
    ///
    /// # Errors
    /// See [`CompactParser::parse`]
    pub fn parse_with_key(&self, token: &str, key: &Key) -> JoseResult<Jwt> {
        self.run(token, Some(key))
    }

    fn run(&self, token: &str, key: Option<&Key>) -> JoseResult<Jwt> {
        let mut stage = ParseStage::Split;
        self.parse_stages(token, key, &mut stage).map_err(|error| {
            tracing::debug!(stage = %stage, error = %error, "token rejected");
            error
        })
    }

    fn parse_stages(
        &self,
        token: &str,
        explicit_key: Option<&Key>,
        stage: &mut ParseStage,
    ) -> JoseResult<Jwt> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != JWS_SEGMENTS && segments.len() != JWE_SEGMENTS {
            return Err(JoseError::malformed(format!(
                "compact token must have {JWS_SEGMENTS} (JWS) or {JWE_SEGMENTS} (JWE) segments, found {}",
                segments.len()
            )));
        }

        let header_json = decode_segment(segments[0], "header")?;
        let header = Header::from_values(self.config.deserializer.deserialize(&header_json)?)?;
        *stage = ParseStage::HeaderDecoded;

        let (payload, kind) = if segments.len() == JWS_SEGMENTS {
            self.verify_jws(&header, &segments, explicit_key, stage)?
        } else {
            (
                self.decrypt_jwe(&header, &segments, explicit_key, stage)?,
                TokenKind::Encrypted,
            )
        };
        *stage = ParseStage::IntegrityVerified;

        let payload = match self.config.resolver.resolve_compression(&header)? {
            Some(codec) => {
                let inflated = codec.decompress(&payload, self.config.max_decompressed_size)?;
                tracing::trace!(codec = codec.id(), size = inflated.len(), "decompressed payload");
                inflated
            }
            None => payload,
        };
        *stage = ParseStage::PayloadDecompressed;

        let payload = self.interpret_payload(payload)?;
        *stage = ParseStage::ClaimsValidated;

        tracing::debug!(kind = ?kind, "token accepted");
        Ok(Jwt::new(header, payload, kind))
    }

    fn verify_jws(
        &self,
        header: &Header,
        segments: &[&str],
        explicit_key: Option<&Key>,
        stage: &mut ParseStage,
    ) -> JoseResult<(Vec<u8>, TokenKind)> {
        let algorithm = self.config.resolver.resolve_signature(header)?;
        self.config.resolver.check_critical(header)?;
        *stage = ParseStage::AlgorithmResolved;

        let payload = decode_segment(segments[1], "payload")?;
        let signature = decode_segment(segments[2], "signature")?;

        if algorithm.is_unsecured() {
            if !signature.is_empty() {
                return Err(JoseError::security(
                    "unsecured token must have an empty signature",
                ));
            }
            return Ok((payload, TokenKind::Unsecured));
        }

        let key = self.resolve_key(header, explicit_key)?;
        let signing_input = format!("{}.{}", segments[0], segments[1]);
        if !algorithm.verify(&key, signing_input.as_bytes(), &signature)? {
            return Err(JoseError::invalid_token());
        }
        Ok((payload, TokenKind::Signed))
    }

    fn decrypt_jwe(
        &self,
        header: &Header,
        segments: &[&str],
        explicit_key: Option<&Key>,
        stage: &mut ParseStage,
    ) -> JoseResult<Vec<u8>> {
        let resolver = &self.config.resolver;
        let key_management = resolver.resolve_key_management(header)?;
        let encryption = resolver.resolve_encryption(header)?;
        resolver.check_critical(header)?;
        *stage = ParseStage::AlgorithmResolved;

        let encrypted_key = decode_segment(segments[1], "encrypted key")?;
        let iv = decode_segment(segments[2], "initialization vector")?;
        let ciphertext = decode_segment(segments[3], "ciphertext")?;
        let tag = decode_segment(segments[4], "authentication tag")?;

        let key = self.resolve_key(header, explicit_key)?;
        let cek = key_management.unwrap(&key, &*encryption, header, &encrypted_key)?;
        encryption.decrypt(&cek, &iv, &ciphertext, &tag, segments[0].as_bytes())
    }

    fn resolve_key(&self, header: &Header, explicit_key: Option<&Key>) -> JoseResult<Key> {
        if let Some(key) = explicit_key {
            return Ok(key.clone());
        }
        let Some(locator) = &self.config.locator else {
            return Err(JoseError::missing_key(
                "no key supplied and no key locator configured",
            ));
        };
        locator.locate(header)?.ok_or_else(|| {
            JoseError::missing_key(format!(
                "key locator found no key for kid {:?}",
                header.key_id()
            ))
        })
    }

    fn interpret_payload(&self, payload: Vec<u8>) -> JoseResult<Payload> {
        let Ok(object) = self.config.deserializer.deserialize(&payload) else {
            if let Some(first) = self.config.expectations.first() {
                return Err(JoseError::MissingClaim(first.claim().to_string()));
            }
            return Ok(Payload::Bytes(payload));
        };
        let claims = Claims::from_values(object)?;
        validate_temporal(&claims, self.config.clock.now(), self.config.clock_skew)?;
        validate_expectations(&claims, &self.config.expectations)?;
        Ok(Payload::Claims(claims))
    }
}

fn decode_segment(segment: &str, name: &str) -> JoseResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| JoseError::malformed(format!("invalid base64url in {name} segment")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_count_checked_first() {
        let parser = CompactParser::new();
        for token in ["a.b", "a", "a.b.c.d", "a.b.c.d.e.f"] {
            assert!(matches!(
                parser.parse(token),
                Err(JoseError::MalformedToken(ref m)) if m.contains("segments")
            ));
        }
    }

    #[test]
    fn test_bad_base64_header() {
        assert!(matches!(
            CompactParser::new().parse("!!!.e30.sig"),
            Err(JoseError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_header_must_be_json_object() {
        // "not json", then [1]
        for token in ["bm90IGpzb24.e30.AAAA", "WzFd.e30.AAAA"] {
            assert!(matches!(
                CompactParser::new().parse(token),
                Err(JoseError::MalformedToken(_))
            ));
        }
    }

    #[test]
    fn test_missing_key_without_locator() {
        // {"alg":"HS256"} . {}
        let token = "eyJhbGciOiJIUzI1NiJ9.e30.AAAA";
        assert!(matches!(
            CompactParser::new().parse(token),
            Err(JoseError::MissingKey(_))
        ));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(ParseStage::HeaderDecoded.to_string(), "header-decoded");
    }
}
