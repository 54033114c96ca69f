//! Compact serialization: building and parsing JWS and JWE tokens
//!
//! A JWS is three dot-separated base64url segments (header, payload, signature); a JWE
//! is five (header, encrypted key, IV, ciphertext, tag). The [`CompactBuilder`] emits
//! either form from a [`Header`] and a [`Payload`]. The [`CompactParser`] detects the form
//! by segment count, resolves algorithms under its [`ParserConfig`] policy, verifies or
//! decrypts, decompresses and finally validates claims.

mod builder;
mod clock;
mod config;
mod json;
mod parser;
mod validation;

pub use builder::CompactBuilder;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{BuilderConfig, DEFAULT_MAX_DECOMPRESSED_SIZE, ParserConfig};
pub use json::{JsonDeserializer, JsonObject, JsonSerializer, SerdeJson};
pub use parser::{CompactParser, ParseStage};
pub use validation::ClaimExpectation;

use crate::claims::Claims;
use crate::header::Header;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

/// Token payload: a claims set or opaque bytes
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// JSON claims set
    Claims(Claims),
    /// Any other content
    Bytes(Vec<u8>),
}

impl Payload {
    /// Claims, if the payload is a claims set
    #[must_use]
    pub fn claims(&self) -> Option<&Claims> {
        match self {
            Self::Claims(claims) => Some(claims),
            Self::Bytes(_) => None,
        }
    }

    /// Raw bytes, if the payload is not a claims set
    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::Claims(_) => None,
        }
    }
}

impl From<Claims> for Payload {
    fn from(claims: Claims) -> Self {
        Self::Claims(claims)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

/// Compact token form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// JWS with a real signature
    Signed,
    /// JWS with `alg: none`
    Unsecured,
    /// JWE
    Encrypted,
}

/// A successfully parsed token
#[derive(Debug, Clone, PartialEq)]
pub struct Jwt {
    header: Header,
    payload: Payload,
    kind: TokenKind,
}

impl Jwt {
    pub(crate) fn new(header: Header, payload: Payload, kind: TokenKind) -> Self {
        Self {
            header,
            payload,
            kind,
        }
    }

    /// Protected header
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Payload
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Claims, if the payload is a claims set
    #[must_use]
    pub fn claims(&self) -> Option<&Claims> {
        self.payload.claims()
    }

    /// Token form
    #[must_use]
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Split into header and payload
    #[must_use]
    pub fn into_parts(self) -> (Header, Payload) {
        (self.header, self.payload)
    }
}

pub(crate) fn encode_segment(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}
