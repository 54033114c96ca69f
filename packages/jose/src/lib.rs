//! Compact JOSE tokens (JWS and JWE) over a typed header and claims model
//!
//! This crate provides:
//! - [`FieldMap`], the schema-backed value container behind [`Header`] and [`Claims`],
//!   with strict typed reads that never truncate numbers silently
//! - case-insensitive algorithm [`Registry`] values for hash, signature, key management,
//!   content encryption and compression algorithms
//! - an [`AlgorithmResolver`] that enforces allow-lists, rejects `alg: none` unless
//!   enabled and fails closed on unknown critical header parameters
//! - the [`CompactBuilder`] and [`CompactParser`] for the dot-separated wire form
//!
//! Building and parsing are synchronous and keep no state between calls.

pub mod algorithms;
pub mod claims;
pub mod codec;
mod error;
pub mod field;
pub mod field_map;
pub mod header;
pub mod key;
pub mod registry;
pub mod resolver;
pub mod value;

pub use claims::Claims;
pub use codec::{
    BuilderConfig, ClaimExpectation, Clock, CompactBuilder, CompactParser, FixedClock,
    JsonDeserializer, JsonSerializer, Jwt, ParseStage, ParserConfig, Payload, SerdeJson,
    SystemClock, TokenKind,
};
pub use error::{JoseError, JoseResult};
pub use field::{Field, FieldKind, Schema};
pub use field_map::{FieldMap, RequiredType};
pub use header::Header;
pub use key::{Key, KeyLocator, StaticKeyLocator};
pub use registry::{Identifiable, Registry};
pub use resolver::{AlgorithmRegistries, AlgorithmResolver, CriticalHandler};
pub use value::FieldValue;

/// Main entry point
pub struct Jose;

impl Jose {
    /// Builder over the built-in algorithms
    #[must_use]
    pub fn builder() -> CompactBuilder {
        CompactBuilder::new()
    }

    /// Parser with the default policy
    #[must_use]
    pub fn parser() -> CompactParser {
        CompactParser::new()
    }

    /// Parser with explicit settings
    #[must_use]
    pub fn parser_with(config: ParserConfig) -> CompactParser {
        CompactParser::with_config(config)
    }
}
