//! Builder and parser configuration

use super::clock::{Clock, SystemClock};
use super::json::{JsonDeserializer, JsonSerializer, SerdeJson};
use super::validation::ClaimExpectation;
use crate::algorithms::{
    CompressionAlgorithm, ContentEncryptionAlgorithm, KeyManagementAlgorithm, SignatureAlgorithm,
};
use crate::error::{JoseError, JoseResult};
use crate::header::Header;
use crate::key::KeyLocator;
use crate::resolver::{AlgorithmRegistries, AlgorithmResolver};
use crate::value::FieldValue;
use chrono::Duration;
use std::fmt;
use std::sync::Arc;

/// Default bound on a decompressed payload, 4 MiB
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 4 * 1024 * 1024;

/// Settings for [`CompactParser`](super::CompactParser)
#[derive(Clone)]
pub struct ParserConfig {
    pub(crate) resolver: AlgorithmResolver,
    pub(crate) clock_skew: Duration,
    pub(crate) expectations: Vec<ClaimExpectation>,
    pub(crate) max_decompressed_size: usize,
    pub(crate) deserializer: Arc<dyn JsonDeserializer>,
    pub(crate) locator: Option<Arc<dyn KeyLocator>>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            resolver: AlgorithmResolver::default(),
            clock_skew: Duration::zero(),
            expectations: Vec::new(),
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
            deserializer: Arc::new(SerdeJson),
            locator: None,
            clock: Arc::new(SystemClock),
        }
    }
}

impl ParserConfig {
    /// Default configuration: every built-in algorithm except `none`, zero skew
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept only these `alg`/`enc` identifiers
    #[must_use]
    pub fn with_allowed_algorithms<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.resolver = self.resolver.with_allowed(ids);
        self
    }

    /// Accept unsecured (`alg: none`) tokens
    #[must_use]
    pub fn with_unsecured(mut self, allow: bool) -> Self {
        self.resolver = self.resolver.with_unsecured(allow);
        self
    }

    /// Tolerance applied to `exp` and `nbf` checks
    ///
    /// # Errors
    /// Returns `JoseError::Configuration` for a negative skew
    pub fn with_clock_skew(mut self, skew: Duration) -> JoseResult<Self> {
        if skew < Duration::zero() {
            return Err(JoseError::configuration(format!(
                "clock skew must not be negative, got {}s",
                skew.num_seconds()
            )));
        }
        self.clock_skew = skew;
        Ok(self)
    }

    /// Add or replace a signature algorithm
    #[must_use]
    pub fn with_signature_algorithm(mut self, algorithm: Arc<dyn SignatureAlgorithm>) -> Self {
        let registries = self.resolver.registries().clone().with_signature(algorithm);
        self.resolver = self.resolver.with_registries(registries);
        self
    }

    /// Add or replace a key management algorithm
    #[must_use]
    pub fn with_key_management_algorithm(
        mut self,
        algorithm: Arc<dyn KeyManagementAlgorithm>,
    ) -> Self {
        let registries = self.resolver.registries().clone().with_key_management(algorithm);
        self.resolver = self.resolver.with_registries(registries);
        self
    }

    /// Add or replace a content encryption algorithm
    #[must_use]
    pub fn with_encryption_algorithm(
        mut self,
        algorithm: Arc<dyn ContentEncryptionAlgorithm>,
    ) -> Self {
        let registries = self.resolver.registries().clone().with_encryption(algorithm);
        self.resolver = self.resolver.with_registries(registries);
        self
    }

    /// Add or replace a compression codec
    #[must_use]
    pub fn with_compression_algorithm(mut self, codec: Arc<dyn CompressionAlgorithm>) -> Self {
        let registries = self.resolver.registries().clone().with_compression(codec);
        self.resolver = self.resolver.with_registries(registries);
        self
    }

    /// Understand the critical header parameter `name`
    #[must_use]
    pub fn with_critical_handler<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Header, &FieldValue) -> JoseResult<()> + Send + Sync + 'static,
    {
        self.resolver = self.resolver.with_critical_handler(name, handler);
        self
    }

    /// Require claim `id` to equal `expected` (membership for `aud`)
    #[must_use]
    pub fn require(mut self, id: impl Into<String>, expected: impl Into<FieldValue>) -> Self {
        self.expectations
            .push(ClaimExpectation::Equals(id.into(), expected.into()));
        self
    }

    /// Require claim `id` to be present
    #[must_use]
    pub fn require_present(mut self, id: impl Into<String>) -> Self {
        self.expectations.push(ClaimExpectation::Present(id.into()));
        self
    }

    /// Bound on decompressed payload size in bytes
    #[must_use]
    pub fn with_max_decompressed_size(mut self, limit: usize) -> Self {
        self.max_decompressed_size = limit;
        self
    }

    /// JSON deserializer for headers and claims
    #[must_use]
    pub fn with_deserializer(mut self, deserializer: Arc<dyn JsonDeserializer>) -> Self {
        self.deserializer = deserializer;
        self
    }

    /// Key locator consulted when no explicit key is supplied
    #[must_use]
    pub fn with_key_locator(mut self, locator: Arc<dyn KeyLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Clock for temporal validation
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Algorithm resolver built from this configuration
    #[must_use]
    pub fn resolver(&self) -> &AlgorithmResolver {
        &self.resolver
    }

    /// Allowed clock skew
    #[must_use]
    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    /// Claim expectations in registration order
    #[must_use]
    pub fn expectations(&self) -> &[ClaimExpectation] {
        &self.expectations
    }
}

impl fmt::Debug for ParserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserConfig")
            .field("resolver", &self.resolver)
            .field("clock_skew", &self.clock_skew)
            .field("expectations", &self.expectations)
            .field("max_decompressed_size", &self.max_decompressed_size)
            .field("deserializer", &self.deserializer)
            .field("locator", &self.locator.is_some())
            .field("clock", &self.clock)
            .finish()
    }
}

/// Settings for [`CompactBuilder`](super::CompactBuilder)
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    pub(crate) registries: AlgorithmRegistries,
    pub(crate) serializer: Arc<dyn JsonSerializer>,
    pub(crate) default_type: Option<String>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            registries: AlgorithmRegistries::default(),
            serializer: Arc::new(SerdeJson),
            default_type: None,
        }
    }
}

impl BuilderConfig {
    /// Default configuration over the built-in algorithms
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON serializer for headers and claims
    #[must_use]
    pub fn with_serializer(mut self, serializer: Arc<dyn JsonSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    /// `typ` written when the header does not declare one
    #[must_use]
    pub fn with_default_type(mut self, typ: impl Into<String>) -> Self {
        self.default_type = Some(typ.into());
        self
    }

    /// Add or replace a signature algorithm
    #[must_use]
    pub fn with_signature_algorithm(mut self, algorithm: Arc<dyn SignatureAlgorithm>) -> Self {
        self.registries = self.registries.with_signature(algorithm);
        self
    }

    /// Add or replace a key management algorithm
    #[must_use]
    pub fn with_key_management_algorithm(
        mut self,
        algorithm: Arc<dyn KeyManagementAlgorithm>,
    ) -> Self {
        self.registries = self.registries.with_key_management(algorithm);
        self
    }

    /// Add or replace a content encryption algorithm
    #[must_use]
    pub fn with_encryption_algorithm(
        mut self,
        algorithm: Arc<dyn ContentEncryptionAlgorithm>,
    ) -> Self {
        self.registries = self.registries.with_encryption(algorithm);
        self
    }

    /// Add or replace a compression codec
    #[must_use]
    pub fn with_compression_algorithm(mut self, codec: Arc<dyn CompressionAlgorithm>) -> Self {
        self.registries = self.registries.with_compression(codec);
        self
    }

    /// Registries consulted when building
    #[must_use]
    pub fn registries(&self) -> &AlgorithmRegistries {
        &self.registries
    }
}
