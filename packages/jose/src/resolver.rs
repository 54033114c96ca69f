//! Header-to-algorithm resolution under the parser's security policy
//!
//! The resolver owns the algorithm registries a parser may use, the caller's allow-list,
//! the unsecured opt-in and the handlers for critical extension parameters. Every
//! decision fails closed: an identifier that is unknown, not allowed or not understood
//! aborts the parse.

use crate::algorithms::{
    COMPRESSION, CompressionAlgorithm, ContentEncryptionAlgorithm, ENCRYPTION, KEY_MANAGEMENT,
    KeyManagementAlgorithm, SIGNATURE, SignatureAlgorithm,
};
use crate::error::{JoseError, JoseResult};
use crate::header::{HEADER_SCHEMA, Header};
use crate::registry::Registry;
use crate::value::FieldValue;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Processes one critical extension parameter; an error rejects the token
pub type CriticalHandler = Arc<dyn Fn(&Header, &FieldValue) -> JoseResult<()> + Send + Sync>;

/// The algorithm registries available to a builder or parser
#[derive(Clone)]
pub struct AlgorithmRegistries {
    signatures: Registry<dyn SignatureAlgorithm>,
    key_management: Registry<dyn KeyManagementAlgorithm>,
    encryption: Registry<dyn ContentEncryptionAlgorithm>,
    compression: Registry<dyn CompressionAlgorithm>,
}

impl Default for AlgorithmRegistries {
    fn default() -> Self {
        Self {
            signatures: SIGNATURE.clone(),
            key_management: KEY_MANAGEMENT.clone(),
            encryption: ENCRYPTION.clone(),
            compression: COMPRESSION.clone(),
        }
    }
}

impl AlgorithmRegistries {
    /// Add or replace a signature algorithm
    #[must_use]
    pub fn with_signature(mut self, algorithm: Arc<dyn SignatureAlgorithm>) -> Self {
        self.signatures = self.signatures.with_entry(algorithm);
        self
    }

    /// Add or replace a key management algorithm
    #[must_use]
    pub fn with_key_management(mut self, algorithm: Arc<dyn KeyManagementAlgorithm>) -> Self {
        self.key_management = self.key_management.with_entry(algorithm);
        self
    }

    /// Add or replace a content encryption algorithm
    #[must_use]
    pub fn with_encryption(mut self, algorithm: Arc<dyn ContentEncryptionAlgorithm>) -> Self {
        self.encryption = self.encryption.with_entry(algorithm);
        self
    }

    /// Add or replace a compression codec
    #[must_use]
    pub fn with_compression(mut self, codec: Arc<dyn CompressionAlgorithm>) -> Self {
        self.compression = self.compression.with_entry(codec);
        self
    }

    /// Signature algorithms
    #[must_use]
    pub fn signatures(&self) -> &Registry<dyn SignatureAlgorithm> {
        &self.signatures
    }

    /// Key management algorithms
    #[must_use]
    pub fn key_management(&self) -> &Registry<dyn KeyManagementAlgorithm> {
        &self.key_management
    }

    /// Content encryption algorithms
    #[must_use]
    pub fn encryption(&self) -> &Registry<dyn ContentEncryptionAlgorithm> {
        &self.encryption
    }

    /// Compression codecs
    #[must_use]
    pub fn compression(&self) -> &Registry<dyn CompressionAlgorithm> {
        &self.compression
    }
}

impl fmt::Debug for AlgorithmRegistries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmRegistries")
            .field("signatures", &self.signatures)
            .field("key_management", &self.key_management)
            .field("encryption", &self.encryption)
            .field("compression", &self.compression)
            .finish()
    }
}

/// Resolves header-declared identifiers to algorithms, enforcing the parse policy
#[derive(Clone, Default)]
pub struct AlgorithmResolver {
    registries: AlgorithmRegistries,
    allowed: Option<HashSet<String>>,
    allow_unsecured: bool,
    critical: HashMap<String, CriticalHandler>,
}

impl AlgorithmResolver {
    /// Resolver over `registries` with the default policy: every registered algorithm
    /// except `none`, and no critical extensions understood
    #[must_use]
    pub fn new(registries: AlgorithmRegistries) -> Self {
        Self {
            registries,
            ..Self::default()
        }
    }

    /// Restrict `alg` and `enc` values to these identifiers (case-insensitive)
    #[must_use]
    pub fn with_allowed<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed = Some(
            ids.into_iter()
                .map(|id| id.as_ref().to_ascii_lowercase())
                .collect(),
        );
        self
    }

    /// Whether `alg: none` tokens are accepted
    #[must_use]
    pub fn with_unsecured(mut self, allow: bool) -> Self {
        self.allow_unsecured = allow;
        self
    }

    /// Understand the critical extension parameter `name`
    #[must_use]
    pub fn with_critical_handler<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Header, &FieldValue) -> JoseResult<()> + Send + Sync + 'static,
    {
        self.critical.insert(name.into(), Arc::new(handler));
        self
    }

    /// Replace the registries
    #[must_use]
    pub fn with_registries(mut self, registries: AlgorithmRegistries) -> Self {
        self.registries = registries;
        self
    }

    /// The registries this resolver consults
    #[must_use]
    pub fn registries(&self) -> &AlgorithmRegistries {
        &self.registries
    }

    /// Whether unsecured tokens are accepted
    #[must_use]
    pub fn allows_unsecured(&self) -> bool {
        self.allow_unsecured
    }

    fn check_allowed(&self, id: &str) -> JoseResult<()> {
        match &self.allowed {
            Some(allowed) if !allowed.contains(&id.to_ascii_lowercase()) => {
                tracing::warn!(algorithm = %id, "algorithm rejected by allow-list");
                Err(JoseError::unsupported_algorithm(format!(
                    "algorithm '{id}' is not allowed by this parser"
                )))
            }
            _ => Ok(()),
        }
    }

    /// Resolve the JWS signature algorithm named by `alg`
    ///
    /// # Errors
    /// - `JoseError::MalformedToken` if the header has no `alg`
    /// - `JoseError::UnsupportedAlgorithm` if `alg` is unknown or not allowed
    /// - `JoseError::Security` if `alg` is `none` and unsecured tokens are not enabled,
    ///   even when the allow-list names it
    pub fn resolve_signature(&self, header: &Header) -> JoseResult<Arc<dyn SignatureAlgorithm>> {
        let id = required_param(header.algorithm(), "alg")?;
        let algorithm = self.registries.signatures.find(id)?;
        self.check_allowed(id)?;
        if algorithm.is_unsecured() && !self.allow_unsecured {
            tracing::warn!("unsecured token rejected");
            return Err(JoseError::security(
                "unsecured tokens (alg 'none') are not allowed",
            ));
        }
        tracing::debug!(algorithm = algorithm.id(), "resolved signature algorithm");
        Ok(Arc::clone(algorithm))
    }

    /// Resolve the JWE key management algorithm named by `alg`
    ///
    /// # Errors
    /// - `JoseError::MalformedToken` if the header has no `alg`
    /// - `JoseError::UnsupportedAlgorithm` if `alg` is unknown or not allowed
    pub fn resolve_key_management(
        &self,
        header: &Header,
    ) -> JoseResult<Arc<dyn KeyManagementAlgorithm>> {
        let id = required_param(header.algorithm(), "alg")?;
        let algorithm = self.registries.key_management.find(id)?;
        self.check_allowed(id)?;
        tracing::debug!(algorithm = algorithm.id(), "resolved key management algorithm");
        Ok(Arc::clone(algorithm))
    }

    /// Resolve the JWE content encryption algorithm named by `enc`
    ///
    /// # Errors
    /// - `JoseError::MalformedToken` if the header has no `enc`
    /// - `JoseError::UnsupportedAlgorithm` if `enc` is unknown or not allowed
    pub fn resolve_encryption(
        &self,
        header: &Header,
    ) -> JoseResult<Arc<dyn ContentEncryptionAlgorithm>> {
        let id = required_param(header.encryption(), "enc")?;
        let algorithm = self.registries.encryption.find(id)?;
        self.check_allowed(id)?;
        tracing::debug!(algorithm = algorithm.id(), "resolved content encryption algorithm");
        Ok(Arc::clone(algorithm))
    }

    /// Resolve the codec named by `zip`; `None` when the payload is not compressed
    ///
    /// # Errors
    /// Returns `JoseError::Compression` if `zip` names no registered codec
    pub fn resolve_compression(
        &self,
        header: &Header,
    ) -> JoseResult<Option<Arc<dyn CompressionAlgorithm>>> {
        let Some(id) = header.compression() else {
            return Ok(None);
        };
        match self.registries.compression.get(id) {
            Some(codec) => {
                tracing::debug!(codec = codec.id(), "resolved compression codec");
                Ok(Some(Arc::clone(codec)))
            }
            None => Err(JoseError::compression(format!(
                "unsupported compression algorithm '{id}'"
            ))),
        }
    }

    /// Enforce the `crit` header parameter
    ///
    /// Every listed name must be an extension (not a registered header parameter),
    /// present in the header and understood by a registered handler. Each handler runs
    /// against the parameter's value.
    ///
    /// # Errors
    /// Returns `JoseError::Security` on any violation, or the handler's own error
    pub fn check_critical(&self, header: &Header) -> JoseResult<()> {
        let Some(names) = header.critical() else {
            return Ok(());
        };
        if names.is_empty() {
            return Err(JoseError::security("'crit' header parameter must not be empty"));
        }
        for name in names {
            if HEADER_SCHEMA.contains(name) {
                return Err(JoseError::security(format!(
                    "'crit' must not list registered header parameter '{name}'"
                )));
            }
            let Some(value) = header.get(name) else {
                return Err(JoseError::security(format!(
                    "critical header parameter '{name}' is missing"
                )));
            };
            let Some(handler) = self.critical.get(name) else {
                tracing::warn!(parameter = %name, "unrecognized critical header parameter");
                return Err(JoseError::security(format!(
                    "critical header parameter '{name}' is not understood"
                )));
            };
            handler(header, value)?;
        }
        Ok(())
    }
}

impl fmt::Debug for AlgorithmResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmResolver")
            .field("registries", &self.registries)
            .field("allowed", &self.allowed)
            .field("allow_unsecured", &self.allow_unsecured)
            .field("critical", &self.critical.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn required_param<'h>(value: Option<&'h str>, name: &str) -> JoseResult<&'h str> {
    value.ok_or_else(|| JoseError::malformed(format!("header does not declare '{name}'")))
}
