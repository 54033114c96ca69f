//! Key material and key location
//!
//! Contains the key container handed to algorithms, HMAC strength validation and the
//! locator contract consulted when a parse call supplies no explicit key.

use crate::error::{JoseError, JoseResult};
use crate::header::Header;
use std::collections::HashMap;
use std::fmt;
use zeroize::Zeroizing;

/// Key material for signing, verification and key management
///
/// Private and secret bytes are zeroized on drop.
#[derive(Clone)]
pub enum Key {
    /// Symmetric secret (HMAC, `dir`, AES key wrap)
    Secret(Zeroizing<Vec<u8>>),
    /// Elliptic curve private key: raw scalar or PKCS#8 PEM
    EcPrivate(Zeroizing<Vec<u8>>),
    /// Elliptic curve public key: SEC1 point or SPKI PEM
    EcPublic(Vec<u8>),
}

impl Key {
    /// Symmetric secret
    #[must_use]
    pub fn secret(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Secret(Zeroizing::new(bytes.into()))
    }

    /// Elliptic curve private key
    #[must_use]
    pub fn ec_private(bytes: impl Into<Vec<u8>>) -> Self {
        Self::EcPrivate(Zeroizing::new(bytes.into()))
    }

    /// Elliptic curve public key
    #[must_use]
    pub fn ec_public(bytes: impl Into<Vec<u8>>) -> Self {
        Self::EcPublic(bytes.into())
    }

    /// Key kind name used in error messages
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Secret(_) => "secret",
            Self::EcPrivate(_) => "EC private",
            Self::EcPublic(_) => "EC public",
        }
    }

    /// Borrow the secret bytes, or fail for asymmetric keys
    ///
    /// # Errors
    /// Returns `JoseError::InvalidKey` if this is not a symmetric secret
    pub fn as_secret(&self, algorithm: &str) -> JoseResult<&[u8]> {
        match self {
            Self::Secret(bytes) => Ok(bytes),
            other => Err(JoseError::invalid_key(format!(
                "{algorithm} requires a secret key, got {} key",
                other.kind_name()
            ))),
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EcPublic(bytes) => f.debug_tuple("EcPublic").field(&bytes.len()).finish(),
            other => write!(f, "{}([redacted])", other.kind_name()),
        }
    }
}

/// Validate HMAC secret key length for security
pub(crate) fn validate_hmac_key(secret: &[u8], algorithm: &str, min_length: usize) -> JoseResult<()> {
    if secret.len() < min_length {
        return Err(JoseError::invalid_key(format!(
            "HMAC key for {algorithm} must be at least {min_length} bytes, got {}",
            secret.len()
        )));
    }
    Ok(())
}

/// Resolves key material from a token header
///
/// Consulted when a parse call supplies no explicit key. Returning `Ok(None)` means no
/// key is known for this header.
pub trait KeyLocator: Send + Sync {
    /// Locate the key for `header`, typically by `kid`, `alg` or `enc`
    ///
    /// # Errors
    /// Implementations may fail if the lookup itself fails
    fn locate(&self, header: &Header) -> JoseResult<Option<Key>>;
}

impl<F> KeyLocator for F
where
    F: Fn(&Header) -> JoseResult<Option<Key>> + Send + Sync,
{
    fn locate(&self, header: &Header) -> JoseResult<Option<Key>> {
        self(header)
    }
}

/// Locator over a fixed `kid` table with an optional fallback key
#[derive(Debug, Clone, Default)]
pub struct StaticKeyLocator {
    keys: HashMap<String, Key>,
    fallback: Option<Key>,
}

impl StaticKeyLocator {
    /// Create an empty locator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key under `kid`
    #[must_use]
    pub fn with_key(mut self, kid: impl Into<String>, key: Key) -> Self {
        self.keys.insert(kid.into(), key);
        self
    }

    /// Key used for headers without a registered `kid`
    #[must_use]
    pub fn with_fallback(mut self, key: Key) -> Self {
        self.fallback = Some(key);
        self
    }
}

impl KeyLocator for StaticKeyLocator {
    fn locate(&self, header: &Header) -> JoseResult<Option<Key>> {
        let by_kid = header.key_id().and_then(|kid| self.keys.get(kid));
        Ok(by_kid.or(self.fallback.as_ref()).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", Key::secret(b"top-secret".to_vec()));
        assert!(!rendered.contains("top"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn test_static_locator_prefers_kid() {
        let locator = StaticKeyLocator::new()
            .with_key("k1", Key::secret(vec![1; 32]))
            .with_fallback(Key::secret(vec![2; 32]));

        let found = locator.locate(&Header::new().with_key_id("k1")).unwrap().unwrap();
        assert_eq!(found.as_secret("HS256").unwrap(), &[1; 32][..]);

        let found = locator.locate(&Header::new().with_key_id("other")).unwrap().unwrap();
        assert_eq!(found.as_secret("HS256").unwrap(), &[2; 32][..]);
    }

    #[test]
    fn test_hmac_key_minimum_length() {
        assert!(validate_hmac_key(&[0; 31], "HS256", 32).is_err());
        assert!(validate_hmac_key(&[0; 32], "HS256", 32).is_ok());
    }
}
