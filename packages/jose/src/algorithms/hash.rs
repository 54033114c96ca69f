//! IANA hash algorithms with primary/fallback provider resolution
//!
//! SHA-2 digests come from the primary provider. SHA-3 digests are only available when
//! a secondary provider supplying them is installed. Which provider serves an entry is
//! decided on its first use and cached for the lifetime of the entry.

use crate::error::{JoseError, JoseResult};
use crate::registry::{Identifiable, Registry};
use digest::DynDigest;
use once_cell::sync::{Lazy, OnceCell};
use std::fmt;
use std::sync::Arc;

/// Source of digest contexts
pub trait HashProvider: Send + Sync + fmt::Debug {
    /// Provider name for diagnostics
    fn name(&self) -> &str;

    /// Acquire a fresh digest context for `id`, or `None` if this provider lacks it
    fn digest(&self, id: &str) -> Option<Box<dyn DynDigest>>;
}

/// SHA-2 family provider
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha2Provider;

impl HashProvider for Sha2Provider {
    fn name(&self) -> &str {
        "RustCrypto sha2"
    }

    fn digest(&self, id: &str) -> Option<Box<dyn DynDigest>> {
        match id.to_ascii_lowercase().as_str() {
            "sha-256" => Some(Box::new(sha2::Sha256::default())),
            "sha-384" => Some(Box::new(sha2::Sha384::default())),
            "sha-512" => Some(Box::new(sha2::Sha512::default())),
            _ => None,
        }
    }
}

/// SHA-3 family provider, installed as a fallback
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha3Provider;

impl HashProvider for Sha3Provider {
    fn name(&self) -> &str {
        "RustCrypto sha3"
    }

    fn digest(&self, id: &str) -> Option<Box<dyn DynDigest>> {
        match id.to_ascii_lowercase().as_str() {
            "sha3-256" => Some(Box::new(sha3::Sha3_256::default())),
            "sha3-384" => Some(Box::new(sha3::Sha3_384::default())),
            "sha3-512" => Some(Box::new(sha3::Sha3_512::default())),
            _ => None,
        }
    }
}

/// A message digest registered under an IANA hash name
pub trait HashAlgorithm: Identifiable + Send + Sync + fmt::Debug {
    /// Digest `data`
    ///
    /// # Errors
    /// Returns `JoseError::UnsupportedAlgorithm` if no provider supplies this algorithm
    fn digest(&self, data: &[u8]) -> JoseResult<Vec<u8>>;
}

/// Hash algorithm served by a primary provider with an optional fallback
pub struct ProvidedHashAlgorithm {
    id: String,
    primary: Arc<dyn HashProvider>,
    fallback: Option<Arc<dyn HashProvider>>,
    resolved: OnceCell<Option<Arc<dyn HashProvider>>>,
}

impl ProvidedHashAlgorithm {
    /// Create an entry served by `primary`, then `fallback`
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        primary: Arc<dyn HashProvider>,
        fallback: Option<Arc<dyn HashProvider>>,
    ) -> Self {
        Self {
            id: id.into(),
            primary,
            fallback,
            resolved: OnceCell::new(),
        }
    }

    fn provider(&self) -> JoseResult<&Arc<dyn HashProvider>> {
        let resolved = self.resolved.get_or_init(|| {
            if self.primary.digest(&self.id).is_some() {
                return Some(Arc::clone(&self.primary));
            }
            match &self.fallback {
                Some(fallback) if fallback.digest(&self.id).is_some() => {
                    tracing::debug!(
                        algorithm = %self.id,
                        provider = fallback.name(),
                        "hash algorithm served by fallback provider"
                    );
                    Some(Arc::clone(fallback))
                }
                _ => None,
            }
        });
        resolved.as_ref().ok_or_else(|| {
            JoseError::unsupported_algorithm(format!(
                "hash algorithm '{}' is not available from any installed provider",
                self.id
            ))
        })
    }
}

impl Identifiable for ProvidedHashAlgorithm {
    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for ProvidedHashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvidedHashAlgorithm")
            .field("id", &self.id)
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.as_ref().map(|p| p.name().to_string()))
            .finish_non_exhaustive()
    }
}

impl HashAlgorithm for ProvidedHashAlgorithm {
    fn digest(&self, data: &[u8]) -> JoseResult<Vec<u8>> {
        let provider = self.provider()?;
        let mut context = provider.digest(&self.id).ok_or_else(|| {
            JoseError::unsupported_algorithm(format!(
                "provider {} no longer supplies '{}'",
                provider.name(),
                self.id
            ))
        })?;
        context.update(data);
        Ok(context.finalize().into_vec())
    }
}

/// Standard hash registry; SHA-3 entries resolve only through `fallback`
#[must_use]
pub fn standard_hash_algorithms(
    fallback: Option<Arc<dyn HashProvider>>,
) -> Registry<dyn HashAlgorithm> {
    let primary: Arc<dyn HashProvider> = Arc::new(Sha2Provider);
    let sha2 = ["sha-256", "sha-384", "sha-512"]
        .into_iter()
        .map(|id| ProvidedHashAlgorithm::new(id, Arc::clone(&primary), None));
    let sha3 = ["sha3-256", "sha3-384", "sha3-512"]
        .into_iter()
        .map(|id| ProvidedHashAlgorithm::new(id, Arc::clone(&primary), fallback.clone()));
    let entries: Vec<Arc<dyn HashAlgorithm>> = sha2
        .chain(sha3)
        .map(|alg| Arc::new(alg) as Arc<dyn HashAlgorithm>)
        .collect();
    Registry::from_unique("IANA hash algorithm", entries)
}

/// Process-wide hash registry with the SHA-3 fallback provider installed
pub static HASH: Lazy<Registry<dyn HashAlgorithm>> =
    Lazy::new(|| standard_hash_algorithms(Some(Arc::new(Sha3Provider))));

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_sha256_known_vector() {
        let digest = HASH.find("SHA-256").unwrap().digest(b"abc").unwrap();
        assert_eq!(
            digest,
            hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn test_sha3_requires_fallback_provider() {
        let without = standard_hash_algorithms(None);
        let err = without.find("sha3-256").unwrap().digest(b"abc").unwrap_err();
        assert!(matches!(err, JoseError::UnsupportedAlgorithm(_)));

        let with = standard_hash_algorithms(Some(Arc::new(Sha3Provider)));
        let digest = with.find("sha3-256").unwrap().digest(b"abc").unwrap();
        assert_eq!(
            digest,
            hex!("3a985da74fe225b2045c172d6bd390bd855f086e3e9d525b46bfe24511431532")
        );
    }

    #[test]
    fn test_registration_order() {
        let ids: Vec<_> = HASH.ids().collect();
        assert_eq!(
            ids,
            vec!["sha-256", "sha-384", "sha-512", "sha3-256", "sha3-384", "sha3-512"]
        );
    }
}
