//! JWS signature algorithms: HMAC, ECDSA and the unsecured `none`
//!
//! ECDSA signatures use the fixed-width `r || s` encoding of RFC 7518 §3.4, not DER.

use crate::error::{JoseError, JoseResult};
use crate::key::{Key, validate_hmac_key};
use crate::registry::{Identifiable, Registry};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use once_cell::sync::Lazy;
use sha2::{Sha256, Sha384, Sha512};
use std::fmt;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Identifier of the unsecured signature algorithm
pub const NONE: &str = "none";

/// A JWS signature algorithm
pub trait SignatureAlgorithm: Identifiable + Send + Sync + fmt::Debug {
    /// Whether this algorithm produces no integrity protection at all
    fn is_unsecured(&self) -> bool {
        false
    }

    /// Sign the JWS signing input (`header.payload` as ASCII)
    ///
    /// # Errors
    /// Returns `JoseError::InvalidKey` if the key has the wrong kind or strength
    fn sign(&self, key: &Key, signing_input: &[u8]) -> JoseResult<Vec<u8>>;

    /// Check a signature over the signing input
    ///
    /// A malformed signature is a mismatch (`Ok(false)`), not an error.
    ///
    /// # Errors
    /// Returns `JoseError::InvalidKey` if the key has the wrong kind or strength
    fn verify(&self, key: &Key, signing_input: &[u8], signature: &[u8]) -> JoseResult<bool>;
}

#[derive(Debug, Clone, Copy)]
enum HmacHash {
    Sha256,
    Sha384,
    Sha512,
}

/// HMAC with SHA-2 (`HS256`, `HS384`, `HS512`)
#[derive(Debug, Clone, Copy)]
pub struct HmacAlgorithm {
    id: &'static str,
    hash: HmacHash,
    min_key_len: usize,
}

impl HmacAlgorithm {
    /// `HS256`
    pub const HS256: Self = Self {
        id: "HS256",
        hash: HmacHash::Sha256,
        min_key_len: 32,
    };
    /// `HS384`
    pub const HS384: Self = Self {
        id: "HS384",
        hash: HmacHash::Sha384,
        min_key_len: 48,
    };
    /// `HS512`
    pub const HS512: Self = Self {
        id: "HS512",
        hash: HmacHash::Sha512,
        min_key_len: 64,
    };

    /// Minimum secret length in bytes (the hash output size)
    #[must_use]
    pub fn min_key_len(&self) -> usize {
        self.min_key_len
    }

    fn tag(&self, key: &Key, data: &[u8]) -> JoseResult<Vec<u8>> {
        let secret = key.as_secret(self.id)?;
        validate_hmac_key(secret, self.id, self.min_key_len)?;
        match self.hash {
            HmacHash::Sha256 => mac::<Hmac<Sha256>>(secret, data),
            HmacHash::Sha384 => mac::<Hmac<Sha384>>(secret, data),
            HmacHash::Sha512 => mac::<Hmac<Sha512>>(secret, data),
        }
    }
}

fn mac<M: Mac + KeyInit>(secret: &[u8], data: &[u8]) -> JoseResult<Vec<u8>> {
    let mut mac = <M as KeyInit>::new_from_slice(secret)
        .map_err(|_| JoseError::invalid_key("Invalid HMAC key"))?;
    Mac::update(&mut mac, data);
    Ok(mac.finalize().into_bytes().to_vec())
}

impl Identifiable for HmacAlgorithm {
    fn id(&self) -> &str {
        self.id
    }
}

impl SignatureAlgorithm for HmacAlgorithm {
    fn sign(&self, key: &Key, signing_input: &[u8]) -> JoseResult<Vec<u8>> {
        self.tag(key, signing_input)
    }

    fn verify(&self, key: &Key, signing_input: &[u8], signature: &[u8]) -> JoseResult<bool> {
        let expected = self.tag(key, signing_input)?;
        Ok(expected.ct_eq(signature).into())
    }
}

macro_rules! ecdsa_algorithm {
    ($(#[$doc:meta])* $name:ident, $id:literal, $curve:ident, $scalar_len:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl $name {
            fn signing_key(key: &Key) -> JoseResult<$curve::ecdsa::SigningKey> {
                use $curve::pkcs8::DecodePrivateKey;

                let Key::EcPrivate(bytes) = key else {
                    return Err(JoseError::invalid_key(format!(
                        "{} signing requires an EC private key, got {} key",
                        $id,
                        key.kind_name()
                    )));
                };
                if bytes.starts_with(b"-----BEGIN") {
                    let pem = std::str::from_utf8(bytes)
                        .map_err(|_| JoseError::invalid_key("Invalid UTF-8 in private key"))?;
                    return $curve::ecdsa::SigningKey::from_pkcs8_pem(pem)
                        .map_err(|_| JoseError::invalid_key("Invalid PKCS8 PEM private key"));
                }
                if bytes.len() != $scalar_len {
                    return Err(JoseError::invalid_key(format!(
                        "Private key must be {} bytes for {}",
                        $scalar_len, $id
                    )));
                }
                $curve::ecdsa::SigningKey::from_slice(bytes)
                    .map_err(|_| JoseError::invalid_key(format!("Invalid {} private key bytes", $id)))
            }

            fn verifying_key(key: &Key) -> JoseResult<$curve::ecdsa::VerifyingKey> {
                use $curve::pkcs8::DecodePublicKey;

                match key {
                    Key::EcPublic(bytes) if bytes.starts_with(b"-----BEGIN") => {
                        let pem = std::str::from_utf8(bytes)
                            .map_err(|_| JoseError::invalid_key("Invalid UTF-8 in public key"))?;
                        $curve::ecdsa::VerifyingKey::from_public_key_pem(pem)
                            .map_err(|_| JoseError::invalid_key("Invalid SPKI PEM public key"))
                    }
                    Key::EcPublic(bytes) => $curve::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
                        .map_err(|_| JoseError::invalid_key(format!("Invalid {} public key", $id))),
                    Key::EcPrivate(_) => Ok(Self::signing_key(key)?.verifying_key().clone()),
                    Key::Secret(_) => Err(JoseError::invalid_key(format!(
                        "{} verification requires an EC key, got secret key",
                        $id
                    ))),
                }
            }
        }

        impl Identifiable for $name {
            fn id(&self) -> &str {
                $id
            }
        }

        impl SignatureAlgorithm for $name {
            fn sign(&self, key: &Key, signing_input: &[u8]) -> JoseResult<Vec<u8>> {
                use $curve::ecdsa::signature::Signer;

                let signature: $curve::ecdsa::Signature =
                    Self::signing_key(key)?.sign(signing_input);
                Ok(signature.to_bytes().to_vec())
            }

            fn verify(&self, key: &Key, signing_input: &[u8], signature: &[u8]) -> JoseResult<bool> {
                use $curve::ecdsa::signature::Verifier;

                let verifying_key = Self::verifying_key(key)?;
                let Ok(signature) = $curve::ecdsa::Signature::from_slice(signature) else {
                    return Ok(false);
                };
                Ok(verifying_key.verify(signing_input, &signature).is_ok())
            }
        }
    };
}

ecdsa_algorithm!(
    /// ECDSA over P-256 with SHA-256 (`ES256`)
    Es256,
    "ES256",
    p256,
    32
);

ecdsa_algorithm!(
    /// ECDSA over P-384 with SHA-384 (`ES384`)
    Es384,
    "ES384",
    p384,
    48
);

/// Unsecured JWS (`none`): an empty signature and no integrity protection
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneAlgorithm;

impl Identifiable for NoneAlgorithm {
    fn id(&self) -> &str {
        NONE
    }
}

impl SignatureAlgorithm for NoneAlgorithm {
    fn is_unsecured(&self) -> bool {
        true
    }

    fn sign(&self, _key: &Key, _signing_input: &[u8]) -> JoseResult<Vec<u8>> {
        Ok(Vec::new())
    }

    fn verify(&self, _key: &Key, _signing_input: &[u8], signature: &[u8]) -> JoseResult<bool> {
        Ok(signature.is_empty())
    }
}

/// Built-in JWS signature algorithms
pub static SIGNATURE: Lazy<Registry<dyn SignatureAlgorithm>> = Lazy::new(|| {
    Registry::from_unique(
        "JWS signature algorithm",
        vec![
            Arc::new(HmacAlgorithm::HS256) as Arc<dyn SignatureAlgorithm>,
            Arc::new(HmacAlgorithm::HS384),
            Arc::new(HmacAlgorithm::HS512),
            Arc::new(Es256),
            Arc::new(Es384),
            Arc::new(NoneAlgorithm),
        ],
    )
});

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_hs256_sign_and_verify() {
        let key = Key::secret(*b"01234567890123456789012345678901");
        let tag = HmacAlgorithm::HS256.sign(&key, b"payload").unwrap();
        assert_eq!(tag.len(), 32);
        assert!(HmacAlgorithm::HS256.verify(&key, b"payload", &tag).unwrap());
        assert!(!HmacAlgorithm::HS256.verify(&key, b"payloae", &tag).unwrap());
        assert!(!HmacAlgorithm::HS256.verify(&key, b"payload", &tag[..31]).unwrap());
    }

    #[test]
    fn test_hs256_known_tag() {
        let key = Key::secret(vec![0x0b; 32]);
        let tag = HmacAlgorithm::HS256.sign(&key, b"Hi There").unwrap();
        assert_eq!(
            tag,
            hex!("198a607eb44bfbc69903a0f1cf2bbdc5ba0aa3f3d9ae3c1c7a3b1696a0b68cf7")
        );
    }

    #[test]
    fn test_hmac_rejects_short_and_asymmetric_keys() {
        let short = Key::secret(vec![0; 47]);
        assert!(matches!(
            HmacAlgorithm::HS384.sign(&short, b"x"),
            Err(JoseError::InvalidKey(_))
        ));
        let ec = Key::ec_public(vec![4; 65]);
        assert!(matches!(
            HmacAlgorithm::HS256.sign(&ec, b"x"),
            Err(JoseError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_es256_raw_signature_round_trip() {
        let private = Key::ec_private(vec![0x11; 32]);
        let signature = Es256.sign(&private, b"input").unwrap();
        assert_eq!(signature.len(), 64);

        let signing_key = p256::ecdsa::SigningKey::from_slice(&[0x11; 32]).unwrap();
        let public = Key::ec_public(
            signing_key
                .verifying_key()
                .to_encoded_point(false)
                .as_bytes()
                .to_vec(),
        );
        assert!(Es256.verify(&public, b"input", &signature).unwrap());
        assert!(!Es256.verify(&public, b"other", &signature).unwrap());
        assert!(!Es256.verify(&public, b"input", b"short").unwrap());
    }

    #[test]
    fn test_es384_signature_width() {
        let private = Key::ec_private(vec![0x22; 48]);
        let signature = Es384.sign(&private, b"input").unwrap();
        assert_eq!(signature.len(), 96);
        assert!(Es384.verify(&private, b"input", &signature).unwrap());
    }

    #[test]
    fn test_none_is_unsecured() {
        let key = Key::secret(Vec::new());
        assert!(NoneAlgorithm.is_unsecured());
        assert!(NoneAlgorithm.sign(&key, b"x").unwrap().is_empty());
        assert!(!NoneAlgorithm.verify(&key, b"x", b"sig").unwrap());
    }

    #[test]
    fn test_registry_contains_builtins() {
        for id in ["hs256", "HS384", "HS512", "ES256", "es384", "NONE"] {
            assert!(SIGNATURE.contains(id), "{id}");
        }
    }
}
