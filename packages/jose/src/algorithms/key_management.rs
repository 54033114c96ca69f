//! JWE key management algorithms: direct encryption and AES-GCM key wrap

use super::encryption::{ContentEncryptionAlgorithm, open, seal};
use crate::error::{JoseError, JoseResult};
use crate::header::Header;
use crate::key::Key;
use crate::registry::{Identifiable, Registry};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Content encryption key produced for a new token
pub struct WrappedKey {
    /// Content encryption key
    pub cek: Zeroizing<Vec<u8>>,
    /// JWE Encrypted Key segment, empty for direct encryption
    pub encrypted_key: Vec<u8>,
}

impl fmt::Debug for WrappedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedKey")
            .field("encrypted_key_len", &self.encrypted_key.len())
            .finish_non_exhaustive()
    }
}

/// A JWE key management algorithm (`alg`)
pub trait KeyManagementAlgorithm: Identifiable + Send + Sync + fmt::Debug {
    /// Produce the content encryption key for `enc`, recording any header parameters
    /// the recipient needs
    ///
    /// # Errors
    /// Returns `JoseError::InvalidKey` if the key has the wrong kind or length
    fn wrap(
        &self,
        key: &Key,
        enc: &dyn ContentEncryptionAlgorithm,
        header: &mut Header,
    ) -> JoseResult<WrappedKey>;

    /// Recover the content encryption key
    ///
    /// # Errors
    /// Returns the opaque invalid-token error if the key does not unwrap
    fn unwrap(
        &self,
        key: &Key,
        enc: &dyn ContentEncryptionAlgorithm,
        header: &Header,
        encrypted_key: &[u8],
    ) -> JoseResult<Zeroizing<Vec<u8>>>;
}

/// Direct use of a shared symmetric key as the CEK (`dir`)
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectKeyManagement;

impl Identifiable for DirectKeyManagement {
    fn id(&self) -> &str {
        "dir"
    }
}

impl KeyManagementAlgorithm for DirectKeyManagement {
    fn wrap(
        &self,
        key: &Key,
        enc: &dyn ContentEncryptionAlgorithm,
        _header: &mut Header,
    ) -> JoseResult<WrappedKey> {
        let secret = key.as_secret("dir")?;
        if secret.len() != enc.key_len() {
            return Err(JoseError::invalid_key(format!(
                "dir with {} requires a {}-byte key, got {}",
                enc.id(),
                enc.key_len(),
                secret.len()
            )));
        }
        Ok(WrappedKey {
            cek: Zeroizing::new(secret.to_vec()),
            encrypted_key: Vec::new(),
        })
    }

    fn unwrap(
        &self,
        key: &Key,
        enc: &dyn ContentEncryptionAlgorithm,
        _header: &Header,
        encrypted_key: &[u8],
    ) -> JoseResult<Zeroizing<Vec<u8>>> {
        let secret = key.as_secret("dir")?;
        if !encrypted_key.is_empty() || secret.len() != enc.key_len() {
            return Err(JoseError::invalid_token());
        }
        Ok(Zeroizing::new(secret.to_vec()))
    }
}

#[derive(Debug, Clone, Copy)]
enum KekSize {
    Aes128,
    Aes256,
}

/// AES-GCM key wrap (`A128GCMKW`, `A256GCMKW`)
///
/// Writes the `iv` and `tag` header parameters on wrap and reads them on unwrap.
#[derive(Debug, Clone, Copy)]
pub struct AesGcmKeyWrap {
    id: &'static str,
    kek: KekSize,
}

impl AesGcmKeyWrap {
    /// `A128GCMKW`
    pub const A128GCMKW: Self = Self {
        id: "A128GCMKW",
        kek: KekSize::Aes128,
    };
    /// `A256GCMKW`
    pub const A256GCMKW: Self = Self {
        id: "A256GCMKW",
        kek: KekSize::Aes256,
    };

    fn kek_len(&self) -> usize {
        match self.kek {
            KekSize::Aes128 => 16,
            KekSize::Aes256 => 32,
        }
    }
}

impl Identifiable for AesGcmKeyWrap {
    fn id(&self) -> &str {
        self.id
    }
}

impl KeyManagementAlgorithm for AesGcmKeyWrap {
    fn wrap(
        &self,
        key: &Key,
        enc: &dyn ContentEncryptionAlgorithm,
        header: &mut Header,
    ) -> JoseResult<WrappedKey> {
        let kek = key.as_secret(self.id)?;
        if kek.len() != self.kek_len() {
            return Err(JoseError::invalid_key(format!(
                "{} requires a {}-byte key, got {}",
                self.id,
                self.kek_len(),
                kek.len()
            )));
        }
        let cek = enc.generate_cek();
        let sealed = match self.kek {
            KekSize::Aes128 => seal::<Aes128Gcm>(kek, &cek, &[])?,
            KekSize::Aes256 => seal::<Aes256Gcm>(kek, &cek, &[])?,
        };
        header.set_key_wrap_params(sealed.iv, sealed.tag);
        Ok(WrappedKey {
            cek,
            encrypted_key: sealed.ciphertext,
        })
    }

    fn unwrap(
        &self,
        key: &Key,
        enc: &dyn ContentEncryptionAlgorithm,
        header: &Header,
        encrypted_key: &[u8],
    ) -> JoseResult<Zeroizing<Vec<u8>>> {
        let kek = key.as_secret(self.id)?;
        let (Some(iv), Some(tag)) = (header.initialization_vector(), header.authentication_tag())
        else {
            return Err(JoseError::malformed(format!(
                "{} requires 'iv' and 'tag' header parameters",
                self.id
            )));
        };
        let cek = Zeroizing::new(match self.kek {
            KekSize::Aes128 => open::<Aes128Gcm>(kek, iv, encrypted_key, tag, &[])?,
            KekSize::Aes256 => open::<Aes256Gcm>(kek, iv, encrypted_key, tag, &[])?,
        });
        if cek.len() != enc.key_len() {
            return Err(JoseError::invalid_token());
        }
        Ok(cek)
    }
}

/// Built-in key management algorithms
pub static KEY_MANAGEMENT: Lazy<Registry<dyn KeyManagementAlgorithm>> = Lazy::new(|| {
    Registry::from_unique(
        "JWE key management algorithm",
        vec![
            Arc::new(DirectKeyManagement) as Arc<dyn KeyManagementAlgorithm>,
            Arc::new(AesGcmKeyWrap::A128GCMKW),
            Arc::new(AesGcmKeyWrap::A256GCMKW),
        ],
    )
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::encryption::AesGcmEncryption;

    #[test]
    fn test_dir_requires_matching_key_length() {
        let enc = AesGcmEncryption::A128GCM;
        let mut header = Header::with_alg("dir");
        assert!(matches!(
            DirectKeyManagement.wrap(&Key::secret(vec![1; 32]), &enc, &mut header),
            Err(JoseError::InvalidKey(_))
        ));
        let wrapped = DirectKeyManagement
            .wrap(&Key::secret(vec![1; 16]), &enc, &mut header)
            .unwrap();
        assert!(wrapped.encrypted_key.is_empty());
        assert_eq!(wrapped.cek.as_slice(), &[1; 16]);
    }

    #[test]
    fn test_gcm_key_wrap_round_trip() {
        let enc = AesGcmEncryption::A256GCM;
        let kek = Key::secret(vec![7; 16]);
        let mut header = Header::with_alg("A128GCMKW");
        let wrapped = AesGcmKeyWrap::A128GCMKW.wrap(&kek, &enc, &mut header).unwrap();
        assert_eq!(header.initialization_vector().map(<[u8]>::len), Some(12));
        assert_eq!(header.authentication_tag().map(<[u8]>::len), Some(16));
        assert_eq!(wrapped.encrypted_key.len(), 32);

        let cek = AesGcmKeyWrap::A128GCMKW
            .unwrap(&kek, &enc, &header, &wrapped.encrypted_key)
            .unwrap();
        assert_eq!(cek, wrapped.cek);

        let other = Key::secret(vec![8; 16]);
        let err = AesGcmKeyWrap::A128GCMKW
            .unwrap(&other, &enc, &header, &wrapped.encrypted_key)
            .unwrap_err();
        assert!(err.is_invalid_token());
    }

    #[test]
    fn test_gcm_key_wrap_needs_header_params() {
        let enc = AesGcmEncryption::A128GCM;
        let err = AesGcmKeyWrap::A256GCMKW
            .unwrap(&Key::secret(vec![0; 32]), &enc, &Header::new(), &[0; 16])
            .unwrap_err();
        assert!(matches!(err, JoseError::MalformedToken(_)));
    }
}
