//! JWE content encryption algorithms (AES-GCM)

use crate::error::{JoseError, JoseResult};
use crate::registry::{Identifiable, Registry};
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::generic_array::typenum::Unsigned;
use aes_gcm::aead::{AeadCore, AeadInPlace, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use once_cell::sync::Lazy;
use rand::RngCore;
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Output of an authenticated encryption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedContent {
    /// Initialization vector
    pub iv: Vec<u8>,
    /// Ciphertext, same length as the plaintext
    pub ciphertext: Vec<u8>,
    /// Authentication tag
    pub tag: Vec<u8>,
}

/// A JWE content encryption algorithm (`enc`)
pub trait ContentEncryptionAlgorithm: Identifiable + Send + Sync + fmt::Debug {
    /// Content encryption key length in bytes
    fn key_len(&self) -> usize;

    /// Encrypt `plaintext` under `cek`, authenticating `aad`
    ///
    /// # Errors
    /// Returns `JoseError::InvalidKey` if `cek` has the wrong length
    fn encrypt(&self, cek: &[u8], plaintext: &[u8], aad: &[u8]) -> JoseResult<SealedContent>;

    /// Decrypt and authenticate
    ///
    /// # Errors
    /// Returns the opaque invalid-token error on any failure
    fn decrypt(
        &self,
        cek: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
        aad: &[u8],
    ) -> JoseResult<Vec<u8>>;

    /// Fresh random content encryption key
    fn generate_cek(&self) -> Zeroizing<Vec<u8>> {
        let mut cek = Zeroizing::new(vec![0u8; self.key_len()]);
        rand::rng().fill_bytes(&mut cek);
        cek
    }
}

pub(crate) fn seal<C>(key: &[u8], plaintext: &[u8], aad: &[u8]) -> JoseResult<SealedContent>
where
    C: KeyInit + AeadInPlace,
{
    let cipher = C::new_from_slice(key).map_err(|_| {
        JoseError::invalid_key(format!(
            "AES-GCM key must be {} bytes, got {}",
            C::KeySize::USIZE,
            key.len()
        ))
    })?;

    let mut iv = vec![0u8; <C as AeadCore>::NonceSize::USIZE];
    rand::rng().fill_bytes(&mut iv);

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(&iv), aad, &mut buffer)
        .map_err(|_| JoseError::invalid_key("AES-GCM encryption failed"))?;

    Ok(SealedContent {
        iv,
        ciphertext: buffer,
        tag: tag.to_vec(),
    })
}

pub(crate) fn open<C>(
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    aad: &[u8],
) -> JoseResult<Vec<u8>>
where
    C: KeyInit + AeadInPlace,
{
    if iv.len() != <C as AeadCore>::NonceSize::USIZE || tag.len() != <C as AeadCore>::TagSize::USIZE
    {
        return Err(JoseError::invalid_token());
    }
    let cipher = C::new_from_slice(key).map_err(|_| JoseError::invalid_token())?;
    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(iv),
            aad,
            &mut buffer,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| JoseError::invalid_token())?;
    Ok(buffer)
}

#[derive(Debug, Clone, Copy)]
enum AesVariant {
    Aes128,
    Aes256,
}

/// AES in Galois/Counter Mode (`A128GCM`, `A256GCM`)
#[derive(Debug, Clone, Copy)]
pub struct AesGcmEncryption {
    id: &'static str,
    variant: AesVariant,
}

impl AesGcmEncryption {
    /// `A128GCM`
    pub const A128GCM: Self = Self {
        id: "A128GCM",
        variant: AesVariant::Aes128,
    };
    /// `A256GCM`
    pub const A256GCM: Self = Self {
        id: "A256GCM",
        variant: AesVariant::Aes256,
    };
}

impl Identifiable for AesGcmEncryption {
    fn id(&self) -> &str {
        self.id
    }
}

impl ContentEncryptionAlgorithm for AesGcmEncryption {
    fn key_len(&self) -> usize {
        match self.variant {
            AesVariant::Aes128 => 16,
            AesVariant::Aes256 => 32,
        }
    }

    fn encrypt(&self, cek: &[u8], plaintext: &[u8], aad: &[u8]) -> JoseResult<SealedContent> {
        match self.variant {
            AesVariant::Aes128 => seal::<Aes128Gcm>(cek, plaintext, aad),
            AesVariant::Aes256 => seal::<Aes256Gcm>(cek, plaintext, aad),
        }
    }

    fn decrypt(
        &self,
        cek: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
        aad: &[u8],
    ) -> JoseResult<Vec<u8>> {
        match self.variant {
            AesVariant::Aes128 => open::<Aes128Gcm>(cek, iv, ciphertext, tag, aad),
            AesVariant::Aes256 => open::<Aes256Gcm>(cek, iv, ciphertext, tag, aad),
        }
    }
}

/// Built-in content encryption algorithms
pub static ENCRYPTION: Lazy<Registry<dyn ContentEncryptionAlgorithm>> = Lazy::new(|| {
    Registry::from_unique(
        "JWE content encryption algorithm",
        vec![
            Arc::new(AesGcmEncryption::A128GCM) as Arc<dyn ContentEncryptionAlgorithm>,
            Arc::new(AesGcmEncryption::A256GCM),
        ],
    )
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a256gcm_round_trip_with_aad() {
        let enc = AesGcmEncryption::A256GCM;
        let cek = enc.generate_cek();
        assert_eq!(cek.len(), 32);

        let sealed = enc.encrypt(&cek, b"secret payload", b"header").unwrap();
        assert_eq!(sealed.iv.len(), 12);
        assert_eq!(sealed.tag.len(), 16);
        assert_eq!(sealed.ciphertext.len(), 14);

        let plain = enc
            .decrypt(&cek, &sealed.iv, &sealed.ciphertext, &sealed.tag, b"header")
            .unwrap();
        assert_eq!(plain, b"secret payload");
    }

    #[test]
    fn test_tampering_is_opaque_failure() {
        let enc = AesGcmEncryption::A128GCM;
        let cek = enc.generate_cek();
        let sealed = enc.encrypt(&cek, b"data", b"aad").unwrap();

        let wrong_aad = enc.decrypt(&cek, &sealed.iv, &sealed.ciphertext, &sealed.tag, b"aae");
        assert!(wrong_aad.unwrap_err().is_invalid_token());

        let short_tag = enc.decrypt(&cek, &sealed.iv, &sealed.ciphertext, &sealed.tag[..8], b"aad");
        assert!(short_tag.unwrap_err().is_invalid_token());

        let wrong_key = enc.decrypt(&[0; 32], &sealed.iv, &sealed.ciphertext, &sealed.tag, b"aad");
        assert!(wrong_key.unwrap_err().is_invalid_token());
    }

    #[test]
    fn test_wrong_cek_length_on_encrypt() {
        let result = AesGcmEncryption::A128GCM.encrypt(&[0; 32], b"x", b"");
        assert!(matches!(result, Err(JoseError::InvalidKey(_))));
    }
}
