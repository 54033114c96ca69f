//! Built-in algorithm families and their process-wide registries
//!
//! Each family is a trait object registry keyed by the IANA identifier. The statics are
//! built on first access and never mutated; callers add or replace algorithms by
//! layering their own entries with [`Registry::with_overrides`](crate::Registry::with_overrides).

pub mod compression;
pub mod encryption;
pub mod hash;
pub mod key_management;
pub mod signature;

pub use compression::{COMPRESSION, CompressionAlgorithm, Deflate, Gzip};
pub use encryption::{AesGcmEncryption, ContentEncryptionAlgorithm, ENCRYPTION, SealedContent};
pub use hash::{
    HASH, HashAlgorithm, HashProvider, ProvidedHashAlgorithm, Sha2Provider, Sha3Provider,
    standard_hash_algorithms,
};
pub use key_management::{
    AesGcmKeyWrap, DirectKeyManagement, KEY_MANAGEMENT, KeyManagementAlgorithm, WrappedKey,
};
pub use signature::{Es256, Es384, HmacAlgorithm, NONE, NoneAlgorithm, SIGNATURE, SignatureAlgorithm};
