//! Payload compression codecs for the `zip` header parameter

use crate::error::{JoseError, JoseResult};
use crate::registry::{Identifiable, Registry};
use flate2::Compression;
use flate2::read::{DeflateDecoder, DeflateEncoder, GzDecoder, GzEncoder};
use once_cell::sync::Lazy;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

/// A payload compression codec
pub trait CompressionAlgorithm: Identifiable + Send + Sync + fmt::Debug {
    /// Compress `data`
    ///
    /// # Errors
    /// Returns `JoseError::Compression` if the encoder fails
    fn compress(&self, data: &[u8]) -> JoseResult<Vec<u8>>;

    /// Decompress `data`, producing at most `limit` bytes
    ///
    /// # Errors
    /// Returns `JoseError::Compression` if the data is corrupt or inflates past `limit`
    fn decompress(&self, data: &[u8], limit: usize) -> JoseResult<Vec<u8>>;
}

fn read_all(mut reader: impl Read, codec: &str) -> JoseResult<Vec<u8>> {
    let mut out = Vec::new();
    reader
        .read_to_end(&mut out)
        .map_err(|e| JoseError::compression(format!("{codec} compression failed: {e}")))?;
    Ok(out)
}

fn read_bounded(reader: impl Read, limit: usize, codec: &str) -> JoseResult<Vec<u8>> {
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    let mut out = Vec::new();
    reader
        .take(cap)
        .read_to_end(&mut out)
        .map_err(|e| JoseError::compression(format!("{codec} decompression failed: {e}")))?;
    if out.len() > limit {
        return Err(JoseError::compression(format!(
            "{codec} payload inflates beyond the {limit}-byte limit"
        )));
    }
    Ok(out)
}

/// Raw DEFLATE, RFC 1951 (`DEF`)
#[derive(Debug, Clone, Copy, Default)]
pub struct Deflate;

impl Identifiable for Deflate {
    fn id(&self) -> &str {
        "DEF"
    }
}

impl CompressionAlgorithm for Deflate {
    fn compress(&self, data: &[u8]) -> JoseResult<Vec<u8>> {
        read_all(DeflateEncoder::new(data, Compression::default()), "DEF")
    }

    fn decompress(&self, data: &[u8], limit: usize) -> JoseResult<Vec<u8>> {
        read_bounded(DeflateDecoder::new(data), limit, "DEF")
    }
}

/// Gzip (`GZIP`)
#[derive(Debug, Clone, Copy, Default)]
pub struct Gzip;

impl Identifiable for Gzip {
    fn id(&self) -> &str {
        "GZIP"
    }
}

impl CompressionAlgorithm for Gzip {
    fn compress(&self, data: &[u8]) -> JoseResult<Vec<u8>> {
        read_all(GzEncoder::new(data, Compression::default()), "GZIP")
    }

    fn decompress(&self, data: &[u8], limit: usize) -> JoseResult<Vec<u8>> {
        read_bounded(GzDecoder::new(data), limit, "GZIP")
    }
}

/// Built-in compression codecs; `DEF` is first and therefore the default
pub static COMPRESSION: Lazy<Registry<dyn CompressionAlgorithm>> = Lazy::new(|| {
    Registry::from_unique(
        "compression algorithm",
        vec![
            Arc::new(Deflate) as Arc<dyn CompressionAlgorithm>,
            Arc::new(Gzip),
        ],
    )
});
