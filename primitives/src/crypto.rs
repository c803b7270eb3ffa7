//! Hashing for content-addressed data.
//!
//! Hash functions are consumed as opaque services through [`Hasher`]:
//! BLAKE3 is the default, SHA-256 is available for deployments that
//! bridge from a SHA-256 main chain.

use crate::codec::CanonicalEncode;
use crate::types::Hash;

/// A 32-byte hash function.
pub trait Hasher: Send + Sync {
    /// Hash arbitrary bytes.
    fn compute(&self, data: &[u8]) -> Hash;
}

/// BLAKE3 hasher.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

impl Hasher for Blake3Hasher {
    fn compute(&self, data: &[u8]) -> Hash {
        hash_blake3(data)
    }
}

/// SHA-256 hasher.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn compute(&self, data: &[u8]) -> Hash {
        hash_sha256(data)
    }
}

/// Compute BLAKE3 hash of the input data.
pub fn hash_blake3(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Compute SHA-256 hash of the input data.
pub fn hash_sha256(data: &[u8]) -> Hash {
    use sha2::Digest;
    let result = sha2::Sha256::digest(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Content hash of a value: the hasher applied to its canonical encoding.
pub fn calculate_hash<T: CanonicalEncode + ?Sized>(hasher: &dyn Hasher, value: &T) -> Hash {
    hasher.compute(&value.to_canonical_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::ResultTransaction;

    #[test]
    fn test_blake3_deterministic() {
        let data = b"hello causeway";
        assert_eq!(hash_blake3(data), hash_blake3(data));
        assert_ne!(hash_blake3(data), hash_blake3(b"hello causewax"));
    }

    #[test]
    fn test_sha256_known_vector() {
        // SHA-256("abc")
        let expected = [
            0xba, 0x78, 0x16, 0xbf, 0x8f, 0x01, 0xcf, 0xea, 0x41, 0x41, 0x40, 0xde, 0x5d, 0xae,
            0x22, 0x23, 0xb0, 0x03, 0x61, 0xa3, 0x96, 0x17, 0x7a, 0x9c, 0xb4, 0x10, 0xff, 0x61,
            0xf2, 0x00, 0x15, 0xad,
        ];
        assert_eq!(hash_sha256(b"abc"), expected);
    }

    #[test]
    fn test_hashers_differ() {
        assert_ne!(Blake3Hasher.compute(b"x"), Sha256Hasher.compute(b"x"));
    }

    #[test]
    fn test_calculate_hash_tracks_content() {
        let a = ResultTransaction {
            nonce: 1,
            ..Default::default()
        };
        let b = ResultTransaction {
            nonce: 2,
            ..Default::default()
        };
        let hasher = Blake3Hasher;
        assert_eq!(calculate_hash(&hasher, &a), calculate_hash(&hasher, &a.clone()));
        assert_ne!(calculate_hash(&hasher, &a), calculate_hash(&hasher, &b));
    }
}
