//! # Issuer Signing Key
//!
//! Wrapper for the issuer's private key material that zeroizes memory
//! on drop. The key signs mint transactions and is consumed opaquely:
//! it is never logged, never serialized in the clear, and never
//! embedded in a receipt.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// A signing key that zeroizes on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningKey {
    /// The private key bytes (32 bytes).
    inner: [u8; 32],
}

impl SigningKey {
    /// Create a new signing key from bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self { inner: bytes }
    }

    /// Create from a slice (copies into fixed array).
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() != 32 {
            return None;
        }
        let mut inner = [0u8; 32];
        inner.copy_from_slice(slice);
        Some(Self { inner })
    }

    /// Issuer account address derived from the key.
    pub fn address(&self) -> String {
        let digest = Sha256::digest(self.inner);
        format!("0x{}", hex::encode(&digest[digest.len() - 20..]))
    }

    /// Sign a transaction payload.
    ///
    /// The concrete chain signature scheme is an opaque external
    /// concern; this produces a deterministic authenticator over the
    /// payload bound to the key.
    pub fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.inner)
            .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the actual key
        f.write_str("SigningKey(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_key_debug_hides_value() {
        let key = SigningKey::new([0xABu8; 32]);
        let debug_str = format!("{key:?}");
        assert!(!debug_str.contains("AB"));
        assert!(debug_str.contains("***"));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let key = SigningKey::new([7u8; 32]);
        assert_eq!(key.sign(b"payload"), key.sign(b"payload"));
        assert_ne!(key.sign(b"payload"), key.sign(b"other"));
    }

    #[test]
    fn test_address_is_stable_and_prefixed() {
        let key = SigningKey::new([7u8; 32]);
        let addr = key.address();
        assert!(addr.starts_with("0x"));
        assert_eq!(addr.len(), 42);
        assert_eq!(addr, SigningKey::new([7u8; 32]).address());
    }

    #[test]
    fn test_from_slice_wrong_length() {
        assert!(SigningKey::from_slice(&[1u8; 16]).is_none());
        assert!(SigningKey::from_slice(&[1u8; 32]).is_some());
    }
}
