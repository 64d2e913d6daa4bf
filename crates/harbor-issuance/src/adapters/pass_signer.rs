//! # HMAC Pass Signer Adapter
//!
//! Deterministic sign-and-package backend standing in for the opaque
//! wallet-pass signing service. A third party holding the same key
//! can verify a credential offline, without contacting this system.

use crate::domain::IssuanceError;
use crate::ports::outbound::PassSigner;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::atomic::{AtomicU32, Ordering};

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 pass signer.
pub struct HmacPassSigner {
    key: Vec<u8>,
    /// Number of upcoming sign calls that fail (test knob for the
    /// retry-once policy).
    fail_remaining: AtomicU32,
}

impl HmacPassSigner {
    /// Create a signer with the given service key.
    pub fn new(key: &[u8]) -> Self {
        Self {
            key: key.to_vec(),
            fail_remaining: AtomicU32::new(0),
        }
    }

    /// Fail the next `n` sign calls.
    pub fn fail_next(&self, n: u32) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    fn mac(&self, signing_input: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
        mac.update(signing_input);
        mac.finalize().into_bytes().to_vec()
    }
}

#[async_trait]
impl PassSigner for HmacPassSigner {
    async fn sign_pass(&self, signing_input: &[u8]) -> Result<Vec<u8>, IssuanceError> {
        if self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(IssuanceError::WalletBuildFailed {
                reason: "pass service rejected the document".to_string(),
            });
        }
        Ok(self.mac(signing_input))
    }

    fn verify_pass(&self, signing_input: &[u8], signature: &[u8]) -> bool {
        self.mac(signing_input) == signature
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_and_verify() {
        let signer = HmacPassSigner::new(b"pass-service-key");
        let signature = signer.sign_pass(b"document").await.unwrap();
        assert!(signer.verify_pass(b"document", &signature));
        assert!(!signer.verify_pass(b"altered document", &signature));
    }

    #[tokio::test]
    async fn test_signing_is_deterministic() {
        let signer = HmacPassSigner::new(b"pass-service-key");
        let a = signer.sign_pass(b"document").await.unwrap();
        let b = signer.sign_pass(b"document").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_fail_next_then_recover() {
        let signer = HmacPassSigner::new(b"pass-service-key");
        signer.fail_next(1);
        assert!(signer.sign_pass(b"document").await.is_err());
        assert!(signer.sign_pass(b"document").await.is_ok());
    }

    #[tokio::test]
    async fn test_different_keys_do_not_verify() {
        let a = HmacPassSigner::new(b"key-a");
        let b = HmacPassSigner::new(b"key-b");
        let signature = a.sign_pass(b"document").await.unwrap();
        assert!(!b.verify_pass(b"document", &signature));
    }
}
