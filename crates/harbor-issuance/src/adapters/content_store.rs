//! # In-Memory Content Store Adapter
//!
//! Content-addressed byte store keyed by SHA-256 digest. Stands in
//! for the remote store endpoint: identical bytes always map to the
//! same reference, and failure-injection knobs drive the retry paths
//! in tests.

use crate::domain::{ContentReference, IssuanceError};
use crate::ports::outbound::ContentStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use tracing::debug;

/// In-memory content-addressed store.
#[derive(Default)]
pub struct InMemoryContentStore {
    /// Stored blobs, keyed by hex digest.
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    /// Completion order of successful stores.
    log: RwLock<Vec<ContentReference>>,
    /// Number of upcoming store calls that fail transiently.
    fail_remaining: AtomicU32,
    /// Definitive rejection mode (auth/quota).
    reject: AtomicBool,
    /// Stores that hit an already-present digest.
    dedup_hits: AtomicU64,
}

impl InMemoryContentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` store calls with a transient error.
    pub fn fail_next(&self, n: u32) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// Toggle definitive-rejection mode.
    pub fn set_reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    /// Number of distinct blobs stored.
    pub fn stored_count(&self) -> usize {
        self.blobs.read().len()
    }

    /// Stores that were short-circuited by content addressing.
    pub fn dedup_hits(&self) -> u64 {
        self.dedup_hits.load(Ordering::SeqCst)
    }

    /// Completion order of successful stores.
    pub fn publish_log(&self) -> Vec<ContentReference> {
        self.log.read().clone()
    }

    fn digest(bytes: &[u8]) -> [u8; 32] {
        let result = Sha256::digest(bytes);
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&result);
        digest
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn store(&self, bytes: &[u8]) -> Result<ContentReference, IssuanceError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(IssuanceError::PublishRejected {
                reason: "store quota exceeded".to_string(),
            });
        }
        if self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(IssuanceError::PublishUnavailable {
                reason: "injected transient store failure".to_string(),
            });
        }

        let digest = Self::digest(bytes);
        let reference = ContentReference::from_digest(&digest);
        let key = hex::encode(digest);

        let mut blobs = self.blobs.write();
        if blobs.contains_key(&key) {
            // Content-addressed: identical bytes reuse the reference.
            self.dedup_hits.fetch_add(1, Ordering::SeqCst);
        } else {
            blobs.insert(key, bytes.to_vec());
        }
        drop(blobs);

        debug!("[issuance] stored {} bytes as {}", bytes.len(), reference);
        self.log.write().push(reference.clone());
        Ok(reference)
    }

    async fn retrieve(
        &self,
        reference: &ContentReference,
    ) -> Result<Option<Vec<u8>>, IssuanceError> {
        let key = match reference.digest_hex() {
            Some(hex) => hex.to_string(),
            None => return Ok(None),
        };
        Ok(self.blobs.read().get(&key).cloned())
    }
}
