//! # Domain Errors
//!
//! Failure taxonomy for the ticket issuance pipeline.
//!
//! Every component signals its own failure kind; the orchestrator never
//! masks a kind, it only decides whether a partial result can still be
//! assembled.

use thiserror::Error;

/// Issuance error types.
#[derive(Debug, Error)]
pub enum IssuanceError {
    /// Caller supplied a malformed request. Never retried.
    #[error("Invalid request: {reason}")]
    InvalidRequest {
        /// What was wrong with the input.
        reason: String,
    },

    /// The content store definitively rejected the upload (auth, quota).
    /// Never retried.
    #[error("Publish rejected: {reason}")]
    PublishRejected {
        /// Rejection reason from the store.
        reason: String,
    },

    /// Transient content store failure. Retried with backoff, then surfaced.
    #[error("Content store unavailable: {reason}")]
    PublishUnavailable {
        /// Last failure observed.
        reason: String,
    },

    /// Transaction construction or submission failed. Not retried blindly;
    /// a resubmission must fetch a fresh account sequence number.
    #[error("Mint submission failed: {reason}")]
    MintSubmissionFailed {
        /// Submission failure reason.
        reason: String,
    },

    /// The chain rejected the mint. Terminal for this transaction.
    #[error("Mint reverted: {reason}")]
    MintReverted {
        /// Revert reason, if the chain reported one.
        reason: String,
    },

    /// Confirmation timed out. The transaction may still land; the caller
    /// must re-query by hash, never resubmit blindly.
    #[error("Mint indeterminate: confirmation pending for {tx_hash}")]
    MintIndeterminate {
        /// Hash of the submitted transaction.
        tx_hash: String,
    },

    /// Ticket identity and code payload reference different tickets.
    /// Always fatal to the request.
    #[error("Mismatched credential: identity {identity_id} vs payload {payload_id}")]
    MismatchedCredential {
        /// Ticket id carried by the identity.
        identity_id: String,
        /// Ticket id embedded in the code payload.
        payload_id: String,
    },

    /// The pass signing service rejected the build. Retried once.
    #[error("Wallet pass build failed: {reason}")]
    WalletBuildFailed {
        /// Service-side rejection reason.
        reason: String,
    },

    /// Serialized code payload exceeds the symbology capacity.
    #[error("Code payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Serialized payload size.
        size: usize,
        /// Practical capacity at the chosen density.
        max: usize,
    },

    /// Caller cancelled the request before chain submission.
    #[error("Issuance cancelled")]
    Cancelled,

    /// Invalid mint receipt state transition.
    #[error("Invalid mint transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: String,
        /// Attempted state.
        to: String,
    },
}

impl IssuanceError {
    /// Whether a publish attempt hitting this error may be retried.
    pub fn is_transient_publish(&self) -> bool {
        matches!(self, Self::PublishUnavailable { .. })
    }
}
