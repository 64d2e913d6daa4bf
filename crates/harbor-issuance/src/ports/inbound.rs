//! # Inbound Ports
//!
//! API trait defining what the issuance pipeline offers to its caller
//! (the UI / collaborator layer).

use crate::domain::{
    IssuanceError, IssuanceOutcome, IssuanceRequest, MintReceipt, PartialIssuanceResult,
    SigningKey,
};
use async_trait::async_trait;

/// Issuance API - inbound port.
#[async_trait]
pub trait IssuanceApi: Send + Sync {
    /// Run the full pipeline for one request.
    ///
    /// Returns `Partial` when a later stage failed after earlier
    /// artifacts were already produced; those artifacts are carried in
    /// the partial result so only the failed stage needs retrying.
    ///
    /// The account sequence number is fetched per call, so concurrent
    /// calls signing with the same key race on it: the loser surfaces
    /// a `MintSubmissionFailed` partial that `retry_mint` completes.
    /// Serialize submissions per signing key to avoid the race.
    async fn issue(
        &self,
        request: IssuanceRequest,
        signer: &SigningKey,
    ) -> Result<IssuanceOutcome, IssuanceError>;

    /// Retry minting for a partial result whose publishes succeeded.
    ///
    /// Reuses the already-published content references; a confirmed
    /// mint is never repeated.
    async fn retry_mint(
        &self,
        partial: PartialIssuanceResult,
        signer: &SigningKey,
    ) -> Result<IssuanceOutcome, IssuanceError>;

    /// Rebuild the wallet pass for a partial result whose mint
    /// confirmed.
    async fn retry_wallet(
        &self,
        partial: PartialIssuanceResult,
    ) -> Result<IssuanceOutcome, IssuanceError>;

    /// Re-query an indeterminate receipt by transaction hash.
    ///
    /// Terminal receipts are returned unchanged; a `TimedOut` receipt
    /// resolves to `Confirmed` or `Reverted` once the chain reports a
    /// terminal state.
    async fn query_mint(&self, receipt: &MintReceipt) -> Result<MintReceipt, IssuanceError>;
}
