//! # Issuance Service
//!
//! Orchestrates the pipeline: identity generation, code encoding,
//! content publication (image before metadata), mint submission and
//! confirmation, and wallet pass assembly. Decides what is retried
//! versus aborted and assembles the final (possibly partial) result.
//!
//! One service instance handles many concurrent requests; per-request
//! state lives on the stack of each `issue` call. The only shared
//! mutable state is the statistics counter.

pub mod wallet;

use crate::algorithms::{encoder, identity};
use crate::domain::{
    BuyerAddress, CodePayload, ContentReference, FailureKind, IssuanceError, IssuanceOutcome,
    IssuanceRequest, IssuanceResult, MintReceipt, MintState, PartialIssuanceResult, PassStyle,
    SigningKey, TicketIdentity, WalletCredential,
};
use crate::ports::inbound::IssuanceApi;
use crate::ports::outbound::{ChainRpc, ChainTxStatus, ContentStore, MintTransaction, PassSigner};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, instrument, warn};

/// Issuance service configuration. Timeouts apply independently to
/// each suspension point.
#[derive(Debug, Clone)]
pub struct IssuanceConfig {
    /// Ticket contract address the mint call targets.
    pub contract_address: String,
    /// Pass styling and issuer identity.
    pub style: PassStyle,
    /// Timeout per publish attempt.
    pub publish_timeout: Duration,
    /// Maximum publish attempts (first try included).
    pub publish_max_attempts: u32,
    /// Base delay for exponential publish backoff.
    pub publish_backoff_base: Duration,
    /// Total time to wait for mint confirmation.
    pub mint_confirmation_timeout: Duration,
    /// Interval between receipt polls.
    pub mint_poll_interval: Duration,
    /// Timeout per pass signing attempt.
    pub wallet_timeout: Duration,
    /// Gas limit for mint transactions.
    pub gas_limit: u64,
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            contract_address: "0x0000000000000000000000000000000000000000".to_string(),
            style: PassStyle::default(),
            publish_timeout: Duration::from_secs(10),
            publish_max_attempts: 4,
            publish_backoff_base: Duration::from_millis(250),
            mint_confirmation_timeout: Duration::from_secs(60),
            mint_poll_interval: Duration::from_millis(500),
            wallet_timeout: Duration::from_secs(10),
            gas_limit: 3_000_000,
        }
    }
}

/// Statistics for the issuance service.
#[derive(Debug, Default, Clone)]
pub struct IssuanceStats {
    /// Requests entering the pipeline.
    pub requests: u64,
    /// Fully completed issuances.
    pub completed: u64,
    /// Partial results returned.
    pub partial: u64,
    /// Requests failed outright.
    pub failed: u64,
    /// Publish attempts (including retries).
    pub publish_attempts: u64,
    /// Publish retries after a transient failure.
    pub publish_retries: u64,
    /// Confirmed mints.
    pub mints_confirmed: u64,
}

/// Caller-held cancellation handle.
///
/// Cancelling before chain submission aborts the request with no side
/// effects. Cancelling after submission only stops confirmation
/// tracking: the transaction cannot be recalled, so the result is
/// reported as indeterminate.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Mint failure with whatever receipt state was reached.
struct MintFailure {
    error: IssuanceError,
    receipt: Option<MintReceipt>,
}

/// The issuance orchestrator, generic over the three outbound ports.
pub struct IssuanceService<S: ContentStore, C: ChainRpc, P: PassSigner> {
    config: IssuanceConfig,
    store: Arc<S>,
    chain: Arc<C>,
    pass_signer: Arc<P>,
    stats: Arc<RwLock<IssuanceStats>>,
}

impl<S: ContentStore, C: ChainRpc, P: PassSigner> IssuanceService<S, C, P> {
    /// Create a new issuance service.
    pub fn new(store: S, chain: C, pass_signer: P, config: IssuanceConfig) -> Self {
        Self {
            config,
            store: Arc::new(store),
            chain: Arc::new(chain),
            pass_signer: Arc::new(pass_signer),
            stats: Arc::new(RwLock::new(IssuanceStats::default())),
        }
    }

    /// Current service statistics.
    pub async fn stats(&self) -> IssuanceStats {
        self.stats.read().await.clone()
    }

    /// Run the pipeline with a caller-held cancellation token.
    #[instrument(skip_all, fields(event = %request.event_name))]
    pub async fn issue_with_cancel(
        &self,
        request: IssuanceRequest,
        signer: &SigningKey,
        cancel: CancelToken,
    ) -> Result<IssuanceOutcome, IssuanceError> {
        self.stats.write().await.requests += 1;

        let outcome = self.run_pipeline(&request, signer, &cancel).await;
        match &outcome {
            Ok(IssuanceOutcome::Complete(_)) => self.stats.write().await.completed += 1,
            Ok(IssuanceOutcome::Partial(partial)) => {
                warn!(
                    "[issuance] partial result for {}: {:?} ({})",
                    partial.identity.id, partial.failure, partial.detail
                );
                self.stats.write().await.partial += 1;
            }
            Err(e) => {
                warn!("[issuance] request failed: {e}");
                self.stats.write().await.failed += 1;
            }
        }
        outcome
    }

    async fn run_pipeline(
        &self,
        request: &IssuanceRequest,
        signer: &SigningKey,
        cancel: &CancelToken,
    ) -> Result<IssuanceOutcome, IssuanceError> {
        if cancel.is_cancelled() {
            return Err(IssuanceError::Cancelled);
        }

        let buyer = identity::validate(request)?;
        let ticket = identity::generate(request)?;
        let code = encoder::encode(&ticket)?;
        info!("[issuance] generated ticket {} for {}", ticket.id, buyer);

        // Image first: the metadata document must embed a stable image
        // reference before it is published itself.
        let image_ref = self.publish_with_retry(&request.image, "image").await?;
        let ticket = ticket.with_image_reference(image_ref.clone());
        let metadata_bytes = ticket.metadata.to_json_bytes()?;
        let metadata_ref = self.publish_with_retry(&metadata_bytes, "metadata").await?;
        debug!("[issuance] published metadata at {metadata_ref}");

        if cancel.is_cancelled() {
            // Nothing on chain yet: a full abort is still possible.
            return Err(IssuanceError::Cancelled);
        }

        let receipt = match self
            .submit_and_confirm(&buyer, &metadata_ref, signer, cancel)
            .await
        {
            Ok(receipt) => receipt,
            Err(failure) => {
                if matches!(failure.error, IssuanceError::Cancelled) {
                    return Err(IssuanceError::Cancelled);
                }
                return Ok(IssuanceOutcome::Partial(PartialIssuanceResult {
                    identity: ticket,
                    buyer,
                    image_ref,
                    metadata_ref,
                    receipt: failure.receipt,
                    credential: None,
                    failure: mint_failure_kind(&failure.error),
                    detail: failure.error.to_string(),
                }));
            }
        };
        self.stats.write().await.mints_confirmed += 1;

        match self
            .build_credential(&ticket, &code, Some(image_ref.clone()))
            .await
        {
            Ok(credential) => Ok(IssuanceOutcome::Complete(IssuanceResult {
                identity: ticket,
                buyer,
                image_ref,
                metadata_ref,
                receipt,
                credential,
            })),
            Err(e @ IssuanceError::MismatchedCredential { .. }) => Err(e),
            Err(e) => Ok(IssuanceOutcome::Partial(PartialIssuanceResult {
                identity: ticket,
                buyer,
                image_ref,
                metadata_ref,
                receipt: Some(receipt),
                credential: None,
                failure: FailureKind::WalletBuildFailed,
                detail: e.to_string(),
            })),
        }
    }

    /// Publish bytes with bounded retries and exponential backoff.
    ///
    /// Definitive rejections are surfaced immediately; only transient
    /// failures and per-attempt timeouts are retried.
    async fn publish_with_retry(
        &self,
        bytes: &[u8],
        what: &str,
    ) -> Result<ContentReference, IssuanceError> {
        let attempts = self.config.publish_max_attempts.max(1);
        let mut last_reason = String::new();

        for attempt in 1..=attempts {
            self.stats.write().await.publish_attempts += 1;
            match timeout(self.config.publish_timeout, self.store.store(bytes)).await {
                Ok(Ok(reference)) => return Ok(reference),
                Ok(Err(e)) if !e.is_transient_publish() => return Err(e),
                Ok(Err(e)) => last_reason = e.to_string(),
                Err(_) => last_reason = format!("{what} publish timed out"),
            }

            if attempt < attempts {
                // Doubling capped at 2^16 so large attempt budgets
                // cannot overflow the duration.
                let backoff = self
                    .config
                    .publish_backoff_base
                    .saturating_mul(1u32 << (attempt - 1).min(16));
                warn!(
                    "[issuance] {what} publish attempt {attempt}/{attempts} failed, \
                     retrying in {backoff:?}: {last_reason}"
                );
                self.stats.write().await.publish_retries += 1;
                sleep(backoff).await;
            }
        }

        Err(IssuanceError::PublishUnavailable {
            reason: format!("{what} publish failed after {attempts} attempts: {last_reason}"),
        })
    }

    /// Build, sign, submit, and wait for a mint transaction.
    ///
    /// The account sequence number and gas price are fetched fresh at
    /// submission time; a resubmission goes through this path again
    /// and therefore never reuses a stale nonce.
    async fn submit_and_confirm(
        &self,
        buyer: &BuyerAddress,
        metadata_ref: &ContentReference,
        signer: &SigningKey,
        cancel: &CancelToken,
    ) -> Result<MintReceipt, MintFailure> {
        let from = signer.address();
        let nonce = self
            .chain
            .account_nonce(&from)
            .await
            .map_err(|e| MintFailure { error: e, receipt: None })?;
        let gas_price_gwei = self
            .chain
            .gas_price_gwei()
            .await
            .map_err(|e| MintFailure { error: e, receipt: None })?;

        let tx = MintTransaction {
            from,
            contract: self.config.contract_address.clone(),
            to: buyer.clone(),
            token_uri: metadata_ref.to_string(),
            nonce,
            gas_limit: self.config.gas_limit,
            gas_price_gwei,
        };
        let signed = tx
            .sign(signer)
            .map_err(|e| MintFailure { error: e, receipt: None })?;

        let mut receipt = MintReceipt::new(signed.hash);
        receipt
            .transition_to(MintState::Signed)
            .map_err(|e| MintFailure { error: e, receipt: None })?;

        if cancel.is_cancelled() {
            // Not yet submitted: aborting leaves no chain state behind.
            return Err(MintFailure {
                error: IssuanceError::Cancelled,
                receipt: None,
            });
        }

        if let Err(e) = self.chain.submit(&signed).await {
            return Err(MintFailure { error: e, receipt: None });
        }
        receipt
            .transition_to(MintState::Submitted)
            .map_err(|e| MintFailure { error: e, receipt: None })?;
        debug!("[issuance] mint {} submitted with nonce {nonce}", signed.hash);

        self.await_confirmation(receipt, cancel).await
    }

    /// Poll for a receipt until a terminal state, the confirmation
    /// timeout, or cancellation. Poll errors are tolerated; only the
    /// deadline turns them into an indeterminate result.
    async fn await_confirmation(
        &self,
        mut receipt: MintReceipt,
        cancel: &CancelToken,
    ) -> Result<MintReceipt, MintFailure> {
        let deadline = Instant::now() + self.config.mint_confirmation_timeout;
        let tx_hash = receipt.tx_hash;

        loop {
            if cancel.is_cancelled() || Instant::now() >= deadline {
                // The transaction itself cannot be cancelled; report
                // indeterminate rather than pretend it failed.
                if let Err(e) = receipt.transition_to(MintState::TimedOut) {
                    return Err(MintFailure { error: e, receipt: Some(receipt) });
                }
                return Err(MintFailure {
                    error: IssuanceError::MintIndeterminate {
                        tx_hash: tx_hash.to_string(),
                    },
                    receipt: Some(receipt),
                });
            }

            match self.chain.receipt(&tx_hash).await {
                Ok(Some(chain_receipt)) => match chain_receipt.status {
                    ChainTxStatus::Success { token_id } => {
                        receipt
                            .confirm(
                                token_id,
                                chain_receipt.gas_used,
                                chain_receipt.effective_gas_price_gwei,
                            )
                            .map_err(|e| MintFailure {
                                error: e,
                                receipt: None,
                            })?;
                        info!("[issuance] mint {tx_hash} confirmed, token {token_id}");
                        return Ok(receipt);
                    }
                    ChainTxStatus::Reverted { reason } => {
                        if let Err(e) = receipt.revert(chain_receipt.gas_used) {
                            return Err(MintFailure { error: e, receipt: Some(receipt) });
                        }
                        return Err(MintFailure {
                            error: IssuanceError::MintReverted { reason },
                            receipt: Some(receipt),
                        });
                    }
                },
                Ok(None) => {}
                Err(e) => warn!("[issuance] receipt poll for {tx_hash} failed: {e}"),
            }

            sleep(self.config.mint_poll_interval).await;
        }
    }

    /// Assemble and sign the wallet credential. A service-side
    /// rejection is retried once, then surfaced.
    async fn build_credential(
        &self,
        ticket: &TicketIdentity,
        code: &CodePayload,
        thumbnail: Option<ContentReference>,
    ) -> Result<WalletCredential, IssuanceError> {
        let document = wallet::build_document(ticket, code, &self.config.style, thumbnail)?;
        let signing_input = document.signing_input()?;

        let mut last = None;
        for attempt in 1..=2u32 {
            match timeout(
                self.config.wallet_timeout,
                self.pass_signer.sign_pass(&signing_input),
            )
            .await
            {
                Ok(Ok(signature)) => {
                    return Ok(WalletCredential {
                        ticket_id: ticket.id.clone(),
                        document,
                        signature,
                    });
                }
                Ok(Err(e)) => {
                    warn!("[issuance] pass signing attempt {attempt} failed: {e}");
                    last = Some(e);
                }
                Err(_) => {
                    warn!("[issuance] pass signing attempt {attempt} timed out");
                    last = Some(IssuanceError::WalletBuildFailed {
                        reason: "pass signing timed out".to_string(),
                    });
                }
            }
        }

        Err(last.unwrap_or(IssuanceError::WalletBuildFailed {
            reason: "pass signing failed".to_string(),
        }))
    }

    /// Finish a partial result that already holds a confirmed receipt:
    /// re-encode the (deterministic) code payload and build the pass.
    async fn finish_with_receipt(
        &self,
        partial: PartialIssuanceResult,
        receipt: MintReceipt,
    ) -> Result<IssuanceOutcome, IssuanceError> {
        let code = encoder::encode(&partial.identity)?;
        match self
            .build_credential(&partial.identity, &code, Some(partial.image_ref.clone()))
            .await
        {
            Ok(credential) => {
                self.stats.write().await.completed += 1;
                Ok(IssuanceOutcome::Complete(IssuanceResult {
                    identity: partial.identity,
                    buyer: partial.buyer,
                    image_ref: partial.image_ref,
                    metadata_ref: partial.metadata_ref,
                    receipt,
                    credential,
                }))
            }
            Err(e @ IssuanceError::MismatchedCredential { .. }) => Err(e),
            Err(e) => {
                self.stats.write().await.partial += 1;
                Ok(IssuanceOutcome::Partial(PartialIssuanceResult {
                    receipt: Some(receipt),
                    credential: None,
                    failure: FailureKind::WalletBuildFailed,
                    detail: e.to_string(),
                    ..partial
                }))
            }
        }
    }
}

/// Map a mint-stage error to the failure kind recorded in a partial
/// result.
fn mint_failure_kind(error: &IssuanceError) -> FailureKind {
    match error {
        IssuanceError::MintReverted { .. } => FailureKind::MintReverted,
        IssuanceError::MintIndeterminate { .. } => FailureKind::MintIndeterminate,
        _ => FailureKind::MintSubmissionFailed,
    }
}

#[async_trait]
impl<S: ContentStore, C: ChainRpc, P: PassSigner> IssuanceApi for IssuanceService<S, C, P> {
    async fn issue(
        &self,
        request: IssuanceRequest,
        signer: &SigningKey,
    ) -> Result<IssuanceOutcome, IssuanceError> {
        self.issue_with_cancel(request, signer, CancelToken::new())
            .await
    }

    async fn retry_mint(
        &self,
        partial: PartialIssuanceResult,
        signer: &SigningKey,
    ) -> Result<IssuanceOutcome, IssuanceError> {
        // A confirmed mint is never repeated; chain state is append-only.
        if let Some(receipt) = &partial.receipt {
            match receipt.state {
                MintState::Confirmed => {
                    let receipt = receipt.clone();
                    return self.finish_with_receipt(partial, receipt).await;
                }
                MintState::TimedOut => {
                    let resolved = self.query_mint(receipt).await?;
                    match resolved.state {
                        MintState::Confirmed => {
                            self.stats.write().await.mints_confirmed += 1;
                            return self.finish_with_receipt(partial, resolved).await;
                        }
                        MintState::Reverted => {
                            // Resolved to a definitive failure; fall
                            // through and mint anew with a fresh nonce.
                            info!(
                                "[issuance] indeterminate mint {} resolved to reverted",
                                resolved.tx_hash
                            );
                        }
                        _ => {
                            self.stats.write().await.partial += 1;
                            return Ok(IssuanceOutcome::Partial(PartialIssuanceResult {
                                receipt: Some(resolved),
                                failure: FailureKind::MintIndeterminate,
                                ..partial
                            }));
                        }
                    }
                }
                _ => {}
            }
        }

        let cancel = CancelToken::new();
        match self
            .submit_and_confirm(&partial.buyer, &partial.metadata_ref, signer, &cancel)
            .await
        {
            Ok(receipt) => {
                self.stats.write().await.mints_confirmed += 1;
                self.finish_with_receipt(partial, receipt).await
            }
            Err(failure) => {
                self.stats.write().await.partial += 1;
                Ok(IssuanceOutcome::Partial(PartialIssuanceResult {
                    receipt: failure.receipt,
                    credential: None,
                    failure: mint_failure_kind(&failure.error),
                    detail: failure.error.to_string(),
                    ..partial
                }))
            }
        }
    }

    async fn retry_wallet(
        &self,
        partial: PartialIssuanceResult,
    ) -> Result<IssuanceOutcome, IssuanceError> {
        let receipt = match &partial.receipt {
            Some(receipt) if receipt.state == MintState::Confirmed => receipt.clone(),
            _ => {
                return Err(IssuanceError::InvalidRequest {
                    reason: "no confirmed mint receipt to attach a pass to".to_string(),
                })
            }
        };
        self.finish_with_receipt(partial, receipt).await
    }

    async fn query_mint(&self, receipt: &MintReceipt) -> Result<MintReceipt, IssuanceError> {
        if receipt.is_terminal() {
            return Ok(receipt.clone());
        }

        let mut updated = receipt.clone();
        match self.chain.receipt(&receipt.tx_hash).await? {
            Some(chain_receipt) => match chain_receipt.status {
                ChainTxStatus::Success { token_id } => {
                    updated.confirm(
                        token_id,
                        chain_receipt.gas_used,
                        chain_receipt.effective_gas_price_gwei,
                    )?;
                }
                ChainTxStatus::Reverted { .. } => {
                    updated.revert(chain_receipt.gas_used)?;
                }
            },
            None => {
                debug!(
                    "[issuance] mint {} still pending on re-query",
                    receipt.tx_hash
                );
            }
        }
        Ok(updated)
    }
}
