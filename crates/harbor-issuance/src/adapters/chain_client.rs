//! # Simulated Chain RPC Adapter
//!
//! In-memory chain endpoint: tracks account sequence numbers, accepts
//! signed mint transactions, and reports receipts after a configurable
//! number of polls. Modes drive the failure paths (revert, stalled
//! confirmation, unreachable endpoint) without a real network.

use crate::domain::{IssuanceError, TxHash};
use crate::ports::outbound::{ChainReceipt, ChainRpc, ChainTxStatus, SignedMintTransaction};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, info};

/// Behavior applied to newly submitted transactions.
#[derive(Clone, Debug)]
pub enum SimChainMode {
    /// Confirm after the given number of receipt polls.
    Confirm {
        /// Polls before the receipt appears.
        after_polls: u32,
    },
    /// Revert with the given reason after one poll.
    Revert {
        /// Revert reason reported in the receipt.
        reason: String,
    },
    /// Never produce a receipt (confirmation stalls).
    Stall,
    /// Endpoint unreachable: every call fails.
    Unreachable,
}

impl Default for SimChainMode {
    fn default() -> Self {
        Self::Confirm { after_polls: 1 }
    }
}

#[derive(Clone, Debug)]
enum PendingOutcome {
    Confirm,
    Revert(String),
    Stall,
}

struct PendingTx {
    polls_remaining: u32,
    outcome: PendingOutcome,
}

#[derive(Default)]
struct SimChainState {
    nonces: HashMap<String, u64>,
    pending: HashMap<TxHash, PendingTx>,
    receipts: HashMap<TxHash, ChainReceipt>,
    next_token_id: u64,
}

/// Simulated chain RPC endpoint.
pub struct SimChainRpc {
    state: RwLock<SimChainState>,
    mode: RwLock<SimChainMode>,
    gas_price_gwei: u64,
}

impl SimChainRpc {
    /// Gas reported as consumed by a successful mint.
    const MINT_GAS_USED: u64 = 187_000;

    /// Create a chain with the default mode (confirm after one poll).
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SimChainState {
                next_token_id: 1,
                ..SimChainState::default()
            }),
            mode: RwLock::new(SimChainMode::default()),
            gas_price_gwei: 20,
        }
    }

    /// Create a chain that applies `mode` to new submissions.
    pub fn with_mode(mode: SimChainMode) -> Self {
        let chain = Self::new();
        *chain.mode.write() = mode;
        chain
    }

    /// Change the mode for subsequent calls.
    pub fn set_mode(&self, mode: SimChainMode) {
        *self.mode.write() = mode;
    }

    /// Force a pending transaction to a confirmed receipt, as if the
    /// chain caught up while the caller was away.
    pub fn force_confirm(&self, tx_hash: &TxHash) {
        let mut state = self.state.write();
        if state.pending.remove(tx_hash).is_some() {
            let token_id = state.next_token_id;
            state.next_token_id += 1;
            state.receipts.insert(
                *tx_hash,
                ChainReceipt {
                    tx_hash: *tx_hash,
                    status: ChainTxStatus::Success { token_id },
                    gas_used: Self::MINT_GAS_USED,
                    effective_gas_price_gwei: self.gas_price_gwei,
                },
            );
        }
    }

    fn unreachable(&self) -> bool {
        matches!(*self.mode.read(), SimChainMode::Unreachable)
    }

    fn unreachable_error() -> IssuanceError {
        IssuanceError::MintSubmissionFailed {
            reason: "chain RPC endpoint unreachable".to_string(),
        }
    }
}

impl Default for SimChainRpc {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainRpc for SimChainRpc {
    async fn account_nonce(&self, address: &str) -> Result<u64, IssuanceError> {
        if self.unreachable() {
            return Err(Self::unreachable_error());
        }
        Ok(*self.state.read().nonces.get(address).unwrap_or(&0))
    }

    async fn gas_price_gwei(&self) -> Result<u64, IssuanceError> {
        if self.unreachable() {
            return Err(Self::unreachable_error());
        }
        Ok(self.gas_price_gwei)
    }

    async fn submit(&self, tx: &SignedMintTransaction) -> Result<TxHash, IssuanceError> {
        if self.unreachable() {
            return Err(Self::unreachable_error());
        }

        let mode = self.mode.read().clone();
        let mut state = self.state.write();

        let expected = *state.nonces.get(&tx.tx.from).unwrap_or(&0);
        if tx.tx.nonce != expected {
            // Reusing a stale sequence number is a caller bug.
            return Err(IssuanceError::MintSubmissionFailed {
                reason: format!("stale nonce: got {}, expected {}", tx.tx.nonce, expected),
            });
        }
        state.nonces.insert(tx.tx.from.clone(), expected + 1);

        let (polls_remaining, outcome) = match mode {
            SimChainMode::Confirm { after_polls } => (after_polls, PendingOutcome::Confirm),
            SimChainMode::Revert { reason } => (1, PendingOutcome::Revert(reason)),
            SimChainMode::Stall => (0, PendingOutcome::Stall),
            SimChainMode::Unreachable => unreachable!("checked above"),
        };
        state.pending.insert(
            tx.hash,
            PendingTx {
                polls_remaining,
                outcome,
            },
        );

        info!("[issuance] submitted mint tx {} nonce {}", tx.hash, expected);
        Ok(tx.hash)
    }

    async fn receipt(&self, tx_hash: &TxHash) -> Result<Option<ChainReceipt>, IssuanceError> {
        if self.unreachable() {
            return Err(Self::unreachable_error());
        }

        let mut state = self.state.write();
        if let Some(receipt) = state.receipts.get(tx_hash) {
            return Ok(Some(receipt.clone()));
        }

        let ready = match state.pending.get_mut(tx_hash) {
            Some(pending) => match pending.outcome {
                PendingOutcome::Stall => false,
                _ => {
                    pending.polls_remaining = pending.polls_remaining.saturating_sub(1);
                    pending.polls_remaining == 0
                }
            },
            None => false,
        };
        if !ready {
            debug!("[issuance] receipt for {} not yet available", tx_hash);
            return Ok(None);
        }

        let pending = state
            .pending
            .remove(tx_hash)
            .unwrap_or_else(|| unreachable!("checked above"));
        let receipt = match pending.outcome {
            PendingOutcome::Confirm => {
                let token_id = state.next_token_id;
                state.next_token_id += 1;
                ChainReceipt {
                    tx_hash: *tx_hash,
                    status: ChainTxStatus::Success { token_id },
                    gas_used: Self::MINT_GAS_USED,
                    effective_gas_price_gwei: self.gas_price_gwei,
                }
            }
            PendingOutcome::Revert(reason) => ChainReceipt {
                tx_hash: *tx_hash,
                status: ChainTxStatus::Reverted { reason },
                gas_used: Self::MINT_GAS_USED / 2,
                effective_gas_price_gwei: self.gas_price_gwei,
            },
            PendingOutcome::Stall => unreachable!("stalled transactions never become ready"),
        };
        state.receipts.insert(*tx_hash, receipt.clone());
        Ok(Some(receipt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BuyerAddress, SigningKey};
    use crate::ports::outbound::MintTransaction;

    fn signed_tx(nonce: u64) -> SignedMintTransaction {
        let key = SigningKey::new([9u8; 32]);
        MintTransaction {
            from: key.address(),
            contract: "0x0000000000000000000000000000000000000002".to_string(),
            to: BuyerAddress::parse("0xABCDEF0123456789abcdef0123456789ABCDEF01").unwrap(),
            token_uri: "cas://00".to_string(),
            nonce,
            gas_limit: 3_000_000,
            gas_price_gwei: 20,
        }
        .sign(&key)
        .unwrap()
    }

    #[tokio::test]
    async fn test_nonce_starts_at_zero_and_increments() {
        let chain = SimChainRpc::new();
        let tx = signed_tx(0);
        assert_eq!(chain.account_nonce(&tx.tx.from).await.unwrap(), 0);
        chain.submit(&tx).await.unwrap();
        assert_eq!(chain.account_nonce(&tx.tx.from).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stale_nonce_rejected() {
        let chain = SimChainRpc::new();
        chain.submit(&signed_tx(0)).await.unwrap();
        let err = chain.submit(&signed_tx(0)).await.unwrap_err();
        assert!(err.to_string().contains("stale nonce"));
    }

    #[tokio::test]
    async fn test_confirm_after_polls() {
        let chain = SimChainRpc::with_mode(SimChainMode::Confirm { after_polls: 2 });
        let tx = signed_tx(0);
        let hash = chain.submit(&tx).await.unwrap();

        assert!(chain.receipt(&hash).await.unwrap().is_none());
        let receipt = chain.receipt(&hash).await.unwrap().unwrap();
        assert!(matches!(receipt.status, ChainTxStatus::Success { .. }));
    }

    #[tokio::test]
    async fn test_revert_mode() {
        let chain = SimChainRpc::with_mode(SimChainMode::Revert {
            reason: "max supply reached".to_string(),
        });
        let hash = chain.submit(&signed_tx(0)).await.unwrap();
        let receipt = chain.receipt(&hash).await.unwrap().unwrap();
        match receipt.status {
            ChainTxStatus::Reverted { reason } => assert_eq!(reason, "max supply reached"),
            other => panic!("expected revert, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stall_then_force_confirm() {
        let chain = SimChainRpc::with_mode(SimChainMode::Stall);
        let hash = chain.submit(&signed_tx(0)).await.unwrap();

        for _ in 0..5 {
            assert!(chain.receipt(&hash).await.unwrap().is_none());
        }
        chain.force_confirm(&hash);
        assert!(chain.receipt(&hash).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unreachable_mode_fails_everything() {
        let chain = SimChainRpc::with_mode(SimChainMode::Unreachable);
        assert!(chain.account_nonce("0xabc").await.is_err());
        assert!(chain.gas_price_gwei().await.is_err());
        assert!(chain.submit(&signed_tx(0)).await.is_err());
    }

    #[tokio::test]
    async fn test_token_ids_are_sequential() {
        let chain = SimChainRpc::new();
        let first = signed_tx(0);
        let hash1 = chain.submit(&first).await.unwrap();
        let r1 = chain.receipt(&hash1).await.unwrap().unwrap();

        let second = signed_tx(1);
        let hash2 = chain.submit(&second).await.unwrap();
        let r2 = chain.receipt(&hash2).await.unwrap().unwrap();

        let (ChainTxStatus::Success { token_id: a }, ChainTxStatus::Success { token_id: b }) =
            (r1.status, r2.status)
        else {
            panic!("expected two confirmed mints");
        };
        assert_eq!(b, a + 1);
    }
}
