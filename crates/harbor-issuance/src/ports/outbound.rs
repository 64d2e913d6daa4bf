//! # Outbound Ports
//!
//! Traits for the three opaque external services the pipeline talks
//! to: the content-addressed store, the chain RPC endpoint, and the
//! wallet-pass signing service.

use crate::domain::{BuyerAddress, ContentReference, IssuanceError, SigningKey, TxHash};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Content-addressed storage endpoint - outbound port.
///
/// `store` suspends until the remote store acknowledges storage.
/// Byte-identical content yields the same reference.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store bytes, returning a stable content reference.
    async fn store(&self, bytes: &[u8]) -> Result<ContentReference, IssuanceError>;

    /// Dereference previously stored content.
    async fn retrieve(&self, reference: &ContentReference)
        -> Result<Option<Vec<u8>>, IssuanceError>;
}

/// An unsigned mint transaction invoking
/// `mint(address to, string tokenURI)` on the ticket contract.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MintTransaction {
    /// Issuer account submitting the transaction.
    pub from: String,
    /// Ticket contract address.
    pub contract: String,
    /// Buyer the token is minted to.
    pub to: BuyerAddress,
    /// Metadata reference recorded as the token URI.
    pub token_uri: String,
    /// Account sequence number, fetched fresh at submission time.
    pub nonce: u64,
    /// Gas limit.
    pub gas_limit: u64,
    /// Gas price in gwei, estimated at submission time.
    pub gas_price_gwei: u64,
}

impl MintTransaction {
    /// Canonical byte encoding presented to the signer.
    pub fn encode(&self) -> Result<Vec<u8>, IssuanceError> {
        serde_json::to_vec(self).map_err(|e| IssuanceError::MintSubmissionFailed {
            reason: format!("transaction encoding failed: {e}"),
        })
    }

    /// Sign the transaction, consuming it.
    ///
    /// The hash is derived from the signed payload, so it is known
    /// before submission and usable for later re-queries.
    pub fn sign(self, key: &SigningKey) -> Result<SignedMintTransaction, IssuanceError> {
        let encoded = self.encode()?;
        let signature = key.sign(&encoded);

        let mut hasher = Sha256::new();
        hasher.update(&encoded);
        hasher.update(&signature);
        let digest = hasher.finalize();
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&digest);

        Ok(SignedMintTransaction {
            tx: self,
            signature,
            hash: TxHash(hash),
        })
    }
}

/// A signed mint transaction ready for submission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignedMintTransaction {
    /// The transaction body.
    pub tx: MintTransaction,
    /// Signature over the encoded body.
    pub signature: Vec<u8>,
    /// Transaction hash.
    pub hash: TxHash,
}

/// Terminal chain outcome of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainTxStatus {
    /// Executed successfully; a token was minted.
    Success {
        /// Token identifier assigned by the contract.
        token_id: u64,
    },
    /// Included but rejected by the chain.
    Reverted {
        /// Revert reason, if reported.
        reason: String,
    },
}

/// Receipt reported by the chain for an included transaction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainReceipt {
    /// Transaction hash.
    pub tx_hash: TxHash,
    /// Terminal outcome.
    pub status: ChainTxStatus,
    /// Gas consumed.
    pub gas_used: u64,
    /// Effective gas price paid, in gwei.
    pub effective_gas_price_gwei: u64,
}

/// Chain RPC endpoint - outbound port.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Current account sequence number for an address.
    async fn account_nonce(&self, address: &str) -> Result<u64, IssuanceError>;

    /// Gas price estimate in gwei.
    async fn gas_price_gwei(&self) -> Result<u64, IssuanceError>;

    /// Submit a signed transaction. Returns the accepted hash.
    async fn submit(&self, tx: &SignedMintTransaction) -> Result<TxHash, IssuanceError>;

    /// Query a receipt by transaction hash. `None` while pending.
    async fn receipt(&self, tx_hash: &TxHash) -> Result<Option<ChainReceipt>, IssuanceError>;
}

/// Wallet-pass signing service - outbound port.
///
/// Signs a serialized pass document so the resulting credential is
/// verifiable offline, without contacting this system again.
#[async_trait]
pub trait PassSigner: Send + Sync {
    /// Sign a pass document.
    async fn sign_pass(&self, signing_input: &[u8]) -> Result<Vec<u8>, IssuanceError>;

    /// Verify a detached pass signature.
    fn verify_pass(&self, signing_input: &[u8], signature: &[u8]) -> bool;
}

// Shared adapters (e.g. one simulated chain behind several services)
// satisfy the ports through Arc.

#[async_trait]
impl<T: ContentStore + ?Sized> ContentStore for std::sync::Arc<T> {
    async fn store(&self, bytes: &[u8]) -> Result<ContentReference, IssuanceError> {
        (**self).store(bytes).await
    }

    async fn retrieve(
        &self,
        reference: &ContentReference,
    ) -> Result<Option<Vec<u8>>, IssuanceError> {
        (**self).retrieve(reference).await
    }
}

#[async_trait]
impl<T: ChainRpc + ?Sized> ChainRpc for std::sync::Arc<T> {
    async fn account_nonce(&self, address: &str) -> Result<u64, IssuanceError> {
        (**self).account_nonce(address).await
    }

    async fn gas_price_gwei(&self) -> Result<u64, IssuanceError> {
        (**self).gas_price_gwei().await
    }

    async fn submit(&self, tx: &SignedMintTransaction) -> Result<TxHash, IssuanceError> {
        (**self).submit(tx).await
    }

    async fn receipt(&self, tx_hash: &TxHash) -> Result<Option<ChainReceipt>, IssuanceError> {
        (**self).receipt(tx_hash).await
    }
}

#[async_trait]
impl<T: PassSigner + ?Sized> PassSigner for std::sync::Arc<T> {
    async fn sign_pass(&self, signing_input: &[u8]) -> Result<Vec<u8>, IssuanceError> {
        (**self).sign_pass(signing_input).await
    }

    fn verify_pass(&self, signing_input: &[u8], signature: &[u8]) -> bool {
        (**self).verify_pass(signing_input, signature)
    }
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Mock pass signer for testing.
#[derive(Clone, Default)]
pub struct MockPassSigner {
    /// Should fail?
    pub should_fail: bool,
}

#[async_trait]
impl PassSigner for MockPassSigner {
    async fn sign_pass(&self, signing_input: &[u8]) -> Result<Vec<u8>, IssuanceError> {
        if self.should_fail {
            return Err(IssuanceError::WalletBuildFailed {
                reason: "mock signer failure".to_string(),
            });
        }
        Ok(Sha256::digest(signing_input).to_vec())
    }

    fn verify_pass(&self, signing_input: &[u8], signature: &[u8]) -> bool {
        Sha256::digest(signing_input).as_slice() == signature
    }
}
