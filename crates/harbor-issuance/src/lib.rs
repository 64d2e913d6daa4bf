//! # Harbor Issuance
//!
//! Event-ticket issuance pipeline: turns a (event, buyer, price)
//! request into three durable, mutually consistent artifacts — an
//! on-chain token, a content-addressed metadata record, and a signed
//! mobile wallet pass carrying a scannable code.
//!
//! ## Purpose
//!
//! The pipeline tolerates the failure of any one external dependency
//! without corrupting the others:
//! - Publishes are idempotent (content-addressed) and retried with
//!   backoff.
//! - Mint outcomes follow a strict state machine; indeterminate
//!   transactions are re-queryable, never silently dropped.
//! - A confirmed mint is never repeated; later stages resume from the
//!   partial result instead.
//!
//! ## Module Structure
//!
//! ```text
//! harbor-issuance/
//! ├── domain/          # Request, identity, receipt, credential, errors
//! ├── algorithms/      # Identity generation, code encoding
//! ├── ports/           # IssuanceApi, ContentStore, ChainRpc, PassSigner
//! ├── adapters/        # In-memory store, simulated chain, HMAC signer
//! └── service/         # Orchestrator: sequencing, retries, timeouts
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use algorithms::{encode, generate, render_svg, CODE_MIME_TYPE, MAX_MESSAGE_BYTES};
pub use domain::{
    BuyerAddress, CodePayload, ContentReference, EventDetails, FailureKind, IssuanceError,
    IssuanceOutcome, IssuanceRequest, IssuanceResult, MetadataAttribute, MintReceipt, MintState,
    PartialIssuanceResult, PassBarcode, PassDocument, PassField, PassStyle, SigningKey, TicketId,
    TicketIdentity, TicketMetadata, TxHash, WalletCredential, PASS_MIME_TYPE,
};
pub use ports::{
    ChainReceipt, ChainRpc, ChainTxStatus, ContentStore, IssuanceApi, MintTransaction,
    MockPassSigner, PassSigner, SignedMintTransaction,
};
pub use service::{CancelToken, IssuanceConfig, IssuanceService, IssuanceStats};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
