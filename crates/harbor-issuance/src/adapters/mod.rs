//! # Adapters Module
//!
//! Concrete implementations of the outbound ports. The shipped
//! adapters are deterministic in-process stand-ins for the remote
//! services; production deployments inject their own.

pub mod chain_client;
pub mod content_store;
pub mod pass_signer;

pub use chain_client::{SimChainMode, SimChainRpc};
pub use content_store::InMemoryContentStore;
pub use pass_signer::HmacPassSigner;
