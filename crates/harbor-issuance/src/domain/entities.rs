//! # Domain Entities
//!
//! Core entities for the issuance pipeline: the inbound request, the
//! ticket identity and its canonical metadata document, the mint
//! receipt state machine, the wallet credential bundle, and the
//! (possibly partial) issuance result.

use super::errors::IssuanceError;
use super::value_objects::{BuyerAddress, ContentReference, MintState, PassStyle, TicketId, TxHash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// MIME type for the downloadable pass bundle.
pub const PASS_MIME_TYPE: &str = "application/vnd.apple.pkpass";

/// A single issuance request, validated by the caller before entering
/// the pipeline. All session-style configuration (endpoints, keys) is
/// passed separately; this struct carries only ticket data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IssuanceRequest {
    /// Event name.
    pub event_name: String,
    /// Event start date/time.
    pub event_date: DateTime<Utc>,
    /// Venue / location.
    pub venue: String,
    /// Buyer address (`0x` + 40 hex chars).
    pub buyer_address: String,
    /// Unit price in native token units.
    pub price: f64,
    /// Maximum ticket supply for the event.
    pub max_supply: u32,
    /// Raw event image bytes.
    pub image: Vec<u8>,
    /// VIP ticket flag.
    pub vip: bool,
    /// Number of accompanying guests.
    pub guest_count: u32,
}

/// Event fields carried through the pipeline after validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
    /// Event name.
    pub name: String,
    /// Event start date/time.
    pub starts_at: DateTime<Utc>,
    /// Venue / location.
    pub venue: String,
    /// Unit price in native token units.
    pub price: f64,
    /// Maximum ticket supply.
    pub max_supply: u32,
    /// VIP ticket flag.
    pub vip: bool,
    /// Number of accompanying guests.
    pub guest_count: u32,
}

/// Typed metadata attribute (`trait_type` / `value` pair).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetadataAttribute {
    /// Attribute name.
    pub trait_type: String,
    /// Attribute value (string or number).
    pub value: serde_json::Value,
}

impl MetadataAttribute {
    /// String-valued attribute.
    pub fn text(trait_type: &str, value: impl Into<String>) -> Self {
        Self {
            trait_type: trait_type.to_string(),
            value: serde_json::Value::String(value.into()),
        }
    }

    /// Number-valued attribute.
    pub fn number(trait_type: &str, value: serde_json::Number) -> Self {
        Self {
            trait_type: trait_type.to_string(),
            value: serde_json::Value::Number(value),
        }
    }
}

/// Canonical token metadata document.
///
/// The image reference starts empty and is filled in exactly once,
/// after the image has been published; the document itself is only
/// published after that point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketMetadata {
    /// Token name.
    pub name: String,
    /// Token description.
    pub description: String,
    /// Content reference to the published event image.
    pub image: Option<ContentReference>,
    /// Typed attribute list.
    pub attributes: Vec<MetadataAttribute>,
}

impl TicketMetadata {
    /// Return a copy with the image reference filled in.
    pub fn with_image(mut self, reference: ContentReference) -> Self {
        self.image = Some(reference);
        self
    }

    /// Serialize the document for publication.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, IssuanceError> {
        serde_json::to_vec(self).map_err(|e| IssuanceError::InvalidRequest {
            reason: format!("metadata serialization failed: {e}"),
        })
    }
}

/// A ticket identity: unique id plus canonical metadata.
///
/// Created once per request and immutable thereafter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TicketIdentity {
    /// Globally unique ticket identifier.
    pub id: TicketId,
    /// Validated event fields.
    pub event: EventDetails,
    /// Canonical metadata document.
    pub metadata: TicketMetadata,
}

impl TicketIdentity {
    /// Return a copy whose metadata carries the published image reference.
    pub fn with_image_reference(mut self, reference: ContentReference) -> Self {
        self.metadata = self.metadata.with_image(reference);
        self
    }
}

/// Minimal verifying payload rendered into the scannable code.
///
/// Deterministic: the same ticket identity always serializes to the
/// same message, so re-encoding yields byte-identical payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodePayload {
    /// Ticket this payload verifies.
    pub ticket_id: TicketId,
    /// Serialized verifying message.
    pub message: String,
    /// Alt text shown when the code cannot be rendered.
    pub alt_text: String,
}

/// Receipt for a mint transaction.
///
/// Created at `Built`, driven through the state machine by the chain
/// registrar. `Confirmed` and `Reverted` are terminal; a `TimedOut`
/// receipt must be re-queried by transaction hash.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MintReceipt {
    /// Transaction hash (known at signing time).
    pub tx_hash: TxHash,
    /// Current state.
    pub state: MintState,
    /// Token identifier assigned on confirmation.
    pub token_id: Option<u64>,
    /// Gas consumed, known after a terminal chain state.
    pub gas_used: Option<u64>,
    /// Effective gas price paid.
    pub effective_gas_price: Option<u64>,
    /// When the transaction was built.
    pub built_at: DateTime<Utc>,
}

impl MintReceipt {
    /// Create a receipt for a freshly built transaction.
    pub fn new(tx_hash: TxHash) -> Self {
        Self {
            tx_hash,
            state: MintState::Built,
            token_id: None,
            gas_used: None,
            effective_gas_price: None,
            built_at: Utc::now(),
        }
    }

    /// Transition to new state, rejecting invalid transitions.
    pub fn transition_to(&mut self, next: MintState) -> Result<(), IssuanceError> {
        if !self.state.can_transition_to(next) {
            return Err(IssuanceError::InvalidTransition {
                from: format!("{:?}", self.state),
                to: format!("{next:?}"),
            });
        }
        self.state = next;
        Ok(())
    }

    /// Mark confirmed and record the assigned token id and fees.
    pub fn confirm(
        &mut self,
        token_id: u64,
        gas_used: u64,
        effective_gas_price: u64,
    ) -> Result<(), IssuanceError> {
        self.transition_to(MintState::Confirmed)?;
        self.token_id = Some(token_id);
        self.gas_used = Some(gas_used);
        self.effective_gas_price = Some(effective_gas_price);
        Ok(())
    }

    /// Mark reverted, recording gas actually burned.
    pub fn revert(&mut self, gas_used: u64) -> Result<(), IssuanceError> {
        self.transition_to(MintState::Reverted)?;
        self.gas_used = Some(gas_used);
        Ok(())
    }

    /// Whether this receipt reached a terminal chain state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Barcode block of a pass document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassBarcode {
    /// Symbology identifier.
    pub format: String,
    /// Encoded verifying message.
    pub message: String,
    /// Message encoding.
    pub message_encoding: String,
    /// Fallback text.
    pub alt_text: String,
}

/// A single display field on a pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassField {
    /// Field key.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Display value.
    pub value: String,
}

impl PassField {
    /// Convenience constructor.
    pub fn new(key: &str, label: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            value: value.into(),
        }
    }
}

/// Unsigned pass document: fixed display slots plus the barcode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PassDocument {
    /// Visual styling and issuer identity.
    pub style: PassStyle,
    /// Pass description (event name).
    pub description: String,
    /// Relevant date shown by the wallet.
    pub relevant_date: DateTime<Utc>,
    /// Header display slot.
    pub header_fields: Vec<PassField>,
    /// Primary display slot.
    pub primary_fields: Vec<PassField>,
    /// Secondary display slot.
    pub secondary_fields: Vec<PassField>,
    /// Auxiliary display slot.
    pub auxiliary_fields: Vec<PassField>,
    /// Scannable code.
    pub barcode: PassBarcode,
    /// Published event image used as the pass thumbnail.
    pub thumbnail: Option<ContentReference>,
}

impl PassDocument {
    /// Canonical byte form presented to the pass signer.
    pub fn signing_input(&self) -> Result<Vec<u8>, IssuanceError> {
        serde_json::to_vec(self).map_err(|e| IssuanceError::WalletBuildFailed {
            reason: format!("pass serialization failed: {e}"),
        })
    }
}

/// A signed, self-contained wallet credential.
///
/// Immutable once built; rebuilding with changed fields produces a new
/// credential. Verifiable offline against the signer's verification key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WalletCredential {
    /// Ticket this credential is bound to.
    pub ticket_id: TicketId,
    /// The signed pass document.
    pub document: PassDocument,
    /// Detached signature over `document.signing_input()`.
    pub signature: Vec<u8>,
}

impl WalletCredential {
    /// Export the credential as a downloadable byte stream
    /// (content type [`PASS_MIME_TYPE`]).
    pub fn to_bytes(&self) -> Result<Vec<u8>, IssuanceError> {
        serde_json::to_vec(self).map_err(|e| IssuanceError::WalletBuildFailed {
            reason: format!("pass bundle serialization failed: {e}"),
        })
    }
}

/// Pipeline stage that failed to produce its artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Transaction construction or submission failed; nothing on chain.
    MintSubmissionFailed,
    /// The chain rejected the mint.
    MintReverted,
    /// Confirmation timed out; outcome unknown until re-queried.
    MintIndeterminate,
    /// Pass signing service rejected the build after the retry.
    WalletBuildFailed,
}

/// A fully issued ticket: all three artifacts are present and
/// mutually consistent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IssuanceResult {
    /// Ticket identity (metadata carries the published image reference).
    pub identity: TicketIdentity,
    /// Buyer the token was minted to.
    pub buyer: BuyerAddress,
    /// Published event image.
    pub image_ref: ContentReference,
    /// Published metadata document.
    pub metadata_ref: ContentReference,
    /// Confirmed mint receipt.
    pub receipt: MintReceipt,
    /// Signed wallet credential.
    pub credential: WalletCredential,
}

/// A partially issued ticket: the artifacts that exist so far, plus
/// the failure kind for the stage that did not complete. Carries
/// enough state to retry only the failed stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PartialIssuanceResult {
    /// Ticket identity (metadata carries the published image reference).
    pub identity: TicketIdentity,
    /// Buyer the token was (or will be) minted to.
    pub buyer: BuyerAddress,
    /// Published event image.
    pub image_ref: ContentReference,
    /// Published metadata document, reusable on mint retry.
    pub metadata_ref: ContentReference,
    /// Mint receipt if a transaction was submitted (reverted or
    /// indeterminate receipts keep their hash for re-query).
    pub receipt: Option<MintReceipt>,
    /// Wallet credential if the pass was built.
    pub credential: Option<WalletCredential>,
    /// Stage that failed.
    pub failure: FailureKind,
    /// Failure detail for operators.
    pub detail: String,
}

/// Outcome of an issuance run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum IssuanceOutcome {
    /// All artifacts produced.
    Complete(IssuanceResult),
    /// Some artifacts produced; the rest can be retried individually.
    Partial(PartialIssuanceResult),
}

impl IssuanceOutcome {
    /// Whether every artifact was produced.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}
