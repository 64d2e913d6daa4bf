//! # Domain Value Objects
//!
//! Immutable value types for ticket issuance.

use super::errors::IssuanceError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Serial prefix for human-readable ticket numbers.
pub const SERIAL_PREFIX: &str = "W3B";

/// Globally unique ticket identifier.
///
/// Combines a v4 UUID (collision-resistant, no central sequence
/// authority) with a short serial derived from the UUID for display
/// on passes and barcodes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId {
    /// Underlying UUID.
    pub uuid: Uuid,
    /// Human-readable serial (e.g. `W3B1A2B3C`).
    pub serial: String,
}

impl TicketId {
    /// Generate a fresh ticket id.
    pub fn generate() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// Derive a ticket id from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        let bytes = uuid.as_bytes();
        let serial = format!(
            "{}{:02X}{:02X}{:02X}",
            SERIAL_PREFIX, bytes[0], bytes[1], bytes[2]
        );
        Self { uuid, serial }
    }
}

impl std::fmt::Display for TicketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.serial)
    }
}

/// Checksummed-format buyer address (`0x` + 40 hex chars).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuyerAddress(String);

impl BuyerAddress {
    /// Parse and validate an address string.
    pub fn parse(raw: &str) -> Result<Self, IssuanceError> {
        let stripped = raw
            .strip_prefix("0x")
            .ok_or_else(|| IssuanceError::InvalidRequest {
                reason: format!("buyer address missing 0x prefix: {raw}"),
            })?;
        if stripped.len() != 40 || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(IssuanceError::InvalidRequest {
                reason: format!("buyer address is not 20 hex bytes: {raw}"),
            });
        }
        Ok(Self(format!("0x{}", stripped.to_ascii_lowercase())))
    }

    /// Address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BuyerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable, location-independent content locator.
///
/// References are derived from the content itself (`cas://<sha256-hex>`),
/// so byte-identical publishes yield identical references.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentReference(String);

impl ContentReference {
    /// URI scheme for content-addressed references.
    pub const SCHEME: &'static str = "cas://";

    /// Build a reference from a SHA-256 digest.
    pub fn from_digest(digest: &[u8; 32]) -> Self {
        Self(format!("{}{}", Self::SCHEME, hex::encode(digest)))
    }

    /// Reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex digest portion of the reference, if well-formed.
    pub fn digest_hex(&self) -> Option<&str> {
        self.0.strip_prefix(Self::SCHEME)
    }
}

impl std::fmt::Display for ContentReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chain transaction hash (32 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub [u8; 32]);

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Mint receipt state machine.
///
/// `Built -> Signed -> Submitted -> {Confirmed | Reverted | TimedOut}`.
/// A `TimedOut` receipt is indeterminate: it may still resolve to
/// `Confirmed` or `Reverted` on a later re-query, but `Confirmed` and
/// `Reverted` are terminal and never transition out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MintState {
    /// Transaction assembled, not yet signed.
    #[default]
    Built,
    /// Transaction signed, not yet submitted.
    Signed,
    /// Accepted by the RPC endpoint, awaiting a terminal chain state.
    Submitted,
    /// Included and executed successfully.
    Confirmed,
    /// Included but rejected by the chain.
    Reverted,
    /// Confirmation wait elapsed; outcome unknown until re-queried.
    TimedOut,
}

impl MintState {
    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: MintState) -> bool {
        match (self, next) {
            (Self::Built, Self::Signed) => true,
            (Self::Signed, Self::Submitted) => true,
            (Self::Submitted, Self::Confirmed) => true,
            (Self::Submitted, Self::Reverted) => true,
            (Self::Submitted, Self::TimedOut) => true,
            // Indeterminate receipts resolve on re-query.
            (Self::TimedOut, Self::Confirmed) => true,
            (Self::TimedOut, Self::Reverted) => true,
            _ => false,
        }
    }

    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Reverted)
    }
}

/// Visual styling and issuer identity for a wallet pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassStyle {
    /// Pass type identifier registered with the wallet platform.
    pub pass_type_identifier: String,
    /// Issuing organization displayed on the pass.
    pub organization_name: String,
    /// Logo text.
    pub logo_text: String,
    /// Background color.
    pub background_color: String,
    /// Foreground (text) color.
    pub foreground_color: String,
    /// Label accent color.
    pub label_color: String,
}

impl Default for PassStyle {
    fn default() -> Self {
        Self {
            pass_type_identifier: "pass.com.harborpass.event".to_string(),
            organization_name: "Web3 Yacht Events".to_string(),
            logo_text: "Web3 Yacht Events".to_string(),
            background_color: "rgb(40, 44, 52)".to_string(),
            foreground_color: "rgb(255, 255, 255)".to_string(),
            label_color: "rgb(255, 223, 0)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_id_serial_prefix() {
        let id = TicketId::generate();
        assert!(id.serial.starts_with(SERIAL_PREFIX));
        assert_eq!(id.serial.len(), SERIAL_PREFIX.len() + 6);
    }

    #[test]
    fn test_ticket_id_deterministic_from_uuid() {
        let uuid = Uuid::new_v4();
        let a = TicketId::from_uuid(uuid);
        let b = TicketId::from_uuid(uuid);
        assert_eq!(a, b);
    }

    #[test]
    fn test_buyer_address_parse_valid() {
        let addr = BuyerAddress::parse("0xABCDEF0123456789abcdef0123456789ABCDEF01").unwrap();
        assert_eq!(addr.as_str(), "0xabcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn test_buyer_address_missing_prefix_fails() {
        assert!(BuyerAddress::parse("ABCDEF0123456789abcdef0123456789ABCDEF01").is_err());
    }

    #[test]
    fn test_buyer_address_wrong_length_fails() {
        assert!(BuyerAddress::parse("0xABC").is_err());
    }

    #[test]
    fn test_content_reference_from_digest() {
        let reference = ContentReference::from_digest(&[0xAB; 32]);
        assert!(reference.as_str().starts_with("cas://"));
        assert_eq!(reference.digest_hex().unwrap().len(), 64);
    }

    #[test]
    fn test_content_reference_identical_for_identical_digest() {
        let a = ContentReference::from_digest(&[7u8; 32]);
        let b = ContentReference::from_digest(&[7u8; 32]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_tx_hash_display() {
        let hash = TxHash([0u8; 32]);
        assert!(hash.to_string().starts_with("0x00"));
    }

    #[test]
    fn test_mint_state_happy_path() {
        assert!(MintState::Built.can_transition_to(MintState::Signed));
        assert!(MintState::Signed.can_transition_to(MintState::Submitted));
        assert!(MintState::Submitted.can_transition_to(MintState::Confirmed));
    }

    #[test]
    fn test_mint_state_timed_out_resolves() {
        assert!(MintState::Submitted.can_transition_to(MintState::TimedOut));
        assert!(MintState::TimedOut.can_transition_to(MintState::Confirmed));
        assert!(MintState::TimedOut.can_transition_to(MintState::Reverted));
    }

    #[test]
    fn test_mint_state_terminal_is_sticky() {
        assert!(!MintState::Confirmed.can_transition_to(MintState::Reverted));
        assert!(!MintState::Confirmed.can_transition_to(MintState::TimedOut));
        assert!(!MintState::Reverted.can_transition_to(MintState::Confirmed));
    }

    #[test]
    fn test_mint_state_no_skipping() {
        assert!(!MintState::Built.can_transition_to(MintState::Submitted));
        assert!(!MintState::Signed.can_transition_to(MintState::Confirmed));
    }

    #[test]
    fn test_mint_state_terminal() {
        assert!(MintState::Confirmed.is_terminal());
        assert!(MintState::Reverted.is_terminal());
        assert!(!MintState::TimedOut.is_terminal());
        assert!(!MintState::Submitted.is_terminal());
    }

    #[test]
    fn test_pass_style_defaults() {
        let style = PassStyle::default();
        assert_eq!(style.background_color, "rgb(40, 44, 52)");
        assert_eq!(style.label_color, "rgb(255, 223, 0)");
    }
}
