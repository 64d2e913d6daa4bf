//! # Wallet Pass Assembly
//!
//! Populates the fixed display slots of a pass document from a ticket
//! identity and embeds the scannable code unchanged. Owns the one
//! integrity invariant of the credential builder: the identity and the
//! code payload must reference the same ticket.

use crate::domain::{
    CodePayload, ContentReference, IssuanceError, PassBarcode, PassDocument, PassField,
    PassStyle, TicketIdentity,
};

/// Barcode symbology identifier used on passes.
const BARCODE_FORMAT: &str = "PKBarcodeFormatQR";

/// Barcode message encoding.
const BARCODE_ENCODING: &str = "iso-8859-1";

/// Assemble an unsigned pass document.
///
/// Fails with `MismatchedCredential` when the code payload embeds a
/// different ticket id than the identity.
pub fn build_document(
    identity: &TicketIdentity,
    code: &CodePayload,
    style: &PassStyle,
    thumbnail: Option<ContentReference>,
) -> Result<PassDocument, IssuanceError> {
    if code.ticket_id != identity.id {
        return Err(IssuanceError::MismatchedCredential {
            identity_id: identity.id.serial.clone(),
            payload_id: code.ticket_id.serial.clone(),
        });
    }

    let event = &identity.event;
    let showtime = event.starts_at.format("%-m/%-d/%y, %-I:%M%p").to_string();
    let door_time = event.starts_at.format("%-I:%M%p").to_string();

    Ok(PassDocument {
        style: style.clone(),
        description: event.name.clone(),
        relevant_date: event.starts_at,
        header_fields: vec![PassField::new("time", "", door_time)],
        primary_fields: vec![PassField::new("yacht", "YACHT NAME", event.name.clone())],
        secondary_fields: vec![
            PassField::new("showtime", "SHOWTIME", showtime),
            PassField::new("inclusive", "INCLUSIVE", "ALL"),
        ],
        auxiliary_fields: vec![
            PassField::new("vip", "VIP", if event.vip { "YES" } else { "NO" }),
            PassField::new("guests", "GUEST", event.guest_count.to_string()),
        ],
        barcode: PassBarcode {
            format: BARCODE_FORMAT.to_string(),
            message: code.message.clone(),
            message_encoding: BARCODE_ENCODING.to_string(),
            alt_text: code.alt_text.clone(),
        },
        thumbnail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{encoder, identity};
    use crate::domain::IssuanceRequest;
    use chrono::{TimeZone, Utc};

    fn test_identity() -> TicketIdentity {
        identity::generate(&IssuanceRequest {
            event_name: "Regatta Gala".to_string(),
            event_date: Utc.with_ymd_and_hms(2025, 6, 1, 19, 40, 0).unwrap(),
            venue: "Miami Marina".to_string(),
            buyer_address: "0xABCDEF0123456789abcdef0123456789ABCDEF01".to_string(),
            price: 0.5,
            max_supply: 100,
            image: vec![1, 2, 3],
            vip: true,
            guest_count: 2,
        })
        .unwrap()
    }

    #[test]
    fn test_primary_field_is_event_name() {
        let identity = test_identity();
        let code = encoder::encode(&identity).unwrap();
        let doc = build_document(&identity, &code, &PassStyle::default(), None).unwrap();
        assert_eq!(doc.primary_fields[0].value, "Regatta Gala");
        assert_eq!(doc.primary_fields[0].label, "YACHT NAME");
    }

    #[test]
    fn test_secondary_and_auxiliary_slots() {
        let identity = test_identity();
        let code = encoder::encode(&identity).unwrap();
        let doc = build_document(&identity, &code, &PassStyle::default(), None).unwrap();

        assert_eq!(doc.secondary_fields[0].key, "showtime");
        assert_eq!(doc.secondary_fields[0].value, "6/1/25, 7:40PM");
        assert_eq!(doc.secondary_fields[1].value, "ALL");
        assert_eq!(doc.auxiliary_fields[0].value, "YES");
        assert_eq!(doc.auxiliary_fields[1].value, "2");
    }

    #[test]
    fn test_barcode_embeds_code_unchanged() {
        let identity = test_identity();
        let code = encoder::encode(&identity).unwrap();
        let doc = build_document(&identity, &code, &PassStyle::default(), None).unwrap();
        assert_eq!(doc.barcode.message, code.message);
        assert_eq!(doc.barcode.format, "PKBarcodeFormatQR");
        assert_eq!(doc.barcode.alt_text, format!("W3B {}", identity.id.serial));
    }

    #[test]
    fn test_mismatched_ticket_id_rejected() {
        let identity = test_identity();
        let other = test_identity();
        let foreign_code = encoder::encode(&other).unwrap();
        match build_document(&identity, &foreign_code, &PassStyle::default(), None) {
            Err(IssuanceError::MismatchedCredential {
                identity_id,
                payload_id,
            }) => {
                assert_eq!(identity_id, identity.id.serial);
                assert_eq!(payload_id, other.id.serial);
            }
            other => panic!("expected MismatchedCredential, got {other:?}"),
        }
    }

    #[test]
    fn test_thumbnail_carried_into_document() {
        let identity = test_identity();
        let code = encoder::encode(&identity).unwrap();
        let thumbnail = ContentReference::from_digest(&[3u8; 32]);
        let doc =
            build_document(&identity, &code, &PassStyle::default(), Some(thumbnail.clone()))
                .unwrap();
        assert_eq!(doc.thumbnail, Some(thumbnail));
    }
}
