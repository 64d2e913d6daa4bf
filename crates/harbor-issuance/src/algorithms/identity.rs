//! # Ticket Identity Generation
//!
//! Turns a validated issuance request into a globally unique ticket
//! identity with its canonical metadata document. Pure apart from the
//! entropy used for the identifier: no I/O, fails only on malformed
//! input.

use crate::domain::{
    BuyerAddress, EventDetails, IssuanceError, IssuanceRequest, MetadataAttribute, TicketId,
    TicketIdentity, TicketMetadata,
};

/// Validate request fields, returning the parsed buyer address.
pub fn validate(request: &IssuanceRequest) -> Result<BuyerAddress, IssuanceError> {
    if request.event_name.trim().is_empty() {
        return Err(IssuanceError::InvalidRequest {
            reason: "event name is empty".to_string(),
        });
    }
    if request.venue.trim().is_empty() {
        return Err(IssuanceError::InvalidRequest {
            reason: "venue is empty".to_string(),
        });
    }
    if request.max_supply == 0 {
        return Err(IssuanceError::InvalidRequest {
            reason: "max supply must be at least 1".to_string(),
        });
    }
    if !request.price.is_finite() || request.price <= 0.0 {
        return Err(IssuanceError::InvalidRequest {
            reason: format!("price must be positive, got {}", request.price),
        });
    }
    if request.image.is_empty() {
        return Err(IssuanceError::InvalidRequest {
            reason: "image bytes are empty".to_string(),
        });
    }
    BuyerAddress::parse(&request.buyer_address)
}

/// Generate a ticket identity for a request.
///
/// The identifier is a fresh v4 UUID; everything else is a
/// deterministic function of the request fields. The metadata image
/// reference is left empty until the image has been published.
pub fn generate(request: &IssuanceRequest) -> Result<TicketIdentity, IssuanceError> {
    validate(request)?;

    let id = TicketId::generate();
    let event = EventDetails {
        name: request.event_name.clone(),
        starts_at: request.event_date,
        venue: request.venue.clone(),
        price: request.price,
        max_supply: request.max_supply,
        vip: request.vip,
        guest_count: request.guest_count,
    };
    let metadata = build_metadata(&id, &event)?;

    Ok(TicketIdentity { id, event, metadata })
}

/// Build the canonical metadata document for a ticket.
fn build_metadata(id: &TicketId, event: &EventDetails) -> Result<TicketMetadata, IssuanceError> {
    let price = serde_json::Number::from_f64(event.price).ok_or_else(|| {
        IssuanceError::InvalidRequest {
            reason: format!("price is not representable: {}", event.price),
        }
    })?;

    Ok(TicketMetadata {
        name: event.name.clone(),
        description: format!("Access to the exclusive {}.", event.name),
        image: None,
        attributes: vec![
            MetadataAttribute::text("Event", event.name.clone()),
            MetadataAttribute::text("Date", event.starts_at.to_rfc3339()),
            MetadataAttribute::text("Location", event.venue.clone()),
            MetadataAttribute::text("Ticket", id.serial.clone()),
            MetadataAttribute::number("Price", price),
            MetadataAttribute::number("Max Supply", event.max_supply.into()),
        ],
    })
}
