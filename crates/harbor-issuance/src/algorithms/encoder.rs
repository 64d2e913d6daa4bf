//! # Credential Encoding
//!
//! Serializes a minimal verifying payload (ticket id, event name,
//! date) into the scannable code embedded in passes. Encoding is
//! deterministic: the same ticket identity always yields a
//! byte-identical payload, which in turn renders to the same code.

use crate::domain::{CodePayload, IssuanceError, TicketIdentity, SERIAL_PREFIX};
use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};

/// MIME type for the rendered code image.
pub const CODE_MIME_TYPE: &str = "image/svg+xml";

/// Practical capacity in bytes of the symbology at error-correction
/// level H (version 40 binary mode).
pub const MAX_MESSAGE_BYTES: usize = 1273;

/// Minimum rendered dimensions in pixels.
const MIN_RENDER_SIZE: u32 = 256;

/// Encode a ticket identity into a scannable code payload.
///
/// Uses error-correction level H so damaged or partial scans still
/// decode. Fails with `PayloadTooLarge` if the serialized message
/// exceeds the symbology capacity; no partial payload is returned.
pub fn encode(identity: &TicketIdentity) -> Result<CodePayload, IssuanceError> {
    let message = format!(
        "{}|{}|{}|{}",
        identity.id.serial,
        identity.id.uuid,
        identity.event.name,
        identity.event.starts_at.to_rfc3339(),
    );

    if message.len() > MAX_MESSAGE_BYTES {
        return Err(IssuanceError::PayloadTooLarge {
            size: message.len(),
            max: MAX_MESSAGE_BYTES,
        });
    }

    // Prove the message fits at level H before handing it out.
    QrCode::with_error_correction_level(message.as_bytes(), EcLevel::H).map_err(|_| {
        IssuanceError::PayloadTooLarge {
            size: message.len(),
            max: MAX_MESSAGE_BYTES,
        }
    })?;

    Ok(CodePayload {
        ticket_id: identity.id.clone(),
        message,
        alt_text: format!("{} {}", SERIAL_PREFIX, identity.id.serial),
    })
}

/// Render a code payload as an SVG image (content type
/// [`CODE_MIME_TYPE`]), suitable for download by the caller.
pub fn render_svg(payload: &CodePayload) -> Result<String, IssuanceError> {
    let code = QrCode::with_error_correction_level(payload.message.as_bytes(), EcLevel::H)
        .map_err(|_| IssuanceError::PayloadTooLarge {
            size: payload.message.len(),
            max: MAX_MESSAGE_BYTES,
        })?;

    Ok(code
        .render::<svg::Color>()
        .min_dimensions(MIN_RENDER_SIZE, MIN_RENDER_SIZE)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}
