//! # Algorithms Module
//!
//! Pure pipeline stages: identity generation and credential encoding.

pub mod encoder;
pub mod identity;

pub use encoder::{encode, render_svg, CODE_MIME_TYPE, MAX_MESSAGE_BYTES};
pub use identity::{generate, validate};
