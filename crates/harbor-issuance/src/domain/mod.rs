//! # Domain Module
//!
//! Core domain types for ticket issuance.

pub mod entities;
pub mod errors;
pub mod secure_key;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use secure_key::SigningKey;
pub use value_objects::*;
