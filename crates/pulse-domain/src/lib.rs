//! Domain types shared across all Pulse services.
//!
//! This crate contains only pure types with no framework dependencies.
//! Import anywhere; nothing here touches HTTP or the database.

pub mod id;
pub mod pagination;
pub mod status;
