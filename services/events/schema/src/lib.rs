//! sea-orm entities for the events service tables.

pub mod alerts;
pub mod events;
pub mod failed_events;
pub mod metrics;
