pub mod dead_letter;
pub mod ingest;
pub mod lifecycle;
pub mod monitoring;
pub mod query;
