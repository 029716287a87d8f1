pub mod processor;
pub mod repository;
pub mod types;
