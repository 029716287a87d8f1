#![allow(async_fn_in_trait)]

use crate::domain::types::Event;

/// Business logic applied to a claimed event.
///
/// An `Err` counts as one failed attempt; the lifecycle manager decides
/// whether the event is retried or dead-lettered.
pub trait EventProcessor: Send + Sync {
    async fn process(&self, event: &Event) -> Result<(), ProcessingError>;
}

/// Why a processor rejected an event. Becomes the dead-letter failure reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ProcessingError(pub String);

impl ProcessingError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}
