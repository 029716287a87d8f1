//! Newtype wrappers for domain identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix of every server-generated event id.
pub const EVENT_ID_PREFIX: &str = "evt-";

/// Identifies an event. Immutable once assigned.
///
/// Server-generated ids are `evt-<uuid v7>`: time-ordered and collision
/// resistant across concurrent submitters. Clients may supply their own id,
/// in which case any non-empty string is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventId(String);

impl EventId {
    /// Generate a fresh `evt-<uuid v7>` identifier.
    pub fn generate() -> Self {
        Self(format!("{EVENT_ID_PREFIX}{}", Uuid::now_v7()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Rejected event id (empty or whitespace only).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("event id must not be empty")]
pub struct EmptyEventId;

impl TryFrom<String> for EventId {
    type Error = EmptyEventId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().is_empty() {
            return Err(EmptyEventId);
        }
        Ok(Self(value))
    }
}

impl From<EventId> for String {
    fn from(id: EventId) -> Self {
        id.0
    }
}

impl FromStr for EventId {
    type Err = EmptyEventId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies an alert record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertId(pub Uuid);

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AlertId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Uuid> for AlertId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}
