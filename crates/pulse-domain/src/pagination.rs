//! Pagination for recent-first listings.

use serde::{Deserialize, Serialize};

/// Default and maximum number of rows a recent-first listing returns.
pub const RECENT_LIMIT_MAX: u32 = 50;

/// Window over a recent-first listing.
///
/// - `limit`: 1–50, default 50
/// - `offset`: ≥ 0, default 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentWindow {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    RECENT_LIMIT_MAX
}

impl Default for RecentWindow {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl RecentWindow {
    pub fn new(limit: u32) -> Self {
        Self { limit, offset: 0 }
    }

    /// Clamp `limit` to the valid range 1–50.
    ///
    /// Call after deserializing from query params to enforce bounds.
    pub fn clamped(self) -> Self {
        Self {
            limit: self.limit.clamp(1, RECENT_LIMIT_MAX),
            offset: self.offset,
        }
    }
}
