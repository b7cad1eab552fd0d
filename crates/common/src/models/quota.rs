//! Per-user remaining-credits snapshot

use serde::{Deserialize, Serialize};

/// Remaining enrichment credits of one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    pub remaining: u32,
    pub unlimited: bool,
}

impl QuotaState {
    pub fn limited(remaining: u32) -> Self {
        Self {
            remaining,
            unlimited: false,
        }
    }

    pub fn unlimited() -> Self {
        Self {
            remaining: 0,
            unlimited: true,
        }
    }

    /// Whether another run may start
    pub fn allows_run(&self) -> bool {
        self.unlimited || self.remaining > 0
    }
}
