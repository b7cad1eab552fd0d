//! Completed run output

use super::EnrichmentResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Aggregated output of one completed run, in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub completed_at: DateTime<Utc>,
    pub results: Vec<EnrichmentResult>,
}

impl RunReport {
    pub fn new(results: Vec<EnrichmentResult>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            completed_at: Utc::now(),
            results,
        }
    }

    /// Records that fell back to local content
    pub fn partial_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_partial()).count()
    }
}
