//! Import statistics tracking.
//!
//! Tracks the number of rows handled and records written during a run.

use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Counters for one import run, or one stage of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImportStats {
    /// Rows consumed from the input sequence
    pub rows: usize,
    /// User records created
    pub users_created: usize,
    /// Company link rows written
    pub company_links: usize,
    /// Rows that failed validation
    pub failed_rows: usize,
    /// Failed entries newly written to the store
    pub failures_recorded: usize,
    /// Failures that matched an existing failed entry
    pub failures_deduplicated: usize,
    /// Bulk insert operations issued
    pub batches: usize,
}

impl ImportStats {
    /// Merge another ImportStats into this one by summing all counts.
    pub fn merge(&mut self, other: &ImportStats) {
        self.rows += other.rows;
        self.users_created += other.users_created;
        self.company_links += other.company_links;
        self.failed_rows += other.failed_rows;
        self.failures_recorded += other.failures_recorded;
        self.failures_deduplicated += other.failures_deduplicated;
        self.batches += other.batches;
    }
}
