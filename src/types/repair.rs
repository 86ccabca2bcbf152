//! Backfill repair options and reports.

use serde::{Deserialize, Serialize};

/// How a repair run commits its work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairMode {
    /// One transaction for the whole run; any failure rolls everything back.
    #[default]
    SingleTransaction,
    /// Commit each assignment separately. An interrupted run keeps what it
    /// committed and the next run continues with the rows still missing an id.
    PerRecord,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepairOptions {
    /// Overrides the configured mode for this run.
    #[serde(default)]
    pub mode: Option<RepairMode>,
    /// Maximum rows to touch in this run.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// One identifier the repairer assigned (or would assign, in a plan).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairAssignment {
    pub record_id: String,
    pub management_id: String,
    #[serde(default)]
    pub partition_key: Option<String>,
    pub created_at_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairReport {
    pub updated: usize,
    /// Counter values skipped because the store already held them.
    pub skipped_collisions: usize,
    pub mode: RepairMode,
    pub assignments: Vec<RepairAssignment>,
    pub elapsed_ms: u64,
}

impl RepairReport {
    #[must_use]
    pub fn to_response(&self) -> RepairResponse {
        RepairResponse {
            ok: true,
            updated: self.updated,
        }
    }
}

/// Dry-run output of [`Catalog::plan_repair`](crate::Catalog::plan_repair).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepairPlan {
    pub pending: usize,
    pub assignments: Vec<RepairAssignment>,
}

impl RepairPlan {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Body returned to the administrative maintenance trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairResponse {
    pub ok: bool,
    pub updated: usize,
}

impl RepairResponse {
    #[must_use]
    pub fn failed() -> Self {
        Self {
            ok: false,
            updated: 0,
        }
    }
}
