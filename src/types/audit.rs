//! Read-only identifier health report.

use serde::{Deserialize, Serialize};

/// Highest stored sequence for one (partition, bucket) scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSummary {
    #[serde(default)]
    pub partition_key: Option<String>,
    pub bucket: String,
    pub records: usize,
    pub max_sequence: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierAudit {
    pub total: usize,
    /// NULL or blank identifiers, i.e. what the next repair run would touch.
    pub missing: usize,
    pub well_formed: usize,
    /// Non-empty identifiers that do not parse as `YYMMDD-<digits>`.
    pub malformed: usize,
    /// Well-formed identifiers whose suffix width differs from the configured width
    /// (shorter only; longer suffixes are expected past the padded range).
    pub off_width: usize,
    pub buckets: Vec<BucketSummary>,
}

impl IdentifierAudit {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.missing == 0 && self.malformed == 0
    }
}
