//! Content records and the inputs used to create them.

use serde::{Deserialize, Serialize};

use super::identifier::is_blank;

/// A catalog row as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Opaque primary key (UUID v4). Not human-facing.
    pub id: String,
    /// `YYMMDD-NN`; `None` until allocated or repaired. May hold a legacy
    /// spelling when the row came in through an import.
    #[serde(default)]
    pub management_id: Option<String>,
    #[serde(default)]
    pub partition_key: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub created_at_ms: i64,
    /// Display order declared by a bulk import.
    #[serde(default)]
    pub manual_rank: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
}

impl ContentRecord {
    #[must_use]
    pub fn has_management_id(&self) -> bool {
        !is_blank(self.management_id.as_deref())
    }
}

/// Input for the live creation path; the allocator fills in the identifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewRecord {
    /// Creation instant. `None` means "now".
    #[serde(default)]
    pub created_at_ms: Option<i64>,
    #[serde(default)]
    pub partition_key: Option<String>,
    #[serde(default)]
    pub manual_rank: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
}

impl NewRecord {
    #[must_use]
    pub fn builder() -> NewRecordBuilder {
        NewRecordBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewRecordBuilder {
    inner: NewRecord,
}

impl NewRecordBuilder {
    pub fn created_at_ms(mut self, millis: i64) -> Self {
        self.inner.created_at_ms = Some(millis);
        self
    }

    pub fn partition_key(mut self, partition: impl Into<String>) -> Self {
        self.inner.partition_key = Some(partition.into());
        self
    }

    pub fn manual_rank(mut self, rank: i64) -> Self {
        self.inner.manual_rank = Some(rank);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.inner.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn build(self) -> NewRecord {
        self.inner
    }
}

/// A row arriving through the bulk-import path.
///
/// Any supplied identifier is stored verbatim, legacy spellings included.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportRecord {
    #[serde(default)]
    pub management_id: Option<String>,
    #[serde(default)]
    pub partition_key: Option<String>,
    pub created_at_ms: i64,
    #[serde(default)]
    pub manual_rank: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Options for [`Catalog::import_records`](crate::Catalog::import_records).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Allocate identifiers for rows that arrive without one instead of
    /// leaving them for the repairer.
    #[serde(default)]
    pub allocate_missing: bool,
}

/// Filter for listing records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    /// `Some(p)` restricts to partition `p`; `Some("")` to unpartitioned rows.
    #[serde(default)]
    pub partition_key: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Normalise an optional partition key to its stored form (`""` = unpartitioned).
pub(crate) fn stored_partition(partition_key: Option<&str>) -> &str {
    partition_key.map_or("", str::trim)
}

/// Inverse of [`stored_partition`].
pub(crate) fn loaded_partition(stored: String) -> Option<String> {
    if stored.is_empty() { None } else { Some(stored) }
}
