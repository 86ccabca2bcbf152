//! Read-only identifier health report.

use std::collections::BTreeMap;

use crate::catalog::lifecycle::Catalog;
use crate::error::Result;
use crate::store::records;
use crate::types::record::loaded_partition;
use crate::types::{BucketSummary, IdentifierAudit, ManagementId};

impl Catalog {
    /// Count missing and malformed identifiers and report the highest stored
    /// sequence per (partition, bucket). Never writes.
    pub fn audit_identifiers(&self) -> Result<IdentifierAudit> {
        let rows = records::all_identifiers(&self.conn)?;
        let width = self.config.sequence_width;

        let mut audit = IdentifierAudit {
            total: rows.len(),
            ..IdentifierAudit::default()
        };
        let mut scopes: BTreeMap<(String, String), (usize, u32)> = BTreeMap::new();

        for (partition, management_id) in rows {
            let Some(raw) = management_id.filter(|value| !value.trim().is_empty()) else {
                audit.missing += 1;
                continue;
            };
            let Some(id) = ManagementId::parse(&raw) else {
                audit.malformed += 1;
                continue;
            };
            audit.well_formed += 1;
            let suffix_len = id.as_str().len() - id.bucket().id_prefix().len();
            if suffix_len < width {
                audit.off_width += 1;
            }
            let entry = scopes
                .entry((partition, id.bucket().to_string()))
                .or_insert((0, 0));
            entry.0 += 1;
            entry.1 = entry.1.max(id.sequence());
        }

        audit.buckets = scopes
            .into_iter()
            .map(|((partition, bucket), (records, max_sequence))| BucketSummary {
                partition_key: loaded_partition(partition),
                bucket,
                records,
                max_sequence,
            })
            .collect();

        if !audit.is_healthy() {
            tracing::warn!(
                catalog.missing = audit.missing,
                catalog.malformed = audit.malformed,
                "identifier audit found gaps"
            );
        }
        Ok(audit)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::CatalogConfig;
    use crate::types::{ImportOptions, ImportRecord};
    use crate::Catalog;

    #[test]
    fn classifies_rows() {
        let mut catalog = Catalog::open_in_memory(CatalogConfig::default()).unwrap();
        let rows = ["251227-01", "251227-7", "251227-12", "bad-id", "", "251228-03"]
            .into_iter()
            .map(|id| ImportRecord {
                management_id: Some(id.to_string()),
                created_at_ms: 0,
                ..ImportRecord::default()
            })
            .collect();
        catalog.import_records(rows, ImportOptions::default()).unwrap();

        let audit = catalog.audit_identifiers().unwrap();
        assert_eq!(audit.total, 6);
        assert_eq!(audit.missing, 1);
        assert_eq!(audit.malformed, 1);
        assert_eq!(audit.well_formed, 4);
        assert_eq!(audit.off_width, 1);
        assert!(!audit.is_healthy());

        let first = &audit.buckets[0];
        assert_eq!(first.bucket, "251227");
        assert_eq!(first.records, 3);
        assert_eq!(first.max_sequence, 12);
        assert_eq!(audit.buckets[1].bucket, "251228");
    }
}
