//! Bulk-import path.
//!
//! Imported rows keep whatever identifier they arrive with, legacy spellings
//! included, along with their declared manual rank. Rows without an identifier
//! either stay blank for the repairer or, with `allocate_missing`, go through
//! the same allocation as live inserts. The whole batch is one transaction.

use rusqlite::TransactionBehavior;
use tracing::instrument;
use uuid::Uuid;

use crate::catalog::allocate::allocate;
use crate::catalog::lifecycle::Catalog;
use crate::error::{CatalogError, Result, is_unique_violation};
use crate::store::records;
use crate::types::record::{loaded_partition, stored_partition};
use crate::types::{ContentRecord, ImportOptions, ImportRecord, is_blank};

impl Catalog {
    #[instrument(level = "info", skip(self, rows), fields(catalog.rows = rows.len()))]
    pub fn import_records(
        &mut self,
        rows: Vec<ImportRecord>,
        options: ImportOptions,
    ) -> Result<Vec<ContentRecord>> {
        let clock = self.clock;
        let width = self.config.sequence_width;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut imported = Vec::with_capacity(rows.len());
        let mut allocated = 0usize;
        for row in rows {
            let partition = stored_partition(row.partition_key.as_deref()).to_string();
            let management_id = if is_blank(row.management_id.as_deref()) {
                if options.allocate_missing {
                    allocated += 1;
                    Some(allocate(&tx, clock, width, row.created_at_ms, &partition)?.into_string())
                } else {
                    None
                }
            } else {
                row.management_id.map(|value| value.trim().to_string())
            };

            let record = ContentRecord {
                id: Uuid::new_v4().to_string(),
                management_id,
                partition_key: loaded_partition(partition),
                created_at_ms: row.created_at_ms,
                manual_rank: row.manual_rank,
                title: row.title,
            };
            if let Err(err) = records::insert(&tx, &record) {
                if is_unique_violation(&err) {
                    return Err(CatalogError::DuplicateIdentifier {
                        management_id: record.management_id.unwrap_or_default(),
                        partition_key: record.partition_key,
                    });
                }
                return Err(err.into());
            }
            imported.push(record);
        }
        tx.commit()?;

        tracing::info!(
            catalog.imported = imported.len(),
            catalog.allocated = allocated,
            catalog.unidentified = imported.iter().filter(|r| !r.has_management_id()).count(),
            "import committed"
        );
        Ok(imported)
    }
}
