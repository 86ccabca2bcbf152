//! Backfill repair: give identifiers to rows that were stored without one.
//!
//! Rows are visited oldest first. Each lands in the bucket of its own
//! `created_at_ms`, never "today". A per-(partition, bucket) counter is seeded
//! lazily from the stored maximum. Every candidate is re-checked against the
//! store before it is written, and an occupied value is skipped, never
//! overwritten. The update itself is guarded on the row still being blank, and
//! the append-only trigger backs that up.

use std::collections::HashMap;
use std::time::Instant;

use rusqlite::{Connection, TransactionBehavior};
use tracing::instrument;

use crate::bucket::{BucketClock, DateBucket};
use crate::catalog::lifecycle::Catalog;
use crate::error::{CatalogError, Result, is_trigger_abort};
use crate::store::records;
use crate::types::record::stored_partition;
use crate::types::{
    ContentRecord, ManagementId, RepairAssignment, RepairMode, RepairOptions, RepairPlan,
    RepairReport,
};

type ScopeKey = (String, DateBucket);

/// In-memory counters for one pass. Only valid while the caller holds the
/// write lock that the counters were seeded under.
struct RepairPass<'a> {
    conn: &'a Connection,
    clock: BucketClock,
    sequence_width: usize,
    counters: HashMap<ScopeKey, u64>,
    skipped_collisions: usize,
}

#[derive(Debug, Default)]
struct PassOutcome {
    assignments: Vec<RepairAssignment>,
    skipped_collisions: usize,
}

impl<'a> RepairPass<'a> {
    fn new(conn: &'a Connection, clock: BucketClock, sequence_width: usize) -> Self {
        Self {
            conn,
            clock,
            sequence_width,
            counters: HashMap::new(),
            skipped_collisions: 0,
        }
    }

    /// Next identifier for `record`, skipping values the store already holds.
    fn next_identifier(&mut self, record: &ContentRecord) -> Result<ManagementId> {
        let bucket = self.clock.bucket_for_millis(record.created_at_ms)?;
        let partition = stored_partition(record.partition_key.as_deref()).to_string();
        let key = (partition.clone(), bucket);

        // One past u32::MAX must surface as exhaustion, never as a repeat.
        let mut candidate = match self.counters.get(&key) {
            Some(next) => *next,
            None => u64::from(records::max_sequence(self.conn, &partition, bucket)?) + 1,
        };
        loop {
            let sequence = u32::try_from(candidate).map_err(|_| CatalogError::InvalidRecord {
                reason: format!("sequence space exhausted for bucket {bucket}"),
            })?;
            let id = ManagementId::format(bucket, sequence, self.sequence_width);
            if !records::identifier_exists(self.conn, &partition, &id)? {
                self.counters.insert(key, candidate + 1);
                return Ok(id);
            }
            tracing::debug!(
                catalog.partition = %partition,
                catalog.management_id = %id,
                "repair candidate already taken, skipping"
            );
            self.skipped_collisions += 1;
            candidate += 1;
        }
    }

    /// Plan (and, when `write`, persist) identifiers for `pending`, in order.
    fn run(mut self, pending: &[ContentRecord], write: bool) -> Result<PassOutcome> {
        let mut assignments = Vec::with_capacity(pending.len());
        for record in pending {
            let id = match self.next_identifier(record) {
                Ok(id) => id,
                Err(CatalogError::InvalidRecord { reason }) => {
                    tracing::warn!(
                        catalog.record_id = %record.id,
                        catalog.created_at_ms = record.created_at_ms,
                        reason = %reason,
                        "no identifier available for record, leaving it blank"
                    );
                    continue;
                }
                Err(err) => return Err(err),
            };
            if write {
                let changed = records::assign_identifier(self.conn, &record.id, &id)
                    .map_err(|err| {
                        if is_trigger_abort(&err) {
                            CatalogError::AppendOnlyViolation {
                                record_id: record.id.clone(),
                            }
                        } else {
                            err.into()
                        }
                    })?;
                if changed == 0 {
                    tracing::warn!(
                        catalog.record_id = %record.id,
                        "record gained an identifier concurrently, leaving it untouched"
                    );
                    continue;
                }
            }
            assignments.push(RepairAssignment {
                record_id: record.id.clone(),
                management_id: id.into_string(),
                partition_key: record.partition_key.clone(),
                created_at_ms: record.created_at_ms,
            });
        }
        Ok(PassOutcome {
            assignments,
            skipped_collisions: self.skipped_collisions,
        })
    }
}

impl Catalog {
    /// Assign identifiers to every record still missing one.
    ///
    /// Idempotent: a second run only sees rows the first did not finish, and
    /// rows that already carry an identifier are never touched.
    #[instrument(level = "info", skip(self, options))]
    pub fn repair(&mut self, options: RepairOptions) -> Result<RepairReport> {
        let mode = options.mode.unwrap_or(self.config.repair_mode);
        let started = Instant::now();
        let outcome = match mode {
            RepairMode::SingleTransaction => self.repair_single_transaction(options.limit)?,
            RepairMode::PerRecord => self.repair_per_record(options.limit)?,
        };
        let report = RepairReport {
            updated: outcome.assignments.len(),
            skipped_collisions: outcome.skipped_collisions,
            mode,
            assignments: outcome.assignments,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        tracing::info!(
            catalog.repair_mode = ?mode,
            catalog.updated = report.updated,
            catalog.skipped_collisions = report.skipped_collisions,
            catalog.elapsed_ms = report.elapsed_ms,
            "repair finished"
        );
        Ok(report)
    }

    /// What [`repair`](Self::repair) would assign right now, without writing.
    pub fn plan_repair(&mut self) -> Result<RepairPlan> {
        let clock = self.clock;
        let width = self.config.sequence_width;
        // Deferred read transaction: one consistent snapshot, rolled back on drop.
        let tx = self.conn.transaction()?;
        let pending = records::missing_identifiers(&tx, None)?;
        let outcome = RepairPass::new(&tx, clock, width).run(&pending, false)?;
        Ok(RepairPlan {
            pending: pending.len(),
            assignments: outcome.assignments,
        })
    }

    fn repair_single_transaction(&mut self, limit: Option<usize>) -> Result<PassOutcome> {
        let clock = self.clock;
        let width = self.config.sequence_width;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let pending = records::missing_identifiers(&tx, limit)?;
        if pending.is_empty() {
            return Ok(PassOutcome::default());
        }
        tracing::debug!(catalog.pending = pending.len(), "repairing in one transaction");
        let outcome = RepairPass::new(&tx, clock, width).run(&pending, true)?;
        tx.commit()?;
        Ok(outcome)
    }

    /// Commit each assignment on its own. Counters are re-seeded under every
    /// lock acquisition, so live allocations between records are respected.
    fn repair_per_record(&mut self, limit: Option<usize>) -> Result<PassOutcome> {
        let clock = self.clock;
        let width = self.config.sequence_width;
        let pending = records::missing_identifiers(&self.conn, limit)?;
        tracing::debug!(catalog.pending = pending.len(), "repairing record by record");

        let mut outcome = PassOutcome::default();
        for record in &pending {
            let tx = self
                .conn
                .transaction_with_behavior(TransactionBehavior::Immediate)?;
            let step = RepairPass::new(&tx, clock, width).run(std::slice::from_ref(record), true)?;
            tx.commit()?;
            outcome.assignments.extend(step.assignments);
            outcome.skipped_collisions += step.skipped_collisions;
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogConfig;
    use crate::store::{initialize_schema, open_in_memory};

    fn conn() -> Connection {
        let mut conn = open_in_memory(&CatalogConfig::default()).unwrap();
        initialize_schema(&mut conn).unwrap();
        conn
    }

    fn unidentified(id: &str, at: i64) -> ContentRecord {
        ContentRecord {
            id: id.to_string(),
            management_id: None,
            partition_key: None,
            created_at_ms: at,
            manual_rank: None,
            title: None,
        }
    }

    fn clock() -> BucketClock {
        BucketClock::from_offset_seconds(0).unwrap()
    }

    // 2025-12-27T00:00:00Z
    const DAY: i64 = 1_766_793_600_000;

    #[test]
    fn skips_values_already_taken() {
        let conn = conn();
        let bucket = DateBucket::parse("251227").unwrap();
        for (id, mid) in [("x", "251227-03"), ("y", "251227-04")] {
            let mut row = unidentified(id, DAY);
            row.management_id = Some(mid.to_string());
            records::insert(&conn, &row).unwrap();
        }

        let mut pass = RepairPass::new(&conn, clock(), 2);
        // Stale seed below the stored values forces the re-check to do its job.
        pass.counters.insert((String::new(), bucket), 3);
        let id = pass.next_identifier(&unidentified("z", DAY)).unwrap();
        assert_eq!(id.as_str(), "251227-05");
        assert_eq!(pass.skipped_collisions, 2);
    }

    #[test]
    fn collision_check_ignores_padding() {
        let conn = conn();
        for (id, mid) in [("x", "251227-001"), ("y", "251227-002")] {
            let mut row = unidentified(id, DAY);
            row.management_id = Some(mid.to_string());
            records::insert(&conn, &row).unwrap();
        }

        let mut pass = RepairPass::new(&conn, clock(), 2);
        let bucket = DateBucket::parse("251227").unwrap();
        pass.counters.insert((String::new(), bucket), 1);
        let id = pass.next_identifier(&unidentified("z", DAY)).unwrap();
        assert_eq!(id.as_str(), "251227-03");
        assert_eq!(pass.skipped_collisions, 2);
    }

    #[test]
    fn last_sequence_is_used_once_then_exhausted() {
        let conn = conn();
        let bucket = DateBucket::parse("251227").unwrap();
        let mut pass = RepairPass::new(&conn, clock(), 2);
        pass.counters.insert((String::new(), bucket), u64::from(u32::MAX));

        let last = pass.next_identifier(&unidentified("a", DAY)).unwrap();
        assert_eq!(last.sequence(), u32::MAX);
        let err = pass.next_identifier(&unidentified("b", DAY)).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidRecord { .. }));
    }

    #[test]
    fn dry_run_leaves_store_untouched() {
        let conn = conn();
        records::insert(&conn, &unidentified("a", DAY)).unwrap();
        records::insert(&conn, &unidentified("b", DAY + 1)).unwrap();
        let pending = records::missing_identifiers(&conn, None).unwrap();

        let outcome = RepairPass::new(&conn, clock(), 2).run(&pending, false).unwrap();
        let planned: Vec<_> = outcome
            .assignments
            .iter()
            .map(|a| a.management_id.as_str())
            .collect();
        assert_eq!(planned, vec!["251227-01", "251227-02"]);
        assert_eq!(records::missing_identifiers(&conn, None).unwrap().len(), 2);
    }

    #[test]
    fn unbucketable_rows_are_left_alone() {
        let conn = conn();
        // 1999 is outside the two-digit-year bucket range.
        records::insert(&conn, &unidentified("ancient", 915_148_800_000)).unwrap();
        records::insert(&conn, &unidentified("fine", DAY)).unwrap();
        let pending = records::missing_identifiers(&conn, None).unwrap();

        let outcome = RepairPass::new(&conn, clock(), 2).run(&pending, true).unwrap();
        assert_eq!(outcome.assignments.len(), 1);
        assert_eq!(outcome.assignments[0].record_id, "fine");
        assert!(records::get(&conn, "ancient").unwrap().unwrap().management_id.is_none());
    }
}
