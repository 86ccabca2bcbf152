//! Identifier allocation on the live creation path.
//!
//! Each attempt runs `BEGIN IMMEDIATE`, reads the current maximum for the
//! (bucket, partition) scope, formats `max + 1` and inserts the row, all inside
//! one transaction. The counter is re-derived from the store on every attempt.
//! Nothing is cached between calls, so separate processes sharing the file
//! stay consistent.

use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use rusqlite::{Connection, TransactionBehavior};
use tracing::instrument;
use uuid::Uuid;

use crate::bucket::BucketClock;
use crate::catalog::lifecycle::Catalog;
use crate::error::{CatalogError, Result, is_lock_contention, is_unique_violation};
use crate::store::records;
use crate::types::record::{loaded_partition, stored_partition};
use crate::types::{ContentRecord, ManagementId, NewRecord};

/// Compute the next identifier for `partition` on the day `now_ms` falls in.
///
/// Must run inside a transaction that already holds the write lock, otherwise
/// two callers can read the same maximum.
pub(crate) fn allocate(
    conn: &Connection,
    clock: BucketClock,
    sequence_width: usize,
    now_ms: i64,
    partition: &str,
) -> Result<ManagementId> {
    let bucket = clock.bucket_for_millis(now_ms)?;
    let current = records::max_sequence(conn, partition, bucket)?;
    let next = current
        .checked_add(1)
        .ok_or_else(|| CatalogError::InvalidRecord {
            reason: format!("sequence space exhausted for bucket {bucket}"),
        })?;
    Ok(ManagementId::format(bucket, next, sequence_width))
}

/// Errors worth another allocation attempt: lock contention, or a unique
/// violation meaning someone else committed the same value first.
fn should_retry(err: &CatalogError) -> bool {
    match err {
        CatalogError::Sqlite(inner) => is_lock_contention(inner) || is_unique_violation(inner),
        _ => false,
    }
}

fn normalize_partition(partition_key: Option<String>) -> Option<String> {
    partition_key
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Catalog {
    /// Create a record and assign its management identifier atomically.
    ///
    /// Lock contention and duplicate-key races are retried up to
    /// `max_allocation_attempts` times; after that the call fails with
    /// [`CatalogError::AllocationContention`], which is retryable. No row is
    /// written unless an identifier was assigned.
    #[instrument(
        level = "debug",
        skip(self, record),
        fields(catalog.partition = ?record.partition_key)
    )]
    pub fn create_record(&mut self, record: NewRecord) -> Result<ContentRecord> {
        let partition_key = normalize_partition(record.partition_key.clone());
        let max_attempts = self.config.max_allocation_attempts;
        let started = Instant::now();

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.try_create(&record, partition_key.as_deref()) {
                Ok(created) => {
                    tracing::debug!(
                        catalog.record_id = %created.id,
                        catalog.management_id = ?created.management_id,
                        catalog.attempts = attempt,
                        catalog.elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
                        "record created"
                    );
                    return Ok(created);
                }
                Err(err) if should_retry(&err) && attempt < max_attempts => {
                    tracing::warn!(
                        error = %err,
                        catalog.attempt = attempt,
                        catalog.max_attempts = max_attempts,
                        "identifier allocation contended, retrying"
                    );
                    let backoff = self.config.retry_backoff_ms.saturating_mul(u64::from(attempt));
                    if backoff > 0 {
                        thread::sleep(Duration::from_millis(backoff));
                    }
                }
                Err(err) if should_retry(&err) => {
                    tracing::error!(
                        error = %err,
                        catalog.attempts = attempt,
                        "identifier allocation gave up"
                    );
                    return Err(CatalogError::AllocationContention { attempts: attempt });
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn try_create(
        &mut self,
        record: &NewRecord,
        partition_key: Option<&str>,
    ) -> Result<ContentRecord> {
        let clock = self.clock;
        let width = self.config.sequence_width;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Read the clock after taking the lock so the bucket is the one valid at commit.
        let created_at_ms = record
            .created_at_ms
            .unwrap_or_else(|| Utc::now().timestamp_millis());
        let partition = stored_partition(partition_key);
        let management_id = allocate(&tx, clock, width, created_at_ms, partition)?;

        let created = ContentRecord {
            id: Uuid::new_v4().to_string(),
            management_id: Some(management_id.into_string()),
            partition_key: loaded_partition(partition.to_string()),
            created_at_ms,
            manual_rank: record.manual_rank,
            title: record.title.clone(),
        };
        records::insert(&tx, &created)?;
        tx.commit()?;
        Ok(created)
    }
}
