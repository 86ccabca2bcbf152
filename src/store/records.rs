//! Row-level queries over `content_records`.
//!
//! Every function takes a plain `&Connection` so it runs unchanged inside a
//! `Transaction` (which derefs to one).

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::bucket::DateBucket;
use crate::error::{CatalogError, Result};
use crate::types::record::{loaded_partition, stored_partition};
use crate::types::{ContentRecord, ListQuery, ManagementId};

const RECORD_COLUMNS: &str =
    "id, management_id, partition_key, created_at_ms, manual_rank, title";

fn map_record_row(row: &Row<'_>) -> rusqlite::Result<ContentRecord> {
    Ok(ContentRecord {
        id: row.get(0)?,
        management_id: row.get(1)?,
        partition_key: loaded_partition(row.get(2)?),
        created_at_ms: row.get(3)?,
        manual_rank: row.get(4)?,
        title: row.get(5)?,
    })
}

/// `(id_bucket, id_sequence)` for a well-formed identifier, NULLs otherwise.
fn split_columns(management_id: Option<&str>) -> (Option<String>, Option<i64>) {
    management_id
        .and_then(ManagementId::parse)
        .map_or((None, None), |id| {
            (Some(id.bucket().to_string()), Some(i64::from(id.sequence())))
        })
}

pub(crate) fn insert(conn: &Connection, record: &ContentRecord) -> rusqlite::Result<()> {
    let (id_bucket, id_sequence) = split_columns(record.management_id.as_deref());
    let mut stmt = conn.prepare_cached(
        "INSERT INTO content_records
            (id, management_id, partition_key, created_at_ms, manual_rank, title,
             id_bucket, id_sequence)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    stmt.execute(params![
        record.id,
        record.management_id,
        stored_partition(record.partition_key.as_deref()),
        record.created_at_ms,
        record.manual_rank,
        record.title,
        id_bucket,
        id_sequence,
    ])?;
    Ok(())
}

/// Highest well-formed sequence stored for `bucket` in `partition`, or 0.
///
/// Compared numerically, so padding never matters: `-005` is below `-40`, and
/// `-100` is above `-99`. Legacy spellings have no split sequence and are not
/// counted.
pub(crate) fn max_sequence(conn: &Connection, partition: &str, bucket: DateBucket) -> Result<u32> {
    let mut stmt = conn.prepare_cached(
        "SELECT MAX(id_sequence) FROM content_records
         WHERE partition_key = ?1 AND id_bucket = ?2",
    )?;
    let max: Option<i64> =
        stmt.query_row(params![partition, bucket.to_string()], |row| row.get(0))?;
    let Some(max) = max else {
        return Ok(0);
    };
    u32::try_from(max).map_err(|_| CatalogError::InvalidRecord {
        reason: format!("stored sequence {max} for bucket {bucket} is out of range"),
    })
}

/// Whether `partition` already holds the sequence of `id` in its bucket, at
/// any padding.
pub(crate) fn identifier_exists(
    conn: &Connection,
    partition: &str,
    id: &ManagementId,
) -> Result<bool> {
    let mut stmt = conn.prepare_cached(
        "SELECT 1 FROM content_records
         WHERE partition_key = ?1 AND id_bucket = ?2 AND id_sequence = ?3
         LIMIT 1",
    )?;
    let found = stmt
        .query_row(
            params![partition, id.bucket().to_string(), i64::from(id.sequence())],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Rows with a NULL or blank identifier, oldest first.
pub(crate) fn missing_identifiers(
    conn: &Connection,
    limit: Option<usize>,
) -> Result<Vec<ContentRecord>> {
    let limit = limit.map_or(-1, |value| i64::try_from(value).unwrap_or(i64::MAX));
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM content_records
         WHERE management_id IS NULL OR TRIM(management_id) = ''
         ORDER BY created_at_ms ASC, rowid ASC
         LIMIT ?1"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params![limit], map_record_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Set the identifier of a row that does not have one yet.
///
/// Returns the number of rows changed: 0 means the row vanished or was
/// assigned by someone else in the meantime.
pub(crate) fn assign_identifier(
    conn: &Connection,
    record_id: &str,
    id: &ManagementId,
) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare_cached(
        "UPDATE content_records
         SET management_id = ?2, id_bucket = ?3, id_sequence = ?4
         WHERE id = ?1 AND (management_id IS NULL OR TRIM(management_id) = '')",
    )?;
    stmt.execute(params![
        record_id,
        id.as_str(),
        id.bucket().to_string(),
        i64::from(id.sequence())
    ])
}

pub(crate) fn get(conn: &Connection, record_id: &str) -> Result<Option<ContentRecord>> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM content_records WHERE id = ?1");
    let mut stmt = conn.prepare_cached(&sql)?;
    Ok(stmt.query_row(params![record_id], map_record_row).optional()?)
}

/// Rows in insertion order; callers that display them run the ordering resolver.
pub(crate) fn list(conn: &Connection, query: &ListQuery) -> Result<Vec<ContentRecord>> {
    let limit = query
        .limit
        .map_or(-1, |value| i64::try_from(value).unwrap_or(i64::MAX));
    let records = if let Some(partition) = query.partition_key.as_deref() {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM content_records
             WHERE partition_key = ?1 ORDER BY rowid ASC LIMIT ?2"
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(
            params![stored_partition(Some(partition)), limit],
            map_record_row,
        )?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    } else {
        let sql =
            format!("SELECT {RECORD_COLUMNS} FROM content_records ORDER BY rowid ASC LIMIT ?1");
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params![limit], map_record_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };
    Ok(records)
}

/// `(partition_key, management_id)` for every row, blank identifiers included.
pub(crate) fn all_identifiers(conn: &Connection) -> Result<Vec<(String, Option<String>)>> {
    let mut stmt = conn
        .prepare_cached("SELECT partition_key, management_id FROM content_records ORDER BY rowid")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
