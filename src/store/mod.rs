//! SQLite sequence store: connection setup, schema and row access.
//!
//! The partial unique indexes and the append-only trigger are part of the
//! identifier contract. They reject duplicates and rewrites even if a code path
//! upstream gets the arithmetic wrong.
//!
//! Well-formed identifiers are also stored split into `id_bucket` and
//! `id_sequence`. Uniqueness and the max lookup work on that pair, so `-6`,
//! `-06` and `-006` are the same sequence whatever their padding.

pub(crate) mod records;

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags, TransactionBehavior, params};

use crate::config::CatalogConfig;
use crate::constants::SCHEMA_VERSION;
use crate::error::{CatalogError, Result};
use crate::types::ManagementId;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS content_records (
    id             TEXT PRIMARY KEY NOT NULL,
    management_id  TEXT,
    partition_key  TEXT NOT NULL DEFAULT '',
    created_at_ms  INTEGER NOT NULL,
    manual_rank    INTEGER,
    title          TEXT,
    id_bucket      TEXT,
    id_sequence    INTEGER
);

CREATE UNIQUE INDEX IF NOT EXISTS content_records_management_id_unique
    ON content_records (partition_key, management_id)
    WHERE management_id IS NOT NULL AND TRIM(management_id) <> '';

CREATE UNIQUE INDEX IF NOT EXISTS content_records_sequence_unique
    ON content_records (partition_key, id_bucket, id_sequence)
    WHERE id_sequence IS NOT NULL;

CREATE INDEX IF NOT EXISTS content_records_created_at
    ON content_records (created_at_ms);

CREATE TRIGGER IF NOT EXISTS content_records_management_id_append_only
    BEFORE UPDATE OF management_id, id_bucket, id_sequence ON content_records
    WHEN OLD.management_id IS NOT NULL
        AND TRIM(OLD.management_id) <> ''
        AND (NEW.management_id IS NOT OLD.management_id
            OR NEW.id_bucket IS NOT OLD.id_bucket
            OR NEW.id_sequence IS NOT OLD.id_sequence)
BEGIN
    SELECT RAISE(ABORT, 'management_id is append-only');
END;
";

pub(crate) fn open_connection(path: &Path, config: &CatalogConfig) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs_err::create_dir_all(parent)?;
        }
    }
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let connection = Connection::open_with_flags(path, flags)?;
    apply_pragmas(&connection, config, true)?;
    Ok(connection)
}

pub(crate) fn open_in_memory(config: &CatalogConfig) -> Result<Connection> {
    let connection = Connection::open_in_memory()?;
    apply_pragmas(&connection, config, false)?;
    Ok(connection)
}

fn apply_pragmas(connection: &Connection, config: &CatalogConfig, on_disk: bool) -> Result<()> {
    connection.busy_timeout(Duration::from_millis(config.lock_timeout_ms))?;
    if on_disk {
        // journal_mode returns the resulting mode as a row
        let mode: String =
            connection.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        tracing::debug!(store.journal_mode = %mode, "sqlite journal mode set");
    }
    connection.execute_batch("PRAGMA synchronous = NORMAL;")?;
    Ok(())
}

/// Create the schema on a fresh database, upgrade an older one, or check the
/// version of a current one.
pub(crate) fn initialize_schema(connection: &mut Connection) -> Result<()> {
    let tx = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;
    // Read under the write lock so concurrent openers do not both migrate.
    let version: i64 = tx.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version > SCHEMA_VERSION {
        return Err(CatalogError::InvalidConfig {
            reason: format!(
                "store schema version {version} is newer than supported {SCHEMA_VERSION}"
            ),
        });
    }
    if version == 1 {
        migrate_split_sequence(&tx)?;
    }
    tx.execute_batch(SCHEMA_SQL)?;
    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tx.commit()?;
    if version < SCHEMA_VERSION {
        tracing::info!(
            store.from_version = version,
            store.to_version = SCHEMA_VERSION,
            "catalog schema initialised"
        );
    }
    Ok(())
}

/// Version 1 stored identifiers as text only. Add the split columns and fill
/// them from every well-formed identifier. Fails if two stored identifiers
/// share a sequence under different padding.
fn migrate_split_sequence(connection: &Connection) -> Result<()> {
    connection.execute_batch(
        "DROP TRIGGER IF EXISTS content_records_management_id_append_only;
         ALTER TABLE content_records ADD COLUMN id_bucket TEXT;
         ALTER TABLE content_records ADD COLUMN id_sequence INTEGER;",
    )?;
    let stored: Vec<(String, String)> = {
        let mut stmt = connection.prepare(
            "SELECT id, management_id FROM content_records
             WHERE management_id IS NOT NULL AND TRIM(management_id) <> ''",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };
    let mut split = 0usize;
    for (record_id, raw) in stored {
        let Some(id) = ManagementId::parse(&raw) else {
            continue;
        };
        connection.execute(
            "UPDATE content_records SET id_bucket = ?2, id_sequence = ?3 WHERE id = ?1",
            params![record_id, id.bucket().to_string(), i64::from(id.sequence())],
        )?;
        split += 1;
    }
    tracing::info!(
        store.split_identifiers = split,
        "split stored identifiers into bucket and sequence"
    );
    Ok(())
}
