//! Lifecycle management for opening a catalog database.
//!
//! Responsibilities:
//! - Open (or create) the SQLite file and apply pragmas, busy timeout included.
//! - Bootstrap the schema, uniqueness index and append-only trigger.
//! - Build the [`BucketClock`] shared by the allocator and repairer.

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::bucket::BucketClock;
use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::ordering;
use crate::store::{self, records};
use crate::types::{ContentRecord, ListQuery};

/// Handle on a catalog database.
///
/// A handle owns one SQLite connection and is meant to be used from one thread
/// at a time; concurrent writers open their own handles on the same file and
/// are serialised by SQLite's write lock, never by in-process state.
pub struct Catalog {
    pub(crate) conn: Connection,
    pub(crate) path: Option<PathBuf>,
    pub(crate) config: CatalogConfig,
    pub(crate) clock: BucketClock,
}

impl Catalog {
    /// Open the catalog at `path`, creating the file and schema if needed.
    pub fn open<P: AsRef<Path>>(path: P, config: CatalogConfig) -> Result<Self> {
        config.validate()?;
        let path_ref = path.as_ref();
        if path_ref.is_dir() {
            return Err(CatalogError::InvalidConfig {
                reason: format!("catalog path {} is a directory", path_ref.display()),
            });
        }
        let mut conn = store::open_connection(path_ref, &config)?;
        store::initialize_schema(&mut conn)?;
        let clock = config.bucket_clock()?;
        tracing::debug!(
            catalog.path = %path_ref.display(),
            catalog.utc_offset_seconds = config.utc_offset_seconds,
            "catalog opened"
        );
        Ok(Self {
            conn,
            path: Some(path_ref.to_path_buf()),
            config,
            clock,
        })
    }

    /// Private in-memory catalog, mostly useful in tests.
    pub fn open_in_memory(config: CatalogConfig) -> Result<Self> {
        config.validate()?;
        let mut conn = store::open_in_memory(&config)?;
        store::initialize_schema(&mut conn)?;
        let clock = config.bucket_clock()?;
        Ok(Self {
            conn,
            path: None,
            config,
            clock,
        })
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    #[must_use]
    pub fn bucket_clock(&self) -> BucketClock {
        self.clock
    }

    pub fn get_record(&self, record_id: &str) -> Result<ContentRecord> {
        records::get(&self.conn, record_id)?.ok_or_else(|| CatalogError::RecordNotFound {
            record_id: record_id.to_string(),
        })
    }

    /// Records in storage order.
    pub fn list_records(&self, query: &ListQuery) -> Result<Vec<ContentRecord>> {
        records::list(&self.conn, query)
    }

    /// Records in display order (see [`ordering::order`]).
    pub fn list_ordered(&self, query: &ListQuery) -> Result<Vec<ContentRecord>> {
        let fetched = records::list(&self.conn, query)?;
        Ok(ordering::order(fetched))
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("path", &self.path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
