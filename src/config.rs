//! Catalog configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::bucket::BucketClock;
use crate::constants::{
    DEFAULT_LOCK_TIMEOUT_MS, DEFAULT_MAX_ALLOCATION_ATTEMPTS, DEFAULT_RETRY_BACKOFF_MS,
    DEFAULT_SEQUENCE_WIDTH, DEFAULT_UTC_OFFSET_SECONDS, MAX_SEQUENCE_WIDTH,
};
use crate::error::{CatalogError, Result};
use crate::types::RepairMode;

fn default_utc_offset_seconds() -> i32 {
    DEFAULT_UTC_OFFSET_SECONDS
}

fn default_sequence_width() -> usize {
    DEFAULT_SEQUENCE_WIDTH
}

fn default_max_allocation_attempts() -> u32 {
    DEFAULT_MAX_ALLOCATION_ATTEMPTS
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

fn default_retry_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF_MS
}

/// Tunables shared by the allocator and the repairer.
///
/// Both paths bucket timestamps through the same [`BucketClock`], derived from
/// `utc_offset_seconds`; there is no per-call override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Fixed offset used to derive `YYMMDD` buckets. Defaults to Asia/Seoul.
    #[serde(default = "default_utc_offset_seconds")]
    pub utc_offset_seconds: i32,
    /// Minimum digits in the sequence suffix.
    #[serde(default = "default_sequence_width")]
    pub sequence_width: usize,
    #[serde(default = "default_max_allocation_attempts")]
    pub max_allocation_attempts: u32,
    /// SQLite busy timeout: how long a writer waits for the lock before failing.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Linear backoff step between allocation attempts.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default)]
    pub repair_mode: RepairMode,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            utc_offset_seconds: default_utc_offset_seconds(),
            sequence_width: default_sequence_width(),
            max_allocation_attempts: default_max_allocation_attempts(),
            lock_timeout_ms: default_lock_timeout_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
            repair_mode: RepairMode::default(),
        }
    }
}

impl CatalogConfig {
    /// Load a JSON configuration file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs_err::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        tracing::debug!(
            config.path = %path.as_ref().display(),
            config.utc_offset_seconds = config.utc_offset_seconds,
            config.sequence_width = config.sequence_width,
            "catalog config loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sequence_width == 0 || self.sequence_width > MAX_SEQUENCE_WIDTH {
            return Err(CatalogError::InvalidConfig {
                reason: format!(
                    "sequence_width must be within 1..={MAX_SEQUENCE_WIDTH}, got {}",
                    self.sequence_width
                ),
            });
        }
        if self.max_allocation_attempts == 0 {
            return Err(CatalogError::InvalidConfig {
                reason: "max_allocation_attempts must be non-zero".into(),
            });
        }
        BucketClock::from_offset_seconds(self.utc_offset_seconds)?;
        Ok(())
    }

    pub fn bucket_clock(&self) -> Result<BucketClock> {
        BucketClock::from_offset_seconds(self.utc_offset_seconds)
    }

    pub fn with_utc_offset_seconds(mut self, seconds: i32) -> Self {
        self.utc_offset_seconds = seconds;
        self
    }

    pub fn with_sequence_width(mut self, width: usize) -> Self {
        self.sequence_width = width;
        self
    }

    pub fn with_max_allocation_attempts(mut self, attempts: u32) -> Self {
        self.max_allocation_attempts = attempts;
        self
    }

    pub fn with_lock_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    pub fn with_repair_mode(mut self, mode: RepairMode) -> Self {
        self.repair_mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"sequence_width": 3, "repair_mode": "per_record"}}"#).expect("write");

        let config = CatalogConfig::from_json_file(file.path()).expect("load");
        assert_eq!(config.sequence_width, 3);
        assert_eq!(config.repair_mode, RepairMode::PerRecord);
        assert_eq!(config.utc_offset_seconds, DEFAULT_UTC_OFFSET_SECONDS);
        assert_eq!(config.max_allocation_attempts, DEFAULT_MAX_ALLOCATION_ATTEMPTS);
    }

    #[test]
    fn rejects_zero_width() {
        let err = CatalogConfig::default()
            .with_sequence_width(0)
            .validate()
            .expect_err("zero width");
        assert!(matches!(err, CatalogError::InvalidConfig { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let err = CatalogConfig::from_json_file(dir.path().join("absent.json"))
            .expect_err("missing file");
        assert!(matches!(err, CatalogError::Io(_)));
    }
}
