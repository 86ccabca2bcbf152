//! Date-bucket derivation.
//!
//! Allocation and repair must bucket timestamps in the same fixed offset, so the
//! offset lives in a single [`BucketClock`] value built from [`CatalogConfig`]
//! and handed to both paths.
//!
//! [`CatalogConfig`]: crate::config::CatalogConfig

use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::BUCKET_DIGITS;
use crate::error::{CatalogError, Result};

/// A `YYMMDD` date bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateBucket {
    year: u16,
    month: u8,
    day: u8,
}

impl DateBucket {
    /// Build a bucket from a full calendar date. Only 2000..=2099 is representable.
    pub fn new(year: u16, month: u8, day: u8) -> Result<Self> {
        if !(2000..=2099).contains(&year) || !(1..=12).contains(&month) || !(1..=31).contains(&day)
        {
            return Err(CatalogError::InvalidRecord {
                reason: format!("date {year:04}-{month:02}-{day:02} outside bucket range"),
            });
        }
        Ok(Self { year, month, day })
    }

    /// Parse a strict six-digit `YYMMDD` string.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() != BUCKET_DIGITS || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let yy: u16 = raw[0..2].parse().ok()?;
        let mm: u8 = raw[2..4].parse().ok()?;
        let dd: u8 = raw[4..6].parse().ok()?;
        Self::new(2000 + yy, mm, dd).ok()
    }

    #[must_use]
    pub fn year(&self) -> u16 {
        self.year
    }

    #[must_use]
    pub fn month(&self) -> u8 {
        self.month
    }

    #[must_use]
    pub fn day(&self) -> u8 {
        self.day
    }

    /// Prefix shared by every identifier in this bucket, e.g. `251227-`.
    #[must_use]
    pub fn id_prefix(&self) -> String {
        format!("{self}{}", crate::constants::ID_SEPARATOR)
    }
}

impl fmt::Display for DateBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}{:02}{:02}",
            self.year % 100,
            self.month,
            self.day
        )
    }
}

/// Maps instants to date buckets in one fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketClock {
    offset: FixedOffset,
}

impl BucketClock {
    pub fn from_offset_seconds(seconds: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(seconds).ok_or_else(|| CatalogError::InvalidConfig {
            reason: format!("utc offset {seconds}s out of range"),
        })?;
        Ok(Self { offset })
    }

    #[must_use]
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn bucket_for(&self, instant: DateTime<Utc>) -> Result<DateBucket> {
        let local = instant.with_timezone(&self.offset);
        let year = u16::try_from(local.year()).map_err(|_| CatalogError::InvalidRecord {
            reason: format!("year {} outside bucket range", local.year()),
        })?;
        // month() <= 12 and day() <= 31, both fit in u8
        let month = u8::try_from(local.month()).unwrap_or(0);
        let day = u8::try_from(local.day()).unwrap_or(0);
        DateBucket::new(year, month, day)
    }

    pub fn bucket_for_millis(&self, millis: i64) -> Result<DateBucket> {
        let instant = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| CatalogError::InvalidRecord {
                reason: format!("timestamp {millis}ms is not representable"),
            })?;
        self.bucket_for(instant)
    }
}
