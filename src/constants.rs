//! Shared constants for the identifier subsystem.

/// Asia/Seoul (UTC+09:00, no daylight saving).
pub const DEFAULT_UTC_OFFSET_SECONDS: i32 = 9 * 3600;

/// Zero-padding applied to the sequence suffix on both the live and repair paths.
pub const DEFAULT_SEQUENCE_WIDTH: usize = 2;
pub const MAX_SEQUENCE_WIDTH: usize = 6;

pub const DEFAULT_MAX_ALLOCATION_ATTEMPTS: u32 = 5;
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 10;

/// Separator between the date bucket and the sequence suffix.
pub const ID_SEPARATOR: char = '-';

/// Digits in a `YYMMDD` bucket.
pub const BUCKET_DIGITS: usize = 6;

/// Multiplier separating the date part of an ordering key from its sequence part.
/// Sequences at or above this value saturate.
pub const SEQUENCE_KEY_SPAN: u64 = 1_000_000;

/// Current on-disk schema version, stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 2;
