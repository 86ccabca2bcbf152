//! Display ordering for batches of content records.
//!
//! Records reach the read path from different creation routes: bulk imports
//! that declare a manual rank, live inserts that only carry a management id,
//! and legacy rows with neither (or with an id in some older spelling). The
//! resolver ranks them through a fixed pipeline of tagged stages. Each stage is
//! consulted only when every earlier stage tied:
//!
//! 1. [`OrderingStage::ManualRank`]: ranked before unranked, then ascending rank.
//! 2. [`OrderingStage::ManagementId`]: parsed ids before unparsed, then the
//!    most recent bucket/sequence first.
//! 3. [`OrderingStage::CreatedAt`]: newest first.
//! 4. [`OrderingStage::Fingerprint`]: a stable hash of unparsable ids, so
//!    garbage orders the same way on every run.
//!
//! Whatever still ties keeps its input order (the sort is stable).
//!
//! Nothing here touches the store and nothing here fails. An identifier that
//! cannot be read degrades to [`SortKey::Fingerprint`].

use std::cmp::Ordering;

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::constants::SEQUENCE_KEY_SPAN;
use crate::types::ContentRecord;

/// ASCII digit runs only: the date and sequence are sliced by byte offset.
fn digit_run() -> Option<&'static Regex> {
    static DIGIT_RUN: OnceCell<std::result::Result<Regex, String>> = OnceCell::new();
    let regex = DIGIT_RUN.get_or_init(|| Regex::new(r"[0-9]+").map_err(|err| err.to_string()));
    match regex {
        Ok(re) => Some(re),
        Err(msg) => {
            tracing::error!(error = %msg, "digit run regex init failed");
            None
        }
    }
}

/// Fields the resolver reads from a record.
pub trait OrderingFields {
    fn manual_rank(&self) -> Option<i64>;
    fn management_id(&self) -> Option<&str>;
    fn created_at_ms(&self) -> i64;
}

impl OrderingFields for ContentRecord {
    fn manual_rank(&self) -> Option<i64> {
        self.manual_rank
    }

    fn management_id(&self) -> Option<&str> {
        self.management_id.as_deref()
    }

    fn created_at_ms(&self) -> i64 {
        self.created_at_ms
    }
}

impl<T: OrderingFields + ?Sized> OrderingFields for &T {
    fn manual_rank(&self) -> Option<i64> {
        (**self).manual_rank()
    }

    fn management_id(&self) -> Option<&str> {
        (**self).management_id()
    }

    fn created_at_ms(&self) -> i64 {
        (**self).created_at_ms()
    }
}

/// What an identifier string contributes to ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// `YYYYMMDD * SEQUENCE_KEY_SPAN + sequence`.
    Parsed(u64),
    /// Non-empty but unreadable: a deterministic hash, not a recency signal.
    Fingerprint(u64),
    /// NULL, empty or blank.
    Missing,
}

impl SortKey {
    #[must_use]
    pub fn parsed(&self) -> Option<u64> {
        match self {
            Self::Parsed(key) => Some(*key),
            _ => None,
        }
    }
}

/// One comparison stage of the ordering pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingStage {
    ManualRank,
    ManagementId,
    CreatedAt,
    Fingerprint,
}

/// Stages in priority order.
pub const PIPELINE: [OrderingStage; 4] = [
    OrderingStage::ManualRank,
    OrderingStage::ManagementId,
    OrderingStage::CreatedAt,
    OrderingStage::Fingerprint,
];

/// Per-record inputs, resolved once before sorting.
#[derive(Debug, Clone, Copy)]
struct ResolvedKeys {
    manual_rank: Option<i64>,
    id_key: SortKey,
    created_at_ms: i64,
}

impl ResolvedKeys {
    fn of<T: OrderingFields>(record: &T) -> Self {
        Self {
            manual_rank: record.manual_rank(),
            id_key: parse_sort_key(record.management_id()),
            created_at_ms: record.created_at_ms(),
        }
    }
}

impl OrderingStage {
    fn compare(self, a: &ResolvedKeys, b: &ResolvedKeys) -> Ordering {
        match self {
            Self::ManualRank => match (a.manual_rank, b.manual_rank) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            Self::ManagementId => match (a.id_key, b.id_key) {
                (SortKey::Parsed(x), SortKey::Parsed(y)) => y.cmp(&x),
                (SortKey::Parsed(_), _) => Ordering::Less,
                (_, SortKey::Parsed(_)) => Ordering::Greater,
                _ => Ordering::Equal,
            },
            Self::CreatedAt => b.created_at_ms.cmp(&a.created_at_ms),
            Self::Fingerprint => match (a.id_key, b.id_key) {
                (SortKey::Fingerprint(x), SortKey::Fingerprint(y)) => x.cmp(&y),
                (SortKey::Fingerprint(_), SortKey::Missing) => Ordering::Less,
                (SortKey::Missing, SortKey::Fingerprint(_)) => Ordering::Greater,
                _ => Ordering::Equal,
            },
        }
    }
}

fn compare_keys(a: &ResolvedKeys, b: &ResolvedKeys) -> Ordering {
    PIPELINE
        .iter()
        .map(|stage| stage.compare(a, b))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Compare two records under the display ordering.
pub fn compare<T: OrderingFields>(a: &T, b: &T) -> Ordering {
    compare_keys(&ResolvedKeys::of(a), &ResolvedKeys::of(b))
}

/// Return `records` in display order. Ties keep their input order.
pub fn order<T: OrderingFields>(records: Vec<T>) -> Vec<T> {
    let mut keyed: Vec<(ResolvedKeys, T)> = records
        .into_iter()
        .map(|record| (ResolvedKeys::of(&record), record))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b));
    keyed.into_iter().map(|(_, record)| record).collect()
}

/// Ordering key for an identifier string.
///
/// Accepts `YYMMDD` and `YYYYMMDD` date prefixes, with or without a separator,
/// and digit runs buried in alphabetic noise (`v251227x03`).
#[must_use]
pub fn parse_sort_key(management_id: Option<&str>) -> SortKey {
    let Some(raw) = management_id.map(str::trim).filter(|value| !value.is_empty()) else {
        return SortKey::Missing;
    };
    if let Some(parts) = parse_parts(raw) {
        return SortKey::Parsed(parts.key());
    }
    tracing::debug!(
        catalog.management_id = raw,
        "unparsable management id, using fingerprint"
    );
    SortKey::Fingerprint(fingerprint(raw))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IdParts {
    year: u32,
    month: u32,
    day: u32,
    sequence: u64,
}

impl IdParts {
    fn key(&self) -> u64 {
        let date = u64::from(self.year * 10_000 + self.month * 100 + self.day);
        date * SEQUENCE_KEY_SPAN + self.sequence.min(SEQUENCE_KEY_SPAN - 1)
    }
}

fn parse_parts(raw: &str) -> Option<IdParts> {
    let runs: Vec<&str> = digit_run()?.find_iter(raw).map(|m| m.as_str()).collect();
    let first = *runs.first()?;

    if runs.len() >= 2 {
        if let Some((year, month, day)) = parse_date(first) {
            return Some(IdParts {
                year,
                month,
                day,
                sequence: saturating_digits(runs[1]),
            });
        }
    }

    split_concatenated(&runs.concat())
}

/// Best-effort split of one digit string into date + sequence.
///
/// An eight-digit `19xx`/`20xx` date wins over a six-digit one when both read
/// as valid dates; whatever follows the date is the sequence (0 when absent).
fn split_concatenated(digits: &str) -> Option<IdParts> {
    let candidates: [usize; 2] = [8, 6];
    for width in candidates {
        if digits.len() < width {
            continue;
        }
        if width == 8 && !(digits.starts_with("19") || digits.starts_with("20")) {
            continue;
        }
        let Some((year, month, day)) = parse_date(&digits[..width]) else {
            continue;
        };
        let rest = &digits[width..];
        let sequence = if rest.is_empty() {
            0
        } else {
            saturating_digits(rest)
        };
        return Some(IdParts {
            year,
            month,
            day,
            sequence,
        });
    }
    None
}

fn parse_date(digits: &str) -> Option<(u32, u32, u32)> {
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (year, rest) = match digits.len() {
        6 => (2000 + digits[0..2].parse::<u32>().ok()?, &digits[2..]),
        8 => (digits[0..4].parse::<u32>().ok()?, &digits[4..]),
        _ => return None,
    };
    let month: u32 = rest[0..2].parse().ok()?;
    let day: u32 = rest[2..4].parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some((year, month, day))
}

fn saturating_digits(digits: &str) -> u64 {
    digits.parse::<u64>().unwrap_or(u64::MAX)
}

fn fingerprint(raw: &str) -> u64 {
    let digest = blake3::hash(raw.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(prefix)
}
