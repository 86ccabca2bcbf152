//! The `YYMMDD-NN` management identifier.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::bucket::DateBucket;
use crate::constants::{BUCKET_DIGITS, ID_SEPARATOR};

/// A well-formed management identifier: a date bucket plus a sequence number.
///
/// The rendered text is kept alongside the parsed parts so a stored value
/// round-trips exactly, whatever padding it was written with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManagementId {
    bucket: DateBucket,
    sequence: u32,
    text: String,
}

impl ManagementId {
    /// Render `bucket-sequence`, zero-padding the sequence to `width` digits.
    #[must_use]
    pub fn format(bucket: DateBucket, sequence: u32, width: usize) -> Self {
        let text = format!("{bucket}{ID_SEPARATOR}{sequence:0width$}");
        Self {
            bucket,
            sequence,
            text,
        }
    }

    /// Strictly parse a stored identifier (`YYMMDD-<digits>`).
    ///
    /// Legacy or noisy spellings are the ordering resolver's concern; the
    /// allocator only counts identifiers that pass this check.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let (bucket_part, sequence_part) = trimmed.split_once(ID_SEPARATOR)?;
        if bucket_part.len() != BUCKET_DIGITS
            || sequence_part.is_empty()
            || !sequence_part.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        let bucket = DateBucket::parse(bucket_part)?;
        let sequence = sequence_part.parse().ok()?;
        Some(Self {
            bucket,
            sequence,
            text: trimmed.to_string(),
        })
    }

    #[must_use]
    pub fn bucket(&self) -> DateBucket {
        self.bucket
    }

    #[must_use]
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for ManagementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for ManagementId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for ManagementId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("malformed management id {raw:?}")))
    }
}

/// `true` when a stored identifier counts as "missing" (NULL, empty or blank).
#[must_use]
pub fn is_blank(management_id: Option<&str>) -> bool {
    management_id.is_none_or(|value| value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket() -> DateBucket {
        DateBucket::parse("251227").unwrap()
    }

    #[test]
    fn formats_with_padding() {
        assert_eq!(ManagementId::format(bucket(), 2, 2).as_str(), "251227-02");
        assert_eq!(ManagementId::format(bucket(), 7, 3).as_str(), "251227-007");
        assert_eq!(ManagementId::format(bucket(), 123, 2).as_str(), "251227-123");
    }

    #[test]
    fn parse_accepts_any_padding() {
        let id = ManagementId::parse("251227-007").unwrap();
        assert_eq!(id.sequence(), 7);
        assert_eq!(id.bucket(), bucket());
        assert_eq!(id.to_string(), "251227-007");
    }

    #[test]
    fn parse_rejects_noise() {
        for raw in ["bad-id", "251227", "251227-", "251227-1a", "2512270-01", "251399-01"] {
            assert!(ManagementId::parse(raw).is_none(), "{raw} should not parse");
        }
    }

    #[test]
    fn blank_detection() {
        assert!(is_blank(None));
        assert!(is_blank(Some("")));
        assert!(is_blank(Some("   ")));
        assert!(!is_blank(Some("251227-01")));
    }

    #[test]
    fn serde_round_trips_text() {
        let id = ManagementId::parse("251227-05").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"251227-05\"");
        let back: ManagementId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<ManagementId>("\"bad-id\"").is_err());
    }
}
