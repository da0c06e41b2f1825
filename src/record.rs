use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::Entry;

/// A key/value pair as it is exposed by the API.
///
/// `created_at` is derived from the version token of the last write to `key`, so it tracks
/// the time of the most recent write, not the first one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// the key
    pub key: String,
    /// the value
    pub value: String,
    /// time of the last write, serialized as an RFC 3339 timestamp
    pub created_at: DateTime<Utc>,
}

impl Record {
    /// builds a record from a `key`, `value` and the `version` token of its last write
    pub fn new(key: impl Into<String>, value: impl Into<String>, version: u64) -> Self {
        Record {
            key: key.into(),
            value: value.into(),
            created_at: version_to_timestamp(version),
        }
    }

    /// builds a record from raw engine bytes. Bytes that are not valid UTF-8 are replaced
    /// rather than rejected.
    pub fn from_raw(key: &[u8], value: &[u8], version: u64) -> Self {
        Record::new(
            String::from_utf8_lossy(key),
            String::from_utf8_lossy(value),
            version,
        )
    }
}

impl From<Entry> for Record {
    fn from(entry: Entry) -> Self {
        Record::from_raw(&entry.key, &entry.value, entry.version)
    }
}

/// interprets a version token as seconds since the Unix epoch
fn version_to_timestamp(version: u64) -> DateTime<Utc> {
    i64::try_from(version)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_read_as_unix_seconds() {
        let record = Record::new("k", "v", 1_700_000_000);
        assert_eq!(record.created_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn out_of_range_version_falls_back_to_epoch() {
        let record = Record::new("k", "v", u64::MAX);
        assert_eq!(record.created_at.timestamp(), 0);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let record = Record::from_raw(b"key", &[0x66, 0xff, 0x6f], 0);
        assert_eq!(record.key, "key");
        assert_eq!(record.value, "f\u{fffd}o");
    }

    #[test]
    fn serializes_created_at_as_rfc3339() {
        let record = Record::new("x", "1", 0);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["key"], "x");
        assert_eq!(json["value"], "1");
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");
    }
}
