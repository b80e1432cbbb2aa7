//! # Event Type
//!
//! The sole record type of the engine: a `(key, ts, value)` triple.
//!
//! The value is an opaque byte string (a JSON document by convention, but the
//! engine never parses it). Timestamps are signed 64-bit integers, monotonic
//! milliseconds by convention; the engine treats them purely as ordering.
//! Negative timestamps are allowed, zero is not.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A stored record. Events are upserts keyed by `(key, ts)`: for a given key
/// the highest timestamp wins, ties resolve to the last writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub key: String,
    pub ts: i64,
    #[serde(with = "base64_bytes")]
    pub value: Bytes,
}

impl Event {
    pub fn new(key: impl Into<String>, ts: i64, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            ts,
            value: value.into(),
        }
    }

    /// Validate the event invariants.
    ///
    /// Keys must be non-empty and must not contain tab or newline, which are
    /// the segment file's record framing characters.
    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(Error::InvalidEvent {
                reason: "key must be non-empty".to_string(),
            });
        }
        if self.key.contains(['\t', '\n']) {
            return Err(Error::InvalidEvent {
                reason: "key must not contain tab or newline".to_string(),
            });
        }
        if self.ts == 0 {
            return Err(Error::InvalidEvent {
                reason: "ts must be non-zero".to_string(),
            });
        }
        if self.value.is_empty() {
            return Err(Error::InvalidEvent {
                reason: "value must be non-empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Serde adapter storing opaque value bytes as a base64 string, so events
/// round-trip losslessly through line-oriented JSON (WAL records, DTOs).
pub mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_well_formed() {
        let event = Event::new("sensor-1", 1700000000000, r#"{"v":1}"#.as_bytes().to_vec());
        assert!(event.validate().is_ok());
    }

    #[test]
    fn test_validate_allows_negative_ts() {
        let event = Event::new("k", -5, b"x".to_vec());
        assert!(event.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_events() {
        let cases = vec![
            Event::new("", 1, b"x".to_vec()),
            Event::new("k", 0, b"x".to_vec()),
            Event::new("k", 1, Vec::new()),
            Event::new("a\tb", 1, b"x".to_vec()),
            Event::new("a\nb", 1, b"x".to_vec()),
        ];
        for event in cases {
            assert!(
                matches!(event.validate(), Err(Error::InvalidEvent { .. })),
                "expected rejection for {:?}",
                event
            );
        }
    }

    #[test]
    fn test_json_round_trip_preserves_value_bytes() {
        let event = Event::new("k", 42, vec![0u8, 1, 2, 255, 254]);
        let encoded = serde_json::to_string(&event).unwrap();
        let decoded: Event = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, event);
    }
}
