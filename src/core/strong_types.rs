// Strong Types - newtypes for identifiers and timestamps stored in documents

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Strongly-typed document ID - the `_id` of every stored document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(Uuid);

impl DocId {
    /// Generate a fresh random ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an ID coming from a request, rejecting malformed input
    pub fn parse(raw: &str, what: &str) -> AppResult<Self> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| AppError::Validation(format!("Invalid {}", what)))
    }

    /// Parse an optional ID; blank input is treated as absent
    pub fn parse_optional(raw: Option<&str>, what: &str) -> AppResult<Option<Self>> {
        match raw.map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Self::parse(raw, what).map(Some),
        }
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DocId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for DocId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, "identifier")
    }
}

impl From<Uuid> for DocId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<DocId> for serde_json::Value {
    fn from(id: DocId) -> Self {
        serde_json::Value::String(id.to_string())
    }
}

/// Document timestamp. Always rendered with microsecond precision so that the
/// string form sorts the same way as the instant it represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    pub fn to_document_string(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_document_string())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for serde_json::Value {
    fn from(ts: Timestamp) -> Self {
        serde_json::Value::String(ts.to_document_string())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_document_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_doc_id_roundtrip_and_rejects_garbage() {
        let id = DocId::new();
        let parsed = DocId::parse(&id.to_string(), "videoId").unwrap();
        assert_eq!(id, parsed);

        let err = DocId::parse("65f1c0ffee", "videoId").unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Invalid videoId");
    }

    #[test]
    fn test_parse_optional_treats_blank_as_absent() {
        assert_eq!(DocId::parse_optional(None, "userId").unwrap(), None);
        assert_eq!(DocId::parse_optional(Some("  "), "userId").unwrap(), None);
        assert!(DocId::parse_optional(Some("nope"), "userId").is_err());
    }

    #[test]
    fn test_timestamp_strings_sort_chronologically() {
        let early = Timestamp::from(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let late = Timestamp::from(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::microseconds(1500),
        );
        assert_eq!(early.to_document_string(), "2024-01-01T00:00:00.000000Z");
        assert!(early.to_document_string() < late.to_document_string());

        let back: Timestamp = serde_json::from_value(late.into()).unwrap();
        assert_eq!(back, late);
    }
}
