use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use std::fmt;
use std::str::FromStr;

/// Identifier of a bibliographic record, assigned by the upstream catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl RecordId {
    /// Cursor value that sorts before every real record.
    pub const ZERO: RecordId = RecordId(0);
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A bibliographic record as held by the record store.
///
/// Records are immutable once stored; the embedding subsystem never writes
/// to them. The catalog may send either the English field names or the
/// legacy Spanish ones (`codigo`, `titulo`, `autor`, `resumen`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(alias = "codigo")]
    pub code: String,
    #[serde(alias = "titulo")]
    pub title: String,
    #[serde(alias = "autor")]
    pub author: String,
    /// Free-text summary; many catalog entries have none.
    #[serde(default, alias = "resumen")]
    pub summary: Option<String>,
    /// Last-modified timestamp reported by the catalog.
    #[serde(deserialize_with = "deserialize_stamp")]
    pub stamp: DateTime<Utc>,
}

impl Record {
    /// Human-readable text used as the embedding input for this record.
    ///
    /// Missing summaries render as an empty string so the shape of the text
    /// stays the same for every record.
    pub fn canonical_text(&self) -> String {
        format!(
            "Title: {}, Author: {}, Summary: {}",
            self.title,
            self.author,
            self.summary.as_deref().unwrap_or("")
        )
    }
}

/// Parse a catalog timestamp.
///
/// Accepts RFC 3339 (`2024-03-01T10:00:00Z`) and the naive
/// `YYYY-MM-DDTHH:MM:SS[.fff]` form, which is taken to be UTC.
pub fn parse_stamp(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid stamp '{s}': {e}"))
}

fn deserialize_stamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_stamp(&raw).map_err(serde::de::Error::custom)
}
