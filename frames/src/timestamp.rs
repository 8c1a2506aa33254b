//! Message timestamps.
//!
//! Timestamps travel as epoch milliseconds. Older servers emit a formatted
//! string instead (`"Nov 21, 2019, 3:45:12 PM"`, RFC 3339, or a SQL-style
//! `"2019-11-21 15:45:12.0"`); all textual parsing lives here so the rest of
//! the client only ever sees a structured value or nothing at all.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// A point in time attached to a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(OffsetDateTime);

impl Timestamp {
    #[must_use]
    pub fn new(at: OffsetDateTime) -> Self {
        Self(at)
    }

    /// Build from epoch milliseconds. `None` when out of range.
    #[must_use]
    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        match OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000) {
            Ok(at) => Some(Self(at)),
            Err(_) => None,
        }
    }

    #[must_use]
    pub fn unix_millis(self) -> i64 {
        i64::try_from(self.0.unix_timestamp_nanos() / 1_000_000).unwrap_or(0)
    }

    #[must_use]
    pub fn as_offset_date_time(self) -> OffsetDateTime {
        self.0
    }

    /// Clock time for display, e.g. `"3:45 PM"`.
    #[must_use]
    pub fn short_time(self) -> String {
        self.0
            .format(format_description!(
                "[hour repr:12 padding:none]:[minute] [period]"
            ))
            .unwrap_or_default()
    }

    /// Decode a JSON value leniently. Anything unrecognised is `None`.
    #[must_use]
    pub fn decode(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().and_then(Self::from_unix_millis),
            Value::String(s) => Self::parse_text(s),
            _ => None,
        }
    }

    /// Parse one of the textual forms older servers emit.
    #[must_use]
    pub fn parse_text(raw: &str) -> Option<Self> {
        // Newer JDKs put a narrow no-break space before the AM/PM marker.
        let normalized = raw.replace('\u{202f}', " ");
        let text = normalized.trim();
        if text.is_empty() {
            return None;
        }

        if let Ok(millis) = text.parse::<i64>() {
            return Self::from_unix_millis(millis);
        }
        if let Ok(at) = OffsetDateTime::parse(text, &Rfc3339) {
            return Some(Self(at));
        }
        if let Ok(at) = PrimitiveDateTime::parse(
            text,
            format_description!(
                "[month repr:short] [day padding:none], [year], [hour repr:12 padding:none]:[minute]:[second] [period]"
            ),
        ) {
            return Some(Self(at.assume_utc()));
        }
        if let Ok(at) = PrimitiveDateTime::parse(
            text,
            format_description!(
                "[month repr:short] [day padding:none], [year] [hour repr:12 padding:none]:[minute]:[second] [period]"
            ),
        ) {
            return Some(Self(at.assume_utc()));
        }

        let whole_seconds = text.split_once('.').map_or(text, |(head, _)| head);
        match PrimitiveDateTime::parse(
            whole_seconds,
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        ) {
            Ok(at) => Some(Self(at.assume_utc())),
            Err(_) => None,
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.unix_millis())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::decode(&value).ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp: {value}")))
    }
}

/// Field deserializer that maps any undecodable timestamp to `None`.
pub(crate) fn deserialize_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Timestamp>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(Timestamp::decode(&value))
}

#[cfg(test)]
#[path = "timestamp_test.rs"]
mod tests;
