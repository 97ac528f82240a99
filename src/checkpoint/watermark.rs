use chrono::{DateTime, NaiveDateTime, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Textual form shared by the checkpoint file and the remote API window bounds.
pub const WATERMARK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
#[error("invalid watermark '{value}': expected format YYYY-MM-DD HH:MM:SS")]
pub struct WatermarkParseError {
    pub value: String,
    #[source]
    source: chrono::ParseError,
}

/// Exclusive lower bound of the next query window.
///
/// Stored at one-second resolution and always interpreted as UTC, matching the
/// time strings the audit-log API accepts and returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Watermark(NaiveDateTime);

impl Watermark {
    /// Current wall-clock time truncated to whole seconds.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(datetime: DateTime<Utc>) -> Self {
        Self(datetime.trunc_subsecs(0).naive_utc())
    }

    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }

    pub fn to_utc(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.0)
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(WATERMARK_FORMAT))
    }
}

impl FromStr for Watermark {
    type Err = WatermarkParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        NaiveDateTime::parse_from_str(value, WATERMARK_FORMAT)
            .map(Self)
            .map_err(|source| WatermarkParseError {
                value: value.to_string(),
                source,
            })
    }
}

impl Serialize for Watermark {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Watermark {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let watermark: Watermark = "2024-06-01 10:00:00".parse().unwrap();
        assert_eq!(watermark.to_string(), "2024-06-01 10:00:00");
    }

    #[test]
    fn test_parse_trims_trailing_newline() {
        let watermark: Watermark = "2024-06-01 10:00:00\n".parse().unwrap();
        assert_eq!(watermark.to_string(), "2024-06-01 10:00:00");
    }

    #[test]
    fn test_parse_rejects_other_formats() {
        assert!("2024-06-01T10:00:00Z".parse::<Watermark>().is_err());
        assert!("yesterday".parse::<Watermark>().is_err());
        assert!("".parse::<Watermark>().is_err());
    }

    #[test]
    fn test_from_datetime_drops_subseconds() {
        let datetime = DateTime::parse_from_rfc3339("2024-06-01T10:00:00.987Z")
            .unwrap()
            .with_timezone(&Utc);
        let watermark = Watermark::from_datetime(datetime);
        assert_eq!(watermark.to_string(), "2024-06-01 10:00:00");
        assert_eq!(watermark.to_utc().timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_ordering_follows_time() {
        let earlier: Watermark = "2024-06-01 09:59:59".parse().unwrap();
        let later: Watermark = "2024-06-01 10:00:00".parse().unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn test_serde_as_string() {
        let watermark: Watermark = "2024-06-01 10:00:00".parse().unwrap();
        let json = serde_json::to_string(&watermark).unwrap();
        assert_eq!(json, "\"2024-06-01 10:00:00\"");
        let back: Watermark = serde_json::from_str(&json).unwrap();
        assert_eq!(back, watermark);
    }
}
