use crate::checkpoint::Watermark;
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Command selector understood by the enterprise API for audit reports.
pub const REPORTING_COMMAND: &str = "reporting";

/// Time range `[from, to)` queried in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchWindow {
    pub from: Watermark,
    pub to: Watermark,
}

impl FetchWindow {
    /// Builds a window, clamping `from` to `to` if it lies in the future so
    /// that `from <= to` always holds.
    pub fn new(from: Watermark, to: Watermark) -> Self {
        Self {
            from: from.min(to),
            to,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }
}

/// Body of the reporting request.
#[derive(Debug, Serialize)]
pub struct ReportingRequest<'a> {
    pub cid: u64,
    pub provhash: &'a str,
    pub cmd: &'static str,
    pub data: &'a FetchWindow,
}

impl<'a> ReportingRequest<'a> {
    pub fn new(account_id: u64, credential: &'a str, window: &'a FetchWindow) -> Self {
        Self {
            cid: account_id,
            provhash: credential,
            cmd: REPORTING_COMMAND,
            data: window,
        }
    }
}

/// One audit record as returned by the API, without its key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawLogRecord {
    #[serde(rename = "Time", default, deserialize_with = "lenient_string")]
    pub time: String,
    #[serde(rename = "Username", default, deserialize_with = "lenient_string")]
    pub username: String,
    #[serde(rename = "IP_Address", default, deserialize_with = "lenient_string")]
    pub ip_address: String,
    #[serde(rename = "Action", default, deserialize_with = "lenient_string")]
    pub action: String,
    #[serde(rename = "Data", default, deserialize_with = "lenient_string")]
    pub data: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub next: String,
    /// Records keyed by their log identifier, in response order.
    #[serde(default, deserialize_with = "keyed_records")]
    pub data: Vec<(String, RawLogRecord)>,
}

impl ApiResponse {
    pub fn is_failure(&self) -> bool {
        self.status.eq_ignore_ascii_case("fail")
    }
}

/// Records for one window, ready for normalization.
#[derive(Debug, Clone, Default)]
pub struct FetchedLogs {
    pub records: Vec<(String, RawLogRecord)>,
    /// Pagination cursor reported by the API. Not followed.
    pub next_cursor: Option<String>,
    pub attempts: u32,
}

/// Accepts strings as-is, maps null to "" and any other JSON value to its text.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// The API sends `data` as an object of records, but an empty result comes
/// back as `[]` (or occasionally `null`).
fn keyed_records<'de, D>(deserializer: D) -> Result<Vec<(String, RawLogRecord)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct KeyedRecordsVisitor;

    impl<'de> Visitor<'de> for KeyedRecordsVisitor {
        type Value = Vec<(String, RawLogRecord)>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map of record key to record, or an empty list")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut records = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, record)) = map.next_entry::<String, RawLogRecord>()? {
                records.push((key, record));
            }
            Ok(records)
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            if seq.next_element::<IgnoredAny>()?.is_some() {
                return Err(de::Error::invalid_length(1, &self));
            }
            Ok(Vec::new())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(KeyedRecordsVisitor)
}
