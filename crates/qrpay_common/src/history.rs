//! Session history log
//!
//! Newest-first, prepend-only record of scan attempts. Rows are shared
//! behind `Arc` and never mutated; appending returns a new log that reuses
//! the previous rows.

use crate::normalizer::{summarize, DisplaySummary};
use crate::risk::RiskLevel;
use crate::scan_response::{lenient, ScanPayload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    Text,
    Image,
}

impl ScanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanMode::Text => "text",
            ScanMode::Image => "image",
        }
    }
}

/// What the user submitted for a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanInput {
    /// Raw QR payload, e.g. `QR:JP:JPY:1500`
    Text(String),
    /// Path to a QR image
    Image(PathBuf),
}

impl ScanInput {
    pub fn mode(&self) -> ScanMode {
        match self {
            ScanInput::Text(_) => ScanMode::Text,
            ScanInput::Image(_) => ScanMode::Image,
        }
    }

    /// Payload text, or the image's file name
    pub fn label(&self) -> String {
        match self {
            ScanInput::Text(payload) => payload.trim().to_string(),
            ScanInput::Image(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRow {
    pub timestamp: DateTime<Utc>,
    pub mode: ScanMode,
    pub input_label: String,
    pub summary: DisplaySummary,
    /// Reply exactly as received, kept for the raw JSON view
    pub raw_response: Value,
}

/// Ordered newest-first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryLog {
    rows: Vec<Arc<HistoryRow>>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn latest(&self) -> Option<&HistoryRow> {
        self.rows.first().map(Arc::as_ref)
    }

    pub fn get(&self, index: usize) -> Option<&HistoryRow> {
        self.rows.get(index).map(Arc::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryRow> {
        self.rows.iter().map(Arc::as_ref)
    }

    /// New log with `row` in front of the existing rows
    pub fn prepend(&self, row: HistoryRow) -> Self {
        let mut rows = Vec::with_capacity(self.rows.len() + 1);
        rows.push(Arc::new(row));
        rows.extend(self.rows.iter().cloned());
        Self { rows }
    }

    pub fn rows(&self) -> &[Arc<HistoryRow>] {
        &self.rows
    }
}

impl Serialize for HistoryLog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Summarize `payload` and prepend it to `log` with the current time
pub fn append_history(log: &HistoryLog, input: &ScanInput, payload: &ScanPayload) -> HistoryLog {
    append_history_at(log, input, payload, Utc::now())
}

pub fn append_history_at(
    log: &HistoryLog,
    input: &ScanInput,
    payload: &ScanPayload,
    timestamp: DateTime<Utc>,
) -> HistoryLog {
    log.prepend(HistoryRow {
        timestamp,
        mode: input.mode(),
        input_label: input.label(),
        summary: summarize(&payload.response),
        raw_response: payload.raw.clone(),
    })
}

/// Prepend a row for a request that failed before producing a reply
pub fn record_failure(log: &HistoryLog, input: &ScanInput, message: &str) -> HistoryLog {
    record_failure_at(log, input, message, Utc::now())
}

pub fn record_failure_at(
    log: &HistoryLog,
    input: &ScanInput,
    message: &str,
    timestamp: DateTime<Utc>,
) -> HistoryLog {
    log.prepend(HistoryRow {
        timestamp,
        mode: input.mode(),
        input_label: input.label(),
        summary: DisplaySummary::failed(message),
        raw_response: serde_json::json!({ "error": message }),
    })
}

/// Row of the service-side history, as returned by the `history` endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteHistoryItem {
    #[serde(deserialize_with = "lenient::count")]
    pub id: Option<u64>,
    #[serde(deserialize_with = "lenient::text")]
    pub created_at: Option<String>,
    /// Field name used by the scanning service itself
    #[serde(deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub mode: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub input_repr: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub home_currency: Option<String>,
    #[serde(deserialize_with = "lenient::number")]
    pub total_home: Option<f64>,
    #[serde(deserialize_with = "lenient::text")]
    pub risk_level: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub note: Option<String>,
}

impl RemoteHistoryItem {
    /// When the scan happened: `created_at`, else `timestamp`
    pub fn time(&self) -> Option<&str> {
        self.created_at.as_deref().or(self.timestamp.as_deref())
    }

    pub fn risk(&self) -> RiskLevel {
        self.risk_level
            .as_deref()
            .map(RiskLevel::parse)
            .unwrap_or_default()
    }
}

/// Body of the `history` endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteHistory {
    #[serde(deserialize_with = "lenient::list")]
    pub items: Vec<RemoteHistoryItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn payload(raw: Value) -> ScanPayload {
        ScanPayload::from_value(raw)
    }

    #[test]
    fn test_append_prepends_and_keeps_rows() {
        let input = ScanInput::Text("QR:JP:JPY:1500".to_string());
        let first = append_history(
            &HistoryLog::new(),
            &input,
            &payload(json!({"fx_result": {"total_home": 1500}})),
        );
        let before = first.rows().to_vec();

        let second = append_history(&first, &input, &payload(json!({"error": "decode failed"})));

        assert_eq!(second.len(), 2);
        assert_eq!(second.latest().unwrap().summary.note, "decode failed");
        assert_eq!(second.get(1).unwrap().summary.total_home, 1500.0);
        assert_eq!(first.len(), 1);
        assert!(Arc::ptr_eq(&first.rows()[0], &before[0]));
        assert!(Arc::ptr_eq(&second.rows()[1], &before[0]));
    }

    #[test]
    fn test_failure_row() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let input = ScanInput::Image(PathBuf::from("/tmp/uploads/menu.png"));
        let log = record_failure_at(&HistoryLog::new(), &input, "Failed to fetch", at);

        let row = log.latest().unwrap();
        assert_eq!(row.timestamp, at);
        assert_eq!(row.mode, ScanMode::Image);
        assert_eq!(row.input_label, "menu.png");
        assert_eq!(row.summary.risk_level, RiskLevel::Error);
        assert_eq!(row.raw_response, json!({"error": "Failed to fetch"}));
    }

    #[test]
    fn test_text_label_is_trimmed() {
        let input = ScanInput::Text("  QR:US:USD:12\n".to_string());
        assert_eq!(input.label(), "QR:US:USD:12");
        assert_eq!(input.mode(), ScanMode::Text);
    }

    #[test]
    fn test_log_serializes_newest_first() {
        let input = ScanInput::Text("a".to_string());
        let log = append_history(&HistoryLog::new(), &input, &payload(json!({"message": "one"})));
        let log = append_history(&log, &input, &payload(json!({"message": "two"})));

        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json[0]["summary"]["note"], "two");
        assert_eq!(json[1]["summary"]["note"], "one");
        assert_eq!(json[0]["mode"], "text");
    }

    #[test]
    fn test_remote_history_is_lenient() {
        let body: RemoteHistory = serde_json::from_value(json!({
            "items": [
                {"id": 7, "created_at": "2026-01-02 10:00:00", "input_repr": "QR:JP:JPY:1500",
                 "total_home": 912.4, "risk_level": "LOW", "note": "ok"},
                {"timestamp": "2026-01-02T09:00:00", "total_home": null, "risk_level": null}
            ]
        }))
        .unwrap();

        assert_eq!(body.items.len(), 2);
        assert_eq!(body.items[0].risk(), RiskLevel::Low);
        assert_eq!(body.items[1].time(), Some("2026-01-02T09:00:00"));
        assert_eq!(body.items[1].risk(), RiskLevel::Unknown);
        assert!(body.items[1].total_home.is_none());
    }

    #[test]
    fn test_remote_row_with_both_time_keys_is_kept() {
        let body: RemoteHistory = serde_json::from_value(json!({
            "items": [{
                "created_at": "2026-01-01",
                "timestamp": "2026-01-01T00:00:00",
                "input_repr": "QR:JP:JPY:1500",
                "total_home": 9.0
            }]
        }))
        .unwrap();

        assert_eq!(body.items.len(), 1);
        assert_eq!(body.items[0].time(), Some("2026-01-01"));
        assert_eq!(body.items[0].timestamp.as_deref(), Some("2026-01-01T00:00:00"));
        assert_eq!(body.items[0].total_home, Some(9.0));
    }
}
