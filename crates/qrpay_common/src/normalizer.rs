//! Response normalizer
//!
//! Reduces any [`ScanResponse`] to a [`DisplaySummary`]: total in home
//! currency, aggregated risk level and a short note. Every function here is
//! total; missing or malformed fields fall back to 0, `unknown` and "".

use crate::risk::RiskLevel;
use crate::scan_response::{BatchScan, FxResult, RiskResult, ScanResponse};
use serde::{Deserialize, Serialize};

/// Notes longer than this are shortened in tables
pub const DEFAULT_NOTE_WIDTH: usize = 120;

/// What the display layer shows for one scan attempt
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplaySummary {
    pub total_home: f64,
    pub risk_level: RiskLevel,
    pub note: String,
}

impl DisplaySummary {
    /// Summary for a request that never produced a response
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            total_home: 0.0,
            risk_level: RiskLevel::Error,
            note: message.into(),
        }
    }
}

pub fn summarize(response: &ScanResponse) -> DisplaySummary {
    DisplaySummary {
        total_home: extract_total(response),
        risk_level: extract_risk(response),
        note: extract_note(response),
    }
}

/// Batch total first, then the single-scan FX total, else 0
pub fn extract_total(response: &ScanResponse) -> f64 {
    let total = match response {
        ScanResponse::Multiple(batch) => batch.total_home.or_else(|| fx_total(&batch.fx_result)),
        ScanResponse::Single(scan) => fx_total(&scan.fx_result),
        ScanResponse::Failure(_) | ScanResponse::Unreadable(_) => None,
    };
    total.filter(|n| n.is_finite()).unwrap_or(0.0)
}

pub fn extract_risk(response: &ScanResponse) -> RiskLevel {
    match response {
        ScanResponse::Multiple(batch) => batch_risk(batch),
        ScanResponse::Single(scan) => risk_label(&scan.risk_result)
            .map(RiskLevel::parse)
            .unwrap_or_default(),
        ScanResponse::Failure(_) | ScanResponse::Unreadable(_) => RiskLevel::Unknown,
    }
}

/// `message`, falling back to `error`
pub fn extract_note(response: &ScanResponse) -> String {
    let (message, error) = match response {
        ScanResponse::Single(scan) => (&scan.message, &scan.error),
        ScanResponse::Multiple(batch) => (&batch.message, &batch.error),
        ScanResponse::Failure(failure) => (&failure.message, &failure.error),
        ScanResponse::Unreadable(_) => return String::new(),
    };
    message
        .as_deref()
        .filter(|m| !m.is_empty())
        .or(error.as_deref())
        .unwrap_or_default()
        .to_string()
}

/// Shorten a note to `width` characters, marking the cut with an ellipsis
pub fn truncate_note(note: &str, width: usize) -> String {
    if note.chars().count() <= width {
        return note.to_string();
    }
    let mut short: String = note.chars().take(width).collect();
    short.push('…');
    short
}

fn fx_total(fx: &Option<FxResult>) -> Option<f64> {
    fx.as_ref().and_then(|fx| fx.total_home)
}

fn risk_label(risk: &Option<RiskResult>) -> Option<&str> {
    risk.as_ref()
        .and_then(|r| r.risk_level.as_deref())
        .map(str::trim)
        .filter(|level| !level.is_empty())
}

/// Items without a risk label are skipped. Labels are compared after
/// lower-casing; disagreement yields `Mixed`.
fn batch_risk(batch: &BatchScan) -> RiskLevel {
    let mut levels = batch
        .entries()
        .filter_map(|item| risk_label(&item.risk_result))
        .map(RiskLevel::parse);

    let Some(first) = levels.next() else {
        return RiskLevel::Unknown;
    };
    if levels.all(|level| level == first) {
        first
    } else {
        RiskLevel::Mixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classify(raw: serde_json::Value) -> ScanResponse {
        ScanResponse::from_value(&raw)
    }

    #[test]
    fn test_single_scan_summary() {
        let response = classify(json!({
            "fx_result": {"total_home": 1500},
            "risk_result": {"risk_level": "LOW"}
        }));

        assert_eq!(
            summarize(&response),
            DisplaySummary {
                total_home: 1500.0,
                risk_level: RiskLevel::Low,
                note: String::new(),
            }
        );
    }

    #[test]
    fn test_batch_with_disagreeing_items_is_mixed() {
        let response = classify(json!({
            "multiple": true,
            "total_home": 27.5,
            "items": [
                {"risk_result": {"risk_level": "low"}},
                {"risk_result": {"risk_level": "high"}}
            ]
        }));

        let summary = summarize(&response);
        assert_eq!(summary.total_home, 27.5);
        assert_eq!(summary.risk_level, RiskLevel::Mixed);
    }

    #[test]
    fn test_batch_agreement_ignores_case_and_missing_levels() {
        let response = classify(json!({
            "multiple": true,
            "items": [
                {"risk_result": {"risk_level": "Medium"}},
                {"risk_result": {}},
                {"fx_result": {"total_home": 3.0}},
                {"risk_result": {"risk_level": "MEDIUM"}}
            ]
        }));

        assert_eq!(extract_risk(&response), RiskLevel::Medium);
    }

    #[test]
    fn test_empty_batch_is_unknown() {
        let response = classify(json!({"multiple": true, "items": []}));
        assert_eq!(extract_risk(&response), RiskLevel::Unknown);
        assert_eq!(extract_total(&response), 0.0);
    }

    #[test]
    fn test_batch_without_total_falls_back_to_fx_result() {
        let response = classify(json!({
            "multiple": true,
            "count": 2,
            "fx_result": {"total_home": 88.25},
            "risk_result": {"risk_level": "low"}
        }));

        assert_eq!(extract_total(&response), 88.25);
    }

    #[test]
    fn test_bare_error_summary() {
        let response = classify(json!({"error": "decode failed"}));

        assert_eq!(
            summarize(&response),
            DisplaySummary {
                total_home: 0.0,
                risk_level: RiskLevel::Unknown,
                note: "decode failed".to_string(),
            }
        );
    }

    #[test]
    fn test_message_preferred_over_error() {
        let response = classify(json!({"error": "boom", "message": "Partial result"}));
        assert_eq!(extract_note(&response), "Partial result");
    }

    #[test]
    fn test_null_and_garbage_degrade_to_defaults() {
        for raw in [json!(null), json!("text"), json!(12), json!({}), json!({"fx_result": null})] {
            let summary = summarize(&classify(raw));
            assert_eq!(summary, DisplaySummary::default());
        }
    }

    #[test]
    fn test_truncate_note() {
        assert_eq!(truncate_note("short", 120), "short");

        let long = "x".repeat(130);
        let short = truncate_note(&long, DEFAULT_NOTE_WIDTH);
        assert_eq!(short.chars().count(), 121);
        assert!(short.ends_with('…'));
    }

    #[test]
    fn test_failed_summary() {
        let summary = DisplaySummary::failed("Failed to fetch");
        assert_eq!(summary.risk_level, RiskLevel::Error);
        assert_eq!(summary.total_home, 0.0);
        assert_eq!(summary.note, "Failed to fetch");
    }
}
