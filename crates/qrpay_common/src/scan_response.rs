//! Scan response model
//!
//! The scanning service answers with several loosely-typed JSON shapes:
//! a single scan, a batch (`multiple: true`), or a bare error. Every field may
//! be missing or carry the wrong JSON type. Classification into
//! [`ScanResponse`] never fails; a field of the wrong type reads as absent.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// FX breakdown of one scan, all amounts in the home currency
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FxResult {
    #[serde(deserialize_with = "lenient::number")]
    pub total_home: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub base_home: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub markup_home: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub network_fee_home: Option<f64>,
    #[serde(deserialize_with = "lenient::text")]
    pub from_currency: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub to_currency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskResult {
    #[serde(deserialize_with = "lenient::text")]
    pub risk_level: Option<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub reasons: Vec<String>,
}

/// Flat single-scan reply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SingleScan {
    #[serde(deserialize_with = "lenient::object")]
    pub fx_result: Option<FxResult>,
    #[serde(deserialize_with = "lenient::object")]
    pub risk_result: Option<RiskResult>,
    #[serde(deserialize_with = "lenient::text")]
    pub message: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub error: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub session_id: Option<String>,
}

/// One entry of a batch reply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchItem {
    #[serde(deserialize_with = "lenient::object")]
    pub risk_result: Option<RiskResult>,
    #[serde(deserialize_with = "lenient::object")]
    pub fx_result: Option<FxResult>,
    #[serde(deserialize_with = "lenient::text")]
    pub message: Option<String>,
}

/// Batch reply for payloads or images holding several QR codes.
///
/// Text batches carry the primary item's `fx_result` next to the batch
/// fields; image batches list their per-QR replies under `results`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchScan {
    #[serde(deserialize_with = "lenient::number")]
    pub total_home: Option<f64>,
    #[serde(deserialize_with = "lenient::count")]
    pub count: Option<u64>,
    #[serde(deserialize_with = "lenient::list")]
    pub items: Vec<BatchItem>,
    #[serde(deserialize_with = "lenient::list", skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<BatchItem>,
    #[serde(deserialize_with = "lenient::object")]
    pub fx_result: Option<FxResult>,
    #[serde(deserialize_with = "lenient::text")]
    pub message: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub error: Option<String>,
}

impl BatchScan {
    /// Per-QR entries, whichever key the service used
    pub fn entries(&self) -> impl Iterator<Item = &BatchItem> {
        self.items.iter().chain(self.results.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanFailure {
    #[serde(deserialize_with = "lenient::text")]
    pub error: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub message: Option<String>,
}

/// Classified service reply
#[derive(Debug, Clone, PartialEq)]
pub enum ScanResponse {
    Single(SingleScan),
    Multiple(BatchScan),
    Failure(ScanFailure),
    /// Not a JSON object (null, array, scalar, or an unparseable body)
    Unreadable(Value),
}

impl ScanResponse {
    /// Classify a raw JSON reply.
    ///
    /// `multiple: true` wins; then an object carrying `fx_result` or
    /// `risk_result` is a single scan; then `success: false` or a string
    /// `error` is a failure. Any other object is a single scan whose fields
    /// are all absent.
    pub fn from_value(raw: &Value) -> Self {
        let Some(object) = raw.as_object() else {
            return ScanResponse::Unreadable(raw.clone());
        };

        let multiple = object.get("multiple").and_then(Value::as_bool) == Some(true);
        let has_result = object.contains_key("fx_result") || object.contains_key("risk_result");
        let failed = object.get("success").and_then(Value::as_bool) == Some(false)
            || object.get("error").is_some_and(Value::is_string);

        if multiple {
            ScanResponse::Multiple(lenient::from_object(raw))
        } else if has_result {
            ScanResponse::Single(lenient::from_object(raw))
        } else if failed {
            ScanResponse::Failure(lenient::from_object(raw))
        } else {
            ScanResponse::Single(lenient::from_object(raw))
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ScanResponse::Single(_) => "single",
            ScanResponse::Multiple(_) => "multiple",
            ScanResponse::Failure(_) => "failure",
            ScanResponse::Unreadable(_) => "unreadable",
        }
    }
}

/// A service reply as received: the classified view plus the JSON it came from
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPayload {
    pub response: ScanResponse,
    pub raw: Value,
}

impl ScanPayload {
    pub fn from_value(raw: Value) -> Self {
        Self {
            response: ScanResponse::from_value(&raw),
            raw,
        }
    }

    /// Parse a response body. A body that is not JSON reads as `null`.
    pub fn from_body(body: &str) -> Self {
        let raw = serde_json::from_str(body).unwrap_or_else(|e| {
            tracing::debug!("Response body is not JSON: {}", e);
            Value::Null
        });
        Self::from_value(raw)
    }
}

impl From<Value> for ScanPayload {
    fn from(raw: Value) -> Self {
        Self::from_value(raw)
    }
}

/// Field readers that never reject a payload
pub(crate) mod lenient {
    use super::*;

    pub fn from_object<T: DeserializeOwned + Default>(raw: &Value) -> T {
        serde_json::from_value(raw.clone()).unwrap_or_default()
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(value.and_then(|v| v.as_f64()).filter(|n| n.is_finite()))
    }

    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(value.and_then(|v| v.as_u64()))
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            Some(Value::String(s)) => Ok(Some(s)),
            _ => Ok(None),
        }
    }

    pub fn object<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        match Option::<Value>::deserialize(d)? {
            Some(v @ Value::Object(_)) => Ok(serde_json::from_value(v).ok()),
            _ => Ok(None),
        }
    }

    /// Entries that do not fit `T` are dropped
    pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        match Option::<Value>::deserialize(d)? {
            Some(Value::Array(entries)) => Ok(entries
                .into_iter()
                .filter_map(|entry| serde_json::from_value(entry).ok())
                .collect()),
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_scan_classification() {
        let raw = json!({
            "success": true,
            "session_id": "s-1",
            "fx_result": {"total_home": 1500, "to_currency": "INR"},
            "risk_result": {"risk_level": "LOW"},
            "message": "ok"
        });

        match ScanResponse::from_value(&raw) {
            ScanResponse::Single(scan) => {
                let fx = scan.fx_result.unwrap();
                assert_eq!(fx.total_home, Some(1500.0));
                assert_eq!(fx.to_currency.as_deref(), Some("INR"));
                assert_eq!(scan.risk_result.unwrap().risk_level.as_deref(), Some("LOW"));
                assert_eq!(scan.session_id.as_deref(), Some("s-1"));
            }
            other => panic!("expected single scan, got {:?}", other),
        }
    }

    #[test]
    fn test_batch_reads_results_key() {
        let raw = json!({
            "multiple": true,
            "count": 2,
            "results": [
                {"risk_result": {"risk_level": "low"}},
                {"risk_result": {"risk_level": "high"}}
            ]
        });

        match ScanResponse::from_value(&raw) {
            ScanResponse::Multiple(batch) => {
                assert_eq!(batch.entries().count(), 2);
                assert_eq!(batch.count, Some(2));
                assert!(batch.total_home.is_none());
            }
            other => panic!("expected batch, got {:?}", other),
        }
    }

    #[test]
    fn test_bare_error_is_failure() {
        let raw = json!({"success": false, "error": "decode failed"});
        assert_eq!(
            ScanResponse::from_value(&raw),
            ScanResponse::Failure(ScanFailure {
                error: Some("decode failed".to_string()),
                message: None,
            })
        );
    }

    #[test]
    fn test_wrong_types_read_as_absent() {
        let raw = json!({
            "fx_result": {"total_home": "1500"},
            "risk_result": "high",
            "message": 42
        });

        match ScanResponse::from_value(&raw) {
            ScanResponse::Single(scan) => {
                assert_eq!(scan.fx_result.unwrap().total_home, None);
                assert!(scan.risk_result.is_none());
                assert!(scan.message.is_none());
            }
            other => panic!("expected single scan, got {:?}", other),
        }
    }

    #[test]
    fn test_non_object_is_unreadable() {
        assert_eq!(ScanResponse::from_value(&Value::Null).kind(), "unreadable");
        assert_eq!(ScanResponse::from_value(&json!([1, 2])).kind(), "unreadable");
        assert_eq!(ScanPayload::from_body("<html>502</html>").raw, Value::Null);
    }

    #[test]
    fn test_batch_drops_non_object_items() {
        let raw = json!({
            "multiple": true,
            "items": [null, "junk", {"risk_result": {"risk_level": "medium"}}]
        });

        match ScanResponse::from_value(&raw) {
            ScanResponse::Multiple(batch) => assert_eq!(batch.items.len(), 1),
            other => panic!("expected batch, got {:?}", other),
        }
    }
}
