//! Command implementations
//!
//! Each handler runs one action against a [`ScanSession`] and prints the
//! result. Errors are returned for the caller to report and map to an exit
//! code.

use crate::output::{Renderer, TableRow};
use crate::spinner::Spinner;
use anyhow::{Context, Result};
use qrpay_common::config::QrpayConfig;
use qrpay_common::{DisplaySummary, ScanClient, ScanError, ScanInput, ScanResponse, ScanSession};
use serde::Serialize;
use serde_json::Value;
use std::io::Read;

/// How results are printed
pub struct View {
    pub renderer: Renderer,
    pub json: bool,
    pub raw: bool,
}

impl View {
    fn spinner(&self, message: &str) -> Spinner {
        Spinner::start(message, !self.json)
    }
}

/// `--json` shape of a scan
#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub summary: DisplaySummary,
    pub formatted_total: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub raw: Option<Value>,
}

/// Resolve the payload argument; `-` reads stdin
pub fn read_payload(arg: &str) -> Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut payload = String::new();
    std::io::stdin()
        .read_to_string(&mut payload)
        .context("Failed to read QR payload from stdin")?;
    Ok(payload)
}

/// Scan text or an image and print the result panel
pub async fn scan<C: ScanClient>(
    session: &ScanSession<C>,
    input: ScanInput,
    view: &View,
) -> Result<()> {
    let spinner = view.spinner("Translating...");
    let result = session.submit(input).await;
    spinner.finish();

    // rejected before a request was made: nothing to show but the error
    let rejected = matches!(
        result,
        Err(ScanError::InvalidInput(_)) | Err(ScanError::Busy(_)) | Err(ScanError::Io { .. })
    );
    if !rejected {
        let error = result.as_ref().err().map(ToString::to_string);
        print!("{}", render_scan(session, view, error));
    }

    result.map(|_| ()).map_err(anyhow::Error::new)
}

/// Text or JSON rendering of the session's latest scan
pub fn render_scan<C: ScanClient>(
    session: &ScanSession<C>,
    view: &View,
    error: Option<String>,
) -> String {
    let summary = session.summary();
    let raw = session.last_raw();
    let response = raw.as_ref().map(ScanResponse::from_value);

    if view.json {
        let report = ScanReport {
            formatted_total: view.renderer.currency().format(summary.total_home),
            summary,
            kind: response.as_ref().map(ScanResponse::kind),
            error,
            raw,
        };
        return serde_json::to_string_pretty(&report)
            .map(|json| format!("{}\n", json))
            .unwrap_or_default();
    }

    let mut out = view.renderer.summary(&summary);
    if let Some(ScanResponse::Single(single)) = &response {
        let breakdown = single
            .fx_result
            .as_ref()
            .and_then(|fx| view.renderer.breakdown(fx));
        if let Some(breakdown) = breakdown {
            out.push_str(&breakdown);
        }
    }
    if view.raw {
        out.push_str("\n[RAW]\n");
        out.push_str(&view.renderer.raw_json(raw.as_ref()));
        out.push('\n');
    }
    out
}

/// Print the service-side history for the configured user
pub async fn history<C: ScanClient>(
    session: &ScanSession<C>,
    limit: usize,
    view: &View,
) -> Result<()> {
    let spinner = view.spinner("Loading history...");
    let items = session.fetch_history(limit).await;
    spinner.finish();
    let items = items?;

    if view.json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        let rows: Vec<TableRow> = items.iter().map(TableRow::from).collect();
        print!("{}", view.renderer.history_table(&rows));
    }
    Ok(())
}

/// Print the rows scanned in this session
pub fn session_history<C: ScanClient>(session: &ScanSession<C>, view: &View) -> Result<()> {
    let log = session.history();
    if view.json {
        println!("{}", serde_json::to_string_pretty(&log)?);
    } else {
        let rows: Vec<TableRow> = log.iter().map(TableRow::from).collect();
        print!("{}", view.renderer.history_table(&rows));
    }
    Ok(())
}

pub async fn clear_history<C: ScanClient>(session: &ScanSession<C>, view: &View) -> Result<()> {
    session.clear_history().await?;

    if view.json {
        println!("{}", serde_json::json!({ "cleared": true }));
    } else {
        view.renderer.display_success(&format!(
            "History cleared for {}",
            session.context().user_id
        ));
    }
    Ok(())
}

/// Show the effective configuration; `init` writes it to the user config path
pub fn config(config: &QrpayConfig, init: bool, renderer: &Renderer) -> Result<()> {
    if init {
        let path = QrpayConfig::user_config_path()?;
        if path.exists() {
            anyhow::bail!("{} already exists", path.display());
        }
        config.save_to(&path)?;
        renderer.display_success(&format!("Wrote {}", path.display()));
        return Ok(());
    }

    let rendered = toml::to_string_pretty(config).context("Failed to serialize configuration")?;
    print!("{}", rendered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrpay_common::config::DisplayConfig;
    use qrpay_common::{FakeScanClient, ScanContext};
    use serde_json::json;

    fn view(json: bool, raw: bool) -> View {
        View {
            renderer: Renderer::plain(&DisplayConfig::default(), false),
            json,
            raw,
        }
    }

    fn session(reply: Value) -> ScanSession<FakeScanClient> {
        ScanSession::new(FakeScanClient::always(reply), ScanContext::new("user-123"))
    }

    #[tokio::test]
    async fn test_render_single_with_breakdown() {
        let session = session(json!({
            "fx_result": {
                "total_home": 920.0,
                "base_home": 900.0,
                "markup_home": 20.0,
                "from_currency": "JPY",
                "to_currency": "INR"
            },
            "risk_result": {"risk_level": "low"}
        }));
        session
            .submit(ScanInput::Text("QR:JP:JPY:1500".to_string()))
            .await
            .unwrap();

        let out = render_scan(&session, &view(false, false), None);

        assert!(out.contains("Total: ₹920.00  [low]"));
        assert!(out.contains("Base: ₹900.00   Markup: ₹20.00"));
        assert!(out.contains("JPY -> INR"));
        assert!(!out.contains("[RAW]"));
    }

    #[tokio::test]
    async fn test_render_raw_section() {
        let session = session(json!({"multiple": true, "total_home": 27.5, "items": []}));
        session
            .submit(ScanInput::Text("QR:JP:JPY:1500,QR:US:USD:12".to_string()))
            .await
            .unwrap();

        let out = render_scan(&session, &view(false, true), None);

        assert!(out.contains("Total: ₹27.50  [unknown]"));
        assert!(out.contains("[RAW]\n{"));
        assert!(out.contains("\"total_home\": 27.5"));
    }

    #[tokio::test]
    async fn test_render_json_report() {
        let session = session(json!({"error": "decode failed"}));
        session
            .submit(ScanInput::Text("garbage".to_string()))
            .await
            .unwrap();

        let out = render_scan(&session, &view(true, false), None);
        let report: Value = serde_json::from_str(&out).unwrap();

        assert_eq!(report["kind"], "failure");
        assert_eq!(report["summary"]["note"], "decode failed");
        assert_eq!(report["summary"]["risk_level"], "unknown");
        assert_eq!(report["formatted_total"], "₹0.00");
        assert_eq!(report["raw"]["error"], "decode failed");
    }

    #[tokio::test]
    async fn test_render_json_after_network_failure() {
        let session = ScanSession::new(
            FakeScanClient::always_error(ScanError::Network("refused".to_string())),
            ScanContext::new("user-123"),
        );
        let error = session
            .submit(ScanInput::Text("QR:JP:JPY:1500".to_string()))
            .await
            .unwrap_err();

        let out = render_scan(&session, &view(true, false), Some(error.to_string()));
        let report: Value = serde_json::from_str(&out).unwrap();

        assert_eq!(report["summary"]["risk_level"], "error");
        assert_eq!(report["error"], "Failed to fetch: refused");
        assert!(report["raw"].is_null());
        assert!(report.get("kind").is_none());
    }

    #[test]
    fn test_read_payload_passthrough() {
        assert_eq!(read_payload("QR:JP:JPY:1500").unwrap(), "QR:JP:JPY:1500");
    }
}
