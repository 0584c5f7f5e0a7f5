//! QR Pay Common - response model, normalizer and scanning client
//!
//! The scanning service does the QR decoding, FX conversion and risk scoring.
//! This crate turns its replies into something a display layer can show
//! without ever failing on a malformed payload.

pub mod config;
pub mod currency;
pub mod history;
pub mod normalizer;
pub mod risk;
pub mod scan_client;
pub mod scan_response;
pub mod session;

pub use currency::{format_currency, HomeCurrency};
pub use history::{
    append_history, append_history_at, record_failure, record_failure_at, HistoryLog, HistoryRow,
    RemoteHistoryItem, ScanInput, ScanMode,
};
pub use normalizer::{
    extract_note, extract_risk, extract_total, summarize, truncate_note, DisplaySummary,
};
pub use risk::{RiskLevel, RiskStyle};
pub use scan_client::{
    FakeCall, FakeScanClient, HttpScanClient, ImageUpload, ScanClient, ScanContext, ScanError,
    ServiceConfig,
};
pub use scan_response::{ScanPayload, ScanResponse};
pub use session::ScanSession;
