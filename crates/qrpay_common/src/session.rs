//! Scan session
//!
//! Drives one user's scans against a [`ScanClient`], owning the session
//! history log, the last summary and the last raw reply. Runs on a single
//! logical thread: state is borrowed only between awaits. Each action has an
//! in-flight flag; a duplicate submission while one is pending fails with
//! [`ScanError::Busy`] and changes nothing.

use crate::history::{append_history, record_failure, HistoryLog, RemoteHistoryItem, ScanInput};
use crate::normalizer::{summarize, DisplaySummary};
use crate::scan_client::{ImageUpload, ScanClient, ScanContext, ScanError};
use crate::scan_response::ScanPayload;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use tracing::{debug, info, warn};

/// Holds an action's in-flight flag; released on drop, including when the
/// request future is dropped before completing
struct InFlight<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a Cell<bool>, action: &'static str) -> Result<Self, ScanError> {
        if flag.replace(true) {
            return Err(ScanError::Busy(action));
        }
        Ok(Self { flag })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

pub struct ScanSession<C: ScanClient> {
    client: C,
    context: ScanContext,
    history: RefCell<HistoryLog>,
    summary: RefCell<DisplaySummary>,
    last_raw: RefCell<Option<Value>>,
    scanning: Cell<bool>,
    clearing: Cell<bool>,
}

impl<C: ScanClient> ScanSession<C> {
    pub fn new(client: C, context: ScanContext) -> Self {
        Self {
            client,
            context,
            history: RefCell::new(HistoryLog::new()),
            summary: RefCell::new(DisplaySummary::default()),
            last_raw: RefCell::new(None),
            scanning: Cell::new(false),
            clearing: Cell::new(false),
        }
    }

    pub fn context(&self) -> &ScanContext {
        &self.context
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Snapshot of the session log, newest first
    pub fn history(&self) -> HistoryLog {
        self.history.borrow().clone()
    }

    pub fn summary(&self) -> DisplaySummary {
        self.summary.borrow().clone()
    }

    pub fn last_raw(&self) -> Option<Value> {
        self.last_raw.borrow().clone()
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.get()
    }

    /// Scan `input` and record the outcome.
    ///
    /// Network failures still produce a history row (`risk_level = error`) and
    /// are returned so the caller can surface them. Input problems are
    /// returned without touching the log.
    pub async fn submit(&self, input: ScanInput) -> Result<DisplaySummary, ScanError> {
        let _in_flight = InFlight::acquire(&self.scanning, "scan")?;

        self.summary.replace(DisplaySummary::default());
        self.last_raw.replace(None);

        match self.request(&input).await {
            Ok(payload) => {
                let summary = summarize(&payload.response);
                info!(
                    mode = input.mode().as_str(),
                    kind = payload.response.kind(),
                    risk = %summary.risk_level,
                    total_home = summary.total_home,
                    "Scan completed"
                );
                self.history
                    .replace_with(|log| append_history(log, &input, &payload));
                self.summary.replace(summary.clone());
                self.last_raw.replace(Some(payload.raw));
                Ok(summary)
            }
            Err(error) => {
                let message = error.to_string();
                if error.is_network_failure() {
                    warn!(mode = input.mode().as_str(), "Scan failed: {}", message);
                    self.history
                        .replace_with(|log| record_failure(log, &input, &message));
                } else {
                    debug!(mode = input.mode().as_str(), "Scan rejected: {}", message);
                }
                self.summary.replace(DisplaySummary::failed(message));
                Err(error)
            }
        }
    }

    async fn request(&self, input: &ScanInput) -> Result<ScanPayload, ScanError> {
        match input {
            ScanInput::Text(payload) => {
                let payload = payload.trim();
                if payload.is_empty() {
                    return Err(ScanError::InvalidInput("Please enter QR text.".to_string()));
                }
                self.client.scan_text(&self.context, payload).await
            }
            ScanInput::Image(path) => {
                if !path.is_file() {
                    return Err(ScanError::InvalidInput("Please choose a QR image.".to_string()));
                }
                let upload = ImageUpload::read(path).await?;
                self.client.scan_image(&self.context, &upload).await
            }
        }
    }

    /// Clear history on the service, then locally
    pub async fn clear_history(&self) -> Result<(), ScanError> {
        let _in_flight = InFlight::acquire(&self.clearing, "clear-history")?;

        self.client.clear_history(&self.context).await.map_err(|error| {
            warn!("Clearing history failed: {}", error);
            error
        })?;

        self.history.replace(HistoryLog::new());
        self.summary.replace(DisplaySummary::default());
        self.last_raw.replace(None);
        info!(user_id = %self.context.user_id, "History cleared");
        Ok(())
    }

    /// Service-side history for this user
    pub async fn fetch_history(&self, limit: usize) -> Result<Vec<RemoteHistoryItem>, ScanError> {
        self.client.history(&self.context, limit).await
    }
}
