//! Scanning service client
//!
//! The QR decoding, FX conversion and risk scoring all happen in the remote
//! scanning service. This module talks to it over HTTP and provides a fake
//! client for tests. Callers pass identity explicitly through [`ScanContext`].

use crate::history::{RemoteHistory, RemoteHistoryItem};
use crate::scan_response::ScanPayload;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Scanning service endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Who is scanning. Sent with every request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanContext {
    pub user_id: String,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_country: Option<String>,
}

impl ScanContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_country(mut self, country: Option<String>) -> Self {
        self.user_country = country.filter(|c| !c.trim().is_empty());
        self
    }
}

/// QR image ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub async fn read(path: &Path) -> Result<Self, ScanError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| ScanError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(Self {
            mime: mime_for(&file_name).to_string(),
            file_name,
            bytes,
        })
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Scan client errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScanError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Failed to fetch: {0}")]
    Network(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Cannot read {path}: {message}")]
    Io { path: String, message: String },

    #[error("A {0} request is already in progress")]
    Busy(&'static str),
}

impl ScanError {
    /// Request could not be completed or the service rejected it
    pub fn is_network_failure(&self) -> bool {
        matches!(
            self,
            ScanError::Network(_) | ScanError::Timeout(_) | ScanError::Status { .. }
        )
    }
}

/// Build the error for a non-success reply: body `error`, then `detail`,
/// then the bare status.
pub fn failure_from_body(status: u16, body: &str) -> ScanError {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let message = ["error", "detail"]
        .iter()
        .find_map(|key| parsed.get(key).and_then(Value::as_str))
        .filter(|m| !m.is_empty())
        .map(String::from)
        .unwrap_or_else(|| format!("HTTP {}", status));
    ScanError::Status { status, message }
}

/// Operations of the remote scanning service
pub trait ScanClient {
    fn scan_text(
        &self,
        ctx: &ScanContext,
        payload: &str,
    ) -> impl Future<Output = Result<ScanPayload, ScanError>>;

    fn scan_image(
        &self,
        ctx: &ScanContext,
        image: &ImageUpload,
    ) -> impl Future<Output = Result<ScanPayload, ScanError>>;

    fn history(
        &self,
        ctx: &ScanContext,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<RemoteHistoryItem>, ScanError>>;

    fn clear_history(&self, ctx: &ScanContext) -> impl Future<Output = Result<(), ScanError>>;
}

#[derive(Serialize)]
struct TextScanRequest<'a> {
    user_id: &'a str,
    session_id: &'a str,
    qr_payload: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_country: Option<&'a str>,
}

#[derive(Serialize)]
struct ClearHistoryRequest<'a> {
    user_id: &'a str,
    session_id: &'a str,
}

/// HTTP client for the scanning service
pub struct HttpScanClient {
    config: ServiceConfig,
    client: reqwest::Client,
}

impl HttpScanClient {
    pub fn new(config: ServiceConfig) -> Result<Self, ScanError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ScanError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/api/{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    fn transport_error(&self, e: reqwest::Error) -> ScanError {
        if e.is_timeout() {
            ScanError::Timeout(self.config.timeout_secs)
        } else {
            ScanError::Network(e.to_string())
        }
    }

    /// Send with a fresh request id and return the body of a successful reply
    async fn send(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<String, ScanError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(%request_id, endpoint, "Sending request to scanning service");

        let response = request
            .header("X-Request-Id", request_id.as_str())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        tracing::debug!(%request_id, status = status.as_u16(), bytes = body.len(), "Reply received");

        if !status.is_success() {
            let error = failure_from_body(status.as_u16(), &body);
            tracing::warn!(%request_id, endpoint, "Scanning service returned {}: {}", status, error);
            return Err(error);
        }
        Ok(body)
    }
}

impl ScanClient for HttpScanClient {
    async fn scan_text(&self, ctx: &ScanContext, payload: &str) -> Result<ScanPayload, ScanError> {
        let body = TextScanRequest {
            user_id: &ctx.user_id,
            session_id: &ctx.session_id,
            qr_payload: payload,
            user_country: ctx.user_country.as_deref(),
        };
        let request = self.client.post(self.url("scan-text")).json(&body);

        let body = self.send("scan-text", request).await?;
        Ok(ScanPayload::from_body(&body))
    }

    async fn scan_image(
        &self,
        ctx: &ScanContext,
        image: &ImageUpload,
    ) -> Result<ScanPayload, ScanError> {
        let part = reqwest::multipart::Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime)
            .map_err(|e| ScanError::InvalidInput(format!("Invalid image type: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let mut query = vec![
            ("user_id", ctx.user_id.as_str()),
            ("session_id", ctx.session_id.as_str()),
        ];
        if let Some(country) = ctx.user_country.as_deref() {
            query.push(("user_country", country));
        }

        let request = self
            .client
            .post(self.url("scan-image"))
            .query(&query)
            .multipart(form);

        let body = self.send("scan-image", request).await?;
        Ok(ScanPayload::from_body(&body))
    }

    async fn history(
        &self,
        ctx: &ScanContext,
        limit: usize,
    ) -> Result<Vec<RemoteHistoryItem>, ScanError> {
        let limit = limit.to_string();
        let request = self
            .client
            .get(self.url("history"))
            .query(&[("user_id", ctx.user_id.as_str()), ("limit", limit.as_str())]);

        let body = self.send("history", request).await?;
        let history: RemoteHistory = serde_json::from_str(&body).unwrap_or_default();
        Ok(history.items)
    }

    async fn clear_history(&self, ctx: &ScanContext) -> Result<(), ScanError> {
        let body = ClearHistoryRequest {
            user_id: &ctx.user_id,
            session_id: &ctx.session_id,
        };
        let request = self.client.post(self.url("clear-history")).json(&body);

        self.send("clear-history", request).await?;
        Ok(())
    }
}

/// Call recorded by [`FakeScanClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    ScanText(String),
    ScanImage(String),
    History(usize),
    ClearHistory,
}

/// Scripted client for tests
pub struct FakeScanClient {
    replies: Mutex<Vec<Result<Value, ScanError>>>,
    remote_history: Mutex<Vec<RemoteHistoryItem>>,
    clear_error: Option<ScanError>,
    calls: Mutex<Vec<FakeCall>>,
    delay: Option<Duration>,
}

impl FakeScanClient {
    /// Replies are handed out in order; the last one repeats
    pub fn new(replies: Vec<Result<Value, ScanError>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            remote_history: Mutex::new(Vec::new()),
            clear_error: None,
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn always(reply: Value) -> Self {
        Self::new(vec![Ok(reply)])
    }

    pub fn always_error(error: ScanError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn with_remote_history(self, items: Vec<RemoteHistoryItem>) -> Self {
        *self.remote_history.lock().unwrap_or_else(PoisonError::into_inner) = items;
        self
    }

    pub fn with_clear_error(mut self, error: ScanError) -> Self {
        self.clear_error = Some(error);
        self
    }

    /// Hold every request open for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn record(&self, call: FakeCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    async fn wait(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn next_reply(&self) -> Result<ScanPayload, ScanError> {
        let mut replies = self.replies.lock().unwrap_or_else(PoisonError::into_inner);
        let reply = match replies.len() {
            0 => Err(ScanError::Network("no scripted reply".to_string())),
            1 => replies[0].clone(),
            _ => replies.remove(0),
        };
        reply.map(ScanPayload::from_value)
    }
}

impl ScanClient for FakeScanClient {
    async fn scan_text(&self, _ctx: &ScanContext, payload: &str) -> Result<ScanPayload, ScanError> {
        self.record(FakeCall::ScanText(payload.to_string()));
        self.wait().await;
        self.next_reply()
    }

    async fn scan_image(
        &self,
        _ctx: &ScanContext,
        image: &ImageUpload,
    ) -> Result<ScanPayload, ScanError> {
        self.record(FakeCall::ScanImage(image.file_name.clone()));
        self.wait().await;
        self.next_reply()
    }

    async fn history(
        &self,
        _ctx: &ScanContext,
        limit: usize,
    ) -> Result<Vec<RemoteHistoryItem>, ScanError> {
        self.record(FakeCall::History(limit));
        self.wait().await;
        let items = self.remote_history.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.iter().take(limit).cloned().collect())
    }

    async fn clear_history(&self, _ctx: &ScanContext) -> Result<(), ScanError> {
        self.record(FakeCall::ClearHistory);
        self.wait().await;
        if let Some(error) = &self.clear_error {
            return Err(error.clone());
        }
        self.remote_history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}
