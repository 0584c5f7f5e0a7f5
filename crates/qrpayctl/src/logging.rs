//! Logging for qrpayctl
//!
//! Diagnostics go through `tracing` to stderr. Each invocation also appends
//! one JSON line to an XDG-compliant log file.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Explicit log file override
pub const ENV_LOG_FILE: &str = "QRPAY_LOG_FILE";

/// Install the stderr subscriber. `verbose` raises the configured level;
/// `ansi` follows the resolved color mode for stderr.
pub fn init_tracing(level: &str, verbose: u8, ansi: bool) {
    let directive = match verbose {
        0 => level.to_string(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    // A subscriber may already be set (tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(ansi)
        .try_init();
}

/// Log entry for each qrpayctl invocation
#[derive(Debug, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 timestamp
    pub ts: String,

    /// Request ID (UUID)
    pub req_id: String,

    /// Command name
    pub command: String,

    /// Command arguments
    #[serde(default)]
    pub args: Vec<String>,

    pub exit_code: i32,

    pub duration_ms: u64,

    pub ok: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(command: &str, args: Vec<String>, exit_code: i32, elapsed: Duration) -> Self {
        Self {
            ts: Self::now(),
            req_id: Self::generate_req_id(),
            command: command.to_string(),
            args,
            exit_code,
            duration_ms: elapsed.as_millis() as u64,
            ok: exit_code == 0,
            error: None,
        }
    }

    pub fn with_error(mut self, code: &str, message: String) -> Self {
        self.error = Some(ErrorDetails {
            code: code.to_string(),
            message,
        });
        self
    }

    /// Discover log file path with fallback chain
    ///
    /// Priority:
    /// 1. $QRPAY_LOG_FILE (explicit override)
    /// 2. $XDG_STATE_HOME/qrpay/ctl.jsonl
    /// 3. ~/.local/state/qrpay/ctl.jsonl
    pub fn discover_log_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(ENV_LOG_FILE) {
            return Some(PathBuf::from(path));
        }

        if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
            return Some(PathBuf::from(xdg_state).join("qrpay").join("ctl.jsonl"));
        }

        if let Ok(home) = std::env::var("HOME") {
            return Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("qrpay")
                    .join("ctl.jsonl"),
            );
        }

        None
    }

    /// Write log entry to file, falling back to stderr on failure
    pub fn write(&self) -> Result<(), std::io::Error> {
        let json = serde_json::to_string(self)?;

        if let Some(path) = Self::discover_log_path() {
            match Self::write_to_file(&json, &path) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::debug!("Cannot write {}: {}", path.display(), e);
                }
            }
        }

        // stdout may be carrying --json output
        eprintln!("{}", json);
        Ok(())
    }

    fn write_to_file(json: &str, path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        writeln!(file, "{}", json)?;
        Ok(())
    }

    pub fn generate_req_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn now() -> String {
        chrono::Utc::now().to_rfc3339()
    }
}
