//! Client configuration
//!
//! Config file: ~/.config/qrpay/config.toml or /etc/qrpay/config.toml.
//! Environment variables override the file; command-line flags override both.

use crate::currency::HomeCurrency;
use crate::normalizer::DEFAULT_NOTE_WIDTH;
use crate::scan_client::{ScanContext, ServiceConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Base URL of the scanning service
pub const ENV_API_BASE: &str = "QRPAY_API_BASE";
/// Currency code totals are displayed in
pub const ENV_HOME_CURRENCY: &str = "QRPAY_HOME_CURRENCY";
/// Log filter, e.g. `debug` or `qrpay_common=trace`
pub const ENV_LOG: &str = "QRPAY_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub user_id: String,
    pub session_id: String,
    pub user_country: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            user_id: "user-123".to_string(),
            session_id: String::new(),
            user_country: None,
        }
    }
}

/// Color display mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Color when stdout is a terminal
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn parse(mode: &str) -> Option<Self> {
        match mode.trim().to_lowercase().as_str() {
            "auto" => Some(ColorMode::Auto),
            "always" | "on" | "yes" => Some(ColorMode::Always),
            "never" | "off" | "no" | "none" => Some(ColorMode::Never),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub home_currency: HomeCurrency,
    /// Notes longer than this are shortened in tables
    pub note_width: usize,
    pub color: ColorMode,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            home_currency: HomeCurrency::inr(),
            note_width: DEFAULT_NOTE_WIDTH,
            color: ColorMode::Auto,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive; `-v` flags raise it
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrpayConfig {
    pub service: ServiceConfig,
    pub identity: IdentityConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

impl QrpayConfig {
    /// ~/.config/qrpay/config.toml, honouring $XDG_CONFIG_HOME
    pub fn user_config_path() -> Result<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config).join("qrpay").join("config.toml"));
        }
        let home = std::env::var("HOME").context("Cannot determine home directory")?;
        Ok(Path::new(&home)
            .join(".config")
            .join("qrpay")
            .join("config.toml"))
    }

    pub fn system_config_path() -> PathBuf {
        PathBuf::from("/etc/qrpay/config.toml")
    }

    /// Load configuration
    ///
    /// Priority:
    /// 1. Explicit path (must exist)
    /// 2. User config (~/.config/qrpay/config.toml)
    /// 3. System config (/etc/qrpay/config.toml)
    /// 4. Defaults
    ///
    /// Environment overrides are applied on top.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from(path)?,
            None => Self::load_default_locations()?,
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_default_locations() -> Result<Self> {
        if let Ok(user_path) = Self::user_config_path() {
            if user_path.exists() {
                return Self::load_from(&user_path);
            }
        }

        let system_path = Self::system_config_path();
        if system_path.exists() {
            return Self::load_from(&system_path);
        }

        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: QrpayConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply environment-style overrides; `lookup` returns a variable's value
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(base_url) = set(ENV_API_BASE) {
            self.service.base_url = base_url;
        }
        if let Some(code) = set(ENV_HOME_CURRENCY) {
            self.display.home_currency = HomeCurrency::new(&code);
        }
        if let Some(level) = set(ENV_LOG) {
            self.logging.level = level;
        }
    }

    /// Write configuration to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(())
    }

    /// Identity to send with requests
    pub fn scan_context(&self) -> ScanContext {
        ScanContext::new(self.identity.user_id.clone())
            .with_session(self.identity.session_id.clone())
            .with_country(self.identity.user_country.clone())
    }
}
