//! Risk levels as shown to the user
//!
//! The scanning service reports free-form risk strings ("LOW", "medium", ...).
//! They are folded into a small recognized set; anything else is kept verbatim
//! for display but styled like `unknown`. Levels compare case-insensitively.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Categorical risk assessment of a scan (or of a batch of scans)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    /// Batch whose items disagree
    Mixed,
    /// Request failed before a risk could be computed
    Error,
    #[default]
    Unknown,
    /// Unrecognized label, as the service sent it (trimmed)
    Other(String),
}

/// Visual treatment of a risk pill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskStyle {
    Low,
    Medium,
    High,
    Error,
    Neutral,
}

impl RiskLevel {
    /// Classify a raw label. Blank labels map to `Unknown`.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "low" => RiskLevel::Low,
            "medium" => RiskLevel::Medium,
            "high" => RiskLevel::High,
            "mixed" => RiskLevel::Mixed,
            "error" => RiskLevel::Error,
            "unknown" | "" => RiskLevel::Unknown,
            _ => RiskLevel::Other(raw.trim().to_string()),
        }
    }

    /// Lower-cased label used for equality and hashing
    fn key(&self) -> Cow<'_, str> {
        match self {
            RiskLevel::Other(label) => Cow::Owned(label.to_lowercase()),
            known => Cow::Borrowed(known.as_str()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Mixed => "mixed",
            RiskLevel::Error => "error",
            RiskLevel::Unknown => "unknown",
            RiskLevel::Other(label) => label,
        }
    }

    pub fn style(&self) -> RiskStyle {
        match self {
            RiskLevel::Low => RiskStyle::Low,
            RiskLevel::Medium => RiskStyle::Medium,
            RiskLevel::High => RiskStyle::High,
            RiskLevel::Error => RiskStyle::Error,
            RiskLevel::Mixed | RiskLevel::Unknown | RiskLevel::Other(_) => RiskStyle::Neutral,
        }
    }

    /// True for the six labels the display layer knows how to style
    pub fn is_recognized(&self) -> bool {
        !matches!(self, RiskLevel::Other(_))
    }
}

impl PartialEq for RiskLevel {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for RiskLevel {}

impl Hash for RiskLevel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for RiskLevel {
    fn from(raw: String) -> Self {
        RiskLevel::parse(&raw)
    }
}

impl From<&str> for RiskLevel {
    fn from(raw: &str) -> Self {
        RiskLevel::parse(raw)
    }
}

impl From<RiskLevel> for String {
    fn from(level: RiskLevel) -> Self {
        level.as_str().to_string()
    }
}
