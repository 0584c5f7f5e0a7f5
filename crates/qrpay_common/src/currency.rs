//! Home-currency formatting
//!
//! Output is locale independent: symbol prefix, always two decimals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency totals are displayed in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct HomeCurrency {
    code: String,
}

impl HomeCurrency {
    pub fn inr() -> Self {
        Self::new("INR")
    }

    pub fn new(code: &str) -> Self {
        let code = code.trim().to_uppercase();
        Self {
            code: if code.is_empty() { "INR".to_string() } else { code },
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Prefix placed before amounts; unknown codes use `CODE `
    pub fn symbol(&self) -> String {
        match self.code.as_str() {
            "INR" => "₹".to_string(),
            "USD" => "$".to_string(),
            "EUR" => "€".to_string(),
            "GBP" => "£".to_string(),
            "JPY" => "¥".to_string(),
            other => format!("{} ", other),
        }
    }

    /// Non-finite amounts format as zero
    pub fn format(&self, amount: f64) -> String {
        let amount = if amount.is_finite() { amount } else { 0.0 };
        let rendered = format!("{:.2}", amount);
        // -0.001 rounds to "-0.00"
        let rendered = if rendered == "-0.00" { "0.00".to_string() } else { rendered };
        format!("{}{}", self.symbol(), rendered)
    }

    pub fn format_optional(&self, amount: Option<f64>) -> String {
        self.format(amount.unwrap_or(0.0))
    }
}

impl Default for HomeCurrency {
    fn default() -> Self {
        Self::inr()
    }
}

impl fmt::Display for HomeCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

impl From<String> for HomeCurrency {
    fn from(code: String) -> Self {
        Self::new(&code)
    }
}

impl From<HomeCurrency> for String {
    fn from(currency: HomeCurrency) -> Self {
        currency.code
    }
}

/// Format an amount in rupees, e.g. `₹1500.00`
pub fn format_currency(amount: f64) -> String {
    HomeCurrency::inr().format(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(1500.0), "₹1500.00");
        assert_eq!(format_currency(27.5), "₹27.50");
        assert_eq!(format_currency(1234.567), "₹1234.57");
    }

    #[test]
    fn test_non_finite_formats_as_zero() {
        assert_eq!(format_currency(f64::NAN), "₹0.00");
        assert_eq!(format_currency(f64::INFINITY), "₹0.00");
        assert_eq!(format_currency(-0.001), "₹0.00");
    }

    #[test]
    fn test_other_currencies() {
        assert_eq!(HomeCurrency::new("usd").format(12.0), "$12.00");
        assert_eq!(HomeCurrency::new("CHF").format(3.5), "CHF 3.50");
        assert_eq!(HomeCurrency::new("").code(), "INR");
        assert_eq!(HomeCurrency::inr().format_optional(None), "₹0.00");
    }
}
