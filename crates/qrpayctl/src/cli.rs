//! CLI - Command-line argument parsing
//!
//! Defines the CLI structure using clap.
//! Keeps argument parsing separate from execution logic.

use clap::{ArgAction, Parser, Subcommand};
use qrpay_common::config::{ColorMode, QrpayConfig};
use std::path::PathBuf;

/// QR Pay Translator CLI
#[derive(Parser, Debug)]
#[command(name = "qrpayctl")]
#[command(
    about = "QR Pay Translator - see what a foreign QR payment costs in your home currency",
    long_about = None
)]
#[command(version = env!("QRPAY_VERSION"))]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Config file (overrides ~/.config/qrpay/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Scanning service base URL (overrides $QRPAY_API_BASE)
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    /// User id sent with every request
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Session id sent with every request
    #[arg(long, global = true)]
    pub session: Option<String>,

    /// Country the payer is in, e.g. JP
    #[arg(long, global = true)]
    pub country: Option<String>,

    /// Output JSON only
    #[arg(long, global = true)]
    pub json: bool,

    /// Also print the raw service reply
    #[arg(long, global = true)]
    pub raw: bool,

    /// Show notes in full instead of shortening them
    #[arg(long, global = true)]
    pub full: bool,

    /// Color output: auto, always or never
    #[arg(long, global = true, value_parser = parse_color)]
    pub color: Option<ColorMode>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate a QR text payload (use `-` to read it from stdin)
    ScanText {
        /// Payload, e.g. QR:JP:JPY:1500 or several joined by commas
        payload: String,
    },

    /// Translate a QR code from an image file
    ScanImage {
        /// PNG or JPEG containing one or more QR codes
        path: PathBuf,
    },

    /// Show recent scans stored by the service
    History {
        /// Maximum number of rows
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Delete this user's history on the service
    ClearHistory,

    /// Interactive scanning session
    Repl,

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the user config file
        #[arg(long)]
        init: bool,
    },
}

fn parse_color(value: &str) -> Result<ColorMode, String> {
    ColorMode::parse(value).ok_or_else(|| format!("invalid color mode '{}'", value))
}

impl Cli {
    /// Subcommand name as typed, for the invocation log
    pub fn command_name(&self) -> &'static str {
        match self.command {
            Commands::ScanText { .. } => "scan-text",
            Commands::ScanImage { .. } => "scan-image",
            Commands::History { .. } => "history",
            Commands::ClearHistory => "clear-history",
            Commands::Repl => "repl",
            Commands::Config { .. } => "config",
        }
    }

    /// Flags take precedence over the config file and environment
    pub fn apply_to(&self, config: &mut QrpayConfig) {
        if let Some(base_url) = &self.api_base {
            config.service.base_url = base_url.clone();
        }
        if let Some(user) = &self.user {
            config.identity.user_id = user.clone();
        }
        if let Some(session) = &self.session {
            config.identity.session_id = session.clone();
        }
        if let Some(country) = &self.country {
            config.identity.user_country = Some(country.clone());
        }
        if let Some(color) = self.color {
            config.display.color = color;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "qrpayctl",
            "scan-text",
            "QR:JP:JPY:1500",
            "--api-base",
            "http://10.0.0.2:8000",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.command_name(), "scan-text");
        assert!(cli.json);
        assert_eq!(cli.api_base.as_deref(), Some("http://10.0.0.2:8000"));
    }

    #[test]
    fn test_history_limit_default() {
        let cli = Cli::try_parse_from(["qrpayctl", "history"]).unwrap();
        match cli.command {
            Commands::History { limit } => assert_eq!(limit, 50),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "qrpayctl",
            "--user",
            "alice",
            "--country",
            "JP",
            "--color",
            "never",
            "repl",
        ])
        .unwrap();
        let mut config = QrpayConfig::default();

        cli.apply_to(&mut config);

        assert_eq!(config.identity.user_id, "alice");
        assert_eq!(config.identity.user_country.as_deref(), Some("JP"));
        assert_eq!(config.display.color, ColorMode::Never);
        assert_eq!(config.service.base_url, "http://127.0.0.1:8000");
    }

    #[test]
    fn test_bad_color_rejected() {
        assert!(Cli::try_parse_from(["qrpayctl", "--color", "rainbow", "repl"]).is_err());
    }
}
