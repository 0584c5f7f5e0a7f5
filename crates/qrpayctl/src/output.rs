//! Output formatting - ASCII framing, colored risk pills
//!
//! Rendering functions return strings; callers decide where they go.

use chrono::{DateTime, Utc};
use owo_colors::{OwoColorize, Style};
use qrpay_common::config::{ColorMode, DisplayConfig};
use qrpay_common::scan_response::FxResult;
use qrpay_common::{
    truncate_note, DisplaySummary, HistoryRow, HomeCurrency, RemoteHistoryItem, RiskLevel,
    RiskStyle,
};
use serde_json::Value;
use std::io::IsTerminal;

/// Shown when a table has no rows
pub const EMPTY_HISTORY: &str = "No history yet.";

/// Shown before the first scan
pub const NO_RESULT: &str = "No result yet.";

/// One line of a history table, from either the session log or the service
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub time: String,
    pub input: String,
    pub total: Option<f64>,
    pub risk: RiskLevel,
    pub note: String,
}

fn format_time(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

impl From<&HistoryRow> for TableRow {
    fn from(row: &HistoryRow) -> Self {
        Self {
            time: format_time(&row.timestamp),
            input: row.input_label.clone(),
            total: Some(row.summary.total_home),
            risk: row.summary.risk_level.clone(),
            note: row.summary.note.clone(),
        }
    }
}

impl From<&RemoteHistoryItem> for TableRow {
    fn from(item: &RemoteHistoryItem) -> Self {
        Self {
            time: item.time().unwrap_or("-").to_string(),
            input: item.input_repr.clone().unwrap_or_else(|| "-".to_string()),
            total: item.total_home,
            risk: item.risk(),
            note: item.note.clone().unwrap_or_default(),
        }
    }
}

/// Whether to emit color on a stream that is (or is not) a terminal
pub fn use_color(mode: ColorMode, is_terminal: bool) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => is_terminal,
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    currency: HomeCurrency,
    note_width: usize,
    full_notes: bool,
    color: bool,
    stderr_color: bool,
}

impl Renderer {
    pub fn new(display: &DisplayConfig, full_notes: bool) -> Self {
        Self {
            currency: display.home_currency.clone(),
            note_width: display.note_width,
            full_notes,
            color: use_color(display.color, std::io::stdout().is_terminal()),
            stderr_color: use_color(display.color, std::io::stderr().is_terminal()),
        }
    }

    /// Renderer without color, for piped output and tests
    pub fn plain(display: &DisplayConfig, full_notes: bool) -> Self {
        Self {
            color: false,
            stderr_color: false,
            ..Self::new(display, full_notes)
        }
    }

    /// Color decision for stderr, shared with the log subscriber
    pub fn stderr_color(&self) -> bool {
        self.stderr_color
    }

    pub fn currency(&self) -> &HomeCurrency {
        &self.currency
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.color {
            text.style(style).to_string()
        } else {
            text.to_string()
        }
    }

    fn risk_style(level: &RiskLevel) -> Style {
        match level.style() {
            RiskStyle::Low => Style::new().green(),
            RiskStyle::Medium => Style::new().yellow(),
            RiskStyle::High => Style::new().red(),
            RiskStyle::Error => Style::new().bright_red().bold(),
            RiskStyle::Neutral => Style::new().dimmed(),
        }
    }

    /// Risk level as a bracketed pill, e.g. `[low]`
    pub fn risk_pill(&self, level: &RiskLevel) -> String {
        self.paint(&format!("[{}]", level), Self::risk_style(level))
    }

    /// Note as shown in tables and the summary panel
    pub fn note(&self, note: &str) -> String {
        if self.full_notes {
            note.to_string()
        } else {
            truncate_note(note, self.note_width)
        }
    }

    /// Result panel for the latest scan
    pub fn summary(&self, summary: &DisplaySummary) -> String {
        let mut out = String::from("[RESULT]\n");

        let note = if summary.note.is_empty() && summary.risk_level == RiskLevel::Unknown {
            self.paint(NO_RESULT, Style::new().dimmed())
        } else {
            self.note(&summary.note)
        };
        for line in note.lines() {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }

        out.push('\n');
        out.push_str(&format!(
            "  Total: {}  {}\n",
            self.paint(&self.currency.format(summary.total_home), Style::new().bold()),
            self.risk_pill(&summary.risk_level)
        ));
        out
    }

    /// FX breakdown lines for a single-item reply, if the service sent any
    pub fn breakdown(&self, fx: &FxResult) -> Option<String> {
        let parts: Vec<String> = [
            ("Base", fx.base_home),
            ("Markup", fx.markup_home),
            ("Network fee", fx.network_fee_home),
        ]
        .iter()
        .filter_map(|(label, amount)| {
            amount.map(|a| format!("{}: {}", label, self.currency.format(a)))
        })
        .collect();

        if parts.is_empty() {
            return None;
        }

        let mut out = format!("  {}\n", parts.join("   "));
        if let (Some(from), Some(to)) = (&fx.from_currency, &fx.to_currency) {
            out.push_str(&format!("  {} -> {}\n", from, to));
        }
        Some(out)
    }

    /// History table: Time | Input | Total | Risk | Note
    pub fn history_table(&self, rows: &[TableRow]) -> String {
        if rows.is_empty() {
            return format!("{}\n", self.paint(EMPTY_HISTORY, Style::new().dimmed()));
        }

        let total_header = format!("Total ({})", self.currency.code());
        let cells: Vec<[String; 5]> = rows
            .iter()
            .map(|row| {
                [
                    row.time.clone(),
                    row.input.clone(),
                    self.currency.format_optional(row.total),
                    format!("[{}]", row.risk),
                    self.note(&row.note).replace('\n', " "),
                ]
            })
            .collect();

        let headers = ["Time", "Input", total_header.as_str(), "Risk", "Note"];
        let mut widths = headers.map(|h| h.chars().count());
        for row in &cells {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        let header_line = headers
            .iter()
            .zip(widths.iter())
            .map(|(h, w)| format!("{:<w$}", h, w = *w))
            .collect::<Vec<_>>()
            .join(" | ");
        out.push_str(&self.paint(header_line.trim_end(), Style::new().bold()));
        out.push('\n');
        out.push_str(
            &widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        out.push('\n');

        for (row, cell) in rows.iter().zip(cells.iter()) {
            // pad before painting so escape codes don't skew the columns
            let risk = self.paint(
                &format!("{:<w$}", cell[3], w = widths[3]),
                Self::risk_style(&row.risk),
            );
            let line = format!(
                "{:<w0$} | {:<w1$} | {:>w2$} | {} | {}",
                cell[0],
                cell[1],
                cell[2],
                risk,
                cell[4],
                w0 = widths[0],
                w1 = widths[1],
                w2 = widths[2],
            );
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }

    /// `[ERROR] message`, colored only when stderr allows it
    pub fn error_line(&self, message: &str) -> String {
        format!("[ERROR] {}", self.paint_stderr(message, Style::new().red()))
    }

    pub fn warning_line(&self, message: &str) -> String {
        format!("[WARNING] {}", self.paint_stderr(message, Style::new().yellow()))
    }

    pub fn success_line(&self, message: &str) -> String {
        format!("[OK] {}", self.paint(message, Style::new().green()))
    }

    fn paint_stderr(&self, text: &str, style: Style) -> String {
        if self.stderr_color {
            text.style(style).to_string()
        } else {
            text.to_string()
        }
    }

    /// Display an error
    pub fn display_error(&self, message: &str) {
        eprintln!();
        eprintln!("{}", self.error_line(message));
        eprintln!();
    }

    /// Display a success message
    pub fn display_success(&self, message: &str) {
        println!();
        println!("{}", self.success_line(message));
        println!();
    }

    /// Display a warning
    pub fn display_warning(&self, message: &str) {
        eprintln!("{}", self.warning_line(message));
    }

    /// Raw service reply, pretty-printed
    pub fn raw_json(&self, raw: Option<&Value>) -> String {
        match raw {
            Some(value) => serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
            None => "null".to_string(),
        }
    }
}
