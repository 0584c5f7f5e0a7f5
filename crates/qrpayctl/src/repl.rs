//! REPL - interactive scanning session
//!
//! Each line is a QR payload; lines starting with `:` are commands. The
//! session log lives for as long as the loop does.

use crate::commands::{self, View};
use anyhow::Result;
use qrpay_common::{ScanClient, ScanInput, ScanSession};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Rows fetched by `:remote` without an explicit count
pub const DEFAULT_REMOTE_LIMIT: usize = 50;

const HELP: &str = "\
Enter a QR payload (e.g. QR:JP:JPY:1500) to translate it.

  :image <path>    scan a QR image
  :history         scans from this session
  :remote [N]      history stored by the service
  :clear           clear history
  :raw             raw reply of the last scan
  :help            this help
  :quit            leave
";

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Scan(String),
    Image(PathBuf),
    History,
    Remote(usize),
    Clear,
    Raw,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

/// Route one input line
pub fn parse_line(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }
    if matches!(line, "exit" | "quit") {
        return ReplCommand::Quit;
    }

    let Some(command) = line.strip_prefix(':') else {
        return ReplCommand::Scan(line.to_string());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match name {
        "image" | "i" => {
            if arg.is_empty() {
                ReplCommand::Invalid("Please choose a QR image.".to_string())
            } else {
                ReplCommand::Image(PathBuf::from(arg))
            }
        }
        "history" | "h" => ReplCommand::History,
        "remote" | "r" => {
            if arg.is_empty() {
                return ReplCommand::Remote(DEFAULT_REMOTE_LIMIT);
            }
            match arg.parse::<usize>() {
                Ok(limit) if limit > 0 => ReplCommand::Remote(limit),
                _ => ReplCommand::Invalid(format!("Invalid limit '{}'", arg)),
            }
        }
        "clear" => ReplCommand::Clear,
        "raw" => ReplCommand::Raw,
        "help" | "?" => ReplCommand::Help,
        "quit" | "q" | "exit" => ReplCommand::Quit,
        other => ReplCommand::Invalid(format!("Unknown command ':{}' (try :help)", other)),
    }
}

fn print_prompt() {
    print!("qrpay> ");
    let _ = io::stdout().flush();
}

/// Run the loop until `:quit` or end of input
pub async fn run<C: ScanClient, R: BufRead>(
    session: &ScanSession<C>,
    view: &View,
    input: R,
) -> Result<()> {
    if !view.json {
        println!(
            "QR Pay Translator - user {} ({} totals). Type :help for commands.",
            session.context().user_id,
            view.renderer.currency().code()
        );
    }

    let mut lines = input.lines();
    loop {
        print_prompt();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                view.renderer.display_error(&format!("Error reading input: {}", e));
                continue;
            }
            None => {
                println!();
                break;
            }
        };

        let result = match parse_line(&line) {
            ReplCommand::Empty => Ok(()),
            ReplCommand::Quit => break,
            ReplCommand::Help => {
                print!("{}", HELP);
                Ok(())
            }
            ReplCommand::Invalid(message) => {
                view.renderer.display_warning(&message);
                Ok(())
            }
            ReplCommand::Scan(payload) => {
                commands::scan(session, ScanInput::Text(payload), view).await
            }
            ReplCommand::Image(path) => commands::scan(session, ScanInput::Image(path), view).await,
            ReplCommand::History => commands::session_history(session, view),
            ReplCommand::Remote(limit) => commands::history(session, limit, view).await,
            ReplCommand::Clear => commands::clear_history(session, view).await,
            ReplCommand::Raw => {
                println!("{}", view.renderer.raw_json(session.last_raw().as_ref()));
                Ok(())
            }
        };

        if let Err(e) = result {
            view.renderer.display_error(&format!("{:#}", e));
        }
    }

    tracing::debug!(rows = session.history().len(), "REPL finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Renderer;
    use qrpay_common::config::DisplayConfig;
    use qrpay_common::{FakeCall, FakeScanClient, RiskLevel, ScanContext};
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("   "), ReplCommand::Empty);
        assert_eq!(
            parse_line(" QR:JP:JPY:1500 "),
            ReplCommand::Scan("QR:JP:JPY:1500".to_string())
        );
        assert_eq!(
            parse_line(":image /tmp/my qr.png"),
            ReplCommand::Image(PathBuf::from("/tmp/my qr.png"))
        );
        assert_eq!(parse_line(":remote"), ReplCommand::Remote(DEFAULT_REMOTE_LIMIT));
        assert_eq!(parse_line(":r 5"), ReplCommand::Remote(5));
        assert_eq!(parse_line(":q"), ReplCommand::Quit);
        assert_eq!(parse_line("exit"), ReplCommand::Quit);
        assert_eq!(parse_line(":raw"), ReplCommand::Raw);
    }

    #[test]
    fn test_parse_line_rejects_bad_input() {
        assert!(matches!(parse_line(":image"), ReplCommand::Invalid(_)));
        assert!(matches!(parse_line(":remote 0"), ReplCommand::Invalid(_)));
        assert!(matches!(parse_line(":remote ten"), ReplCommand::Invalid(_)));
        assert!(matches!(parse_line(":frobnicate"), ReplCommand::Invalid(_)));
    }

    #[tokio::test]
    async fn test_loop_scans_until_quit() {
        let session = ScanSession::new(
            FakeScanClient::always(json!({"risk_result": {"risk_level": "medium"}})),
            ScanContext::new("user-123"),
        );
        let view = View {
            renderer: Renderer::plain(&DisplayConfig::default(), false),
            json: false,
            raw: false,
        };
        let input = Cursor::new("QR:JP:JPY:1500\n\n:bogus\nQR:US:USD:12\n:quit\nQR:never\n");

        run(&session, &view, input).await.unwrap();

        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history().latest().unwrap().input_label, "QR:US:USD:12");
        assert_eq!(session.summary().risk_level, RiskLevel::Medium);
        assert_eq!(
            session.client().calls(),
            vec![
                FakeCall::ScanText("QR:JP:JPY:1500".to_string()),
                FakeCall::ScanText("QR:US:USD:12".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_loop_survives_errors() {
        let session = ScanSession::new(
            FakeScanClient::always(json!({})),
            ScanContext::new("user-123"),
        );
        let view = View {
            renderer: Renderer::plain(&DisplayConfig::default(), false),
            json: false,
            raw: false,
        };
        let input = Cursor::new(":image /nonexistent/qr.png\n:clear\n");

        run(&session, &view, input).await.unwrap();

        assert!(session.history().is_empty());
        assert_eq!(session.client().calls(), vec![FakeCall::ClearHistory]);
    }
}
