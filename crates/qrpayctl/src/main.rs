//! QR Pay Control - CLI client for the QR Pay Translator service
//!
//! Sends QR payloads or images to the scanning service and shows what the
//! payment costs in the home currency.

use anyhow::Result;
use clap::Parser;
use qrpay_common::config::{DisplayConfig, QrpayConfig};
use qrpay_common::{HttpScanClient, ScanInput, ScanSession};
use qrpayctl::cli::{Cli, Commands};
use qrpayctl::commands::{self, View};
use qrpayctl::errors::{error_code_for, exit_code_for, EXIT_SUCCESS};
use qrpayctl::logging::{self, LogEntry};
use qrpayctl::output::Renderer;
use qrpayctl::repl;
use std::time::Instant;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let started = Instant::now();

    // flags alone decide color until the config file is read
    let mut renderer = Renderer::new(
        &DisplayConfig {
            color: cli.color.unwrap_or_default(),
            ..DisplayConfig::default()
        },
        cli.full,
    );
    let result = run(&cli, &mut renderer).await;

    let exit_code = match &result {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            renderer.display_error(&format!("{:#}", e));
            exit_code_for(e)
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut entry = LogEntry::new(cli.command_name(), args, exit_code, started.elapsed());
    if let Err(e) = &result {
        entry = entry.with_error(error_code_for(e), format!("{:#}", e));
    }
    let _ = entry.write();

    std::process::exit(exit_code);
}

async fn run(cli: &Cli, renderer: &mut Renderer) -> Result<()> {
    let mut config = QrpayConfig::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    *renderer = Renderer::new(&config.display, cli.full);

    logging::init_tracing(&config.logging.level, cli.verbose, renderer.stderr_color());
    tracing::debug!(
        base_url = %config.service.base_url,
        user_id = %config.identity.user_id,
        "Configuration loaded"
    );

    let view = View {
        renderer: renderer.clone(),
        json: cli.json,
        raw: cli.raw,
    };
    let client = HttpScanClient::new(config.service.clone())?;
    let session = ScanSession::new(client, config.scan_context());

    match &cli.command {
        Commands::ScanText { payload } => {
            let payload = commands::read_payload(payload)?;
            commands::scan(&session, ScanInput::Text(payload), &view).await
        }
        Commands::ScanImage { path } => {
            commands::scan(&session, ScanInput::Image(path.clone()), &view).await
        }
        Commands::History { limit } => commands::history(&session, *limit, &view).await,
        Commands::ClearHistory => commands::clear_history(&session, &view).await,
        Commands::Repl => repl::run(&session, &view, std::io::stdin().lock()).await,
        Commands::Config { init } => commands::config(&config, *init, renderer),
    }
}
