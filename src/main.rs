use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fern::colors::{Color, ColoredLevelConfig};
use log::{error, warn, LevelFilter};
use tokio_util::sync::CancellationToken;

mod config;
mod error;
mod excel;
mod file_name;
mod filter;
mod report;
mod report_command;
mod report_service;
mod request;
mod time_entry;
mod toggl;

use config::Config;
use excel::XlsxReportRenderer;
use report_command::{ReportArgs, ReportCommand};
use toggl::TogglClient;

/// Toggl のtime entryから工数レポート(Excel)を作成するCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- report --start 2024-01-01 --end 2024-01-31 --project "Test Client"
/// $ cargo run -- report --request request.json --output-dir reports
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    /// ログの詳細度(-v: debug, -vv: trace)
    #[clap(short = 'v', long = "verbose", global = true, parse(from_occurrences))]
    verbose: u8,

    #[clap(subcommand)]
    subcommand: SubCommands,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, Subcommand)]
enum SubCommands {
    Report(ReportArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logger(args.verbose).context("Failed to initialize logger")?;

    match args.subcommand {
        SubCommands::Report(report) => {
            let config = Config::load().context("Failed to load configuration")?;
            let client = TogglClient::new(&config).context("Failed to new toggl client")?;
            let renderer = XlsxReportRenderer::new();
            let cancel = cancel_on_ctrl_c();

            let command = ReportCommand::new(&client, &renderer);
            if let Err(e) = command.run(report, &cancel).await {
                error!("Failed to generate report: {:?}", e);
                eprintln!("{}", e.public_message());
                process::exit(e.kind().exit_code());
            }
        }
    }

    Ok(())
}

/// ログの出力先と書式を設定する。
fn setup_logger(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(LevelFilter::Warn)
        .level_for(env!("CARGO_CRATE_NAME"), level)
        .chain(std::io::stderr())
        .apply()?;

    Ok(())
}

/// Ctrl-Cでキャンセルされる`CancellationToken`を返す。
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl-C, cancelling");
            token.cancel();
        }
    });
    cancel
}
