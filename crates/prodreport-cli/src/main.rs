//! prodreport CLI - Production Performance Report generator
//!
//! Reads a production tracking sheet and writes the multi-sheet performance
//! workbook.

mod config;
mod diagnostics;
mod input;
mod sink;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::json;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use prodreport_core::Notifier;
use prodreport_render::{ReportRunner, RunError, RunStatus};

use crate::config::ReportConfig;
use crate::diagnostics::{ExitCode, JsonNotifier, NotifyConfig, TerminalNotifier};
use crate::input::FileInput;
use crate::sink::FileSink;

#[derive(Parser)]
#[command(name = "prodreport")]
#[command(author, version, about = "Production performance report generator", long_about = None)]
struct Cli {
    /// Production tracking file (.xlsx, .xlsm, .xls, .xlsb, .ods or .csv)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Output workbook path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Input sheet name (first sheet if not specified)
    #[arg(short, long)]
    sheet: Option<String>,

    /// Configuration file (default: ./prodreport.toml if present)
    #[arg(short, long, env = "PRODREPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Notification format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Only print errors
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "error",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn exit_code(result: &Result<RunStatus, RunError>) -> ExitCode {
    match result {
        Ok(RunStatus::Completed(_)) => ExitCode::Success,
        Ok(RunStatus::Aborted) => ExitCode::Aborted,
        Err(_) => ExitCode::Failure,
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let mut config = ReportConfig::load(cli.config.as_deref(), &cwd)?;
    if let Some(output) = cli.output {
        config.output = output;
    }
    if cli.sheet.is_some() {
        config.sheet = cli.sheet;
    }

    let runner = ReportRunner::new(config.pipeline(), config.assembler());
    let mut input = FileInput::new(cli.file, config.sheet.clone());
    let mut sink = FileSink::new(&config.output);
    let notify = NotifyConfig { quiet: cli.quiet };

    match cli.format {
        OutputFormat::Text => {
            let mut notifier = TerminalNotifier::new(std::io::stderr(), notify);
            let result = runner.run(&mut input, &mut sink, &mut notifier);
            if let Ok(RunStatus::Completed(summary)) = &result {
                for sheet in &summary.sheets {
                    notifier.info(&format!(
                        "  {}: {} rows, {} charts",
                        sheet.name, sheet.rows, sheet.charts
                    ));
                }
            }
            debug!(
                errors = notifier.error_count(),
                warnings = notifier.warning_count(),
                "run finished"
            );
            Ok(exit_code(&result))
        }
        OutputFormat::Json => {
            let mut notifier = JsonNotifier::new(notify);
            let result = runner.run(&mut input, &mut sink, &mut notifier);
            let code = exit_code(&result);
            debug!(
                events = notifier.events().len(),
                errors = notifier.error_count(),
                "run finished"
            );
            let (status, summary) = match &result {
                Ok(RunStatus::Completed(summary)) => ("completed", serde_json::to_value(summary)?),
                Ok(RunStatus::Aborted) => ("aborted", serde_json::Value::Null),
                Err(_) => ("failed", serde_json::Value::Null),
            };
            let document = json!({
                "status": status,
                "exit_code": code.code(),
                "summary": summary,
                "events": notifier.to_json_value(),
            });
            println!("{}", serde_json::to_string_pretty(&document)?);
            Ok(code)
        }
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code.into(),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::Failure.into()
        }
    }
}
