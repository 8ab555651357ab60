//! Notification output for the CLI
//!
//! This module implements the two notifiers the binary can run with:
//! - `TerminalNotifier`: one line per event to stderr
//! - `JsonNotifier`: collects events for a single JSON document on stdout
//!
//! Both honor `--quiet`, which suppresses everything except errors.
//!
//! ## Exit Code Semantics
//!
//! | Exit Code | Meaning |
//! |-----------|---------|
//! | 0 | Success: report written (warnings allowed) |
//! | 1 | Failure: a fatal error was reported |
//! | 2 | Aborted: no input was provided |
//!
//! `--quiet` and `--format=json` do not affect the exit code.

use std::io::Write;
use std::process;

use serde::Serialize;

use prodreport_core::{Level, Notifier, Warning};

// ============================================================================
// Exit Code
// ============================================================================

/// Exit codes for a report run.
///
/// These are stable API for scripts wrapping the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Report written, possibly with warnings
    Success = 0,
    /// A fatal error stopped the run
    Failure = 1,
    /// The run ended without input
    Aborted = 2,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code as u8)
    }
}

// ============================================================================
// Notify Config
// ============================================================================

/// Configuration for notification output
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyConfig {
    /// Suppress all output except errors
    pub quiet: bool,
}

impl NotifyConfig {
    pub fn quiet() -> Self {
        Self { quiet: true }
    }

    pub fn should_show(&self, level: Level) -> bool {
        !self.quiet || level == Level::Error
    }
}

/// Writes `level[code]: message` lines, rustc style
pub struct TerminalNotifier<W: Write> {
    writer: W,
    config: NotifyConfig,
    error_count: usize,
    warning_count: usize,
}

impl<W: Write> TerminalNotifier<W> {
    pub fn new(writer: W, config: NotifyConfig) -> Self {
        Self {
            writer,
            config,
            error_count: 0,
            warning_count: 0,
        }
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    fn write_event(
        &mut self,
        level: Level,
        code: Option<&str>,
        message: &str,
    ) -> std::io::Result<()> {
        match level {
            Level::Error => self.error_count += 1,
            Level::Warning => self.warning_count += 1,
            Level::Info => {}
        }
        if !self.config.should_show(level) {
            return Ok(());
        }
        match code {
            Some(code) => writeln!(self.writer, "{level}[{code}]: {message}"),
            None => writeln!(self.writer, "{level}: {message}"),
        }
    }
}

impl<W: Write> Notifier for TerminalNotifier<W> {
    fn report(&mut self, level: Level, message: &str) {
        // stderr may be closed
        let _ = self.write_event(level, None, message);
    }

    fn warn(&mut self, warning: &Warning) {
        let _ = self.write_event(Level::Warning, Some(warning.kind.code()), &warning.to_string());
    }
}

/// Collects events for machine-readable output
pub struct JsonNotifier {
    events: Vec<JsonEvent>,
    config: NotifyConfig,
}

/// JSON representation of one notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsonEvent {
    pub level: Level,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

impl JsonNotifier {
    pub fn new(config: NotifyConfig) -> Self {
        Self {
            events: Vec::new(),
            config,
        }
    }

    pub fn events(&self) -> &[JsonEvent] {
        &self.events
    }

    pub fn error_count(&self) -> usize {
        self.events.iter().filter(|e| e.level == Level::Error).count()
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(&self.events).unwrap_or(serde_json::Value::Null)
    }

    fn push(&mut self, level: Level, code: Option<&str>, message: String) {
        if self.config.should_show(level) {
            self.events.push(JsonEvent {
                level,
                code: code.map(str::to_string),
                message,
            });
        }
    }
}

impl Notifier for JsonNotifier {
    fn report(&mut self, level: Level, message: &str) {
        self.push(level, None, message.to_string());
    }

    fn warn(&mut self, warning: &Warning) {
        self.push(Level::Warning, Some(warning.kind.code()), warning.to_string());
    }
}
