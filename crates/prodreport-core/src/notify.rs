//! Status and warning notifications
//!
//! The pipeline never talks to a user directly. Everything that a person
//! should see goes through a [`Notifier`], which the binary backs with a
//! terminal or JSON emitter and tests back with [`MemoryNotifier`].

use serde::Serialize;

/// Severity of a notification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a recoverable problem
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A date cell could not be parsed and was treated as missing
    DateParse,
    /// A process extraction or aggregation step degraded to empty
    Pipeline { stage: String },
    /// A chart could not be built and was skipped
    Chart { sheet: String },
}

impl WarningKind {
    pub fn code(&self) -> &'static str {
        match self {
            WarningKind::DateParse => "date-parse",
            WarningKind::Pipeline { .. } => "pipeline",
            WarningKind::Chart { .. } => "chart",
        }
    }
}

/// A recoverable problem that was contained and reported
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn pipeline(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(WarningKind::Pipeline { stage: stage.into() }, message)
    }

    pub fn chart(sheet: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(WarningKind::Chart { sheet: sheet.into() }, message)
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            WarningKind::DateParse => write!(f, "{}", self.message),
            WarningKind::Pipeline { stage } => write!(f, "{stage}: {}", self.message),
            WarningKind::Chart { sheet } => write!(f, "{sheet} chart: {}", self.message),
        }
    }
}

/// Receiver for status, warning and error events
pub trait Notifier {
    fn report(&mut self, level: Level, message: &str);

    fn info(&mut self, message: &str) {
        self.report(Level::Info, message);
    }

    fn warn(&mut self, warning: &Warning) {
        self.report(Level::Warning, &warning.to_string());
    }

    fn error(&mut self, message: &str) {
        self.report(Level::Error, message);
    }
}

impl<N: Notifier + ?Sized> Notifier for &mut N {
    fn report(&mut self, level: Level, message: &str) {
        (**self).report(level, message);
    }
}

/// Notifier that keeps every event in memory
#[derive(Clone, Debug, Default)]
pub struct MemoryNotifier {
    events: Vec<(Level, String)>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[(Level, String)] {
        &self.events
    }

    /// Number of events at exactly `level`
    pub fn count(&self, level: Level) -> usize {
        self.events.iter().filter(|(l, _)| *l == level).count()
    }

    /// Messages at `level`, in arrival order
    pub fn messages(&self, level: Level) -> Vec<&str> {
        self.events
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.as_str())
            .collect()
    }
}

impl Notifier for MemoryNotifier {
    fn report(&mut self, level: Level, message: &str) {
        self.events.push((level, message.to_string()));
    }
}

/// Notifier that discards everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn report(&mut self, _level: Level, _message: &str) {}
}
