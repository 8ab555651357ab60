//! # prodreport-core
//!
//! Core domain model and boundary traits for the production report generator.
//!
//! This crate provides:
//! - Raw input types: `Cell`, `RawTable`
//! - Domain types: `Process`, `ProcessRecord`, `ProcessTable` and the summary rows
//! - Column-label mapping ([`columns`]) and date normalization ([`dates`])
//! - Boundary traits: `InputProvider`, `ReportSink`, [`notify::Notifier`]
//! - Error types
//!
//! ## Example
//!
//! ```rust
//! use prodreport_core::{Cell, RawTable};
//!
//! let table = RawTable::new(
//!     vec!["Job".into(), "Branch".into()],
//!     vec![vec![Cell::from("J-1"), Cell::from("North")]],
//! );
//! assert_eq!(table.height(), 1);
//! assert_eq!(table.cell(0, 1), &Cell::from("North"));
//! assert_eq!(table.cell(0, 9), &Cell::Empty);
//! ```

pub mod columns;
pub mod dates;
pub mod notify;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use thiserror::Error;

pub use notify::{Level, MemoryNotifier, Notifier, NullNotifier, Warning, WarningKind};

// ============================================================================
// Raw input
// ============================================================================

/// One untyped cell of the source table
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl Cell {
    /// Empty, or text that is only whitespace
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed, non-empty textual form
    pub fn as_label(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Number(n) if !n.is_finite() => None,
            other => {
                let text = other.to_string();
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
        }
    }

    /// Finite numeric value; numeric text is accepted
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            Cell::Number(n) => *n,
            Cell::Text(s) => s.trim().replace(',', "").parse::<f64>().ok()?,
            _ => return None,
        };
        n.is_finite().then_some(n)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<NaiveDate> for Cell {
    fn from(d: NaiveDate) -> Self {
        Cell::Date(d)
    }
}

static EMPTY_CELL: Cell = Cell::Empty;

/// The source table: a header row plus positional data rows
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of data rows (the header row is not counted)
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Widest of the header row and every data row
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at a position; ragged rows read as empty past their end
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }
}

// ============================================================================
// Processes
// ============================================================================

/// Production stage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Process {
    /// Data entry
    Key,
    /// Quality check
    Qc,
    /// Final handling and shipment
    Final,
}

impl Process {
    /// Every process, in report order
    pub const ALL: [Process; 3] = [Process::Key, Process::Qc, Process::Final];

    pub fn as_str(&self) -> &'static str {
        match self {
            Process::Key => "Key",
            Process::Qc => "QC",
            Process::Final => "Final",
        }
    }
}

impl std::fmt::Display for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calendar bucket size for time-series rollups
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Granularity {
    Weekly,
    Monthly,
}

impl Granularity {
    pub const ALL: [Granularity; 2] = [Granularity::Weekly, Granularity::Monthly];

    /// Start of the bucket containing `date`: Monday of its week, or the 1st of its month.
    ///
    /// `None` when the Monday falls before the earliest representable date.
    pub fn period_start(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Granularity::Weekly => {
                let offset = i64::from(date.weekday().num_days_from_monday());
                date.checked_sub_signed(Duration::days(offset))
            }
            Granularity::Monthly => date.with_day(1),
        }
    }

    /// "Weekly" / "Monthly"
    pub fn label(&self) -> &'static str {
        match self {
            Granularity::Weekly => "Weekly",
            Granularity::Monthly => "Monthly",
        }
    }

    /// Header of the period column: "Week" / "Month"
    pub fn period_header(&self) -> &'static str {
        match self {
            Granularity::Weekly => "Week",
            Granularity::Monthly => "Month",
        }
    }
}

/// Whether a Key job came back by its due date
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum OnTimeStatus {
    OnTime,
    Delayed,
}

impl OnTimeStatus {
    /// `OnTime` only when both dates exist and `in_date <= due_date`
    pub fn evaluate(in_date: Option<NaiveDate>, due_date: Option<NaiveDate>) -> Self {
        match (in_date, due_date) {
            (Some(i), Some(d)) if i <= d => OnTimeStatus::OnTime,
            _ => OnTimeStatus::Delayed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OnTimeStatus::OnTime => "On Time",
            OnTimeStatus::Delayed => "Delayed",
        }
    }
}

impl std::fmt::Display for OnTimeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields that only some processes carry
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ProcessDetail {
    Key {
        due_date: Option<NaiveDate>,
        on_time: OnTimeStatus,
    },
    Qc,
    Final {
        status: Option<String>,
        ship_date: Option<NaiveDate>,
    },
}

/// One extracted row of a process table
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessRecord {
    /// Branch or person responsible (trimmed, never empty)
    pub name: String,
    pub out_date: Option<NaiveDate>,
    pub in_date: Option<NaiveDate>,
    pub total_records: f64,
    /// Anchor date minus out date, in whole days
    pub processing_days: Option<i64>,
    /// Monday of the anchor date's week
    pub week: Option<NaiveDate>,
    /// First of the anchor date's month
    pub month: Option<NaiveDate>,
    pub detail: ProcessDetail,
}

impl ProcessRecord {
    pub fn process(&self) -> Process {
        match self.detail {
            ProcessDetail::Key { .. } => Process::Key,
            ProcessDetail::Qc => Process::Qc,
            ProcessDetail::Final { .. } => Process::Final,
        }
    }

    /// Date used for processing time and period bucketing
    pub fn anchor_date(&self) -> Option<NaiveDate> {
        match &self.detail {
            ProcessDetail::Final { ship_date, .. } => *ship_date,
            _ => self.in_date,
        }
    }

    pub fn period(&self, granularity: Granularity) -> Option<NaiveDate> {
        match granularity {
            Granularity::Weekly => self.week,
            Granularity::Monthly => self.month,
        }
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        match &self.detail {
            ProcessDetail::Key { due_date, .. } => *due_date,
            _ => None,
        }
    }

    pub fn on_time(&self) -> Option<OnTimeStatus> {
        match &self.detail {
            ProcessDetail::Key { on_time, .. } => Some(*on_time),
            _ => None,
        }
    }

    pub fn ship_date(&self) -> Option<NaiveDate> {
        match &self.detail {
            ProcessDetail::Final { ship_date, .. } => *ship_date,
            _ => None,
        }
    }

    pub fn status(&self) -> Option<&str> {
        match &self.detail {
            ProcessDetail::Final { status, .. } => status.as_deref(),
            _ => None,
        }
    }
}

/// All records of one process, in source row order
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessTable {
    pub process: Process,
    pub records: Vec<ProcessRecord>,
}

impl ProcessTable {
    pub fn empty(process: Process) -> Self {
        Self {
            process,
            records: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

// ============================================================================
// Summaries
// ============================================================================

/// Overall total for one (name, process) pair
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PersonnelSummary {
    /// 1-based position after sorting by total, descending
    pub rank: usize,
    pub name: String,
    pub process: Process,
    pub total_records: f64,
}

/// Total for one (period, name, process) triple
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PeriodPersonnelSummary {
    pub period: NaiveDate,
    pub name: String,
    pub process: Process,
    pub total_records: f64,
}

/// Metrics of one process within one period
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ProcessPeriodMetrics {
    pub total_records: f64,
    /// Mean of the non-missing processing days; 0 when none exist
    pub avg_processing_days: f64,
}

/// One row of a period pivot
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PeriodProcessSummary {
    pub period: NaiveDate,
    /// Aligned with [`PeriodProcessReport::processes`]
    pub metrics: Vec<ProcessPeriodMetrics>,
}

/// Period × process pivot of totals and average processing days
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PeriodProcessReport {
    pub granularity: Granularity,
    /// Processes that contributed any period data, in report order
    pub processes: Vec<Process>,
    /// One row per period, ascending
    pub rows: Vec<PeriodProcessSummary>,
}

impl PeriodProcessReport {
    pub fn empty(granularity: Granularity) -> Self {
        Self {
            granularity,
            processes: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column headers after the period column: totals first, then averages
    pub fn metric_headers(&self) -> Vec<String> {
        let totals = self.processes.iter().map(|p| format!("Total Rec. {p}"));
        let averages = self
            .processes
            .iter()
            .map(|p| format!("Avg Processing Days {p}"));
        totals.chain(averages).collect()
    }

    /// Metrics of `process` in `row`, if that process has a column
    pub fn metrics(
        &self,
        row: &PeriodProcessSummary,
        process: Process,
    ) -> Option<ProcessPeriodMetrics> {
        let idx = self.processes.iter().position(|p| *p == process)?;
        row.metrics.get(idx).copied()
    }
}

// ============================================================================
// Boundary traits
// ============================================================================

/// What the input collaborator handed back
#[derive(Clone, Debug, PartialEq)]
pub enum InputRequest {
    Table(RawTable),
    /// The user declined to provide input
    Abort,
}

/// Supplies the raw table
pub trait InputProvider {
    fn request_input(&mut self) -> Result<InputRequest, InputError>;
}

/// Persists the finished workbook
pub trait ReportSink {
    /// Human-readable destination, used in status messages
    fn destination(&self) -> String;

    fn persist(&mut self, workbook: &[u8]) -> Result<(), PersistError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Malformed column label
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ColumnSpecError {
    #[error("Empty column label")]
    Empty,

    #[error("Invalid column character '{character}' in '{label}'")]
    InvalidCharacter { label: String, character: char },

    #[error("Column label too long: {0}")]
    Overflow(String),

    #[error("Expected {expected} columns, got {actual}")]
    Arity { expected: usize, actual: usize },
}

/// Source table absent, unreadable or empty
#[derive(Debug, Error)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read input: {0}")]
    Read(String),

    #[error("The selected file is empty")]
    Empty,
}

/// Destination could not be written
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Could not save {path}. The file may be open in another program")]
    Locked { path: String },

    #[error("Error saving {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// Tests
// ============================================================================
