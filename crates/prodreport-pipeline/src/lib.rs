//! # prodreport-pipeline
//!
//! Data stages of the production report: extraction of the three process
//! tables and every rollup built from them.
//!
//! This crate provides:
//! - Schema-driven process extraction ([`extract`])
//! - Personnel and period aggregation ([`aggregate`])
//! - [`ReportPipeline`], which runs every stage and contains failures
//!
//! ## Failure containment
//!
//! Each stage yields a [`StageOutcome`]. A failed process extraction or
//! aggregation degrades to an empty value plus a [`Warning`]; the remaining
//! stages still run. Only an empty source table stops the pipeline.
//!
//! ## Example
//!
//! ```rust,ignore
//! use prodreport_core::MemoryNotifier;
//! use prodreport_pipeline::ReportPipeline;
//!
//! let mut notifier = MemoryNotifier::new();
//! let data = ReportPipeline::new().run(&raw_table, &mut notifier)?;
//! println!("{} personnel rows", data.personnel.len());
//! ```

pub mod aggregate;
pub mod extract;

use tracing::{info, warn};

use prodreport_core::{
    Granularity, InputError, Notifier, PeriodPersonnelSummary, PeriodProcessReport,
    PersonnelSummary, Process, ProcessTable, RawTable, Warning,
};

pub use aggregate::AggregateError;
pub use extract::{ExtractError, Field, MissingColumnsError, ProcessSchema, PROCESS_SCHEMAS};

/// Result of one contained stage
#[derive(Clone, Debug, PartialEq)]
pub enum StageOutcome<T> {
    /// The stage produced its value
    Complete(T),
    /// The stage failed; `value` is the empty fallback
    Degraded { value: T, warning: Warning },
}

impl<T> StageOutcome<T> {
    /// Contain a stage result at `stage`, substituting `fallback` on error
    pub fn contain<E: std::fmt::Display>(
        result: Result<T, E>,
        stage: &str,
        fallback: impl FnOnce() -> T,
    ) -> Self {
        match result {
            Ok(value) => StageOutcome::Complete(value),
            Err(e) => StageOutcome::Degraded {
                value: fallback(),
                warning: Warning::pipeline(stage, format!("{e}. Continuing without it")),
            },
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, StageOutcome::Degraded { .. })
    }

    pub fn into_parts(self) -> (T, Option<Warning>) {
        match self {
            StageOutcome::Complete(value) => (value, None),
            StageOutcome::Degraded { value, warning } => (value, Some(warning)),
        }
    }
}

/// Everything the workbook is built from
#[derive(Clone, Debug, PartialEq)]
pub struct ReportData {
    /// Key, QC and Final tables, in that order
    pub processes: Vec<ProcessTable>,
    pub weekly: PeriodProcessReport,
    pub monthly: PeriodProcessReport,
    pub personnel: Vec<PersonnelSummary>,
    pub personnel_weekly: Vec<PeriodPersonnelSummary>,
    pub personnel_monthly: Vec<PeriodPersonnelSummary>,
    /// Stage warnings, in the order they occurred
    pub warnings: Vec<Warning>,
}

impl ReportData {
    pub fn table(&self, process: Process) -> Option<&ProcessTable> {
        self.processes.iter().find(|t| t.process == process)
    }

    pub fn period_report(&self, granularity: Granularity) -> &PeriodProcessReport {
        match granularity {
            Granularity::Weekly => &self.weekly,
            Granularity::Monthly => &self.monthly,
        }
    }

    pub fn personnel_periodic(&self, granularity: Granularity) -> &[PeriodPersonnelSummary] {
        match granularity {
            Granularity::Weekly => &self.personnel_weekly,
            Granularity::Monthly => &self.personnel_monthly,
        }
    }

    /// True when no process produced a single record
    pub fn is_empty(&self) -> bool {
        self.processes.iter().all(ProcessTable::is_empty)
    }
}

/// Runs extraction and aggregation over one raw table
#[derive(Clone, Debug)]
pub struct ReportPipeline {
    schemas: Vec<ProcessSchema>,
}

impl Default for ReportPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPipeline {
    pub fn new() -> Self {
        Self {
            schemas: ProcessSchema::defaults(),
        }
    }

    /// Replace the column layout of one process
    pub fn with_schema(mut self, schema: ProcessSchema) -> Self {
        match self.schemas.iter_mut().find(|s| s.process == schema.process) {
            Some(slot) => *slot = schema,
            None => self.schemas.push(schema),
        }
        self
    }

    pub fn schemas(&self) -> &[ProcessSchema] {
        &self.schemas
    }

    /// Run every stage.
    ///
    /// Fails only when the source table has no data rows. Stage warnings are
    /// reported through `notifier` as they happen and collected in
    /// [`ReportData::warnings`].
    pub fn run(
        &self,
        raw: &RawTable,
        notifier: &mut dyn Notifier,
    ) -> Result<ReportData, InputError> {
        if raw.is_empty() {
            return Err(InputError::Empty);
        }

        let mut warnings = Vec::new();

        // Extraction, one contained stage per process
        let mut processes = Vec::with_capacity(Process::ALL.len());
        for process in Process::ALL {
            let outcome = match self.schemas.iter().find(|s| s.process == process) {
                Some(schema) => StageOutcome::contain(
                    extract::extract(raw, schema, notifier),
                    &format!("{process} Data"),
                    || ProcessTable::empty(process),
                ),
                None => StageOutcome::Complete(ProcessTable::empty(process)),
            };
            let (table, warning) = outcome.into_parts();
            record(&mut warnings, warning, notifier);
            info!(process = %process, records = table.len(), "process table ready");
            processes.push(table);
        }

        // Personnel rollups
        let (personnel, warning) = StageOutcome::contain(
            aggregate::personnel_overall(&processes),
            "Personnel Report",
            Vec::new,
        )
        .into_parts();
        record(&mut warnings, warning, notifier);

        let mut periodic_personnel = Vec::with_capacity(2);
        for granularity in Granularity::ALL {
            let (rows, warning) = StageOutcome::contain(
                aggregate::personnel_periodic(&processes, granularity),
                &format!("{} Personnel", granularity.label()),
                Vec::new,
            )
            .into_parts();
            record(&mut warnings, warning, notifier);
            periodic_personnel.push(rows);
        }
        let personnel_monthly = periodic_personnel.pop().unwrap_or_default();
        let personnel_weekly = periodic_personnel.pop().unwrap_or_default();

        // Process period pivots; a failing process is left out of the pivot
        let mut period_reports = Vec::with_capacity(2);
        for granularity in Granularity::ALL {
            let mut period_tables = Vec::new();
            for table in processes.iter().filter(|t| !t.is_empty()) {
                match aggregate::process_period_table(table, granularity) {
                    Ok(t) => period_tables.push(t),
                    Err(e) => record(
                        &mut warnings,
                        Some(Warning::pipeline(
                            format!("{} {}", granularity.label(), table.process),
                            e.to_string(),
                        )),
                        notifier,
                    ),
                }
            }
            let (report, warning) = StageOutcome::contain(
                aggregate::pivot_periods(&period_tables, granularity),
                &format!("{} Report", granularity.label()),
                || PeriodProcessReport::empty(granularity),
            )
            .into_parts();
            record(&mut warnings, warning, notifier);
            period_reports.push(report);
        }
        let monthly = period_reports
            .pop()
            .unwrap_or_else(|| PeriodProcessReport::empty(Granularity::Monthly));
        let weekly = period_reports
            .pop()
            .unwrap_or_else(|| PeriodProcessReport::empty(Granularity::Weekly));

        Ok(ReportData {
            processes,
            weekly,
            monthly,
            personnel,
            personnel_weekly,
            personnel_monthly,
            warnings,
        })
    }
}

/// Report and keep a stage warning, if there is one
fn record(warnings: &mut Vec<Warning>, warning: Option<Warning>, notifier: &mut dyn Notifier) {
    if let Some(w) = warning {
        warn!(warning = %w, "stage degraded");
        notifier.warn(&w);
        warnings.push(w);
    }
}
