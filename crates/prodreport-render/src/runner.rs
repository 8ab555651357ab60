//! End-to-end report run: input → pipeline → workbook → sink.

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, info_span};

use prodreport_core::{
    InputError, InputProvider, InputRequest, Notifier, PersistError, ReportSink, Warning,
};
use prodreport_pipeline::ReportPipeline;

use crate::excel::{SheetSummary, WorkbookAssembler};
use crate::RenderError;

/// Default output file name
pub const DEFAULT_OUTPUT: &str = "Production_Performance_Report.xlsx";

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Outcome of a successful run
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub destination: String,
    pub sheets: Vec<SheetSummary>,
    pub charts: usize,
    /// Every pipeline, sheet and chart warning, in the order raised
    pub warnings: Vec<Warning>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunStatus {
    Completed(RunSummary),
    /// Input was declined; nothing was written
    Aborted,
}

/// Drives one report from input request to persisted workbook
#[derive(Clone, Debug, Default)]
pub struct ReportRunner {
    pipeline: ReportPipeline,
    assembler: WorkbookAssembler,
}

impl ReportRunner {
    pub fn new(pipeline: ReportPipeline, assembler: WorkbookAssembler) -> Self {
        Self {
            pipeline,
            assembler,
        }
    }

    pub fn pipeline(&self) -> &ReportPipeline {
        &self.pipeline
    }

    pub fn assembler(&self) -> &WorkbookAssembler {
        &self.assembler
    }

    /// Run the whole report.
    ///
    /// Fatal errors are reported through `notifier` before being returned.
    /// The sink is only touched once the workbook is fully serialized.
    pub fn run(
        &self,
        input: &mut dyn InputProvider,
        sink: &mut dyn ReportSink,
        notifier: &mut dyn Notifier,
    ) -> Result<RunStatus, RunError> {
        let _span = info_span!("report_run").entered();
        let result = self.run_inner(input, sink, notifier);
        if let Err(e) = &result {
            error!(error = %e, "report run failed");
            notifier.error(&e.to_string());
        }
        result
    }

    fn run_inner(
        &self,
        input: &mut dyn InputProvider,
        sink: &mut dyn ReportSink,
        notifier: &mut dyn Notifier,
    ) -> Result<RunStatus, RunError> {
        let raw = match input.request_input()? {
            InputRequest::Abort => {
                info!("input declined");
                notifier.info("No file selected. Exiting.");
                return Ok(RunStatus::Aborted);
            }
            InputRequest::Table(raw) => raw,
        };
        notifier.info(&format!(
            "Loaded {} rows across {} columns",
            raw.height(),
            raw.width()
        ));

        let data = self.pipeline.run(&raw, notifier)?;
        let mut warnings = data.warnings.clone();

        let mut assembled = self.assembler.assemble(&data, notifier)?;
        let bytes = assembled.to_bytes()?;
        warnings.append(&mut assembled.warnings);

        let destination = sink.destination();
        sink.persist(&bytes)?;
        info!(destination = %destination, bytes = bytes.len(), "report written");
        notifier.info(&format!("Report successfully saved as {destination}"));

        let charts = assembled.chart_count();
        notifier.info(&format!(
            "Wrote {} sheets with {} charts ({} warnings)",
            assembled.sheets.len(),
            charts,
            warnings.len()
        ));
        Ok(RunStatus::Completed(RunSummary {
            destination,
            sheets: assembled.sheets,
            charts,
            warnings,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use prodreport_core::{Cell, Level, MemoryNotifier, RawTable};

    struct FixedInput(Option<Result<InputRequest, InputError>>);

    impl InputProvider for FixedInput {
        fn request_input(&mut self) -> Result<InputRequest, InputError> {
            self.0.take().unwrap_or(Ok(InputRequest::Abort))
        }
    }

    #[derive(Default)]
    struct MemorySink {
        written: Option<Vec<u8>>,
        locked: bool,
    }

    impl ReportSink for MemorySink {
        fn destination(&self) -> String {
            "memory.xlsx".to_string()
        }

        fn persist(&mut self, workbook: &[u8]) -> Result<(), PersistError> {
            if self.locked {
                return Err(PersistError::Locked {
                    path: self.destination(),
                });
            }
            self.written = Some(workbook.to_vec());
            Ok(())
        }
    }

    /// One valid Key row in J..N, padded out to AC
    fn key_table() -> RawTable {
        let mut row = vec![Cell::Empty; 29];
        row[9] = Cell::from("North");
        row[10] = Cell::from("2024-03-01");
        row[11] = Cell::from("2024-03-08");
        row[12] = Cell::from("2024-03-06");
        row[13] = Cell::Number(120.0);
        RawTable::new(Vec::new(), vec![row])
    }

    #[test]
    fn abort_writes_nothing() {
        let mut sink = MemorySink::default();
        let mut notifier = MemoryNotifier::new();
        let status = ReportRunner::default()
            .run(&mut FixedInput(Some(Ok(InputRequest::Abort))), &mut sink, &mut notifier)
            .unwrap();
        assert_eq!(status, RunStatus::Aborted);
        assert!(sink.written.is_none());
        assert_eq!(notifier.messages(Level::Info), vec!["No file selected. Exiting."]);
    }

    #[test]
    fn empty_input_is_fatal() {
        let mut sink = MemorySink::default();
        let mut notifier = MemoryNotifier::new();
        let input = Ok(InputRequest::Table(RawTable::new(Vec::new(), Vec::new())));
        let err = ReportRunner::default()
            .run(&mut FixedInput(Some(input)), &mut sink, &mut notifier)
            .unwrap_err();
        assert!(matches!(err, RunError::Input(InputError::Empty)));
        assert!(sink.written.is_none());
        assert_eq!(notifier.messages(Level::Error), vec!["The selected file is empty"]);
    }

    #[test]
    fn completed_run_persists_and_summarizes() {
        let mut sink = MemorySink::default();
        let mut notifier = MemoryNotifier::new();
        let status = ReportRunner::default()
            .run(
                &mut FixedInput(Some(Ok(InputRequest::Table(key_table())))),
                &mut sink,
                &mut notifier,
            )
            .unwrap();

        let RunStatus::Completed(summary) = status else {
            panic!("expected a completed run");
        };
        assert_eq!(summary.destination, "memory.xlsx");
        let names: Vec<&str> = summary.sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Key Process",
                "Weekly Report",
                "Monthly Report",
                "Personnel Performance",
                "Personnel Weekly",
                "Personnel Monthly"
            ]
        );
        assert_eq!(summary.charts, 5);
        assert!(summary.warnings.is_empty());
        assert!(sink.written.is_some());
        assert!(notifier
            .messages(Level::Info)
            .contains(&"Report successfully saved as memory.xlsx"));
    }

    #[test]
    fn locked_destination_reports_the_path() {
        let mut sink = MemorySink {
            locked: true,
            ..MemorySink::default()
        };
        let mut notifier = MemoryNotifier::new();
        let err = ReportRunner::default()
            .run(
                &mut FixedInput(Some(Ok(InputRequest::Table(key_table())))),
                &mut sink,
                &mut notifier,
            )
            .unwrap_err();
        assert!(matches!(err, RunError::Persist(PersistError::Locked { .. })));
        assert_eq!(
            notifier.messages(Level::Error),
            vec!["Could not save memory.xlsx. The file may be open in another program"]
        );
    }
}
