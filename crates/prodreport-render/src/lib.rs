//! # prodreport-render
//!
//! Workbook output for production reports.
//!
//! This crate provides:
//! - [`WorkbookAssembler`], which lays out every report sheet in an xlsx workbook
//! - Production, ranking and trend charts ([`charts`])
//! - [`ReportRunner`], which drives input, pipeline, workbook and sink
//!
//! ## Example
//!
//! ```rust,ignore
//! use prodreport_core::NullNotifier;
//! use prodreport_pipeline::ReportPipeline;
//! use prodreport_render::WorkbookAssembler;
//!
//! let data = ReportPipeline::new().run(&raw_table, &mut NullNotifier)?;
//! let xlsx_bytes = WorkbookAssembler::new()
//!     .max_column_width(40.0)
//!     .render(&data, &mut NullNotifier)?;
//! std::fs::write("Production_Performance_Report.xlsx", xlsx_bytes)?;
//! ```

pub mod charts;
pub mod excel;
pub mod runner;

use thiserror::Error;

pub use charts::ChartError;
pub use excel::{AssembledWorkbook, SheetSummary, WorkbookAssembler};
pub use runner::{ReportRunner, RunError, RunStatus, RunSummary, DEFAULT_OUTPUT};

/// Workbook could not be produced
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}
