//! Excel workbook assembly
//!
//! Builds the production performance workbook from [`ReportData`]:
//! - **Key Process / QC Process / Final Process**: one row per record
//! - **Weekly Report / Monthly Report**: period totals and average
//!   processing days per process, with a production volume chart
//! - **Personnel Performance**: ranked totals with a top performers chart
//! - **Personnel Weekly / Personnel Monthly**: per-period totals with a
//!   trend chart for the leading names
//!
//! Every sheet is built on a detached [`Worksheet`] and only attached to the
//! workbook once it is complete, so a sheet that fails to build leaves no
//! partial tab behind.

use chrono::NaiveDate;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use serde::Serialize;
use tracing::{debug, info_span, warn};

use prodreport_core::{
    Granularity, Notifier, PeriodPersonnelSummary, PeriodProcessReport, PersonnelSummary, Process,
    ProcessRecord, ProcessTable, Warning,
};
use prodreport_pipeline::ReportData;

use crate::charts::{self, ChartError};
use crate::RenderError;

/// Default cap on auto-fitted column widths
pub const DEFAULT_MAX_COLUMN_WIDTH: f64 = 50.0;
/// Default number of ranked rows in the top performers chart
pub const DEFAULT_RANKING_TOP_N: usize = 15;
/// Default number of names in a trend chart
pub const DEFAULT_TREND_TOP_N: usize = 5;
/// Default header fill
pub const DEFAULT_HEADER_COLOR: u32 = 0x4F81BD;

/// Workbook assembler configuration
#[derive(Clone, Debug)]
pub struct WorkbookAssembler {
    /// Header fill color (RGB)
    pub header_color: u32,
    /// Upper bound for auto-fitted column widths
    pub max_column_width: f64,
    /// Rows plotted in the top performers chart
    pub ranking_top_n: usize,
    /// Names plotted in each trend chart
    pub trend_top_n: usize,
}

impl Default for WorkbookAssembler {
    fn default() -> Self {
        Self {
            header_color: DEFAULT_HEADER_COLOR,
            max_column_width: DEFAULT_MAX_COLUMN_WIDTH,
            ranking_top_n: DEFAULT_RANKING_TOP_N,
            trend_top_n: DEFAULT_TREND_TOP_N,
        }
    }
}

/// What ended up on one sheet
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SheetSummary {
    pub name: String,
    /// Data rows, excluding the header and any chart data block
    pub rows: usize,
    /// Charts successfully inserted
    pub charts: usize,
}

/// A finished workbook that has not been serialized yet
pub struct AssembledWorkbook {
    workbook: Workbook,
    pub sheets: Vec<SheetSummary>,
    /// Chart and sheet warnings raised while assembling
    pub warnings: Vec<Warning>,
}

impl std::fmt::Debug for AssembledWorkbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssembledWorkbook")
            .field("sheets", &self.sheets)
            .field("warnings", &self.warnings)
            .finish_non_exhaustive()
    }
}

impl AssembledWorkbook {
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn chart_count(&self) -> usize {
        self.sheets.iter().map(|s| s.charts).sum()
    }

    /// Serialize to xlsx bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, RenderError> {
        self.workbook
            .save_to_buffer()
            .map_err(|e| RenderError::Format(e.to_string()))
    }
}

/// Formats shared by every sheet
pub(crate) struct ExcelFormats {
    pub(crate) header: Format,
    text: Format,
    integer: Format,
    number: Format,
    average: Format,
    day: Format,
    month: Format,
}

/// A sheet that built successfully, ready to attach
struct BuiltSheet {
    worksheet: Worksheet,
    summary: SheetSummary,
    warnings: Vec<Warning>,
}

impl WorkbookAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header_color(mut self, color: u32) -> Self {
        self.header_color = color;
        self
    }

    pub fn max_column_width(mut self, width: f64) -> Self {
        self.max_column_width = width;
        self
    }

    pub fn ranking_top_n(mut self, n: usize) -> Self {
        self.ranking_top_n = n;
        self
    }

    pub fn trend_top_n(mut self, n: usize) -> Self {
        self.trend_top_n = n;
        self
    }

    fn create_formats(&self) -> ExcelFormats {
        let header = Format::new()
            .set_bold()
            .set_align(FormatAlign::Center)
            .set_background_color(self.header_color)
            .set_font_color(0xFFFFFF)
            .set_border(FormatBorder::Thin);

        let text = Format::new().set_border(FormatBorder::Thin);

        let integer = Format::new()
            .set_num_format("0")
            .set_border(FormatBorder::Thin);

        let number = Format::new()
            .set_num_format("General")
            .set_border(FormatBorder::Thin);

        let average = Format::new()
            .set_num_format("0.00")
            .set_border(FormatBorder::Thin);

        let day = Format::new()
            .set_num_format("mm/dd/yyyy")
            .set_align(FormatAlign::Left)
            .set_border(FormatBorder::Thin);

        let month = Format::new()
            .set_num_format("yyyy-mm")
            .set_align(FormatAlign::Left)
            .set_border(FormatBorder::Thin);

        ExcelFormats {
            header,
            text,
            integer,
            number,
            average,
            day,
            month,
        }
    }

    /// Build every non-empty sheet, in report order.
    ///
    /// Sheet build failures and chart failures are reported through
    /// `notifier` and recorded on the result; neither aborts the workbook.
    /// Fails only when no sheet at all could be produced.
    pub fn assemble(
        &self,
        data: &ReportData,
        notifier: &mut dyn Notifier,
    ) -> Result<AssembledWorkbook, RenderError> {
        let _span = info_span!("assemble").entered();
        let formats = self.create_formats();

        let mut builds: Vec<(String, Result<BuiltSheet, XlsxError>)> = Vec::new();

        for process in Process::ALL {
            if let Some(table) = data.table(process).filter(|t| !t.is_empty()) {
                let name = process_sheet_name(process);
                builds.push((name.clone(), self.process_sheet(&name, table, &formats)));
            }
        }

        for granularity in Granularity::ALL {
            let report = data.period_report(granularity);
            if !report.is_empty() {
                let name = format!("{} Report", granularity.label());
                builds.push((name.clone(), self.period_sheet(&name, report, &formats)));
            }
        }

        if !data.personnel.is_empty() {
            let name = "Personnel Performance".to_string();
            builds.push((name.clone(), self.personnel_sheet(&name, &data.personnel, &formats)));
        }

        for granularity in Granularity::ALL {
            let rows = data.personnel_periodic(granularity);
            if !rows.is_empty() {
                let name = format!("Personnel {}", granularity.label());
                builds.push((
                    name.clone(),
                    self.personnel_periodic_sheet(&name, granularity, rows, &formats),
                ));
            }
        }

        let mut workbook = Workbook::new();
        let mut sheets = Vec::new();
        let mut warnings = Vec::new();

        for (name, build) in builds {
            match build {
                Ok(built) => {
                    debug!(
                        sheet = %built.summary.name,
                        rows = built.summary.rows,
                        charts = built.summary.charts,
                        "sheet built"
                    );
                    for warning in built.warnings {
                        notifier.warn(&warning);
                        warnings.push(warning);
                    }
                    workbook.push_worksheet(built.worksheet);
                    sheets.push(built.summary);
                }
                Err(e) => {
                    warn!(sheet = %name, error = %e, "sheet skipped");
                    let warning = Warning::pipeline(
                        format!("{name} Sheet"),
                        format!("{e}. Continuing without it"),
                    );
                    notifier.warn(&warning);
                    warnings.push(warning);
                }
            }
        }

        if sheets.is_empty() {
            return Err(RenderError::InvalidData("no data to report".to_string()));
        }

        Ok(AssembledWorkbook {
            workbook,
            sheets,
            warnings,
        })
    }

    /// Assemble and serialize in one step
    pub fn render(
        &self,
        data: &ReportData,
        notifier: &mut dyn Notifier,
    ) -> Result<Vec<u8>, RenderError> {
        self.assemble(data, notifier)?.to_bytes()
    }

    fn process_sheet(
        &self,
        name: &str,
        table: &ProcessTable,
        formats: &ExcelFormats,
    ) -> Result<BuiltSheet, XlsxError> {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(name)?;
        let mut sheet = SheetWriter::new(&mut worksheet, formats);

        sheet.header(0, process_headers(table.process))?;
        for (idx, record) in table.records.iter().enumerate() {
            let row = to_row(idx + 1);
            let values = process_row(idx + 1, record);
            sheet.row(row, &values)?;
        }
        sheet.finish(self.max_column_width)?;

        Ok(BuiltSheet {
            worksheet,
            summary: SheetSummary {
                name: name.to_string(),
                rows: table.len(),
                charts: 0,
            },
            warnings: Vec::new(),
        })
    }

    fn period_sheet(
        &self,
        name: &str,
        report: &PeriodProcessReport,
        formats: &ExcelFormats,
    ) -> Result<BuiltSheet, XlsxError> {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(name)?;
        let mut sheet = SheetWriter::new(&mut worksheet, formats);

        let metric_headers = report.metric_headers();
        let mut headers: Vec<&str> = vec![report.granularity.period_header()];
        headers.extend(metric_headers.iter().map(String::as_str));
        sheet.header(0, &headers)?;

        let style = DateStyle::for_granularity(report.granularity);
        for (idx, summary) in report.rows.iter().enumerate() {
            let mut values = vec![Value::Date(Some(summary.period), style)];
            values.extend(summary.metrics.iter().map(|m| Value::Number(m.total_records)));
            values.extend(
                summary
                    .metrics
                    .iter()
                    .map(|m| Value::Average(m.avg_processing_days)),
            );
            sheet.row(to_row(idx + 1), &values)?;
        }

        let mut warnings = Vec::new();
        let mut chart_count = 0;
        match charts::production_chart(sheet.worksheet(), name, report) {
            Ok(()) => chart_count += 1,
            Err(e) => warnings.push(chart_warning(name, &e)),
        }
        sheet.finish(self.max_column_width)?;

        Ok(BuiltSheet {
            worksheet,
            summary: SheetSummary {
                name: name.to_string(),
                rows: report.rows.len(),
                charts: chart_count,
            },
            warnings,
        })
    }

    fn personnel_sheet(
        &self,
        name: &str,
        rows: &[PersonnelSummary],
        formats: &ExcelFormats,
    ) -> Result<BuiltSheet, XlsxError> {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(name)?;
        let mut sheet = SheetWriter::new(&mut worksheet, formats);

        sheet.header(0, &["S.No.", "Name", "Process", "Total Records"])?;
        for (idx, summary) in rows.iter().enumerate() {
            sheet.row(
                to_row(idx + 1),
                &[
                    Value::Integer(summary.rank as i64),
                    Value::Text(&summary.name),
                    Value::Text(summary.process.as_str()),
                    Value::Number(summary.total_records),
                ],
            )?;
        }

        let mut warnings = Vec::new();
        let mut chart_count = 0;
        match charts::ranking_chart(sheet.worksheet(), name, rows.len(), self.ranking_top_n) {
            Ok(()) => chart_count += 1,
            Err(e) => warnings.push(chart_warning(name, &e)),
        }
        sheet.finish(self.max_column_width)?;

        Ok(BuiltSheet {
            worksheet,
            summary: SheetSummary {
                name: name.to_string(),
                rows: rows.len(),
                charts: chart_count,
            },
            warnings,
        })
    }

    fn personnel_periodic_sheet(
        &self,
        name: &str,
        granularity: Granularity,
        rows: &[PeriodPersonnelSummary],
        formats: &ExcelFormats,
    ) -> Result<BuiltSheet, XlsxError> {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(name)?;
        let mut sheet = SheetWriter::new(&mut worksheet, formats);

        let style = DateStyle::for_granularity(granularity);
        sheet.header(0, &[granularity.period_header(), "Name", "Process", "Total Records"])?;
        for (idx, summary) in rows.iter().enumerate() {
            sheet.row(
                to_row(idx + 1),
                &[
                    Value::Date(Some(summary.period), style),
                    Value::Text(&summary.name),
                    Value::Text(summary.process.as_str()),
                    Value::Number(summary.total_records),
                ],
            )?;
        }

        let mut warnings = Vec::new();
        let mut chart_count = 0;
        match charts::trend_chart(&mut sheet, name, granularity, rows, self.trend_top_n) {
            Ok(()) => chart_count += 1,
            Err(e) => warnings.push(chart_warning(name, &e)),
        }
        sheet.finish(self.max_column_width)?;

        Ok(BuiltSheet {
            worksheet,
            summary: SheetSummary {
                name: name.to_string(),
                rows: rows.len(),
                charts: chart_count,
            },
            warnings,
        })
    }
}

fn chart_warning(sheet: &str, error: &ChartError) -> Warning {
    warn!(sheet, error = %error, "chart skipped");
    Warning::chart(sheet, error.to_string())
}

pub fn process_sheet_name(process: Process) -> String {
    format!("{process} Process")
}

pub fn process_headers(process: Process) -> &'static [&'static str] {
    match process {
        Process::Key => &[
            "S.No.",
            "Key Branch",
            "Start Date",
            "Due Date",
            "End Date",
            "Total Records",
            "Processing Days",
            "Status",
        ],
        Process::Qc => &[
            "S.No.",
            "QC Branch",
            "Start Date",
            "End Date",
            "Total Records",
            "Processing Days",
        ],
        Process::Final => &[
            "S.No.",
            "Final Person",
            "Start Date",
            "QC End Date",
            "Shipment Date",
            "Total Records",
            "Processing Days",
            "Status",
        ],
    }
}

fn process_row(serial: usize, record: &ProcessRecord) -> Vec<Value<'_>> {
    let days = record.processing_days.map_or(Value::Empty, Value::Integer);
    let mut values = vec![
        Value::Integer(serial as i64),
        Value::Text(&record.name),
        Value::Date(record.out_date, DateStyle::Day),
    ];
    match record.process() {
        Process::Key => {
            values.extend([
                Value::Date(record.due_date(), DateStyle::Day),
                Value::Date(record.in_date, DateStyle::Day),
                Value::Number(record.total_records),
                days,
                record
                    .on_time()
                    .map_or(Value::Empty, |s| Value::Text(s.as_str())),
            ]);
        }
        Process::Qc => {
            values.extend([
                Value::Date(record.in_date, DateStyle::Day),
                Value::Number(record.total_records),
                days,
            ]);
        }
        Process::Final => {
            values.extend([
                Value::Date(record.in_date, DateStyle::Day),
                Value::Date(record.ship_date(), DateStyle::Day),
                Value::Number(record.total_records),
                days,
                record.status().map_or(Value::Empty, Value::Text),
            ]);
        }
    }
    values
}

// ============================================================================
// Sheet writer
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DateStyle {
    /// MM/DD/YYYY
    Day,
    /// YYYY-MM
    Month,
}

impl DateStyle {
    pub(crate) fn for_granularity(granularity: Granularity) -> Self {
        match granularity {
            Granularity::Weekly => DateStyle::Day,
            Granularity::Monthly => DateStyle::Month,
        }
    }

    fn render(self, date: NaiveDate) -> String {
        match self {
            DateStyle::Day => date.format("%m/%d/%Y").to_string(),
            DateStyle::Month => date.format("%Y-%m").to_string(),
        }
    }
}

/// One cell of a data row
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Value<'a> {
    Text(&'a str),
    Integer(i64),
    Number(f64),
    Average(f64),
    Date(Option<NaiveDate>, DateStyle),
    Empty,
}

impl Value<'_> {
    /// Text as the cell would display it; drives column auto-fit
    fn rendered(&self) -> String {
        match self {
            Value::Text(s) => (*s).to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Number(n) => render_number(*n),
            Value::Average(n) => format!("{n:.2}"),
            Value::Date(Some(d), style) => style.render(*d),
            Value::Date(None, _) | Value::Empty => String::new(),
        }
    }
}

/// Integral values print without a fraction
pub(crate) fn render_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

/// Column width for a rendered length: padded, scaled, then capped
pub fn fitted_width(len: usize, cap: f64) -> f64 {
    ((len as f64 + 2.0) * 1.2).min(cap)
}

fn to_row(idx: usize) -> u32 {
    u32::try_from(idx).unwrap_or(u32::MAX)
}

fn to_col(idx: usize) -> u16 {
    u16::try_from(idx).unwrap_or(u16::MAX)
}

/// Writes cells while tracking the widest rendered value per column
pub(crate) struct SheetWriter<'a> {
    sheet: &'a mut Worksheet,
    formats: &'a ExcelFormats,
    widths: Vec<usize>,
    last_row: u32,
}

impl<'a> SheetWriter<'a> {
    fn new(sheet: &'a mut Worksheet, formats: &'a ExcelFormats) -> Self {
        Self {
            sheet,
            formats,
            widths: Vec::new(),
            last_row: 0,
        }
    }

    pub(crate) fn worksheet(&mut self) -> &mut Worksheet {
        self.sheet
    }

    /// Last row index written so far
    pub(crate) fn last_row(&self) -> u32 {
        self.last_row
    }

    fn track(&mut self, row: u32, col: usize, len: usize) {
        if self.widths.len() <= col {
            self.widths.resize(col + 1, 0);
        }
        self.widths[col] = self.widths[col].max(len);
        self.last_row = self.last_row.max(row);
    }

    pub(crate) fn header<S: AsRef<str>>(
        &mut self,
        row: u32,
        headers: &[S],
    ) -> Result<(), XlsxError> {
        for (col, header) in headers.iter().enumerate() {
            let header = header.as_ref();
            self.sheet
                .write_with_format(row, to_col(col), header, &self.formats.header)?;
            self.track(row, col, header.chars().count());
        }
        Ok(())
    }

    pub(crate) fn row(&mut self, row: u32, values: &[Value<'_>]) -> Result<(), XlsxError> {
        for (col, value) in values.iter().enumerate() {
            let c = to_col(col);
            let formats = self.formats;
            match value {
                Value::Text(s) => {
                    self.sheet.write_with_format(row, c, *s, &formats.text)?;
                }
                Value::Integer(n) => {
                    self.sheet
                        .write_with_format(row, c, *n as f64, &formats.integer)?;
                }
                Value::Number(n) => {
                    self.sheet.write_with_format(row, c, *n, &formats.number)?;
                }
                Value::Average(n) => {
                    self.sheet.write_with_format(row, c, *n, &formats.average)?;
                }
                Value::Date(Some(d), style) => {
                    let format = match style {
                        DateStyle::Day => &formats.day,
                        DateStyle::Month => &formats.month,
                    };
                    self.sheet.write_with_format(row, c, d, format)?;
                }
                Value::Date(None, _) | Value::Empty => {
                    self.sheet.write_blank(row, c, &formats.text)?;
                }
            }
            self.track(row, col, value.rendered().chars().count());
        }
        Ok(())
    }

    /// Apply the tracked widths and freeze the header row
    fn finish(self, cap: f64) -> Result<(), XlsxError> {
        for (col, len) in self.widths.iter().enumerate() {
            self.sheet.set_column_width(to_col(col), fitted_width(*len, cap))?;
        }
        self.sheet.set_freeze_panes(1, 0)?;
        Ok(())
    }
}
