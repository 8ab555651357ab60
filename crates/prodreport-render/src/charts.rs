//! Chart placement for the report sheets.
//!
//! Each chart is independent: a failure is returned to the caller, which
//! records it as a chart warning and keeps the sheet.

use rust_xlsxwriter::{Chart, ChartType, Worksheet, XlsxError};
use thiserror::Error;

use prodreport_core::{Granularity, PeriodPersonnelSummary, PeriodProcessReport};
use prodreport_pipeline::aggregate::{top_names, trend_pivot};

use crate::excel::{DateStyle, SheetWriter, Value};

/// Column H, where the volume and trend charts are anchored
const SIDE_CHART_COL: u16 = 7;
/// Cell F2, where the top performers chart is anchored
const RANKING_ANCHOR: (u32, u16) = (1, 5);
const CHART_STYLE: u8 = 10;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Error adding {chart} chart: no data to plot")]
    NoData { chart: &'static str },

    #[error("Error adding {chart} chart: {source}")]
    Xlsx {
        chart: &'static str,
        #[source]
        source: XlsxError,
    },
}

fn xlsx(chart: &'static str) -> impl FnOnce(XlsxError) -> ChartError {
    move |source| ChartError::Xlsx { chart, source }
}

fn last_index(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Clustered column chart of per-process totals, one series per process.
///
/// Expects the period report laid out with the period in column A and the
/// `Total Rec.` columns immediately after it.
pub fn production_chart(
    sheet: &mut Worksheet,
    sheet_name: &str,
    report: &PeriodProcessReport,
) -> Result<(), ChartError> {
    const CHART: &str = "production";
    if report.processes.is_empty() || report.rows.is_empty() {
        return Err(ChartError::NoData { chart: CHART });
    }
    let last = last_index(report.rows.len());
    let label = report.granularity.label();

    let mut chart = Chart::new(ChartType::Column);
    chart.set_style(CHART_STYLE);
    let title = format!("{label} Production Volume");
    chart.title().set_name(title.as_str());
    chart.x_axis().set_name(label);
    chart.y_axis().set_name("Records");

    for idx in 0..report.processes.len() {
        let col = u16::try_from(idx + 1).unwrap_or(u16::MAX);
        chart
            .add_series()
            .set_name((sheet_name, 0, col))
            .set_categories((sheet_name, 1, 0, last, 0))
            .set_values((sheet_name, 1, col, last, col));
    }

    sheet
        .insert_chart(last + 2, SIDE_CHART_COL, &chart)
        .map_err(xlsx(CHART))?;
    Ok(())
}

/// Horizontal bar chart of the first `top_n` ranked personnel rows
pub fn ranking_chart(
    sheet: &mut Worksheet,
    sheet_name: &str,
    rows: usize,
    top_n: usize,
) -> Result<(), ChartError> {
    const CHART: &str = "personnel";
    let shown = rows.min(top_n);
    if shown == 0 {
        return Err(ChartError::NoData { chart: CHART });
    }
    let last = last_index(shown);

    let mut chart = Chart::new(ChartType::Bar);
    chart.set_style(CHART_STYLE);
    chart.title().set_name("Top Performers by Total Records");
    chart.x_axis().set_name("Records");
    chart.y_axis().set_name("Personnel");
    chart.legend().set_hidden();

    chart
        .add_series()
        .set_name((sheet_name, 0, 3))
        .set_categories((sheet_name, 1, 1, last, 1))
        .set_values((sheet_name, 1, 3, last, 3));

    let (row, col) = RANKING_ANCHOR;
    sheet.insert_chart(row, col, &chart).map_err(xlsx(CHART))?;
    Ok(())
}

/// Column chart of the leading names over time.
///
/// The period × name pivot the chart plots is written below the existing
/// data, under its own header row.
pub(crate) fn trend_chart(
    sheet: &mut SheetWriter<'_>,
    sheet_name: &str,
    granularity: Granularity,
    rows: &[PeriodPersonnelSummary],
    top_n: usize,
) -> Result<(), ChartError> {
    const CHART: &str = "trend";
    let names = top_names(rows, top_n);
    let pivot = trend_pivot(rows, &names);
    if names.is_empty() || pivot.is_empty() {
        return Err(ChartError::NoData { chart: CHART });
    }

    let start = sheet.last_row() + 1;
    let mut header = vec![granularity.period_header()];
    header.extend(names.iter().map(String::as_str));
    sheet.header(start, &header).map_err(xlsx(CHART))?;

    let style = DateStyle::for_granularity(granularity);
    let mut row = start;
    for (period, values) in &pivot {
        row += 1;
        let mut cells = vec![Value::Date(Some(*period), style)];
        cells.extend(values.iter().map(|v| Value::Number(*v)));
        sheet.row(row, &cells).map_err(xlsx(CHART))?;
    }

    let label = granularity.label();
    let mut chart = Chart::new(ChartType::Column);
    chart.set_style(CHART_STYLE);
    let title = format!("Top Performers Trend ({label})");
    chart.title().set_name(title.as_str());
    chart.x_axis().set_name(label);
    chart.y_axis().set_name("Records");

    for idx in 0..names.len() {
        let col = u16::try_from(idx + 1).unwrap_or(u16::MAX);
        chart
            .add_series()
            .set_name((sheet_name, start, col))
            .set_categories((sheet_name, start + 1, 0, row, 0))
            .set_values((sheet_name, start + 1, col, row, col));
    }

    sheet
        .worksheet()
        .insert_chart(row + 2, SIDE_CHART_COL, &chart)
        .map_err(xlsx(CHART))?;
    Ok(())
}
