//! Process extraction
//!
//! One generic routine turns the raw table into a typed [`ProcessTable`] for
//! any process. What differs between Key, QC and Final lives in
//! [`PROCESS_SCHEMAS`]: which source columns are read and which field each
//! one becomes.
//!
//! The Final schema starts at column X, which is also the last QC column.
//! The same raw value feeds QC's `TotalRecords` and Final's `TotalRecords`.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info_span};

use prodreport_core::columns::{column_label, resolve_columns};
use prodreport_core::dates::normalize_date;
use prodreport_core::{
    Cell, ColumnSpecError, Granularity, Notifier, OnTimeStatus, Process, ProcessDetail,
    ProcessRecord, ProcessTable, RawTable,
};

/// Canonical field a source column is renamed to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    OutDate,
    DueDate,
    InDate,
    TotalRecords,
    Status,
    ShipDate,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::OutDate => "OutDate",
            Field::DueDate => "DueDate",
            Field::InDate => "InDate",
            Field::TotalRecords => "TotalRecords",
            Field::Status => "Status",
            Field::ShipDate => "ShipDate",
        }
    }
}

/// Static layout of one process in the source sheet
#[derive(Clone, Copy, Debug)]
pub struct SchemaSpec {
    pub process: Process,
    pub columns: &'static [&'static str],
    pub fields: &'static [Field],
}

const KEY_SCHEMA: SchemaSpec = SchemaSpec {
    process: Process::Key,
    columns: &["J", "K", "L", "M", "N"],
    fields: &[
        Field::Name,
        Field::OutDate,
        Field::DueDate,
        Field::InDate,
        Field::TotalRecords,
    ],
};

const QC_SCHEMA: SchemaSpec = SchemaSpec {
    process: Process::Qc,
    columns: &["U", "V", "W", "X"],
    fields: &[Field::Name, Field::OutDate, Field::InDate, Field::TotalRecords],
};

const FINAL_SCHEMA: SchemaSpec = SchemaSpec {
    process: Process::Final,
    columns: &["X", "Y", "Z", "AA", "AB", "AC"],
    fields: &[
        Field::TotalRecords,
        Field::Name,
        Field::OutDate,
        Field::InDate,
        Field::Status,
        Field::ShipDate,
    ],
};

/// Default column layout of the production tracking sheet
pub const PROCESS_SCHEMAS: [SchemaSpec; 3] = [KEY_SCHEMA, QC_SCHEMA, FINAL_SCHEMA];

impl SchemaSpec {
    /// Built-in layout of `process`
    pub const fn for_process(process: Process) -> SchemaSpec {
        match process {
            Process::Key => KEY_SCHEMA,
            Process::Qc => QC_SCHEMA,
            Process::Final => FINAL_SCHEMA,
        }
    }
}

/// Column layout used for one run; columns may be overridden by configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessSchema {
    pub process: Process,
    pub columns: Vec<String>,
    pub fields: &'static [Field],
}

impl ProcessSchema {
    /// Built-in layout for `process`
    pub fn default_for(process: Process) -> Self {
        let spec = SchemaSpec::for_process(process);
        Self {
            process: spec.process,
            columns: spec.columns.iter().map(|c| (*c).to_string()).collect(),
            fields: spec.fields,
        }
    }

    /// Built-in fields for `process`, read from other columns
    pub fn with_columns(process: Process, columns: Vec<String>) -> Self {
        Self {
            columns,
            ..Self::default_for(process)
        }
    }

    /// Layouts for every process, in report order
    pub fn defaults() -> Vec<ProcessSchema> {
        Process::ALL.iter().map(|p| Self::default_for(*p)).collect()
    }
}

/// Configured columns do not exist in the source table
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{process} columns {} not found (source table has {width} columns)", .columns.join(", "))]
pub struct MissingColumnsError {
    pub process: Process,
    pub columns: Vec<String>,
    pub width: usize,
}

/// Failure that empties one process table
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Invalid column specification for {process} data: {source}")]
    ColumnSpec {
        process: Process,
        #[source]
        source: ColumnSpecError,
    },

    #[error(transparent)]
    MissingColumns(#[from] MissingColumnsError),
}

/// Fields read from one source row, before required-field checks
#[derive(Debug, Default)]
struct RowFields {
    name: Option<String>,
    out_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    in_date: Option<NaiveDate>,
    total_records: Option<f64>,
    status: Option<String>,
    ship_date: Option<NaiveDate>,
}

impl RowFields {
    fn read(cells: &[(&Field, &Cell)], notifier: &mut dyn Notifier) -> Self {
        let mut fields = RowFields::default();
        for (field, cell) in cells {
            match field {
                Field::Name => fields.name = cell.as_label(),
                Field::OutDate => fields.out_date = normalize_date(cell, notifier),
                Field::DueDate => fields.due_date = normalize_date(cell, notifier),
                Field::InDate => fields.in_date = normalize_date(cell, notifier),
                Field::TotalRecords => fields.total_records = cell.as_number(),
                Field::Status => fields.status = cell.as_label(),
                Field::ShipDate => fields.ship_date = normalize_date(cell, notifier),
            }
        }
        fields
    }

    /// Build the record, or `None` when name or total is absent
    fn into_record(self, process: Process) -> Option<ProcessRecord> {
        let name = self.name?;
        let total_records = self.total_records?;

        let detail = match process {
            Process::Key => ProcessDetail::Key {
                due_date: self.due_date,
                on_time: OnTimeStatus::evaluate(self.in_date, self.due_date),
            },
            Process::Qc => ProcessDetail::Qc,
            Process::Final => ProcessDetail::Final {
                status: self.status,
                ship_date: self.ship_date,
            },
        };

        let anchor = match process {
            Process::Final => self.ship_date,
            _ => self.in_date,
        };
        let processing_days = match (anchor, self.out_date) {
            (Some(end), Some(start)) => Some((end - start).num_days()),
            _ => None,
        };

        Some(ProcessRecord {
            name,
            out_date: self.out_date,
            in_date: self.in_date,
            total_records,
            processing_days,
            week: anchor.and_then(|d| Granularity::Weekly.period_start(d)),
            month: anchor.and_then(|d| Granularity::Monthly.period_start(d)),
            detail,
        })
    }
}

/// Extract one process table from the raw table.
///
/// Rows without a name or a numeric total are dropped; every other missing
/// value is kept as `None`.
pub fn extract(
    raw: &RawTable,
    schema: &ProcessSchema,
    notifier: &mut dyn Notifier,
) -> Result<ProcessTable, ExtractError> {
    let process = schema.process;
    let _span = info_span!("extract", process = %process).entered();

    let column_error = |source| ExtractError::ColumnSpec { process, source };

    if schema.columns.len() != schema.fields.len() {
        return Err(column_error(ColumnSpecError::Arity {
            expected: schema.fields.len(),
            actual: schema.columns.len(),
        }));
    }
    let indices = resolve_columns(&schema.columns).map_err(column_error)?;

    let width = raw.width();
    let missing: Vec<String> = indices
        .iter()
        .filter(|idx| **idx >= width)
        .map(|idx| column_label(*idx))
        .collect();
    if !missing.is_empty() {
        return Err(MissingColumnsError {
            process,
            columns: missing,
            width,
        }
        .into());
    }

    let mut records = Vec::with_capacity(raw.height());
    let mut dropped = 0usize;
    for row in 0..raw.height() {
        let cells: Vec<(&Field, &Cell)> = schema
            .fields
            .iter()
            .zip(&indices)
            .map(|(field, col)| (field, raw.cell(row, *col)))
            .collect();

        match RowFields::read(&cells, notifier).into_record(process) {
            Some(record) => records.push(record),
            None => dropped += 1,
        }
    }

    debug!(kept = records.len(), dropped, "extracted process table");

    Ok(ProcessTable { process, records })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use prodreport_core::{Level, MemoryNotifier};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Table whose columns are named by position: values go to the listed columns
    fn table(rows: Vec<Vec<(usize, Cell)>>) -> RawTable {
        let width = 29; // A..AC
        let headers = (0..width).map(column_label).collect();
        let rows = rows
            .into_iter()
            .map(|cells| {
                let mut row = vec![Cell::Empty; width];
                for (col, cell) in cells {
                    row[col] = cell;
                }
                row
            })
            .collect();
        RawTable::new(headers, rows)
    }

    fn extract_key(raw: &RawTable, notifier: &mut MemoryNotifier) -> ProcessTable {
        extract(raw, &ProcessSchema::default_for(Process::Key), notifier).unwrap()
    }

    fn key_row(name: &str, out: &str, due: &str, inn: &str, total: f64) -> Vec<(usize, Cell)> {
        vec![
            (9, Cell::from(name)),
            (10, Cell::from(out)),
            (11, Cell::from(due)),
            (12, Cell::from(inn)),
            (13, Cell::Number(total)),
        ]
    }

    #[test]
    fn schema_table_is_consistent() {
        for spec in PROCESS_SCHEMAS {
            assert_eq!(spec.columns.len(), spec.fields.len(), "{}", spec.process);
            assert!(spec.fields.contains(&Field::Name));
            assert!(spec.fields.contains(&Field::TotalRecords));
        }
        assert_eq!(ProcessSchema::defaults().len(), 3);
    }

    #[test]
    fn each_process_gets_its_own_layout() {
        for process in Process::ALL {
            let schema = ProcessSchema::default_for(process);
            assert_eq!(schema.process, process);
            assert_eq!(SchemaSpec::for_process(process).process, process);
        }
        assert_eq!(
            ProcessSchema::default_for(Process::Final).fields.first(),
            Some(&Field::TotalRecords)
        );
        assert_eq!(ProcessSchema::default_for(Process::Qc).columns, ["U", "V", "W", "X"]);
    }

    #[test]
    fn final_total_aliases_qc_total() {
        let qc = ProcessSchema::default_for(Process::Qc);
        let fin = ProcessSchema::default_for(Process::Final);
        assert_eq!(qc.columns.last(), fin.columns.first());
    }

    #[test]
    fn key_rows_extracted_with_derived_fields() {
        let raw = table(vec![
            key_row("North", "2024-03-01", "2024-03-08", "2024-03-07", 120.0),
            key_row("South", "2024-03-01", "2024-03-05", "2024-03-07", 80.0),
        ]);
        let mut notifier = MemoryNotifier::new();
        let table = extract_key(&raw, &mut notifier);

        assert_eq!(table.len(), 2);
        let north = &table.records[0];
        assert_eq!(north.name, "North");
        assert_eq!(north.processing_days, Some(6));
        assert_eq!(north.on_time(), Some(OnTimeStatus::OnTime));
        assert_eq!(north.week, Some(date(2024, 3, 4)));
        assert_eq!(north.month, Some(date(2024, 3, 1)));
        assert_eq!(north.due_date(), Some(date(2024, 3, 8)));

        assert_eq!(table.records[1].on_time(), Some(OnTimeStatus::Delayed));
        assert!(notifier.events().is_empty());
    }

    #[test]
    fn row_without_name_is_dropped() {
        let raw = table(vec![
            key_row("North", "2024-03-01", "2024-03-08", "2024-03-07", 120.0),
            key_row("   ", "2024-03-01", "2024-03-08", "2024-03-07", 50.0),
        ]);
        let table = extract(
            &raw,
            &ProcessSchema::default_for(Process::Key),
            &mut MemoryNotifier::new(),
        )
        .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records[0].name, "North");
    }

    #[test]
    fn row_without_numeric_total_is_dropped() {
        let mut row = key_row("North", "2024-03-01", "2024-03-08", "2024-03-07", 0.0);
        row[4] = (13, Cell::from("lots"));
        let raw = table(vec![row]);
        let table = extract(
            &raw,
            &ProcessSchema::default_for(Process::Key),
            &mut MemoryNotifier::new(),
        )
        .unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn missing_out_date_keeps_row() {
        let raw = table(vec![key_row("North", "WIP", "2024-03-08", "2024-03-07", 10.0)]);
        let table = extract(
            &raw,
            &ProcessSchema::default_for(Process::Key),
            &mut MemoryNotifier::new(),
        )
        .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records[0].out_date, None);
        assert_eq!(table.records[0].processing_days, None);
        assert_eq!(table.records[0].week, Some(date(2024, 3, 4)));
    }

    #[test]
    fn missing_anchor_leaves_periods_empty() {
        let raw = table(vec![key_row("North", "2024-03-01", "2024-03-08", "", 10.0)]);
        let table = extract(
            &raw,
            &ProcessSchema::default_for(Process::Key),
            &mut MemoryNotifier::new(),
        )
        .unwrap();
        let record = &table.records[0];
        assert_eq!(record.week, None);
        assert_eq!(record.month, None);
        assert_eq!(record.on_time(), Some(OnTimeStatus::Delayed));
    }

    #[test]
    fn unparsable_date_warns_and_continues() {
        let raw = table(vec![key_row("North", "soon", "2024-03-08", "2024-03-07", 10.0)]);
        let mut notifier = MemoryNotifier::new();
        let table = extract_key(&raw, &mut notifier);
        assert_eq!(table.len(), 1);
        assert_eq!(notifier.count(Level::Warning), 1);
    }

    #[test]
    fn extreme_year_is_a_warning_not_a_date() {
        let raw = table(vec![key_row(
            "North",
            "2024-03-01",
            "2024-03-08",
            "-262143-01-01 00:00:00",
            10.0,
        )]);
        let mut notifier = MemoryNotifier::new();
        let table = extract_key(&raw, &mut notifier);
        let record = &table.records[0];
        assert_eq!(record.in_date, None);
        assert_eq!(record.week, None);
        assert_eq!(record.processing_days, None);
        assert_eq!(notifier.count(Level::Warning), 1);
        assert!(notifier.events()[0].1.contains("-262143-01-01"));
    }

    #[test]
    fn final_anchors_on_ship_date() {
        let raw = table(vec![vec![
            (23, Cell::Number(40.0)),
            (24, Cell::from("Maya")),
            (25, Cell::from("2024-04-01")),
            (26, Cell::from("2024-04-03")),
            (27, Cell::from("Shipped")),
            (28, Cell::Date(date(2024, 4, 10))),
        ]]);
        let table = extract(
            &raw,
            &ProcessSchema::default_for(Process::Final),
            &mut MemoryNotifier::new(),
        )
        .unwrap();
        let record = &table.records[0];
        assert_eq!(record.process(), Process::Final);
        assert_eq!(record.total_records, 40.0);
        assert_eq!(record.processing_days, Some(9));
        assert_eq!(record.status(), Some("Shipped"));
        assert_eq!(record.week, Some(date(2024, 4, 8)));
        assert_eq!(record.month, Some(date(2024, 4, 1)));
    }

    #[test]
    fn negative_processing_days_are_kept() {
        let raw = table(vec![vec![
            (20, Cell::from("Ravi")),
            (21, Cell::from("2024-04-05")),
            (22, Cell::from("2024-04-03")),
            (23, Cell::Number(7.0)),
        ]]);
        let table = extract(
            &raw,
            &ProcessSchema::default_for(Process::Qc),
            &mut MemoryNotifier::new(),
        )
        .unwrap();
        assert_eq!(table.records[0].processing_days, Some(-2));
    }

    #[test]
    fn bad_label_is_column_spec_error() {
        let schema = ProcessSchema::with_columns(
            Process::Final,
            vec!["X", "Y", "Z", "A1", "AB", "AC"].into_iter().map(String::from).collect(),
        );
        let err = extract(&table(vec![]), &schema, &mut MemoryNotifier::new()).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::ColumnSpec {
                process: Process::Final,
                source: ColumnSpecError::InvalidCharacter { character: '1', .. }
            }
        ));
    }

    #[test]
    fn wrong_column_count_is_column_spec_error() {
        let schema = ProcessSchema::with_columns(Process::Qc, vec!["U".into(), "V".into()]);
        let err = extract(&table(vec![]), &schema, &mut MemoryNotifier::new()).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::ColumnSpec {
                source: ColumnSpecError::Arity { expected: 4, actual: 2 },
                ..
            }
        ));
    }

    #[test]
    fn narrow_table_is_missing_columns_error() {
        let raw = RawTable::new(
            vec!["A".into(), "B".into()],
            vec![vec![Cell::from("x"), Cell::from("y")]],
        );
        let err = extract(
            &raw,
            &ProcessSchema::default_for(Process::Key),
            &mut MemoryNotifier::new(),
        )
        .unwrap_err();
        match err {
            ExtractError::MissingColumns(e) => {
                assert_eq!(e.columns, vec!["J", "K", "L", "M", "N"]);
                assert_eq!(e.width, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
