//! Source table readers
//!
//! Spreadsheets go through calamine, CSV files through the `csv` crate. Both
//! treat the first row as the header row and keep cells at their absolute
//! column positions.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use tracing::{debug, info};

use prodreport_core::{Cell, InputError, InputProvider, InputRequest, RawTable};

const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xls", "xlsb", "ods"];

/// The input selected on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileInput {
    Spreadsheet { path: PathBuf, sheet: Option<String> },
    Csv { path: PathBuf },
    Unsupported { path: PathBuf },
    /// No file was given
    Declined,
}

impl FileInput {
    pub fn new(path: Option<PathBuf>, sheet: Option<String>) -> Self {
        let Some(path) = path else {
            return FileInput::Declined;
        };
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if ext == "csv" {
            FileInput::Csv { path }
        } else if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
            FileInput::Spreadsheet { path, sheet }
        } else {
            FileInput::Unsupported { path }
        }
    }
}

impl InputProvider for FileInput {
    fn request_input(&mut self) -> Result<InputRequest, InputError> {
        let table = match self {
            FileInput::Declined => return Ok(InputRequest::Abort),
            FileInput::Unsupported { path } => {
                return Err(InputError::UnsupportedFormat(path.display().to_string()))
            }
            FileInput::Spreadsheet { path, sheet } => read_spreadsheet(path, sheet.as_deref())?,
            FileInput::Csv { path } => read_csv(path)?,
        };
        Ok(InputRequest::Table(table))
    }
}

/// Read one sheet; the first sheet when `sheet` is `None`
pub fn read_spreadsheet(path: &Path, sheet: Option<&str>) -> Result<RawTable, InputError> {
    if !path.exists() {
        return Err(InputError::Read(format!("{} not found", path.display())));
    }
    let mut workbook =
        open_workbook_auto(path).map_err(|e| InputError::Read(format!("{}: {e}", path.display())))?;

    let name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| InputError::Read(format!("{} has no sheets", path.display())))?,
    };
    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| InputError::Read(format!("sheet '{name}': {e}")))?;

    // The used range may not begin at A1; only the column offset is positional
    let start_col = range.start().map_or(0, |(_, col)| col as usize);
    let grid = range
        .rows()
        .map(|row| {
            let mut cells = vec![Cell::Empty; start_col];
            cells.extend(row.iter().map(convert));
            cells
        })
        .collect();

    let table = split_header(grid);
    info!(sheet = %name, rows = table.height(), columns = table.width(), "spreadsheet loaded");
    Ok(table)
}

pub fn read_csv(path: &Path) -> Result<RawTable, InputError> {
    let file = std::fs::File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut grid = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| InputError::Read(e.to_string()))?;
        grid.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }

    let table = split_header(grid);
    info!(rows = table.height(), columns = table.width(), "csv loaded");
    Ok(table)
}

/// The first non-blank row becomes the headers, everything below stays
/// positional data
fn split_header(mut grid: Vec<Vec<Cell>>) -> RawTable {
    let Some(header_row) = grid.iter().position(|row| !row.iter().all(Cell::is_blank)) else {
        return RawTable::new(Vec::new(), Vec::new());
    };
    if header_row > 0 {
        debug!(skipped = header_row, "blank rows above the header");
    }
    let rows = grid.split_off(header_row + 1);
    let header = grid.pop().unwrap_or_default();
    let headers = header
        .iter()
        .map(|c| c.as_label().unwrap_or_default())
        .collect();
    RawTable::new(headers, rows)
}

fn convert(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => Cell::Date(value.date()),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => {
            debug!(error = ?e, "error cell read as empty");
            Cell::Empty
        }
    }
}
