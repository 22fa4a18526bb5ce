//! Spreadsheet workbooks (xlsx, xls, xlsb, ods) via `calamine`.

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use chrono::{NaiveDate, NaiveDateTime};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use super::{build_table, TabularReader};
use crate::error::{ReaderError, ReaderResult};
use crate::models::{CellValue, Table};

/// Reads sheets from an opened workbook.
pub struct WorkbookReader<RS> {
    source_name: String,
    workbook: Sheets<RS>,
}

impl WorkbookReader<BufReader<File>> {
    /// Open a workbook file; the format is picked from the extension.
    pub fn open(path: impl AsRef<Path>) -> ReaderResult<Self> {
        let path = path.as_ref();
        let workbook = open_workbook_auto(path).map_err(|e| ReaderError::SourceUnavailable {
            source_name: path.display().to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            source_name: path.display().to_string(),
            workbook,
        })
    }
}

impl WorkbookReader<Cursor<Vec<u8>>> {
    /// Open a workbook held in memory; the format is sniffed from the content.
    pub fn from_bytes(bytes: Vec<u8>) -> ReaderResult<Self> {
        let source_name = format!("<{} bytes in memory>", bytes.len());
        let workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| {
            ReaderError::SourceUnavailable {
                source_name: source_name.clone(),
                message: e.to_string(),
            }
        })?;

        Ok(Self { source_name, workbook })
    }
}

impl<RS: Read + Seek> TabularReader for WorkbookReader<RS> {
    fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    fn read_sheet(&mut self, sheet: &str, header_row: usize) -> ReaderResult<Table> {
        let available = self.workbook.sheet_names();
        if !available.iter().any(|name| name == sheet) {
            return Err(ReaderError::SheetNotFound {
                sheet: sheet.to_string(),
                available,
            });
        }

        let range = self
            .workbook
            .worksheet_range(sheet)
            .map_err(|e| ReaderError::Decode {
                sheet: sheet.to_string(),
                message: format!("{} ({})", e, self.source_name),
            })?;

        build_table(sheet, range_to_grid(&range), header_row)
    }
}

/// Re-base a used range onto absolute sheet coordinates.
fn range_to_grid(range: &Range<Data>) -> Vec<Vec<CellValue>> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };

    let mut grid: Vec<Vec<CellValue>> = (0..start_row).map(|_| Vec::new()).collect();
    for row in range.rows() {
        let mut cells = vec![CellValue::Missing; start_col as usize];
        cells.extend(row.iter().map(cell_value));
        grid.push(cells);
    }
    grid
}

/// Map a calamine cell onto the closed [`CellValue`] set.
pub(crate) fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Missing,
        // #N/A and friends read as missing values
        Data::Error(_) => CellValue::Missing,
        Data::String(s) if s.is_empty() => CellValue::Missing,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) if dt.is_duration() => CellValue::Number(dt.as_f64()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(CellValue::Date)
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) => parse_iso(s)
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

fn parse_iso(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
