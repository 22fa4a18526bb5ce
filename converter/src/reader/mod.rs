//! Tabular sources.
//!
//! A [`TabularReader`] turns one named sheet into a [`Table`]. Blank rows are
//! ignored everywhere: `header_row` counts the non-blank rows above the header,
//! and every non-blank row below it becomes a [`Row`](crate::models::Row).
//!
//! Two readers are provided:
//!
//! - [`WorkbookReader`] - xlsx/xls/xlsb/ods workbooks via `calamine`
//! - [`CsvDirectoryReader`] - a directory holding one CSV export per sheet

pub mod csv;
pub mod workbook;

pub use self::csv::{decode_content, detect_delimiter, detect_encoding, CsvDirectoryReader};
pub use self::workbook::WorkbookReader;

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::error::{ReaderError, ReaderResult};
use crate::models::{CellValue, Table};

/// Something that yields header-addressed rows per sheet.
pub trait TabularReader {
    /// Names of the sheets in source order.
    fn sheet_names(&self) -> Vec<String>;

    /// Read `sheet`, taking the non-blank row at index `header_row` as the header.
    fn read_sheet(&mut self, sheet: &str, header_row: usize) -> ReaderResult<Table>;
}

/// Where the tabular data comes from.
#[derive(Debug, Clone)]
pub enum Source {
    /// A workbook file, or a directory of CSV exports.
    Path(PathBuf),
    /// An in-memory workbook, e.g. a downloaded export.
    Bytes(Vec<u8>),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Path(p) => write!(f, "{}", p.display()),
            Source::Bytes(b) => write!(f, "<{} bytes in memory>", b.len()),
        }
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::Path(path)
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Source::Bytes(bytes)
    }
}

/// Open the reader matching `source`.
pub fn open_source(source: &Source) -> ReaderResult<Box<dyn TabularReader>> {
    match source {
        Source::Path(path) if path.is_dir() => Ok(Box::new(CsvDirectoryReader::open(path)?)),
        Source::Path(path) => Ok(Box::new(WorkbookReader::open(path)?)),
        Source::Bytes(bytes) => Ok(Box::new(WorkbookReader::from_bytes(bytes.clone())?)),
    }
}

/// Build a [`Table`] from a positional grid of cells.
///
/// Rows with no values are dropped first, so `header_row` indexes the
/// remaining rows. Empty header cells are named `Unnamed: <col>` (and dropped
/// when the whole column is empty), repeated headers get `.1`, `.2`, ...
/// suffixes.
pub(crate) fn build_table(
    sheet: &str,
    grid: Vec<Vec<CellValue>>,
    header_row: usize,
) -> ReaderResult<Table> {
    let mut grid: Vec<Vec<CellValue>> = grid
        .into_iter()
        .filter(|row| row.iter().any(|c| !c.is_missing()))
        .collect();

    if header_row >= grid.len() {
        return Err(ReaderError::HeaderRowOutOfRange {
            sheet: sheet.to_string(),
            header_row,
            rows: grid.len(),
        });
    }

    let body = grid.split_off(header_row + 1);
    let header = grid.pop().unwrap_or_default();

    let width = header
        .len()
        .max(body.iter().map(Vec::len).max().unwrap_or(0));

    let named: Vec<Option<String>> = (0..width)
        .map(|col| {
            let text = header.get(col).map(|c| c.to_string()).unwrap_or_default();
            if text.trim().is_empty() {
                None
            } else {
                Some(text)
            }
        })
        .collect();

    // Keep named columns, and unnamed ones that carry data
    let kept: Vec<usize> = (0..width)
        .filter(|&col| {
            named[col].is_some()
                || body.iter().any(|row| row.get(col).is_some_and(|c| !c.is_missing()))
        })
        .collect();

    let columns = dedupe_headers(
        kept.iter()
            .map(|&col| named[col].clone().unwrap_or_else(|| format!("Unnamed: {}", col))),
    );

    let rows = body.into_iter().map(|mut row| {
        kept.iter()
            .map(|&col| {
                row.get_mut(col)
                    .map(|cell| std::mem::replace(cell, CellValue::Missing))
                    .unwrap_or(CellValue::Missing)
            })
            .collect::<Vec<_>>()
    });

    Ok(Table::from_rows(sheet, columns, rows))
}

/// Suffix repeated names with `.1`, `.2`, ... in order of appearance.
fn dedupe_headers(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::new();

    for name in names {
        let mut candidate = name.clone();
        while let Some(count) = seen.get_mut(&candidate) {
            *count += 1;
            candidate = format!("{}.{}", name, count);
        }
        seen.insert(candidate.clone(), 0);
        out.push(candidate);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::from(s)
    }

    #[test]
    fn test_header_offset() {
        let grid = vec![
            vec![text("The AI Risk Repository")],
            vec![text("Version 2")],
            vec![text("QuickRef"), text("Title")],
            vec![text("A1"), text("X")],
            vec![text("A2"), text("Y")],
        ];

        let table = build_table("Facts", grid, 2).unwrap();
        assert_eq!(table.columns, vec!["QuickRef", "Title"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1]["Title"], text("Y"));
    }

    #[test]
    fn test_header_offset_ignores_blank_rows() {
        let grid = vec![
            vec![],
            vec![text("About this sheet")],
            vec![CellValue::Missing, CellValue::Missing],
            vec![],
            vec![text("Source: survey")],
            vec![text("QuickRef"), text("Title")],
            vec![],
            vec![text("A1"), text("X")],
        ];

        // Two non-blank rows sit above the header
        let table = build_table("Facts", grid.clone(), 2).unwrap();
        assert_eq!(table.columns, vec!["QuickRef", "Title"]);
        assert_eq!(table.len(), 1);

        // The absolute index would land on a data row
        let err = build_table("Facts", grid, 5).unwrap_err();
        assert!(matches!(err, ReaderError::HeaderRowOutOfRange { rows: 4, .. }));
    }

    #[test]
    fn test_header_row_out_of_range() {
        let grid = vec![vec![text("only row")]];
        let err = build_table("Facts", grid, 11).unwrap_err();
        assert!(matches!(err, ReaderError::HeaderRowOutOfRange { rows: 1, .. }));
    }

    #[test]
    fn test_blank_rows_skipped_and_short_rows_padded() {
        let grid = vec![
            vec![text("a"), text("b")],
            vec![text("1")],
            vec![CellValue::Missing, CellValue::Missing],
            vec![text("2"), text("3")],
        ];

        let table = build_table("S", grid, 0).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0]["b"], CellValue::Missing);
        assert_eq!(table.rows[1]["b"], text("3"));
    }

    #[test]
    fn test_unnamed_and_duplicate_headers() {
        let grid = vec![
            vec![text("Title"), CellValue::Missing, text("Title"), CellValue::Missing, text("Title")],
            vec![text("a"), text("b"), text("c"), CellValue::Missing, text("e")],
        ];

        let table = build_table("S", grid, 0).unwrap();
        // Column 3 is unnamed and empty, so it is dropped
        assert_eq!(table.columns, vec!["Title", "Unnamed: 1", "Title.1", "Title.2"]);
        assert_eq!(table.rows[0]["Unnamed: 1"], text("b"));
        assert_eq!(table.rows[0]["Title.2"], text("e"));
    }

    #[test]
    fn test_numeric_header_rendered_as_text() {
        let grid = vec![vec![CellValue::Number(2024.0)], vec![text("x")]];
        let table = build_table("S", grid, 0).unwrap();
        assert_eq!(table.columns, vec!["2024"]);
    }

    #[test]
    fn test_header_only_sheet_has_columns() {
        let grid = vec![vec![text("QuickRef"), text("Year")]];
        let table = build_table("S", grid, 0).unwrap();
        assert!(table.is_empty());
        assert!(table.has_column("QuickRef"));
    }
}
