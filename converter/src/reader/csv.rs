//! CSV exports with encoding and delimiter auto-detection.
//!
//! Spreadsheet tools export one CSV per sheet, so a directory of
//! `<sheet name>.csv` files stands in for a workbook. CSV carries no types:
//! every non-empty value is read as text.

use encoding_rs::{Encoding, UTF_8};
use std::path::{Path, PathBuf};

use super::{build_table, TabularReader};
use crate::error::{ReaderError, ReaderResult};
use crate::models::{CellValue, Table};

const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Guess the encoding of an export. Labels `encoding_rs` does not know
/// fall back to UTF-8.
pub fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    let (charset, _, _) = chardet::detect(bytes);
    Encoding::for_label(charset.as_bytes()).unwrap_or(UTF_8)
}

/// Decode an export to text. A byte order mark overrides `encoding`.
pub fn decode_content(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// The candidate occurring most often on the first non-empty line, `,` when
/// none occurs. Ties go to the earlier candidate.
pub fn detect_delimiter(content: &str) -> u8 {
    let header = content.lines().find(|l| !l.trim().is_empty()).unwrap_or_default();
    DELIMITERS
        .iter()
        .rev()
        .max_by_key(|&&d| header.bytes().filter(|&b| b == d).count())
        .copied()
        .unwrap_or(b',')
}

/// Parse CSV text into a positional grid of cells.
pub(crate) fn parse_grid(sheet: &str, content: &str, delimiter: u8) -> ReaderResult<Vec<Vec<CellValue>>> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Vec::new();
    for (line_idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ReaderError::Decode {
            sheet: sheet.to_string(),
            message: format!("line {}: {}", line_idx + 1, e),
        })?;

        grid.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        CellValue::Missing
                    } else {
                        CellValue::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(grid)
}

/// Read a single CSV document as `sheet`.
pub fn read_csv_bytes(sheet: &str, bytes: &[u8], header_row: usize) -> ReaderResult<Table> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, encoding);
    let delimiter = detect_delimiter(&content);
    build_table(sheet, parse_grid(sheet, &content, delimiter)?, header_row)
}

/// A directory of per-sheet CSV exports.
pub struct CsvDirectoryReader {
    dir: PathBuf,
}

impl CsvDirectoryReader {
    pub fn open(dir: impl AsRef<Path>) -> ReaderResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ReaderError::SourceUnavailable {
                source_name: dir.display().to_string(),
                message: "not a directory".to_string(),
            });
        }
        Ok(Self { dir: dir.to_path_buf() })
    }

    fn sheet_path(&self, sheet: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", sheet))
    }
}

impl TabularReader for CsvDirectoryReader {
    fn sheet_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .flatten()
                    .map(|entry| entry.path())
                    .filter(|path| path.extension().is_some_and(|e| e.eq_ignore_ascii_case("csv")))
                    .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    fn read_sheet(&mut self, sheet: &str, header_row: usize) -> ReaderResult<Table> {
        let path = self.sheet_path(sheet);
        if !path.is_file() {
            return Err(ReaderError::SheetNotFound {
                sheet: sheet.to_string(),
                available: self.sheet_names(),
            });
        }

        let bytes = std::fs::read(&path).map_err(|e| ReaderError::SourceUnavailable {
            source_name: path.display().to_string(),
            message: e.to_string(),
        })?;

        read_csv_bytes(sheet, &bytes, header_row)
    }
}
