//! Local inspection of the spreadsheet before it is uploaded.
//!
//! Only the first sheet is read. Row 0 counts as a header when any of its
//! cells contains a Latin letter; the data row count excludes it, and the
//! header cells feed [`crate::mapping::detect_mapping`].

use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use anyhow::{Context, Result};
use calamine::{Data, Reader, open_workbook_auto};
use encoding_rs::Encoding;
use log::debug;
use regex::Regex;
use thiserror::Error;

use crate::{
    io_utils,
    mapping::{ColumnMapping, detect_mapping},
};

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];
const DELIMITED_EXTENSIONS: &[&str] = &["csv", "tsv"];

#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("Unsupported file {path:?}: expected a spreadsheet (.xlsx, .xls, .ods) or a .csv/.tsv export")]
    Unsupported { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetKind {
    Workbook,
    Delimited,
}

impl SpreadsheetKind {
    pub fn from_path(path: &Path) -> Result<Self, WorkbookError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
            Ok(SpreadsheetKind::Workbook)
        } else if DELIMITED_EXTENSIONS.contains(&extension.as_str()) {
            Ok(SpreadsheetKind::Delimited)
        } else {
            Err(WorkbookError::Unsupported {
                path: path.to_path_buf(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetInspection {
    pub path: PathBuf,
    pub sheet: String,
    pub has_header: bool,
    pub headers: Vec<String>,
    pub data_rows: u64,
    /// Present only when row 0 was detected as a header.
    pub mapping: Option<ColumnMapping>,
}

impl SheetInspection {
    /// Placeholder for a file that could not be read locally; the server may still handle it.
    pub fn unread(path: &Path) -> Self {
        SheetInspection {
            path: path.to_path_buf(),
            sheet: String::new(),
            has_header: false,
            headers: Vec::new(),
            data_rows: 0,
            mapping: None,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

pub fn inspect(path: &Path, encoding: &'static Encoding) -> Result<SheetInspection> {
    let kind = SpreadsheetKind::from_path(path)?;
    let (sheet, rows) = match kind {
        SpreadsheetKind::Workbook => read_first_sheet(path)?,
        SpreadsheetKind::Delimited => read_delimited(path, encoding)?,
    };
    debug!("Read {} non-empty row(s) from sheet '{}'", rows.len(), sheet);
    Ok(summarize(path, sheet, rows))
}

fn summarize(path: &Path, sheet: String, rows: Vec<Vec<String>>) -> SheetInspection {
    let Some(first_row) = rows.first() else {
        return SheetInspection {
            sheet,
            ..SheetInspection::unread(path)
        };
    };
    let has_header = row_looks_like_header(first_row);
    let total = rows.len() as u64;
    let (headers, data_rows, mapping) = if has_header {
        let headers = first_row
            .iter()
            .map(|cell| cell.trim().to_string())
            .collect::<Vec<_>>();
        let mapping = detect_mapping(&headers);
        (headers, total - 1, Some(mapping))
    } else {
        (Vec::new(), total, None)
    };
    SheetInspection {
        path: path.to_path_buf(),
        sheet,
        has_header,
        headers,
        data_rows,
        mapping,
    }
}

fn header_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("[A-Za-zÀ-ú]").expect("header pattern is valid"))
}

pub fn row_looks_like_header<S: AsRef<str>>(row: &[S]) -> bool {
    row.iter().any(|cell| header_pattern().is_match(cell.as_ref()))
}

fn read_first_sheet(path: &Path) -> Result<(String, Vec<Vec<String>>)> {
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("Opening workbook {path:?}"))?;
    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        debug!("Workbook {path:?} has no sheets");
        return Ok((String::new(), Vec::new()));
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("Reading sheet '{sheet_name}' from {path:?}"))?;
    let rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
        .filter(|row| !row_is_blank(row))
        .collect();
    Ok((sheet_name, rows))
}

fn read_delimited(
    path: &Path,
    encoding: &'static Encoding,
) -> Result<(String, Vec<Vec<String>>)> {
    let mut reader = io_utils::open_csv_reader(path, io_utils::detect_delimiter(path)?)?;
    let mut rows = Vec::new();
    for (idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} in {path:?}", idx + 1))?;
        let decoded = io_utils::decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {} in {path:?}", idx + 1))?;
        if !row_is_blank(&decoded) {
            rows.push(decoded);
        }
    }
    let sheet = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok((sheet, rows))
}

fn row_is_blank(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        // Phone numbers typed into numeric cells come back as floats.
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
