//! Plain-text rendering of inspection results, mappings and server previews.

use std::fmt::Write as _;

use itertools::Itertools;

use crate::{
    client::PreviewRow,
    mapping::{ColumnMapping, ColumnRole},
    workbook::SheetInspection,
};

const NOT_IDENTIFIED: &str = "(not identified)";

/// Left-aligned columns separated by two spaces, with a dashed rule under the header.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|h| h.chars().count().max(3))
        .collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(flatten(cell).chars().count());
        }
    }

    let line = |cells: &mut dyn Iterator<Item = String>| -> String {
        cells
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}", width = *width))
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", line(&mut headers.iter().map(|h| h.to_string())));
    let _ = writeln!(out, "{}", line(&mut widths.iter().map(|w| "-".repeat(*w))));
    for row in rows {
        let _ = writeln!(out, "{}", line(&mut row.iter().map(|cell| flatten(cell))));
    }
    out
}

fn flatten(cell: &str) -> String {
    cell.replace(['\n', '\r', '\t'], " ")
}

pub fn mapping_table(mapping: &ColumnMapping) -> String {
    let rows = ColumnRole::ALL
        .iter()
        .map(|role| {
            vec![
                role.field_name().to_string(),
                role.label().to_string(),
                mapping.get(*role).unwrap_or(NOT_IDENTIFIED).to_string(),
            ]
        })
        .collect::<Vec<_>>();
    render_table(&["field", "role", "column"], &rows)
}

pub fn preview_table(rows: &[PreviewRow]) -> String {
    let cells = rows.iter().map(PreviewRow::cells).collect::<Vec<_>>();
    render_table(&["numero", "acao", "cnpj"], &cells)
}

pub fn inspection_summary(inspection: &SheetInspection) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "File:  {}", inspection.file_name());
    if !inspection.sheet.is_empty() {
        let _ = writeln!(out, "Sheet: {}", inspection.sheet);
    }
    let _ = writeln!(
        out,
        "Rows:  {}{}",
        inspection.data_rows,
        if inspection.has_header {
            " (header row excluded)"
        } else {
            ""
        }
    );
    if inspection.has_header {
        let _ = writeln!(out, "Columns: {}", inspection.headers.iter().join(", "));
    }
    out
}
