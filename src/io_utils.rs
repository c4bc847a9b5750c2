//! Delimited-text helpers used when the input is a CSV/TSV export rather than
//! a workbook.
//!
//! Rows are read as raw bytes and decoded with `encoding_rs`, so exports
//! saved as Windows-1252 (common for Excel "CSV" on Windows) can be inspected
//! with `--input-encoding windows-1252`.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';
const SNIFFED_DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'")),
        None => Ok(UTF_8),
    }
}

pub fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    }
}

/// Tab for `.tsv`; otherwise sniffed from the first non-blank line, since
/// Excel exports on pt-BR systems separate fields with `;`.
pub fn detect_delimiter(path: &Path) -> Result<u8> {
    if delimiter_for(path) == DEFAULT_TSV_DELIMITER {
        return Ok(DEFAULT_TSV_DELIMITER);
    }
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    let mut reader = BufReader::new(file);
    let mut line = Vec::new();
    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .with_context(|| format!("Reading first line of {path:?}"))?;
        if read == 0 {
            return Ok(DEFAULT_CSV_DELIMITER);
        }
        if !line.iter().all(u8::is_ascii_whitespace) {
            return Ok(sniff_delimiter(&line));
        }
    }
}

/// Most frequent of `,` `;` and tab outside quotes; ties keep that order.
pub fn sniff_delimiter(line: &[u8]) -> u8 {
    let mut counts = [0usize; SNIFFED_DELIMITERS.len()];
    let mut in_quotes = false;
    for byte in line {
        if *byte == b'"' {
            in_quotes = !in_quotes;
        } else if !in_quotes
            && let Some(idx) = SNIFFED_DELIMITERS.iter().position(|d| d == byte)
        {
            counts[idx] += 1;
        }
    }
    let mut best = 0;
    for idx in 1..counts.len() {
        if counts[idx] > counts[best] {
            best = idx;
        }
    }
    if counts[best] == 0 {
        DEFAULT_CSV_DELIMITER
    } else {
        SNIFFED_DELIMITERS[best]
    }
}

/// Opens `path` without header handling; the caller decides whether row 0 is a header.
pub fn open_csv_reader(path: &Path, delimiter: u8) -> Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(BufReader::new(file));
    Ok(reader)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}
