use super::types::{CellValue, Columns, Row, RowSet, Workbook};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::collections::HashSet;
use std::io::Cursor;
use std::sync::Arc;
use thiserror::Error;

const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";
const CFB_SIGNATURE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const CSV_SHEET_NAME: &str = "Sheet1";
const EMPTY_HEADER: &str = "__EMPTY";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("File is empty")]
    EmptyInput,
    #[error("Unsupported text encoding: CSV files must be UTF-8")]
    UnsupportedEncoding,
    #[error("Failed to open workbook: {0}")]
    Corrupt(String),
    #[error("Failed to read CSV: {0}")]
    Csv(String),
    #[error("Failed to read worksheet {sheet}: {cause}")]
    Worksheet { sheet: String, cause: String },
    #[error("No sheets found in the file")]
    NoSheets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Spreadsheet,
    Text,
}

fn sniff(bytes: &[u8]) -> Container {
    if bytes.starts_with(ZIP_SIGNATURE) || bytes.starts_with(CFB_SIGNATURE) {
        Container::Spreadsheet
    } else {
        Container::Text
    }
}

/// Decodes an uploaded file into a [`Workbook`].
///
/// The format is picked from the content signature, never from the file name:
/// ZIP and OLE containers go through calamine, everything else is read as
/// UTF-8 CSV. Any failure aborts the whole decode.
pub fn decode(bytes: &[u8]) -> Result<Workbook, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::EmptyInput);
    }

    let sheets = match sniff(bytes) {
        Container::Spreadsheet => decode_spreadsheet(bytes)?,
        Container::Text => vec![(CSV_SHEET_NAME.to_string(), decode_csv(bytes)?)],
    };

    if sheets.is_empty() {
        tracing::error!("Decoded file contains no sheets");
        return Err(DecodeError::NoSheets);
    }

    Ok(Workbook::from_sheets(sheets))
}

fn decode_spreadsheet(bytes: &[u8]) -> Result<Vec<(String, RowSet)>, DecodeError> {
    let cursor = Cursor::new(bytes);
    let mut workbook = open_workbook_auto_from_rs(cursor).map_err(|e| {
        tracing::error!("Failed to open workbook: {}", e);
        DecodeError::Corrupt(e.to_string())
    })?;

    let sheet_names = workbook.sheet_names().to_vec();
    tracing::info!("Found {} sheets: {:?}", sheet_names.len(), sheet_names);

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for sheet_name in sheet_names {
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| DecodeError::Worksheet {
                sheet: sheet_name.clone(),
                cause: e.to_string(),
            })?;

        let mut grid = range.rows().map(|row| row.iter().map(cell_value));
        let rows = match grid.next() {
            Some(header_row) => {
                let headers = header_names(header_row.map(|cell| cell.to_string()));
                build_rows(headers, grid)
            }
            None => Vec::new(),
        };
        tracing::debug!("Sheet {} decoded with {} rows", sheet_name, rows.len());
        sheets.push((sheet_name, rows));
    }

    Ok(sheets)
}

fn decode_csv(bytes: &[u8]) -> Result<RowSet, DecodeError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::UnsupportedEncoding)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DecodeError::Csv(e.to_string()))?;
        records.push(record);
    }

    let mut records = records.into_iter();
    let Some(header_record) = records.next() else {
        return Ok(Vec::new());
    };

    let width = records
        .as_slice()
        .iter()
        .map(|r| r.len())
        .chain(std::iter::once(header_record.len()))
        .max()
        .unwrap_or(0);
    let headers = header_names(
        (0..width).map(|idx| header_record.get(idx).unwrap_or_default().to_string()),
    );

    Ok(build_rows(
        headers,
        records.map(|record| {
            record
                .iter()
                .map(csv_field_value)
                .collect::<Vec<_>>()
                .into_iter()
        }),
    ))
}

/// Maps a calamine cell to a scalar. Dates become ISO text, errors their code.
fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) if value.time() == chrono::NaiveTime::MIN => {
                CellValue::Text(value.format("%Y-%m-%d").to_string())
            }
            Some(value) => CellValue::Text(value.format("%Y-%m-%dT%H:%M:%S").to_string()),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

fn csv_field_value(field: &str) -> CellValue {
    if field.is_empty() {
        return CellValue::Empty;
    }
    if field.eq_ignore_ascii_case("true") {
        return CellValue::Bool(true);
    }
    if field.eq_ignore_ascii_case("false") {
        return CellValue::Bool(false);
    }
    match field.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && looks_numeric(field.trim()) => CellValue::Number(n),
        _ => CellValue::Text(field.to_string()),
    }
}

// `str::parse::<f64>` also accepts words like "inf" and "NaN".
fn looks_numeric(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
}

/// Names header cells: blanks become `__EMPTY`, `__EMPTY_1`, ... and repeated
/// names get a numeric suffix.
fn header_names(cells: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    cells
        .map(|cell| {
            let base = if cell.trim().is_empty() {
                EMPTY_HEADER.to_string()
            } else {
                cell
            };
            let mut name = base.clone();
            let mut counter = 1;
            while !seen.insert(name.clone()) {
                name = format!("{}_{}", base, counter);
                counter += 1;
            }
            name
        })
        .collect()
}

/// Pairs each data row with the headers, dropping empty cells and blank rows.
/// Every row of the sheet shares one column set.
fn build_rows<R, C>(headers: Vec<String>, data: R) -> RowSet
where
    R: Iterator<Item = C>,
    C: Iterator<Item = CellValue>,
{
    let columns = Arc::new(Columns::new(headers));
    let width = columns.len();
    data.filter_map(|cells| {
        let values = cells
            .take(width)
            .map(|value| (!value.is_blank()).then_some(value))
            .collect();
        let row = Row::with_columns(Arc::clone(&columns), values);
        (!row.is_empty()).then_some(row)
    })
    .collect()
}
