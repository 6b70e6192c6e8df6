//! Tabular sources: CSV files and spreadsheets.
//!
//! Menus exported from a POS or typed into a spreadsheet are already
//! structured, so they bypass OCR and the model. Each row becomes a JSON
//! object keyed by the header row and goes through the same
//! [`crate::pipeline::normalize`] stage as model output, which resolves
//! header spellings (`SubCategory`, `sub_category`, …) and coerces prices.

use crate::error::ExtractionError;
use calamine::{open_workbook_auto, Data, Reader};
use serde_json::{Map, Value};
use std::fmt::Display;
use std::path::Path;
use tracing::{debug, info};

/// Read a CSV file into raw candidates, one per non-blank row.
pub fn read_csv(path: &Path) -> Result<Vec<Value>, ExtractionError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| table_error(path, e))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| table_error(path, e))?
        .iter()
        .map(clean_header)
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(table_error(path, "CSV file contains no header row"));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| table_error(path, e))?;
        let cells = (0..headers.len())
            .map(|i| record.get(i).unwrap_or("").trim().to_owned())
            .collect();
        if let Some(row) = row_to_candidate(&headers, cells) {
            rows.push(row);
        }
    }

    info!("Parsed {} rows from CSV {}", rows.len(), path.display());
    Ok(rows)
}

/// Read the first worksheet of an XLSX/XLSM/XLS/ODS workbook.
pub fn read_spreadsheet(path: &Path) -> Result<Vec<Value>, ExtractionError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| table_error(path, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| table_error(path, "workbook has no worksheets"))?
        .map_err(|e| table_error(path, e))?;

    let mut sheet_rows = range.rows();
    let Some(header_row) = sheet_rows.next() else {
        debug!("Worksheet in {} is empty", path.display());
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|c| clean_header(&cell_text(c)))
        .collect();

    let rows: Vec<Value> = sheet_rows
        .filter_map(|r| row_to_candidate(&headers, r.iter().map(cell_text).collect()))
        .collect();

    info!("Parsed {} rows from spreadsheet {}", rows.len(), path.display());
    Ok(rows)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string().trim().to_owned(),
    }
}

fn clean_header(raw: &str) -> String {
    raw.trim_start_matches('\u{FEFF}').trim().to_owned()
}

/// Zip headers with cells; blank rows and unnamed columns are skipped.
fn row_to_candidate(headers: &[String], cells: Vec<String>) -> Option<Value> {
    if cells.iter().all(String::is_empty) {
        return None;
    }
    let map: Map<String, Value> = headers
        .iter()
        .zip(cells)
        .filter(|(h, _)| !h.is_empty())
        .map(|(h, c)| (h.clone(), Value::String(c)))
        .collect();
    Some(Value::Object(map))
}

fn table_error(path: &Path, detail: impl Display) -> ExtractionError {
    ExtractionError::TableRead {
        path: path.to_path_buf(),
        detail: detail.to_string(),
    }
}
