//! FILENAME: persistence/src/json.rs
//! PURPOSE: Workbook JSON (de)serialization.
//! CONTEXT: Schema is `sheet_name`, `max_row`, `max_col`, and a
//! `"row,col"`-keyed cell map. The wire `value`/`error` fields are plain
//! JSON scalars (a bare number, string, boolean, or sentinel string) per
//! the persisted schema, not `engine`'s tagged `CellValue` enum — so this
//! module converts by hand rather than deriving `Serialize` on `Cell`
//! itself.

use crate::error::PersistenceError;
use engine::{Cell, CellError, CellFormat, CellValue, Sheet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};

#[derive(Debug, Serialize, Deserialize)]
struct WorkbookDocument {
    sheet_name: String,
    max_row: u32,
    max_col: u32,
    cells: HashMap<String, CellDocument>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CellDocument {
    raw: String,
    value: serde_json::Value,
    #[serde(default)]
    format: CellFormat,
    error: Option<String>,
}

fn value_to_json(value: &CellValue) -> serde_json::Value {
    match value {
        CellValue::Empty => serde_json::Value::Null,
        CellValue::Number(n) => serde_json::json!(n),
        CellValue::Text(s) => serde_json::json!(s),
        CellValue::Boolean(b) => serde_json::json!(b),
        CellValue::Error(e) => serde_json::json!(e.sentinel()),
    }
}

fn sentinel_to_error(s: &str) -> Option<CellError> {
    match s {
        "#CYCLE!" => Some(CellError::Cycle),
        "#DIV/0!" => Some(CellError::Div0),
        "#VALUE!" => Some(CellError::Value),
        "#REF!" => Some(CellError::Ref),
        "#NAME?" => Some(CellError::Name),
        "#ERROR!" => Some(CellError::Error),
        _ => None,
    }
}

fn json_to_value(value: &serde_json::Value, error: Option<CellError>) -> CellValue {
    if let Some(e) = error {
        return CellValue::Error(e);
    }
    match value {
        serde_json::Value::Null => CellValue::Empty,
        serde_json::Value::Bool(b) => CellValue::Boolean(*b),
        serde_json::Value::Number(n) => CellValue::Number(n.as_f64().unwrap_or(0.0)),
        serde_json::Value::String(s) => CellValue::Text(s.clone()),
        // Arrays/objects are never written by `to_json`; treat as empty
        // rather than failing a load over a hand-edited file.
        _ => CellValue::Empty,
    }
}

fn parse_key(key: &str) -> Option<(u32, u32)> {
    let (row, col) = key.split_once(',')?;
    Some((row.parse().ok()?, col.parse().ok()?))
}

fn to_document(sheet: &Sheet) -> WorkbookDocument {
    let mut cells = HashMap::with_capacity(sheet.len());
    for (&(row, col), cell) in sheet.iter() {
        let error = cell.error.map(|e| e.sentinel().to_string());
        cells.insert(
            format!("{},{}", row, col),
            CellDocument {
                raw: cell.raw.clone(),
                value: value_to_json(&cell.value),
                format: cell.format.clone(),
                error,
            },
        );
    }
    WorkbookDocument {
        sheet_name: sheet.sheet_name.clone(),
        max_row: sheet.max_row(),
        max_col: sheet.max_col(),
        cells,
    }
}

fn from_document(document: WorkbookDocument) -> Result<Sheet, PersistenceError> {
    let mut sheet = Sheet::new();
    sheet.sheet_name = document.sheet_name;
    sheet.expand_bounds(document.max_row, document.max_col);

    for (key, doc) in document.cells {
        let (row, col) = parse_key(&key)
            .ok_or_else(|| PersistenceError::InvalidFormat(format!("bad cell key: {:?}", key)))?;
        let error = doc.error.as_deref().and_then(sentinel_to_error);
        let value = json_to_value(&doc.value, error);
        let cell = Cell {
            raw: doc.raw,
            value,
            format: doc.format,
            error,
        };
        sheet.put(row, col, cell);
    }

    Ok(sheet)
}

/// Serializes `sheet` as pretty-printed workbook JSON to `writer`.
pub fn save<W: Write>(sheet: &Sheet, writer: W) -> Result<(), PersistenceError> {
    serde_json::to_writer_pretty(writer, &to_document(sheet))?;
    Ok(())
}

/// Deserializes a workbook JSON document from `reader` into a fresh
/// [`Sheet`], replacing whatever it previously held.
pub fn load<R: Read>(reader: R) -> Result<Sheet, PersistenceError> {
    let document: WorkbookDocument = serde_json::from_reader(reader)?;
    from_document(document)
}

/// Convenience wrapper around [`save`] for a filesystem path.
pub fn save_to_path(sheet: &Sheet, path: impl AsRef<std::path::Path>) -> Result<(), PersistenceError> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|e| {
        log::error!("failed to create workbook file {:?}: {}", path, e);
        e
    })?;
    save(sheet, file)
}

/// Convenience wrapper around [`load`] for a filesystem path.
pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Sheet, PersistenceError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        log::error!("failed to open workbook file {:?}: {}", path, e);
        e
    })?;
    load(file).map_err(|e| {
        log::error!("failed to parse workbook file {:?}: {}", path, e);
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_values_formats_and_errors() {
        let mut sheet = Sheet::new();
        sheet.sheet_name = "Budget".to_string();
        sheet.put(0, 0, {
            let mut c = Cell::new("10");
            c.set_value(CellValue::Number(10.0));
            c
        });
        sheet.put(0, 1, {
            let mut c = Cell::new("=A1/0");
            c.set_error(CellError::Div0);
            c
        });
        let mut with_format = Cell::new("hello");
        with_format.format.bold = Some(true);
        with_format.format.precision = Some(2);
        with_format.set_value(CellValue::Text("hello".to_string()));
        sheet.put(1, 0, with_format);

        let mut buf = Vec::new();
        save(&sheet, &mut buf).unwrap();
        let loaded = load(buf.as_slice()).unwrap();

        assert_eq!(loaded.sheet_name, "Budget");
        assert_eq!(loaded.get(0, 0).value, CellValue::Number(10.0));
        assert_eq!(loaded.get(0, 1).error, Some(CellError::Div0));
        assert_eq!(loaded.get(1, 0).format.bold, Some(true));
        assert_eq!(loaded.get(1, 0).format.precision, Some(2));
    }

    #[test]
    fn unknown_format_keys_round_trip_through_extra() {
        let mut sheet = Sheet::new();
        let mut cell = Cell::new("1");
        cell.set_value(CellValue::Number(1.0));
        cell.format.extra.insert(
            "fontFamily".to_string(),
            serde_json::Value::String("Arial".to_string()),
        );
        sheet.put(0, 0, cell);

        let mut buf = Vec::new();
        save(&sheet, &mut buf).unwrap();
        let loaded = load(buf.as_slice()).unwrap();
        assert_eq!(
            loaded.get(0, 0).format.extra.get("fontFamily"),
            Some(&serde_json::Value::String("Arial".to_string()))
        );
    }

    #[test]
    fn max_bounds_round_trip_even_beyond_populated_cells() {
        let mut sheet = Sheet::new();
        sheet.set_raw(2, 2, "x");
        sheet.expand_bounds(10, 10);

        let mut buf = Vec::new();
        save(&sheet, &mut buf).unwrap();
        let loaded = load(buf.as_slice()).unwrap();
        assert_eq!(loaded.max_row(), 10);
        assert_eq!(loaded.max_col(), 10);
    }

    #[test]
    fn rejects_malformed_cell_keys() {
        let json = serde_json::json!({
            "sheet_name": "Sheet1",
            "max_row": 0,
            "max_col": 0,
            "cells": { "not-a-key": { "raw": "1", "value": 1, "format": {}, "error": null } }
        });
        let err = load(json.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidFormat(_)));
    }
}
