//! FILENAME: persistence/src/csv.rs
//! PURPOSE: CSV export/import over the bounding rectangle of populated cells.
//! CONTEXT: Export writes each cell's displayed value (errors as their
//! sentinel string); import stores each non-empty field raw, except that a
//! field matching the numeric-coercion pattern is normalized to its parsed
//! number's string form first.

use crate::error::PersistenceError;
use engine::{Cell, CellValue, Sheet};
use std::io::{Read, Write};

/// Matches `^-?[0-9]+(\.[0-9]+)?$`, the same numeric-coercion rule the
/// evaluator uses for a non-formula cell's literal text.
fn is_numeric_string(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s, None),
    };
    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match frac_part {
        Some(f) => !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()),
        None => true,
    }
}

fn display_value(cell: &Cell) -> String {
    if let Some(error) = cell.error {
        return error.sentinel().to_string();
    }
    match &cell.value {
        CellValue::Empty => cell.raw.clone(),
        other => other.display(),
    }
}

/// Writes the bounding rectangle `[0, max_row] x [0, max_col]` of `sheet`
/// as CSV. Fields are quoted only when they contain `"`, `,`, or a
/// newline; internal `"` is doubled. Records are LF-terminated.
pub fn export<W: Write>(sheet: &Sheet, writer: W) -> Result<(), PersistenceError> {
    let mut wtr = ::csv::WriterBuilder::new().terminator(::csv::Terminator::Any(b'\n')).from_writer(writer);

    if sheet.is_empty() {
        wtr.flush()?;
        return Ok(());
    }

    for row in 0..=sheet.max_row() {
        let mut record = Vec::with_capacity(sheet.max_col() as usize + 1);
        for col in 0..=sheet.max_col() {
            record.push(display_value(&sheet.get(row, col)));
        }
        wtr.write_record(&record).map_err(|e| {
            log::error!("failed writing CSV row {}: {}", row, e);
            e
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Reads CSV rows, writing each non-empty field into `sheet` starting at
/// `(start_row, start_col)`. A field is normalized to its parsed numeric
/// string when it matches the numeric-coercion pattern, otherwise stored
/// verbatim as `raw`.
pub fn import<R: Read>(sheet: &mut Sheet, reader: R, start_row: u32, start_col: u32) -> Result<(), PersistenceError> {
    let mut rdr = ::csv::ReaderBuilder::new().has_headers(false).from_reader(reader);

    for (row_offset, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| {
            log::error!("failed reading CSV row {}: {}", row_offset, e);
            e
        })?;
        let row = start_row + row_offset as u32;
        for (col_offset, field) in record.iter().enumerate() {
            let col = start_col + col_offset as u32;
            let field = field.trim();
            if field.is_empty() {
                continue;
            }
            let raw = if is_numeric_string(field) {
                field.parse::<f64>().map(|n| n.to_string()).unwrap_or_else(|_| field.to_string())
            } else {
                field.to_string()
            };
            sheet.set_raw(row, col, raw);
        }
    }
    Ok(())
}
