//! FILENAME: persistence/src/lib.rs
//! PURPOSE: Workbook JSON (de)serialization and CSV import/export for the
//! spreadsheet core.
//! CONTEXT: Built entirely on `engine`'s `Sheet`/`Cell` types; a loaded or
//! imported cell's raw text is re-parsed by `engine::Engine` once the
//! caller installs it, not by this crate.

mod csv;
mod error;
mod json;

pub use error::PersistenceError;
pub use json::{load, load_from_path, save, save_to_path};

/// Exports `sheet`'s populated rectangle as CSV.
pub use csv::export as export_csv;
/// Imports CSV rows into `sheet` starting at `(start_row, start_col)`.
pub use csv::import as import_csv;

#[cfg(test)]
mod tests {
    use super::*;
    use engine::{Cell, CellValue, Sheet};

    #[test]
    fn json_round_trip_through_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workbook.json");

        let mut sheet = Sheet::new();
        sheet.set_raw(0, 0, "10");
        sheet.put(0, 0, {
            let mut c = Cell::new("10");
            c.set_value(CellValue::Number(10.0));
            c
        });

        save_to_path(&sheet, &path).unwrap();
        let loaded = load_from_path(&path).unwrap();
        assert_eq!(loaded.get(0, 0).value, CellValue::Number(10.0));
    }

    #[test]
    fn csv_export_then_import_round_trips_through_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.csv");

        let mut sheet = Sheet::new();
        sheet.set_raw(0, 0, "1");
        sheet.set_raw(0, 1, "hello");

        let file = std::fs::File::create(&path).unwrap();
        export_csv(&sheet, file).unwrap();

        let mut imported = Sheet::new();
        let file = std::fs::File::open(&path).unwrap();
        import_csv(&mut imported, file, 0, 0).unwrap();
        assert_eq!(imported.get(0, 0).raw, "1");
        assert_eq!(imported.get(0, 1).raw, "hello");
    }
}
