//! FILENAME: persistence/src/error.rs
//! PURPOSE: Typed I/O errors for workbook persistence.
//! CONTEXT: Unlike the parser/engine crates' hand-rolled error types, this
//! layer leans on `thiserror`'s `#[from]` conversions since it's a thin
//! boundary wrapping three different underlying I/O libraries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid workbook format: {0}")]
    InvalidFormat(String),

    #[error("sheet not found: {0}")]
    SheetNotFound(String),
}
