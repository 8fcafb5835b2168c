//! FILENAME: engine/src/cell.rs
//! PURPOSE: Defines the fundamental data structures for a single spreadsheet cell.
//! CONTEXT: Separates the user's input (`raw`) from the computed result
//! (`value`/`error`) and the cell's display format. A cell with a formula
//! keeps both its original text and its last-computed value side by side.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One of the six error sentinels a cell can display in place of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellError {
    Cycle,
    Div0,
    Value,
    Ref,
    Name,
    Error,
}

impl CellError {
    /// The exact sentinel string shown to a user and round-tripped through
    /// persistence.
    pub fn sentinel(self) -> &'static str {
        match self {
            CellError::Cycle => "#CYCLE!",
            CellError::Div0 => "#DIV/0!",
            CellError::Value => "#VALUE!",
            CellError::Ref => "#REF!",
            CellError::Name => "#NAME?",
            CellError::Error => "#ERROR!",
        }
    }
}

impl std::fmt::Display for CellError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sentinel())
    }
}

/// The calculated result held by a cell: a number, text, a boolean, or an
/// error sentinel. Never constructed directly for a `null`/never-evaluated
/// cell — that state is `Cell::value == CellValue::Empty`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(CellError),
}

impl CellValue {
    /// The text a UI would render for this value.
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{:.0}", n)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Error(e) => e.sentinel().to_string(),
        }
    }
}

/// Recognized formatting options. Unknown keys are preserved verbatim
/// through `extra` on a JSON round-trip but are never consulted by the
/// engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u8>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// The atomic unit of the spreadsheet. Absent from the sheet's sparse map
/// entirely when `raw` would be empty — see [`crate::sheet::Sheet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub raw: String,
    pub value: CellValue,
    #[serde(default)]
    pub format: CellFormat,
    pub error: Option<CellError>,
}

impl Cell {
    /// A cell with `raw` text and no computed value yet (`value == Empty`,
    /// `error == None`). The recalc engine fills in `value`/`error` during
    /// the next `recalculate()`.
    pub fn new(raw: impl Into<String>) -> Self {
        Cell {
            raw: raw.into(),
            value: CellValue::Empty,
            format: CellFormat::default(),
            error: None,
        }
    }

    pub fn is_formula(&self) -> bool {
        self.raw.starts_with('=')
    }

    /// Installs a successful evaluation result, clearing any prior error.
    pub fn set_value(&mut self, value: CellValue) {
        self.error = None;
        self.value = value;
    }

    /// Installs an error sentinel; `value` mirrors it per the cell
    /// invariant that `error.is_some()` implies `value == Error(error)`.
    pub fn set_error(&mut self, error: CellError) {
        self.error = Some(error);
        self.value = CellValue::Error(error);
    }

    pub fn display_value(&self) -> String {
        self.value.display()
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::new(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_formula_detects_leading_equals() {
        assert!(Cell::new("=A1+1").is_formula());
        assert!(!Cell::new("42").is_formula());
        assert!(!Cell::new("").is_formula());
    }

    #[test]
    fn set_error_mirrors_value() {
        let mut cell = Cell::new("=A1/0");
        cell.set_error(CellError::Div0);
        assert_eq!(cell.value, CellValue::Error(CellError::Div0));
        assert_eq!(cell.error, Some(CellError::Div0));
    }

    #[test]
    fn format_round_trips_unknown_keys() {
        let json = serde_json::json!({"bold": true, "precision": 2, "fontFamily": "Arial"});
        let format: CellFormat = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(format.bold, Some(true));
        assert_eq!(format.precision, Some(2));
        assert_eq!(
            format.extra.get("fontFamily").unwrap(),
            &serde_json::Value::String("Arial".to_string())
        );
        let back = serde_json::to_value(&format).unwrap();
        assert_eq!(back, json);
    }
}
