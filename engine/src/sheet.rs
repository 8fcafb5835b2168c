//! FILENAME: engine/src/sheet.rs
//! PURPOSE: Sparse storage for a single sheet's cells.
//! CONTEXT: Absence from the map denotes an empty cell rather than an
//! explicit null; `max_row`/`max_col` track the largest index ever written
//! and are never shrunk by a delete.

use crate::cell::{Cell, CellValue};
use crate::observer::SheetObserver;
use std::collections::HashMap;

/// The spreadsheet's cell store plus bookkeeping for its populated extent.
pub struct Sheet {
    pub sheet_name: String,
    cells: HashMap<(u32, u32), Cell>,
    max_row: u32,
    max_col: u32,
    observer: Option<Box<dyn SheetObserver>>,
}

impl Sheet {
    pub fn new() -> Self {
        Sheet {
            sheet_name: "Sheet1".to_string(),
            cells: HashMap::new(),
            max_row: 0,
            max_col: 0,
            observer: None,
        }
    }

    pub fn set_observer(&mut self, observer: Box<dyn SheetObserver>) {
        self.observer = Some(observer);
    }

    pub fn max_row(&self) -> u32 {
        self.max_row
    }

    pub fn max_col(&self) -> u32 {
        self.max_col
    }

    /// Widens the cached extent to at least `(row, col)` without touching
    /// any cell. Used by persistence when loading a workbook whose stored
    /// `max_row`/`max_col` exceed its populated cells.
    pub fn expand_bounds(&mut self, row: u32, col: u32) {
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
    }

    /// Returns the cell at `(row, col)`, or a default empty cell if absent.
    pub fn get(&self, row: u32, col: u32) -> Cell {
        self.cells.get(&(row, col)).cloned().unwrap_or_default()
    }

    pub fn get_ref(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        self.cells.contains_key(&(row, col))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(u32, u32), &Cell)> {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Inserts or overwrites `raw` at `(row, col)`. An empty `text` deletes
    /// the cell, preserving the invariant that `raw == ""` iff absent.
    /// Resets the cached `value`/`error` to empty; the recalc engine fills
    /// them in on the next `recalculate()`.
    pub fn set_raw(&mut self, row: u32, col: u32, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            self.delete(row, col);
            return;
        }

        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);

        let format = self
            .cells
            .get(&(row, col))
            .map(|c| c.format.clone())
            .unwrap_or_default();
        let mut cell = Cell::new(text);
        cell.format = format;
        self.cells.insert((row, col), cell);
        self.notify_cell_changed(row, col);
    }

    /// Directly installs a fully-formed cell (used by the recalc engine to
    /// write back a computed value/error, and by undo to restore a prior
    /// snapshot verbatim).
    pub fn put(&mut self, row: u32, col: u32, cell: Cell) {
        if cell.raw.is_empty() {
            self.delete(row, col);
            return;
        }
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
        self.cells.insert((row, col), cell);
        self.notify_cell_changed(row, col);
    }

    /// `max_row`/`max_col` are monotonic and never shrink here, per the
    /// sheet's extent invariant — only `insert_row`/`insert_column` widen it.
    pub fn delete(&mut self, row: u32, col: u32) {
        if self.cells.remove(&(row, col)).is_some() {
            self.notify_cell_changed(row, col);
        }
    }

    /// Cells currently on row `r`, as `(col, Cell)` pairs — used by the
    /// undo log to capture a row's contents before a `delete_row`.
    pub fn row_cells(&self, r: u32) -> Vec<(u32, Cell)> {
        self.cells
            .iter()
            .filter(|(&(row, _), _)| row == r)
            .map(|(&(_, col), cell)| (col, cell.clone()))
            .collect()
    }

    /// Cells currently on column `c`, as `(row, Cell)` pairs.
    pub fn column_cells(&self, c: u32) -> Vec<(u32, Cell)> {
        self.cells
            .iter()
            .filter(|(&(_, col), _)| col == c)
            .map(|(&(row, _), cell)| (row, cell.clone()))
            .collect()
    }

    /// Shifts every cell at or beyond row `r` down by one and widens
    /// `max_row` by one. Fires `structure_changed`.
    pub fn insert_row(&mut self, r: u32) {
        self.cells = self
            .cells
            .drain()
            .map(|((row, col), cell)| {
                let row = if row >= r { row + 1 } else { row };
                ((row, col), cell)
            })
            .collect();
        self.max_row += 1;
        self.notify_structure_changed();
    }

    /// Removes every cell on row `r`, shifts cells beyond it up by one.
    /// `max_row` is not shrunk. Fires `structure_changed`.
    pub fn delete_row(&mut self, r: u32) {
        self.cells = self
            .cells
            .drain()
            .filter_map(|((row, col), cell)| {
                if row == r {
                    None
                } else if row > r {
                    Some(((row - 1, col), cell))
                } else {
                    Some(((row, col), cell))
                }
            })
            .collect();
        self.notify_structure_changed();
    }

    /// Shifts every cell at or beyond column `c` right by one and widens
    /// `max_col` by one. Fires `structure_changed`.
    pub fn insert_column(&mut self, c: u32) {
        self.cells = self
            .cells
            .drain()
            .map(|((row, col), cell)| {
                let col = if col >= c { col + 1 } else { col };
                ((row, col), cell)
            })
            .collect();
        self.max_col += 1;
        self.notify_structure_changed();
    }

    /// Removes every cell on column `c`, shifts cells beyond it left by
    /// one. `max_col` is not shrunk. Fires `structure_changed`.
    pub fn delete_column(&mut self, c: u32) {
        self.cells = self
            .cells
            .drain()
            .filter_map(|((row, col), cell)| {
                if col == c {
                    None
                } else if col > c {
                    Some(((row, col - 1), cell))
                } else {
                    Some(((row, col), cell))
                }
            })
            .collect();
        self.notify_structure_changed();
    }

    /// Predicate-based scan over populated cells, returned in row-major
    /// order. A read-only convenience over the same sparse map; introduces
    /// no new state.
    pub fn find_all(&self, query: &str, case_sensitive: bool, match_entire_cell: bool) -> Vec<(u32, u32)> {
        if query.is_empty() {
            return Vec::new();
        }
        let needle = if case_sensitive { query.to_string() } else { query.to_lowercase() };

        let mut matches: Vec<(u32, u32)> = self
            .cells
            .iter()
            .filter(|(_, cell)| Self::matches(cell, &needle, case_sensitive, match_entire_cell))
            .map(|(&pos, _)| pos)
            .collect();

        matches.sort_by_key(|&(row, col)| (row, col));
        matches
    }

    pub fn count_matches(&self, query: &str, case_sensitive: bool, match_entire_cell: bool) -> usize {
        self.find_all(query, case_sensitive, match_entire_cell).len()
    }

    fn matches(cell: &Cell, needle: &str, case_sensitive: bool, match_entire_cell: bool) -> bool {
        let display = if let CellValue::Empty = cell.value {
            cell.raw.clone()
        } else {
            cell.value.display()
        };
        let display = if case_sensitive { display } else { display.to_lowercase() };

        if match_entire_cell {
            display == needle
        } else {
            display.contains(needle)
        }
    }

    fn notify_cell_changed(&mut self, row: u32, col: u32) {
        if let Some(observer) = self.observer.as_mut() {
            observer.on_cell_changed(row, col);
        }
    }

    fn notify_structure_changed(&mut self) {
        if let Some(observer) = self.observer.as_mut() {
            observer.on_structure_changed();
        }
    }
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_raw_deletes_the_cell() {
        let mut sheet = Sheet::new();
        sheet.set_raw(0, 0, "hello");
        assert!(sheet.contains(0, 0));
        sheet.set_raw(0, 0, "");
        assert!(!sheet.contains(0, 0));
    }

    #[test]
    fn max_bounds_expand_on_insert_and_do_not_shrink_on_delete() {
        let mut sheet = Sheet::new();
        sheet.set_raw(5, 3, "x");
        assert_eq!(sheet.max_row(), 5);
        assert_eq!(sheet.max_col(), 3);
        sheet.delete(5, 3);
        assert_eq!(sheet.max_row(), 5);
        assert_eq!(sheet.max_col(), 3);
    }

    #[test]
    fn insert_row_shifts_cells_at_or_beyond_index() {
        let mut sheet = Sheet::new();
        sheet.set_raw(0, 0, "x");
        sheet.set_raw(1, 0, "y");
        sheet.insert_row(0);
        assert!(!sheet.contains(0, 0));
        assert_eq!(sheet.get(1, 0).raw, "x");
        assert_eq!(sheet.get(2, 0).raw, "y");
    }

    #[test]
    fn delete_row_removes_line_and_shifts_remainder_up() {
        let mut sheet = Sheet::new();
        sheet.set_raw(0, 0, "x");
        sheet.set_raw(1, 0, "y");
        sheet.set_raw(2, 0, "z");
        sheet.delete_row(1);
        assert_eq!(sheet.get(0, 0).raw, "x");
        assert_eq!(sheet.get(1, 0).raw, "z");
        assert!(!sheet.contains(2, 0));
    }

    #[test]
    fn find_all_is_row_major_and_case_insensitive() {
        let mut sheet = Sheet::new();
        sheet.set_raw(1, 0, "Hello");
        sheet.set_raw(0, 0, "hello world");
        let results = sheet.find_all("hello", false, false);
        assert_eq!(results, vec![(0, 0), (1, 0)]);
    }
}
