//! FILENAME: engine/src/undo.rs
//! PURPOSE: Command-pattern undo/redo log for sheet edits.
//! CONTEXT: Commands are a sum type with a single `apply`/`revert` pair
//! per variant (not an object hierarchy), each capturing exactly the state
//! it needs to reverse itself. Two bounded stacks (undo, redo) plus
//! optional transaction batching for grouping several commands into one
//! undo step.

use crate::cell::{Cell, CellFormat};
use crate::sheet::Sheet;
use std::collections::VecDeque;

const DEFAULT_MAX_HISTORY: usize = 100;

/// A reversible operation against a [`Sheet`]. `apply`/`revert` each
/// return whether they succeeded; a command that fails to apply leaves
/// the sheet untouched, and a command that fails to revert is re-pushed
/// by [`UndoStack`] rather than dropped.
#[derive(Debug, Clone)]
pub enum Command {
    SetCell {
        row: u32,
        col: u32,
        before: Option<Cell>,
        raw: String,
    },
    InsertRow {
        row: u32,
    },
    DeleteRow {
        row: u32,
        removed: Vec<(u32, Cell)>,
    },
    InsertColumn {
        col: u32,
    },
    DeleteColumn {
        col: u32,
        removed: Vec<(u32, Cell)>,
    },
    FormatCell {
        row: u32,
        col: u32,
        before: CellFormat,
        changes: CellFormat,
    },
    /// An ordered list of commands executed atomically: if any child
    /// `apply` fails, already-applied children are reverted in reverse
    /// order and the macro reports failure.
    Macro(Vec<Command>),
}

impl Command {
    /// Captures the cell's current state before overwriting its raw text,
    /// so the command can be constructed *before* the caller mutates the
    /// sheet.
    pub fn set_cell(sheet: &Sheet, row: u32, col: u32, raw: impl Into<String>) -> Self {
        Command::SetCell {
            row,
            col,
            before: sheet.get_ref(row, col).cloned(),
            raw: raw.into(),
        }
    }

    pub fn delete_row(sheet: &Sheet, row: u32) -> Self {
        Command::DeleteRow {
            row,
            removed: sheet.row_cells(row),
        }
    }

    pub fn delete_column(sheet: &Sheet, col: u32) -> Self {
        Command::DeleteColumn {
            col,
            removed: sheet.column_cells(col),
        }
    }

    pub fn format_cell(sheet: &Sheet, row: u32, col: u32, changes: CellFormat) -> Self {
        Command::FormatCell {
            row,
            col,
            before: sheet.get(row, col).format,
            changes,
        }
    }

    pub fn apply(&mut self, sheet: &mut Sheet) -> bool {
        match self {
            Command::SetCell { row, col, raw, .. } => {
                sheet.set_raw(*row, *col, raw.clone());
                true
            }
            Command::InsertRow { row } => {
                sheet.insert_row(*row);
                true
            }
            Command::DeleteRow { row, .. } => {
                sheet.delete_row(*row);
                true
            }
            Command::InsertColumn { col } => {
                sheet.insert_column(*col);
                true
            }
            Command::DeleteColumn { col, .. } => {
                sheet.delete_column(*col);
                true
            }
            Command::FormatCell { row, col, changes, .. } => {
                if let Some(p) = changes.precision {
                    if p > 6 {
                        return false;
                    }
                }
                if !sheet.contains(*row, *col) {
                    return false;
                }
                let mut cell = sheet.get(*row, *col);
                if let Some(bold) = changes.bold {
                    cell.format.bold = Some(bold);
                }
                if let Some(precision) = changes.precision {
                    cell.format.precision = Some(precision);
                }
                for (k, v) in &changes.extra {
                    cell.format.extra.insert(k.clone(), v.clone());
                }
                sheet.put(*row, *col, cell);
                true
            }
            Command::Macro(children) => {
                let mut applied = 0;
                let mut failed = false;
                for i in 0..children.len() {
                    if children[i].apply(sheet) {
                        applied = i + 1;
                    } else {
                        failed = true;
                        break;
                    }
                }
                if failed {
                    for child in children[..applied].iter_mut().rev() {
                        child.revert(sheet);
                    }
                    false
                } else {
                    true
                }
            }
        }
    }

    pub fn revert(&mut self, sheet: &mut Sheet) -> bool {
        match self {
            Command::SetCell { row, col, before, .. } => {
                match before {
                    Some(cell) => sheet.put(*row, *col, cell.clone()),
                    None => sheet.delete(*row, *col),
                }
                true
            }
            Command::InsertRow { row } => {
                sheet.delete_row(*row);
                true
            }
            Command::DeleteRow { row, removed } => {
                sheet.insert_row(*row);
                for (col, cell) in removed.iter() {
                    sheet.put(*row, *col, cell.clone());
                }
                true
            }
            Command::InsertColumn { col } => {
                sheet.delete_column(*col);
                true
            }
            Command::DeleteColumn { col, removed } => {
                sheet.insert_column(*col);
                for (row, cell) in removed.iter() {
                    sheet.put(*row, *col, cell.clone());
                }
                true
            }
            Command::FormatCell { row, col, before, .. } => {
                if !sheet.contains(*row, *col) {
                    return false;
                }
                let mut cell = sheet.get(*row, *col);
                cell.format = before.clone();
                sheet.put(*row, *col, cell);
                true
            }
            Command::Macro(children) => {
                let mut ok = true;
                for child in children.iter_mut().rev() {
                    if !child.revert(sheet) {
                        ok = false;
                        break;
                    }
                }
                ok
            }
        }
    }

    /// Collects every address this command directly writes to into `out`.
    /// Row/column insert and delete shift addresses wholesale rather than
    /// touching a fixed cell, so they contribute nothing here — resyncing
    /// the dependency graph around a structural edit is out of scope (see
    /// the design notes on formula rewriting across a shift).
    pub fn touched_addresses(&self, out: &mut Vec<parser::Address>) {
        match self {
            Command::SetCell { row, col, .. } | Command::FormatCell { row, col, .. } => {
                out.push((*row, *col));
            }
            Command::InsertRow { .. }
            | Command::DeleteRow { .. }
            | Command::InsertColumn { .. }
            | Command::DeleteColumn { .. } => {}
            Command::Macro(children) => {
                for child in children {
                    child.touched_addresses(out);
                }
            }
        }
    }
}

pub struct UndoStack {
    undo_stack: VecDeque<Command>,
    redo_stack: VecDeque<Command>,
    current_transaction: Option<Vec<Command>>,
    max_size: usize,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_HISTORY)
    }

    pub fn with_max_size(max_size: usize) -> Self {
        UndoStack {
            undo_stack: VecDeque::with_capacity(max_size),
            redo_stack: VecDeque::with_capacity(max_size),
            current_transaction: None,
            max_size,
        }
    }

    /// Begins batching subsequent [`UndoStack::execute`] calls into one
    /// undo step. A nested call while a transaction is already open is a
    /// no-op.
    pub fn begin_transaction(&mut self) {
        if self.current_transaction.is_none() {
            self.current_transaction = Some(Vec::new());
        }
    }

    /// Wraps the open transaction's commands into a single [`Command::Macro`]
    /// and pushes it as one undo step. A no-op if the transaction is empty.
    pub fn commit_transaction(&mut self) {
        if let Some(commands) = self.current_transaction.take() {
            if !commands.is_empty() {
                self.push_undo(Command::Macro(commands));
            }
        }
    }

    /// Discards the open transaction without undoing the commands already
    /// applied through it — callers that need rollback should use
    /// `Command::Macro`'s own atomic-apply behavior instead.
    pub fn cancel_transaction(&mut self) {
        self.current_transaction = None;
    }

    /// Executes `command` against `sheet`. On success, records it (batched
    /// into the open transaction if any, otherwise as its own undo step)
    /// and clears redo.
    pub fn execute(&mut self, sheet: &mut Sheet, mut command: Command) -> bool {
        if !command.apply(sheet) {
            return false;
        }
        if let Some(transaction) = self.current_transaction.as_mut() {
            transaction.push(command);
        } else {
            self.push_undo(command);
        }
        true
    }

    fn push_undo(&mut self, command: Command) {
        self.redo_stack.clear();
        while self.undo_stack.len() >= self.max_size {
            self.undo_stack.pop_front();
        }
        self.undo_stack.push_back(command);
    }

    /// The command `undo()` would revert next, without popping it — lets a
    /// caller resync state (e.g. the dependency graph) that the command
    /// itself doesn't know about before committing to the revert.
    pub fn peek_undo(&self) -> Option<&Command> {
        self.undo_stack.back()
    }

    pub fn peek_redo(&self) -> Option<&Command> {
        self.redo_stack.back()
    }

    /// Pops the most recent command, reverts it, and moves it to redo. A
    /// failing revert is re-pushed onto the undo stack so the log stays
    /// consistent.
    pub fn undo(&mut self, sheet: &mut Sheet) -> bool {
        let Some(mut command) = self.undo_stack.pop_back() else {
            return false;
        };
        if command.revert(sheet) {
            while self.redo_stack.len() >= self.max_size {
                self.redo_stack.pop_front();
            }
            self.redo_stack.push_back(command);
            true
        } else {
            self.undo_stack.push_back(command);
            false
        }
    }

    /// Pops the most recent undone command, re-applies it, and moves it
    /// back to undo. A failing apply is re-pushed onto the redo stack.
    pub fn redo(&mut self, sheet: &mut Sheet) -> bool {
        let Some(mut command) = self.redo_stack.pop_back() else {
            return false;
        };
        if command.apply(sheet) {
            while self.undo_stack.len() >= self.max_size {
                self.undo_stack.pop_front();
            }
            self.undo_stack.push_back(command);
            true
        } else {
            self.redo_stack.push_back(command);
            false
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_transaction = None;
    }

    pub fn stack_sizes(&self) -> (usize, usize) {
        (self.undo_stack.len(), self.redo_stack.len())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_cell_undo_redo_round_trips() {
        let mut sheet = Sheet::new();
        let mut stack = UndoStack::new();

        let cmd = Command::set_cell(&sheet, 0, 0, "10");
        assert!(stack.execute(&mut sheet, cmd));
        assert_eq!(sheet.get(0, 0).raw, "10");

        assert!(stack.undo(&mut sheet));
        assert!(!sheet.contains(0, 0));

        assert!(stack.redo(&mut sheet));
        assert_eq!(sheet.get(0, 0).raw, "10");
    }

    #[test]
    fn max_size_evicts_oldest_undo_entry() {
        let mut sheet = Sheet::new();
        let mut stack = UndoStack::with_max_size(2);
        for i in 0..3 {
            let cmd = Command::set_cell(&sheet, i, 0, "x");
            stack.execute(&mut sheet, cmd);
        }
        assert_eq!(stack.stack_sizes().0, 2);
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut sheet = Sheet::new();
        let mut stack = UndoStack::new();
        stack.execute(&mut sheet, Command::set_cell(&sheet, 0, 0, "1"));
        stack.undo(&mut sheet);
        assert!(stack.can_redo());
        stack.execute(&mut sheet, Command::set_cell(&sheet, 1, 0, "2"));
        assert!(!stack.can_redo());
    }

    #[test]
    fn delete_row_undo_restores_cells_verbatim() {
        let mut sheet = Sheet::new();
        let mut stack = UndoStack::new();
        stack.execute(&mut sheet, Command::set_cell(&sheet, 1, 0, "x"));
        stack.execute(&mut sheet, Command::set_cell(&sheet, 1, 1, "y"));

        let delete_cmd = Command::delete_row(&sheet, 1);
        stack.execute(&mut sheet, delete_cmd);
        assert!(!sheet.contains(1, 0));

        assert!(stack.undo(&mut sheet));
        assert_eq!(sheet.get(1, 0).raw, "x");
        assert_eq!(sheet.get(1, 1).raw, "y");
    }

    #[test]
    fn transaction_batches_into_one_undo_step() {
        let mut sheet = Sheet::new();
        let mut stack = UndoStack::new();

        stack.begin_transaction();
        stack.execute(&mut sheet, Command::set_cell(&sheet, 0, 0, "a"));
        stack.execute(&mut sheet, Command::set_cell(&sheet, 0, 1, "b"));
        stack.commit_transaction();

        assert_eq!(stack.stack_sizes().0, 1);
        stack.undo(&mut sheet);
        assert!(!sheet.contains(0, 0));
        assert!(!sheet.contains(0, 1));
    }

    #[test]
    fn macro_rolls_back_already_applied_children_on_failure() {
        let mut sheet = Sheet::new();
        sheet.set_raw(0, 0, "x");

        let mut bad_format = CellFormat::default();
        bad_format.precision = Some(9); // invalid: apply() should fail

        let macro_cmd = Command::Macro(vec![
            Command::set_cell(&sheet, 1, 0, "y"),
            Command::format_cell(&sheet, 0, 0, bad_format),
        ]);

        let mut stack = UndoStack::new();
        assert!(!stack.execute(&mut sheet, macro_cmd));
        assert!(!sheet.contains(1, 0));
    }
}
