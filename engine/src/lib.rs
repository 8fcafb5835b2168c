//! FILENAME: engine/src/lib.rs
//! PURPOSE: Sparse cell store, dependency graph, evaluator, recalc
//! orchestration, and undo/redo log for the spreadsheet core.
//! CONTEXT: [`Engine`] is the facade a caller actually drives: it owns a [`Sheet`],
//! a [`DependencyGraph`], a [`Recalculator`], and an [`UndoStack`], and
//! wires every user-visible edit through all four so that dependency
//! tracking, recalculation, and undo stay in lockstep. Individual modules
//! stay public for callers (and tests) that want the pieces directly.

pub mod cell;
pub mod dependency_graph;
pub mod evaluator;
pub mod observer;
pub mod recalc;
pub mod sheet;
pub mod undo;

pub use cell::{Cell, CellError, CellFormat, CellValue};
pub use dependency_graph::{CycleError, DependencyGraph};
pub use evaluator::{evaluate, EvalResult};
pub use observer::SheetObserver;
pub use recalc::Recalculator;
pub use sheet::Sheet;
pub use undo::{Command, UndoStack};

use parser::Address;

/// Owns the whole recalculation pipeline: sheet storage, dependency graph,
/// dirty tracking, and the undo/redo log. Every mutating method returns
/// whatever the underlying [`UndoStack::execute`]/`undo`/`redo` call
/// returns, so a caller can surface a failed undo without inspecting
/// engine internals.
pub struct Engine {
    sheet: Sheet,
    graph: DependencyGraph,
    recalc: Recalculator,
    undo: UndoStack,
}

impl Engine {
    pub fn new() -> Self {
        Engine {
            sheet: Sheet::new(),
            graph: DependencyGraph::new(),
            recalc: Recalculator::new(),
            undo: UndoStack::new(),
        }
    }

    pub fn with_history_limit(max_size: usize) -> Self {
        Engine {
            sheet: Sheet::new(),
            graph: DependencyGraph::new(),
            recalc: Recalculator::new(),
            undo: UndoStack::with_max_size(max_size),
        }
    }

    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    pub fn set_observer(&mut self, observer: Box<dyn SheetObserver>) {
        self.sheet.set_observer(observer);
    }

    pub fn cell(&self, row: u32, col: u32) -> Cell {
        self.sheet.get(row, col)
    }

    /// The single entry point for a user edit: records an undoable
    /// [`Command::SetCell`], then re-runs dependency tracking and
    /// recalculation for the edited cell and everything downstream of it.
    /// Returns `false` only if `apply()` itself fails, which `SetCell`
    /// never does.
    pub fn set_cell(&mut self, row: u32, col: u32, raw: impl Into<String>) -> bool {
        let raw = raw.into();
        let command = Command::set_cell(&self.sheet, row, col, raw.clone());
        let applied = self.undo.execute(&mut self.sheet, command);
        if applied {
            self.recalc.set_cell_formula(&mut self.sheet, &mut self.graph, row, col, raw);
        }
        applied
    }

    pub fn insert_row(&mut self, row: u32) -> bool {
        self.undo.execute(&mut self.sheet, Command::InsertRow { row })
    }

    pub fn delete_row(&mut self, row: u32) -> bool {
        let command = Command::delete_row(&self.sheet, row);
        self.undo.execute(&mut self.sheet, command)
    }

    pub fn insert_column(&mut self, col: u32) -> bool {
        self.undo.execute(&mut self.sheet, Command::InsertColumn { col })
    }

    pub fn delete_column(&mut self, col: u32) -> bool {
        let command = Command::delete_column(&self.sheet, col);
        self.undo.execute(&mut self.sheet, command)
    }

    pub fn format_cell(&mut self, row: u32, col: u32, changes: CellFormat) -> bool {
        let command = Command::format_cell(&self.sheet, row, col, changes);
        self.undo.execute(&mut self.sheet, command)
    }

    /// Reverts the most recent command. Structural and format edits don't
    /// touch the dependency graph themselves, so a full reconstruction
    /// from the reverted sheet's formulas keeps `graph`/`recalc` correct
    /// without each `Command` variant needing its own graph-repair logic.
    pub fn undo(&mut self) -> bool {
        let ok = self.undo.undo(&mut self.sheet);
        if ok {
            self.resync_graph();
        }
        ok
    }

    pub fn redo(&mut self) -> bool {
        let ok = self.undo.redo(&mut self.sheet);
        if ok {
            self.resync_graph();
        }
        ok
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    pub fn begin_transaction(&mut self) {
        self.undo.begin_transaction();
    }

    pub fn commit_transaction(&mut self) {
        self.undo.commit_transaction();
    }

    pub fn cancel_transaction(&mut self) {
        self.undo.cancel_transaction();
    }

    pub fn find_all(&self, query: &str, case_sensitive: bool, match_entire_cell: bool) -> Vec<Address> {
        self.sheet.find_all(query, case_sensitive, match_entire_cell)
    }

    pub fn count_matches(&self, query: &str, case_sensitive: bool, match_entire_cell: bool) -> usize {
        self.sheet.count_matches(query, case_sensitive, match_entire_cell)
    }

    /// Rebuilds the dependency graph and dirty set from scratch against the
    /// sheet's current formulas, then runs one recalculation pass. Used
    /// after undo/redo, where the reverted sheet's formula text can differ
    /// arbitrarily from what the graph currently tracks.
    fn resync_graph(&mut self) {
        self.graph = DependencyGraph::new();
        self.recalc = Recalculator::new();
        let addresses: Vec<Address> = self
            .sheet
            .iter()
            .filter(|(_, cell)| cell.is_formula())
            .map(|(&addr, _)| addr)
            .collect();
        for (row, col) in &addresses {
            let raw = self.sheet.get(*row, *col).raw;
            self.recalc.set_cell_formula(&mut self.sheet, &mut self.graph, *row, *col, raw);
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
