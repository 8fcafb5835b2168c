//! FILENAME: engine/src/recalc.rs
//! PURPOSE: Wires a formula edit into the dependency graph and drives
//! recalculation of everything it touches.
//! CONTEXT: `set_cell_formula` is the single entry point for any cell edit:
//! 1. Drop the cell's old outgoing dependency edges and cached AST.
//! 2. A non-formula edit stores the coerced literal directly and stops
//!    there, after queuing dependents dirty.
//! 3. A formula is parsed, its referenced addresses registered as new
//!    edges, and its AST cached. A parse failure sets `#ERROR!` on the
//!    cell alone and returns immediately, without touching dependents.
//! 4. If the new edge set closes a cycle, every cell on the cycle gets
//!    `#CYCLE!` and nothing is queued beyond that.
//! 5. Otherwise the cell and its transitive dependents are queued dirty.
//! 6. `recalculate()` runs: topologically order the dirty set and
//!    evaluate each cell in turn, writing back value or error.

use crate::cell::{CellError, CellValue};
use crate::dependency_graph::DependencyGraph;
use crate::evaluator::{self, EvalResult};
use crate::sheet::Sheet;
use parser::Address;
use std::collections::HashSet;

fn parse_literal(raw: &str) -> CellValue {
    if evaluator::is_numeric_string(raw) {
        raw.parse::<f64>().map(CellValue::Number).unwrap_or(CellValue::Text(raw.to_string()))
    } else {
        CellValue::Text(raw.to_string())
    }
}

/// Tracks which cells need recalculation and guards against re-entrant
/// recalculation triggered from inside an observer callback.
#[derive(Debug, Default)]
pub struct Recalculator {
    dirty: HashSet<Address>,
    calculating: bool,
}

impl Recalculator {
    pub fn new() -> Self {
        Self::default()
    }

    fn mark_dirty(&mut self, addr: Address) {
        self.dirty.insert(addr);
    }

    fn mark_dirty_many(&mut self, addrs: impl IntoIterator<Item = Address>) {
        self.dirty.extend(addrs);
    }

    /// Applies a raw edit at `(row, col)` and recalculates everything it
    /// affects. `raw` starting with `=` is parsed as a formula; anything
    /// else (including the empty string, which deletes the cell) is a
    /// literal.
    pub fn set_cell_formula(
        &mut self,
        sheet: &mut Sheet,
        graph: &mut DependencyGraph,
        row: u32,
        col: u32,
        raw: impl Into<String>,
    ) {
        let raw = raw.into();
        let addr = (row, col);
        // `addr`'s dependents (who reads it) are unaffected by clearing its
        // own outgoing edges below, so it's safe to read them either side.
        graph.clear(addr);

        if !raw.starts_with('=') {
            sheet.set_raw(row, col, raw.clone());
            if !raw.is_empty() {
                let mut cell = sheet.get(row, col);
                cell.set_value(parse_literal(&raw));
                sheet.put(row, col, cell);
            }
            self.mark_dirty(addr);
            self.mark_dirty_many(graph.all_dependents(addr));
            self.recalculate(sheet, graph);
            return;
        }

        sheet.set_raw(row, col, raw.clone());
        match parser::parse(&raw[1..]) {
            Ok(expr) => {
                for dep in DependencyGraph::extract(&expr) {
                    graph.add(addr, dep);
                }
                graph.cache_ast(addr, expr);

                if let Some(cycle) = graph.find_cycle_from(addr) {
                    log::warn!(
                        "circular reference detected starting at ({}, {}): {} cell(s) on the cycle",
                        row,
                        col,
                        cycle.len()
                    );
                    let cycle_set: HashSet<Address> = cycle.iter().copied().collect();
                    for member in &cycle {
                        let mut cell = sheet.get(member.0, member.1);
                        cell.set_error(CellError::Cycle);
                        sheet.put(member.0, member.1, cell);
                    }
                    // Cells downstream of the cycle (but not on it) still
                    // need to see the propagated error.
                    let affected = graph.all_dependents(addr).into_iter().filter(|a| !cycle_set.contains(a));
                    self.mark_dirty_many(affected);
                } else {
                    self.mark_dirty(addr);
                    self.mark_dirty_many(graph.all_dependents(addr));
                }
            }
            Err(err) => {
                log::warn!("formula parse error at ({}, {}): {}", row, col, err);
                let mut cell = sheet.get(row, col);
                cell.set_error(CellError::Error);
                sheet.put(row, col, cell);
                // Dependents are left untouched — the cell's previous
                // dependents still point at it and keep their own values.
                return;
            }
        }

        self.recalculate(sheet, graph);
    }

    /// Evaluates every dirty cell in dependency order. A no-op if already
    /// running (guards against an observer callback re-entering) or if
    /// nothing is dirty. `calculating` is always reset before returning,
    /// even if evaluation is abandoned partway — there is no way to leave
    /// this guard stuck set.
    pub fn recalculate(&mut self, sheet: &mut Sheet, graph: &DependencyGraph) {
        if self.calculating || self.dirty.is_empty() {
            return;
        }
        self.calculating = true;

        let dirty = std::mem::take(&mut self.dirty);
        let order = graph.topo_sort(&dirty);
        log::debug!("recalculating {} of {} dirty cell(s)", order.len(), dirty.len());

        for addr in order {
            let Some(expr) = graph.ast(addr) else { continue };
            let result = evaluator::evaluate(expr, sheet);
            log::debug!("({}, {}) -> {:?}", addr.0, addr.1, result);

            let mut cell = sheet.get(addr.0, addr.1);
            match result {
                EvalResult::Error(e) => cell.set_error(e),
                other => cell.set_value(other.to_cell_value()),
            }
            sheet.put(addr.0, addr.1, cell);
        }

        self.calculating = false;
    }

    pub fn is_dirty(&self, addr: Address) -> bool {
        self.dirty.contains(&addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_chain_recalculates_dependents_in_order() {
        let mut sheet = Sheet::new();
        let mut graph = DependencyGraph::new();
        let mut recalc = Recalculator::new();

        recalc.set_cell_formula(&mut sheet, &mut graph, 0, 0, "10");
        recalc.set_cell_formula(&mut sheet, &mut graph, 1, 0, "=A1*2");
        recalc.set_cell_formula(&mut sheet, &mut graph, 2, 0, "=B1+5");

        assert_eq!(sheet.get(1, 0).value, CellValue::Number(20.0));
        assert_eq!(sheet.get(2, 0).value, CellValue::Number(25.0));

        recalc.set_cell_formula(&mut sheet, &mut graph, 0, 0, "5");
        assert_eq!(sheet.get(1, 0).value, CellValue::Number(10.0));
        assert_eq!(sheet.get(2, 0).value, CellValue::Number(15.0));
    }

    #[test]
    fn self_cycle_sets_cycle_error_and_stops() {
        let mut sheet = Sheet::new();
        let mut graph = DependencyGraph::new();
        let mut recalc = Recalculator::new();

        recalc.set_cell_formula(&mut sheet, &mut graph, 0, 0, "=A1+1");
        assert_eq!(sheet.get(0, 0).error, Some(CellError::Cycle));
    }

    #[test]
    fn three_cell_cycle_marks_every_member() {
        // A1 = B1, B1 = C1, C1 = A1 — all three cells live in row 0
        // (A1=(0,0), B1=(0,1), C1=(0,2)) so the formula text and the
        // addresses they're written to actually line up.
        let mut sheet = Sheet::new();
        let mut graph = DependencyGraph::new();
        let mut recalc = Recalculator::new();

        recalc.set_cell_formula(&mut sheet, &mut graph, 0, 0, "=B1");
        recalc.set_cell_formula(&mut sheet, &mut graph, 0, 1, "=C1");
        recalc.set_cell_formula(&mut sheet, &mut graph, 0, 2, "=A1");

        assert_eq!(sheet.get(0, 0).error, Some(CellError::Cycle));
        assert_eq!(sheet.get(0, 1).error, Some(CellError::Cycle));
        assert_eq!(sheet.get(0, 2).error, Some(CellError::Cycle));
    }

    #[test]
    fn breaking_a_cycle_lets_remaining_cells_recompute() {
        let mut sheet = Sheet::new();
        let mut graph = DependencyGraph::new();
        let mut recalc = Recalculator::new();

        recalc.set_cell_formula(&mut sheet, &mut graph, 0, 0, "=B1");
        recalc.set_cell_formula(&mut sheet, &mut graph, 0, 1, "=C1");
        recalc.set_cell_formula(&mut sheet, &mut graph, 0, 2, "=A1");
        assert_eq!(sheet.get(0, 1).error, Some(CellError::Cycle));

        recalc.set_cell_formula(&mut sheet, &mut graph, 0, 1, "7");
        assert_eq!(sheet.get(0, 1).value, CellValue::Number(7.0));
        assert_eq!(sheet.get(0, 0).value, CellValue::Number(7.0));
        assert_eq!(sheet.get(0, 2).value, CellValue::Number(7.0));
    }

    #[test]
    fn division_by_zero_propagates_to_dependents() {
        let mut sheet = Sheet::new();
        let mut graph = DependencyGraph::new();
        let mut recalc = Recalculator::new();

        recalc.set_cell_formula(&mut sheet, &mut graph, 0, 0, "=1/0");
        recalc.set_cell_formula(&mut sheet, &mut graph, 1, 0, "=A1+1");

        assert_eq!(sheet.get(0, 0).error, Some(CellError::Div0));
        assert_eq!(sheet.get(1, 0).error, Some(CellError::Div0));
    }

    #[test]
    fn sum_over_range_updates_when_a_member_cell_is_deleted() {
        let mut sheet = Sheet::new();
        let mut graph = DependencyGraph::new();
        let mut recalc = Recalculator::new();

        recalc.set_cell_formula(&mut sheet, &mut graph, 0, 0, "1");
        recalc.set_cell_formula(&mut sheet, &mut graph, 1, 0, "2");
        recalc.set_cell_formula(&mut sheet, &mut graph, 2, 0, "3");
        recalc.set_cell_formula(&mut sheet, &mut graph, 3, 0, "=SUM(A1:A3)");
        assert_eq!(sheet.get(3, 0).value, CellValue::Number(6.0));

        recalc.set_cell_formula(&mut sheet, &mut graph, 1, 0, "");
        assert_eq!(sheet.get(3, 0).value, CellValue::Number(4.0));
    }
}
