//! FILENAME: engine/src/dependency_graph.rs
//! PURPOSE: Tracks which cells reference which, for cycle detection and
//! recalculation ordering.
//! CONTEXT: Maintains forward (`deps`) and reverse (`dependents`) edges
//! between cells, and caches each formula cell's parsed AST so
//! recalculation never re-parses.
//!
//! TERMINOLOGY: if `x`'s formula reads `y`, then `y` is a dependency of `x`
//! (`deps[x]` contains `y`) and `x` is a dependent of `y` (`dependents[y]`
//! contains `x`).

use parser::{Address, Expr};
use std::collections::{HashMap, HashSet, VecDeque};

/// The cells involved in a detected cycle, in path order.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleError {
    pub cycle_path: Vec<Address>,
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "circular reference: ")?;
        for (i, addr) in self.cycle_path.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "({}, {})", addr.0, addr.1)?;
        }
        Ok(())
    }
}

impl std::error::Error for CycleError {}

#[derive(Debug, Default)]
pub struct DependencyGraph {
    deps: HashMap<Address, HashSet<Address>>,
    dependents: HashMap<Address, HashSet<Address>>,
    ast: HashMap<Address, Expr>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        DependencyGraph::default()
    }

    /// Caches `c`'s parsed AST; does not touch dependency edges (call
    /// [`DependencyGraph::add`] separately for each extracted address).
    pub fn cache_ast(&mut self, c: Address, expr: Expr) {
        self.ast.insert(c, expr);
    }

    pub fn ast(&self, c: Address) -> Option<&Expr> {
        self.ast.get(&c)
    }

    /// Registers `c` as depending on `d`: `deps[c] += d`, `dependents[d] += c`.
    pub fn add(&mut self, c: Address, d: Address) {
        self.deps.entry(c).or_default().insert(d);
        self.dependents.entry(d).or_default().insert(c);
    }

    /// Removes every edge `c` has as a dependency source and drops its
    /// cached AST. Leaves edges where `c` is itself a dependency of others
    /// untouched (those belong to the *other* cell's `deps` entry).
    pub fn clear(&mut self, c: Address) {
        if let Some(old_deps) = self.deps.remove(&c) {
            for d in old_deps {
                if let Some(set) = self.dependents.get_mut(&d) {
                    set.remove(&c);
                    if set.is_empty() {
                        self.dependents.remove(&d);
                    }
                }
            }
        }
        self.ast.remove(&c);
    }

    pub fn get_deps(&self, c: Address) -> Option<&HashSet<Address>> {
        self.deps.get(&c)
    }

    pub fn get_dependents(&self, c: Address) -> Option<&HashSet<Address>> {
        self.dependents.get(&c)
    }

    /// Walks an AST, collecting every referenced address: each `CellRef`
    /// directly, and every cell enumerated by a `Range`.
    pub fn extract(expr: &Expr) -> HashSet<Address> {
        let mut out = HashSet::new();
        Self::extract_into(expr, &mut out);
        out
    }

    fn extract_into(expr: &Expr, out: &mut HashSet<Address>) {
        match expr {
            Expr::Number(_) | Expr::String(_) => {}
            Expr::CellRef(addr) => {
                out.insert(*addr);
            }
            Expr::Range(addrs) => {
                out.extend(addrs.iter().copied());
            }
            Expr::Unary(_, inner) => Self::extract_into(inner, out),
            Expr::Binary(_, left, right) => {
                Self::extract_into(left, out);
                Self::extract_into(right, out);
            }
            Expr::Function(_, args) => {
                for arg in args {
                    Self::extract_into(arg, out);
                }
            }
        }
    }

    /// Transitive closure of `dependents`, starting at (but not including)
    /// `start`. Used to build the dirty set after an edit.
    pub fn all_dependents(&self, start: Address) -> HashSet<Address> {
        let mut result = HashSet::new();
        let mut queue: VecDeque<Address> = VecDeque::new();
        if let Some(direct) = self.dependents.get(&start) {
            queue.extend(direct.iter().copied());
        }
        while let Some(current) = queue.pop_front() {
            if !result.insert(current) {
                continue;
            }
            if let Some(direct) = self.dependents.get(&current) {
                for &d in direct {
                    if !result.contains(&d) {
                        queue.push_back(d);
                    }
                }
            }
        }
        result
    }

    /// DFS over the **dependent** direction starting at `start`. On
    /// re-encountering an in-stack node, returns the slice of the current
    /// path from that node onward — the cycle itself, not the whole walk.
    /// A cell that references itself directly is a cycle of length one.
    pub fn find_cycle_from(&self, start: Address) -> Option<Vec<Address>> {
        let mut path: Vec<Address> = Vec::new();
        let mut on_path: HashSet<Address> = HashSet::new();
        self.dfs_find_cycle(start, &mut path, &mut on_path)
    }

    fn dfs_find_cycle(
        &self,
        node: Address,
        path: &mut Vec<Address>,
        on_path: &mut HashSet<Address>,
    ) -> Option<Vec<Address>> {
        if on_path.contains(&node) {
            let start_idx = path.iter().position(|&a| a == node).unwrap();
            return Some(path[start_idx..].to_vec());
        }

        path.push(node);
        on_path.insert(node);

        if let Some(dependents) = self.dependents.get(&node) {
            let mut sorted: Vec<Address> = dependents.iter().copied().collect();
            sorted.sort();
            for next in sorted {
                if let Some(cycle) = self.dfs_find_cycle(next, path, on_path) {
                    return Some(cycle);
                }
            }
        }

        path.pop();
        on_path.remove(&node);
        None
    }

    /// Kahn's algorithm restricted to `dirty`: only edges whose both
    /// endpoints lie in `dirty` count toward in-degree. Cells left over
    /// with nonzero in-degree sit on a cycle and are omitted from the
    /// result (the caller leaves their existing `#CYCLE!` error in place).
    /// The zero-in-degree frontier is processed in row-major order so the
    /// result is deterministic.
    pub fn topo_sort(&self, dirty: &HashSet<Address>) -> Vec<Address> {
        let mut in_degree: HashMap<Address, usize> = dirty.iter().map(|&c| (c, 0)).collect();

        for &cell in dirty {
            if let Some(deps) = self.deps.get(&cell) {
                for d in deps {
                    if dirty.contains(d) {
                        *in_degree.get_mut(&cell).unwrap() += 1;
                    }
                }
            }
        }

        let mut frontier: Vec<Address> = in_degree
            .iter()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(&c, _)| c)
            .collect();
        frontier.sort();
        let mut queue: VecDeque<Address> = frontier.into();

        let mut result = Vec::with_capacity(dirty.len());
        while let Some(cell) = queue.pop_front() {
            result.push(cell);

            if let Some(deps_of) = self.dependents.get(&cell) {
                let mut ready: Vec<Address> = Vec::new();
                for &dep in deps_of {
                    if let Some(deg) = in_degree.get_mut(&dep) {
                        *deg -= 1;
                        if *deg == 0 {
                            ready.push(dep);
                        }
                    }
                }
                ready.sort();
                for r in ready {
                    queue.push_back(r);
                }
            }
        }

        result
    }
}
