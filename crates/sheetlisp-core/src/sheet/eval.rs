use super::Sheet;
use super::ops::{dispose, parse_key};
use super::state::lock;
use crate::error::Result;
use sheetlisp_engine::engine::{
    CellResolver, CellRef, EvalError, EvalResult, Value, format_result,
};
use std::collections::HashSet;
use tracing::debug;

/// Deepest chain of cell evaluations waiting on one another. Inputs are
/// normally settled before a cell is evaluated, so this is only reached by
/// long reference loops or chains only visible at run time.
pub const MAX_NESTED_CELLS: usize = 128;

impl Sheet {
    /// Current value of a cell, evaluating it if it is dirty.
    ///
    /// Undefined cells read as [`Value::Undefined`]. A failed evaluation is
    /// memoized like any other value.
    pub fn get_cell(&self, cell: &CellRef) -> EvalResult<Value> {
        if let Some(result) = self.fresh(cell) {
            return result;
        }
        self.settle_inputs(cell);

        let parsed = {
            let Some(entry) = self.grid.get(cell) else {
                return Ok(Value::Undefined);
            };
            if !entry.dirty
                && let Some(cached) = &entry.cached
            {
                return cached.clone();
            }
            entry.parsed.clone()
        };

        let atom = match parsed {
            Ok(atom) => atom,
            Err(e) => {
                let result = Err(EvalError::Parse(e));
                self.store(cell, result.clone(), HashSet::new());
                return result;
            }
        };

        {
            let mut evaluating = lock(&self.evaluating);
            if let Some(pos) = evaluating.iter().position(|c| c == cell) {
                let mut path = evaluating[pos..].to_vec();
                path.push(cell.clone());
                return Err(EvalError::Cycle(path));
            }
            if evaluating.len() >= MAX_NESTED_CELLS {
                return Err(EvalError::Validation(format!(
                    "cell references nested deeper than {MAX_NESTED_CELLS} at {cell}"
                )));
            }
            evaluating.push(cell.clone());
        }
        lock(&self.reads).push(HashSet::new());

        debug!(cell = %cell, "evaluating");
        let result = self.engine.eval_atom(&atom, Some(self));

        let reads = lock(&self.reads).pop().unwrap_or_default();
        lock(&self.evaluating).pop();

        if let Err(e) = &result {
            debug!(cell = %cell, error = %e, "evaluation failed");
        }
        self.store(cell, result.clone(), reads);
        result
    }

    /// The memoized result, or `None` if the cell has to be evaluated.
    fn fresh(&self, cell: &CellRef) -> Option<EvalResult<Value>> {
        let Some(entry) = self.grid.get(cell) else {
            return Some(Ok(Value::Undefined));
        };
        if entry.dirty {
            return None;
        }
        entry.cached.clone()
    }

    /// Evaluate the dirty cells `cell` depends on, deepest first, so that the
    /// reads made while evaluating `cell` itself find them memoized.
    fn settle_inputs(&self, cell: &CellRef) {
        if !lock(&self.settling).insert(cell.clone()) {
            return;
        }
        for input in self.dirty_inputs(cell) {
            // Failures are memoized on the input and seen again when read.
            let _ = self.get_cell(&input);
        }
        lock(&self.settling).remove(cell);
    }

    /// Dirty cells reachable from `cell` through recorded dependencies, in
    /// post-order. Cells already being evaluated or settled are skipped.
    fn dirty_inputs(&self, cell: &CellRef) -> Vec<CellRef> {
        let mut skip: HashSet<CellRef> = lock(&self.evaluating).iter().cloned().collect();
        skip.extend(lock(&self.settling).iter().cloned());

        let mut order = Vec::new();
        let Some(first) = self.dirty_dependencies(cell) else {
            return order;
        };
        skip.insert(cell.clone());
        let mut stack = vec![(cell.clone(), first)];
        while let Some((_, pending)) = stack.last_mut() {
            match pending.pop() {
                Some(dep) => {
                    if !skip.insert(dep.clone()) {
                        continue;
                    }
                    if let Some(deps) = self.dirty_dependencies(&dep) {
                        stack.push((dep, deps));
                    }
                }
                None => {
                    if let Some((done, _)) = stack.pop()
                        && done != *cell
                    {
                        order.push(done);
                    }
                }
            }
        }
        order
    }

    /// Dependencies of a dirty cell, last first; `None` for clean or
    /// undefined cells.
    fn dirty_dependencies(&self, cell: &CellRef) -> Option<Vec<CellRef>> {
        self.grid
            .get(cell)
            .filter(|entry| entry.dirty)
            .map(|entry| entry.depends_on.iter().rev().cloned().collect())
    }

    /// Value of a cell by key ("B3").
    pub fn get(&self, key: &str) -> Result<Value> {
        let cell = parse_key(key)?;
        Ok(self.get_cell(&cell)?)
    }

    /// Display form of a cell: its formatted value, or `#ERR: ...`.
    pub fn display(&self, cell: &CellRef) -> String {
        format_result(&self.get_cell(cell))
    }

    /// Evaluate an expression that is not stored in any cell. It may read
    /// cells but nothing depends on it.
    pub fn evaluate(&self, source: &str) -> EvalResult<Value> {
        self.engine.eval_with_cells(source, Some(self))
    }

    /// Memoize a result and refresh the cell's dependency edges.
    fn store(&self, cell: &CellRef, result: EvalResult<Value>, reads: HashSet<CellRef>) {
        let (old_deps, new_deps, old_value) = {
            // Cleared while evaluating: nothing to store.
            let Some(mut entry) = self.grid.get_mut(cell) else {
                return;
            };
            let mut all: HashSet<CellRef> = reads;
            all.extend(entry.static_deps.iter().cloned());
            let mut deps: Vec<CellRef> = all.into_iter().collect();
            deps.sort();
            let old_deps = std::mem::replace(&mut entry.depends_on, deps.clone());
            let old_value = entry.cached.replace(result);
            entry.dirty = false;
            (old_deps, deps, old_value)
        };

        if old_deps != new_deps {
            self.unlink(cell, &old_deps);
            self.link(cell, &new_deps);
        }
        dispose(old_value);
    }

    fn record_read(&self, cell: &CellRef) {
        if let Some(frame) = lock(&self.reads).last_mut() {
            frame.insert(cell.clone());
        }
    }
}

/// Formulas read other cells through the sheet. Errors are poison: reading
/// a failed cell fails the reader, naming the cell.
impl CellResolver for Sheet {
    fn cell_value(&self, cell: &CellRef) -> EvalResult<Value> {
        self.record_read(cell);
        match self.get_cell(cell) {
            Err(e @ EvalError::Cycle(_)) => Err(e),
            Err(e) => Err(EvalError::Cell {
                cell: cell.clone(),
                message: e.to_string(),
            }),
            ok => ok,
        }
    }
}
