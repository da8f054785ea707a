//! Circular dependency detection for formula cells.
//!
//! When a formula is entered we check whether its static references close a
//! loop (A1 reads B1, B1 reads C1, C1 reads A1). Evaluation has its own
//! runtime guard; this depth-first search is used to report the loop early.

use std::collections::HashSet;

use super::cell_ref::CellRef;

/// Detect circular dependencies starting from a cell.
///
/// `deps` yields the dependencies of a cell, or `None` for an empty cell.
/// Returns the path ending in the repeated cell if a cycle is found.
pub fn detect_cycle<F>(start: &CellRef, deps: F) -> Option<Vec<CellRef>>
where
    F: Fn(&CellRef) -> Option<Vec<CellRef>>,
{
    let mut visiting = HashSet::new();
    let mut done = HashSet::new();
    let mut path = vec![start.clone()];
    // Unvisited dependencies of each cell on `path`, last first.
    let mut pending = vec![reversed(deps(start)?)];
    visiting.insert(start.clone());

    while let Some(next) = pending.last_mut() {
        let Some(dep) = next.pop() else {
            pending.pop();
            if let Some(finished) = path.pop() {
                visiting.remove(&finished);
                done.insert(finished);
            }
            continue;
        };
        if visiting.contains(&dep) {
            path.push(dep);
            return Some(path);
        }
        if done.contains(&dep) {
            continue;
        }
        match deps(&dep) {
            Some(more) => {
                visiting.insert(dep.clone());
                path.push(dep);
                pending.push(reversed(more));
            }
            None => {
                done.insert(dep);
            }
        }
    }
    None
}

fn reversed(mut cells: Vec<CellRef>) -> Vec<CellRef> {
    cells.reverse();
    cells
}
