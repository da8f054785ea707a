use super::Sheet;
use super::state::Cell;
use crate::error::{Result, SheetError};
use sheetlisp_engine::engine::{CellRef, EvalResult, Value, detect_cycle, extract_dependencies};
use std::collections::HashSet;
use tracing::{debug, warn};

pub(crate) fn parse_key(key: &str) -> Result<CellRef> {
    CellRef::from_str(key.trim()).ok_or_else(|| SheetError::InvalidCellRef(key.to_string()))
}

/// Run the disposal hook on a memoized value that is being dropped.
pub(crate) fn dispose(old: Option<EvalResult<Value>>) {
    if let Some(Ok(value)) = old {
        value.dispose();
    }
}

impl Sheet {
    /// Set a cell's source text, or remove the cell with `None`.
    ///
    /// The source is parsed now but evaluated only when read. Blank source
    /// removes the cell.
    pub fn set_cell(&self, cell: &CellRef, source: Option<&str>) {
        let Some(source) = source.filter(|s| !s.trim().is_empty()) else {
            self.clear_cell(cell);
            return;
        };

        let parsed = self.engine.parse(source);
        let static_deps = parsed
            .as_ref()
            .map(extract_dependencies)
            .unwrap_or_default();
        let previous = self
            .grid
            .insert(cell.clone(), Cell::new(source, parsed, static_deps.clone()));
        if let Some(previous) = previous {
            self.unlink(cell, &previous.depends_on);
            dispose(previous.cached);
        }
        self.link(cell, &static_deps);
        debug!(cell = %cell, source, "cell set");

        // A new loop has to come back through a cell that refers to this one.
        if self.dependents.contains_key(cell)
            && let Some(path) =
                detect_cycle(cell, |c| self.grid.get(c).map(|e| e.depends_on.clone()))
        {
            let path: Vec<String> = path.iter().map(|c| c.to_string()).collect();
            warn!(cell = %cell, cycle = %path.join(" -> "), "circular reference");
        }

        self.mark_dependents_dirty(cell);
    }

    /// Set a cell by key ("B3").
    pub fn set(&self, key: &str, source: Option<&str>) -> Result<()> {
        let cell = parse_key(key)?;
        self.set_cell(&cell, source);
        Ok(())
    }

    /// Remove a cell. Cells that read it see an undefined value from now on.
    pub fn clear_cell(&self, cell: &CellRef) {
        if let Some((_, previous)) = self.grid.remove(cell) {
            self.unlink(cell, &previous.depends_on);
            dispose(previous.cached);
            debug!(cell = %cell, "cell cleared");
        }
        self.mark_dependents_dirty(cell);
    }

    pub fn clear(&self, key: &str) -> Result<()> {
        self.clear_cell(&parse_key(key)?);
        Ok(())
    }

    /// Mark all cells that depend (transitively) on the changed cell as dirty
    pub fn mark_dependents_dirty(&self, changed_cell: &CellRef) {
        let mut to_process = vec![changed_cell.clone()];
        let mut visited = HashSet::new();
        while let Some(cell_ref) = to_process.pop() {
            if !visited.insert(cell_ref.clone()) {
                continue;
            }

            let deps = match self.dependents.get(&cell_ref) {
                Some(deps) => deps.clone(),
                None => continue,
            };
            for dep in deps {
                let old = self.grid.get_mut(&dep).and_then(|mut cell| cell.invalidate());
                if old.is_some() {
                    debug!(cell = %dep, changed = %changed_cell, "invalidated");
                }
                dispose(old);
                to_process.push(dep);
            }
        }
    }

    /// Mark every cell dirty, e.g. after the library environment changed.
    pub fn invalidate_all(&self) {
        let mut dropped = Vec::new();
        for mut entry in self.grid.iter_mut() {
            dropped.push(entry.invalidate());
        }
        dropped.into_iter().for_each(dispose);
    }

    pub(crate) fn link(&self, cell: &CellRef, deps: &[CellRef]) {
        for dep in deps {
            self.dependents
                .entry(dep.clone())
                .or_default()
                .insert(cell.clone());
        }
    }

    pub(crate) fn unlink(&self, cell: &CellRef, deps: &[CellRef]) {
        for dep in deps {
            if let Some(mut dependents) = self.dependents.get_mut(dep) {
                dependents.remove(cell);
            }
            self.dependents.remove_if(dep, |_, dependents| dependents.is_empty());
        }
    }
}
