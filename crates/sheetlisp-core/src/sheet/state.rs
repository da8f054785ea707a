use dashmap::DashMap;
use sheetlisp_engine::engine::{
    Atom, CellRef, Engine, EvalResult, ParseError, Value, create_engine,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One formula cell.
#[derive(Clone)]
pub struct Cell {
    /// Source text as entered.
    pub source: String,
    /// Parsed once on write; a parse failure becomes the cell's value.
    pub parsed: Result<Atom, ParseError>,
    /// References named in the source text.
    pub static_deps: Vec<CellRef>,
    /// Static references plus the cells read by the last evaluation.
    pub depends_on: Vec<CellRef>,
    pub dirty: bool,
    pub cached: Option<EvalResult<Value>>,
}

impl Cell {
    pub fn new(source: &str, parsed: Result<Atom, ParseError>, static_deps: Vec<CellRef>) -> Self {
        Cell {
            source: source.to_string(),
            parsed,
            depends_on: static_deps.clone(),
            static_deps,
            dirty: true,
            cached: None,
        }
    }

    /// Drop the memoized value, returning it so the caller can dispose it.
    pub(crate) fn invalidate(&mut self) -> Option<EvalResult<Value>> {
        self.dirty = true;
        self.cached.take()
    }
}

/// The reactive cell store.
///
/// Cells are evaluated lazily on read and memoized. Each evaluation records
/// the cells it read; writing a cell marks everything that transitively
/// read it as dirty, so reads always observe current values.
pub struct Sheet {
    pub(crate) grid: DashMap<CellRef, Cell>,
    pub(crate) engine: Engine,
    /// Reverse dependency map: cell -> cells that depend on it
    pub(crate) dependents: DashMap<CellRef, HashSet<CellRef>>,
    /// Cells whose evaluation is in progress, outermost first.
    pub(crate) evaluating: Mutex<Vec<CellRef>>,
    /// One read set per in-progress evaluation.
    pub(crate) reads: Mutex<Vec<HashSet<CellRef>>>,
    /// Cells whose dirty inputs are being evaluated ahead of them.
    pub(crate) settling: Mutex<HashSet<CellRef>>,
    pub(crate) library_files: Vec<PathBuf>,
}

impl Sheet {
    /// An empty sheet over the default engine.
    pub fn new() -> Self {
        Self::with_engine(create_engine())
    }

    /// An empty sheet over `engine`; the range form `:` is added to its
    /// special forms.
    pub fn with_engine(mut engine: Engine) -> Self {
        super::range::register_range_special(&mut engine);
        Sheet {
            grid: DashMap::new(),
            engine,
            dependents: DashMap::new(),
            evaluating: Mutex::new(Vec::new()),
            reads: Mutex::new(Vec::new()),
            settling: Mutex::new(HashSet::new()),
            library_files: Vec::new(),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Keys of all defined cells, column-major.
    pub fn cells(&self) -> Vec<CellRef> {
        let mut cells: Vec<CellRef> = self.grid.iter().map(|e| e.key().clone()).collect();
        cells.sort();
        cells
    }

    /// Source text of a cell, if defined.
    pub fn source(&self, cell: &CellRef) -> Option<String> {
        self.grid.get(cell).map(|c| c.source.clone())
    }

    pub fn contains(&self, cell: &CellRef) -> bool {
        self.grid.contains_key(cell)
    }

    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    pub fn library_files(&self) -> &[PathBuf] {
        &self.library_files
    }
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
