//! Static dependency extraction from parsed formulas.
//!
//! Walks an [`Atom`] tree to find the cell references a formula names
//! (e.g. `A1`, `B2:C5`, `(: "A1" "B3")`). The result seeds the dependency
//! graph for invalidation and static cycle warnings; evaluation records the
//! cells it actually reads on top of this.
//!
//! Handles:
//! - Coordinate symbols: `A1`, `B2`
//! - Range symbols: `A1:B5`
//! - Range forms with literal corners: `(: A1 B5)`, `(: "A1" "B5")`
//! - Ignores anything under `quote`

use std::collections::HashSet;

use super::atom::Atom;
use super::cell_ref::{CellRange, CellRef};

pub const MAX_DEPENDENCY_RANGE_CELLS: usize = 1_000_000;

/// Extract all cell references named in a formula, deduplicated, in first
/// occurrence order.
pub fn extract_dependencies(atom: &Atom) -> Vec<CellRef> {
    let mut deps = Deps::default();
    collect(atom, &mut deps);
    deps.order
}

#[derive(Default)]
struct Deps {
    order: Vec<CellRef>,
    seen: HashSet<CellRef>,
}

impl Deps {
    fn push(&mut self, cell: CellRef) {
        if self.seen.insert(cell.clone()) {
            self.order.push(cell);
        }
    }
}

fn collect(atom: &Atom, deps: &mut Deps) {
    match atom {
        Atom::Str(_) => {}
        Atom::Symbol(name) => {
            if let Some(range) = CellRange::from_symbol(name) {
                push_range(&range, deps);
            } else if let Some(cell) = CellRef::from_symbol(name) {
                deps.push(cell);
            }
        }
        Atom::List(items) => match items.as_slice() {
            [Atom::Symbol(head), _] if head == "quote" => {}
            [Atom::Symbol(head), from, to] if head == ":" => {
                match (corner(from), corner(to)) {
                    (Some(a), Some(b)) => push_range(&CellRange::new(a, b), deps),
                    _ => {
                        collect(from, deps);
                        collect(to, deps);
                    }
                }
            }
            _ => items.iter().for_each(|item| collect(item, deps)),
        },
    }
}

fn corner(atom: &Atom) -> Option<CellRef> {
    match atom {
        Atom::Symbol(name) => CellRef::from_symbol(name),
        Atom::Str(key) => CellRef::from_str(key),
        Atom::List(_) => None,
    }
}

fn push_range(range: &CellRange, deps: &mut Deps) {
    if range.cell_count() > MAX_DEPENDENCY_RANGE_CELLS {
        return;
    }
    deps.order.reserve(range.cell_count());
    for cell in range.cells() {
        deps.push(cell);
    }
}
