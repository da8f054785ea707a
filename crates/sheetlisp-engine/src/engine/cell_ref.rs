//! Cell reference parsing and formatting.
//!
//! Provides bidirectional conversion between spreadsheet-style cell references
//! (e.g., "A1", "B2", "AA100") and zero-indexed row/column coordinates, plus
//! rectangular ranges written as `<cell>:<cell>`.
//!
//! # Examples
//!
//! ```
//! use sheetlisp_engine::engine::CellRef;
//!
//! let cell = CellRef::from_str("B3").unwrap();
//! assert_eq!(cell.row, 2);  // 0-indexed
//! assert_eq!(cell.col, 1);
//! assert_eq!(cell.to_string(), "B3");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// A reference to a cell by row and column indices (0-indexed).
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

fn a1_re() -> &'static Regex {
    static A1_RE: OnceLock<Regex> = OnceLock::new();
    A1_RE.get_or_init(|| {
        Regex::new(r"^(?<letters>[A-Za-z]+)(?<numbers>[0-9]+)$").expect("A1 regex must compile")
    })
}

fn symbol_re() -> &'static Regex {
    static SYMBOL_RE: OnceLock<Regex> = OnceLock::new();
    SYMBOL_RE.get_or_init(|| Regex::new(r"^[A-Z]+[0-9]+$").expect("cell symbol regex must compile"))
}

impl CellRef {
    pub fn new(row: usize, col: usize) -> CellRef {
        CellRef { row, col }
    }

    /// Parse a cell reference from spreadsheet notation (e.g., "A1", "B2", "AA10").
    /// Returns None if the input is invalid.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(name: &str) -> Option<CellRef> {
        Self::parse_a1(name)
    }

    /// Resolve a formula identifier as a cell reference.
    ///
    /// Only upper-case coordinates count, so ordinary lower-case names such as
    /// `x1` stay plain variables.
    pub fn from_symbol(name: &str) -> Option<CellRef> {
        if symbol_re().is_match(name) {
            Self::parse_a1(name)
        } else {
            None
        }
    }

    fn parse_a1(name: &str) -> Option<CellRef> {
        let caps = a1_re().captures(name)?;
        let col = col_from_letters(&caps["letters"])?.checked_sub(1)?;
        let row = caps["numbers"].parse::<usize>().ok()?.checked_sub(1)?;
        Some(CellRef::new(row, col))
    }

    /// Convert column index to spreadsheet-style letters (0 -> A, 25 -> Z, 26 -> AA).
    pub fn col_to_letters(col: usize) -> String {
        let mut result = String::new();
        let mut n = col + 1;
        while n > 0 {
            n -= 1;
            result.insert(0, (b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        result
    }
}

/// Decode base-26 column letters where `A` is 1 (`Z` = 26, `AA` = 27).
pub fn col_from_letters(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.bytes().try_fold(0usize, |acc, c| {
        let c = c.to_ascii_uppercase();
        if !c.is_ascii_uppercase() {
            return None;
        }
        acc.checked_mul(26)?.checked_add((c - b'A') as usize + 1)
    })
}

/// Build the key for a 1-based column and row (column 2, row 3 -> "B3").
pub fn cell_key(column: usize, row: usize) -> Option<String> {
    let col = column.checked_sub(1)?;
    row.checked_sub(1)?;
    Some(format!("{}{}", CellRef::col_to_letters(col), row))
}

impl std::str::FromStr for CellRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_a1(s).ok_or_else(|| format!("Invalid cell reference: {}", s))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CellRef::col_to_letters(self.col), self.row + 1)
    }
}

/// Cells sort column-major, matching range iteration order.
impl Ord for CellRef {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.col, self.row).cmp(&(other.col, other.row))
    }
}

impl PartialOrd for CellRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An inclusive rectangle of cells.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    /// Build a range from two corners in any order.
    pub fn new(a: CellRef, b: CellRef) -> CellRange {
        CellRange {
            start: CellRef::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellRef::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// Parse two corner keys ("A1", "B2").
    pub fn from_corners(from: &str, to: &str) -> Option<CellRange> {
        Some(CellRange::new(CellRef::from_str(from)?, CellRef::from_str(to)?))
    }

    /// Parse a range like "A1:B5".
    pub fn parse(range: &str) -> Option<CellRange> {
        let (from, to) = range.split_once(':')?;
        Self::from_corners(from, to)
    }

    /// Like [`CellRange::parse`] but only for upper-case formula identifiers.
    pub fn from_symbol(name: &str) -> Option<CellRange> {
        let (from, to) = name.split_once(':')?;
        Some(CellRange::new(
            CellRef::from_symbol(from)?,
            CellRef::from_symbol(to)?,
        ))
    }

    /// Number of cells covered by the range.
    pub fn cell_count(&self) -> usize {
        (self.end.row - self.start.row + 1).saturating_mul(self.end.col - self.start.col + 1)
    }

    /// Iterate the cells column by column (A1, A2, B1, B2).
    pub fn cells(&self) -> impl Iterator<Item = CellRef> + '_ {
        (self.start.col..=self.end.col).flat_map(move |col| {
            (self.start.row..=self.end.row).map(move |row| CellRef::new(row, col))
        })
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}
