//! The reactive cell store.

mod eval;
mod library;
mod ops;
mod range;
mod state;

pub use state::{Cell, Sheet};
