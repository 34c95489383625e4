//! Document-to-row projection.
//!
//! Resolves user-declared field paths against document trees and emits flat,
//! schema-shaped rows, replicating rows across `[*]` array expansions.

pub mod expansion;
pub mod field;
pub mod projector;
pub mod types;

pub use field::{indexed_vals_list, parse_indexed_vals_list, Field};
pub use projector::Projector;
pub use types::{row_to_json, Cell, Column, ColumnType, OutputSchema, Row};
