//! XLSX (Office Open XML) adapter for in-place workbook translation.
//!
//! Only string cells are translated: shared strings and inline strings.
//! Numbers, booleans, dates, errors and formula cells are never visited.

pub mod adapter;
#[cfg(any(test, feature = "test-helpers"))]
pub mod fixtures;
pub mod location;
pub mod parser;
pub mod shared_strings;

pub use adapter::SpreadsheetAdapter;
pub use location::{CellLocation, CellRef};
pub use parser::{Sheet, Workbook, XlsxParser};
pub use shared_strings::SharedStrings;
