//! Raw tstat log parsing: header sanitization, whitespace-delimited table
//! reading, and numeric coercion of cell values.

pub mod numeric;
pub mod row;

pub use numeric::{coerce, CellValue};
pub use row::{canonical_field, LogReader, RowError, SanitizedRow};
