//! Converters for grid-shaped sources: delimited text and spreadsheet
//! workbooks.

pub mod delimited;
pub mod spreadsheet;

pub use delimited::DelimitedConverter;
pub use spreadsheet::{SheetModel, SpreadsheetConverter};
