//! HTML and Word document converters.
//!
//! Word files are first decoded to HTML (`docx` from its XML package, legacy
//! `doc` from the piece table of its compound file) and then rendered with
//! the same tree walk as web pages.

pub mod docx;
pub mod html;
pub mod legacy;
pub mod word;

pub use html::{html_to_nodes, HtmlConverter, WalkOptions};
pub use word::WordConverter;
