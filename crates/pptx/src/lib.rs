//! PowerPoint converter.
//!
//! `.pptx` packages are ZIP archives of DrawingML parts; slide text, notes and
//! document properties are read from them. Legacy `.ppt` files only get an
//! advisory notice.

pub mod converter;
pub mod legacy;
pub mod parser;

pub use converter::PresentationConverter;
