//! Converters for sources without explicit structure: plain text and PDF.
//!
//! Both recover headings and list items line by line with the heuristics in
//! [`docmd_core::heuristics`].

pub mod pdf;
pub mod txt;

pub use pdf::PdfConverter;
pub use txt::TextConverter;
