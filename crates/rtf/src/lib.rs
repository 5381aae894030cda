//! RTF to Markdown.
//!
//! The control stream is tokenized by [`lexer`], folded into the shared
//! [`docmd_core::Node`] tree by [`parser`] and rendered by
//! [`docmd_core::render`].

pub mod converter;
pub mod lexer;
pub mod parser;

pub use converter::RtfConverter;
pub use parser::parse_rtf;
