//! Core types, Markdown emission kit, structure heuristics and the node
//! renderer for document-to-Markdown conversion.

pub mod document;
pub mod error;
pub mod formats;
pub mod heuristics;
pub mod markdown;
pub mod render;
pub mod source;
pub mod types;

pub use document::{EmphasisKind, Node, StyleSet};
pub use error::{Error, Result};
pub use formats::{
    detect_file_type, validate_file_size, FileFormat, FileTypeInfo, Maturity, Quality,
    DEFAULT_MAX_FILE_SIZE_MB,
};
pub use render::render;
pub use source::{DiskFile, MemoryFile, SourceFile};
pub use types::{ConversionResult, Converted, Converter, Metadata};
