//! Error types for document conversion.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while converting a document.
#[derive(Error, Debug)]
pub enum Error {
    /// No converter is registered for the extension.
    #[error("不支持的文件格式: {0}")]
    UnsupportedFormat(String),

    /// Failed to read the source bytes or text.
    #[error("文件读取失败: {0}")]
    SourceRead(#[from] std::io::Error),

    /// Malformed delimited text.
    #[error("CSV parsing error: {0}")]
    Csv(String),

    /// The workbook could not be opened or a sheet could not be read.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// The PDF could not be loaded or its text could not be extracted.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// The HTML could not be processed.
    #[error("HTML error: {0}")]
    Html(String),

    /// Failed to decode a Word document.
    #[error("Document error: {0}")]
    Document(String),

    /// Malformed RTF control stream.
    #[error("RTF parsing error: {0}")]
    Rtf(String),

    /// ZIP archive error (for PPTX and DOCX).
    #[error("ZIP error: {0}")]
    Zip(String),

    /// XML parsing error (for PPTX and DOCX).
    #[error("XML parsing error: {0}")]
    Xml(String),

    /// OLE/CFB container error (for legacy DOC).
    #[error("OLE/CFB error: {0}")]
    Cfb(String),
}

impl Error {
    /// Whether this error is a read failure rather than a parse failure.
    pub fn is_source_read(&self) -> bool {
        matches!(self, Error::SourceRead(_))
    }
}
