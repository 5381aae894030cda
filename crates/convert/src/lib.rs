//! Convert documents of many formats to Markdown.
//!
//! [`convert`] picks a converter from the declared file type and runs it.
//! Only an unknown type is an `Err`; every other problem is reported inside
//! the returned [`ConversionResult`].
//!
//! ```no_run
//! use docmd::{convert_file, DiskFile};
//!
//! let file = DiskFile::open("report.docx")?;
//! let result = convert_file(&file)?;
//! if let Some(markdown) = result.markdown() {
//!     println!("{}", markdown);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use docmd_core::{
    detect_file_type, validate_file_size, ConversionResult, Converted, Converter, DiskFile, Error,
    FileFormat, FileTypeInfo, Maturity, MemoryFile, Metadata, Quality, Result, SourceFile,
    DEFAULT_MAX_FILE_SIZE_MB,
};
pub use docmd_html::{HtmlConverter, WordConverter};
pub use docmd_pptx::PresentationConverter;
pub use docmd_rtf::RtfConverter;
pub use docmd_sheet::{DelimitedConverter, SpreadsheetConverter};
pub use docmd_text::{PdfConverter, TextConverter};

/// The converter registered for an extension. Case is ignored and a leading
/// `.` is allowed.
pub fn converter_for(extension: &str) -> Option<&'static dyn Converter> {
    let converter: &'static dyn Converter = match FileFormat::from_extension(extension)? {
        FileFormat::Txt => &TextConverter,
        FileFormat::Pdf => &PdfConverter,
        FileFormat::Doc | FileFormat::Docx => &WordConverter,
        FileFormat::Xls | FileFormat::Xlsx => &SpreadsheetConverter,
        FileFormat::Csv | FileFormat::Tsv => &DelimitedConverter,
        FileFormat::Html | FileFormat::Htm => &HtmlConverter,
        FileFormat::Rtf => &RtfConverter,
        FileFormat::Ppt | FileFormat::Pptx => &PresentationConverter,
    };
    Some(converter)
}

/// Convert `file` with the converter for `declared_type`.
pub fn convert(file: &dyn SourceFile, declared_type: &str) -> Result<ConversionResult> {
    let converter = converter_for(declared_type)
        .ok_or_else(|| Error::UnsupportedFormat(declared_type.to_string()))?;

    log::debug!("Converting {} as {}", file.name(), declared_type);
    Ok(converter.convert(file))
}

/// Convert `file` using the extension of its name as the declared type.
pub fn convert_file(file: &dyn SourceFile) -> Result<ConversionResult> {
    convert(file, &file.extension())
}

/// Every supported extension, in advertised order.
pub fn supported_types() -> Vec<&'static str> {
    FileFormat::ALL.iter().map(FileFormat::extension).collect()
}

/// Name, maturity, quality and MIME type of every supported extension.
pub fn file_type_info() -> Vec<FileTypeInfo> {
    FileFormat::ALL.iter().map(FileFormat::info).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_advertised_type_has_a_converter() {
        for ext in supported_types() {
            assert!(converter_for(ext).is_some(), "no converter for {}", ext);
        }
    }

    #[test]
    fn test_converter_lookup_normalizes_extension() {
        assert!(converter_for(".CSV").is_some());
        assert!(converter_for(" Pptx ").is_some());
        assert!(converter_for("xyz").is_none());
        assert!(converter_for("").is_none());
    }

    #[test]
    fn test_file_type_info_matches_supported_types() {
        let info = file_type_info();
        assert_eq!(info.len(), supported_types().len());
        assert_eq!(info[0].extension, "txt");
        assert_eq!(info[0].mime_type, "text/plain");
    }
}
