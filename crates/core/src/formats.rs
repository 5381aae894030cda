//! The advertised set of supported file formats.

use serde::{Deserialize, Serialize};

/// Default upper bound for accepted input files, in megabytes.
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 10;

/// A supported source format, one per advertised extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Txt,
    Pdf,
    Doc,
    Docx,
    Xls,
    Xlsx,
    Csv,
    Tsv,
    Html,
    Htm,
    Rtf,
    Ppt,
    Pptx,
}

/// How mature a converter is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Maturity {
    Stable,
    Beta,
    Experimental,
}

/// Expected output quality of a converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    High,
    Medium,
    Low,
}

/// Classification entry for one supported extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileTypeInfo {
    pub extension: String,
    pub name: String,
    pub status: Maturity,
    pub quality: Quality,
    pub mime_type: String,
}

impl FileFormat {
    /// Every supported format, in advertised order.
    pub const ALL: [FileFormat; 13] = [
        FileFormat::Txt,
        FileFormat::Pdf,
        FileFormat::Doc,
        FileFormat::Docx,
        FileFormat::Xls,
        FileFormat::Xlsx,
        FileFormat::Csv,
        FileFormat::Tsv,
        FileFormat::Html,
        FileFormat::Htm,
        FileFormat::Rtf,
        FileFormat::Ppt,
        FileFormat::Pptx,
    ];

    /// Look up a format by extension. Case is ignored and a leading `.` is allowed.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim().trim_start_matches('.').to_lowercase();
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Docx => "docx",
            Self::Xls => "xls",
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Html => "html",
            Self::Htm => "htm",
            Self::Rtf => "rtf",
            Self::Ppt => "ppt",
            Self::Pptx => "pptx",
        }
    }

    /// Human-readable name shown next to the extension.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Txt => "文本文件",
            Self::Pdf => "PDF文档",
            Self::Doc => "Word文档(旧版)",
            Self::Docx => "Word文档",
            Self::Xls => "Excel表格(旧版)",
            Self::Xlsx => "Excel表格",
            Self::Csv => "CSV表格",
            Self::Tsv => "TSV表格",
            Self::Html | Self::Htm => "HTML网页",
            Self::Rtf => "RTF富文本",
            Self::Ppt => "PowerPoint演示文稿(旧版)",
            Self::Pptx => "PowerPoint演示文稿",
        }
    }

    pub fn status(&self) -> Maturity {
        match self {
            Self::Rtf | Self::Pptx => Maturity::Beta,
            Self::Ppt => Maturity::Experimental,
            _ => Maturity::Stable,
        }
    }

    pub fn quality(&self) -> Quality {
        match self {
            Self::Rtf | Self::Pptx | Self::Doc => Quality::Medium,
            Self::Ppt => Quality::Low,
            _ => Quality::High,
        }
    }

    /// Canonical content type, e.g. for a file picker's `accept` list.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Txt => "text/plain",
            Self::Pdf => "application/pdf",
            Self::Doc => "application/msword",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Xls => "application/vnd.ms-excel",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Csv => "text/csv",
            Self::Tsv => "text/tab-separated-values",
            Self::Html | Self::Htm => "text/html",
            Self::Rtf => "application/rtf",
            Self::Ppt => "application/vnd.ms-powerpoint",
            Self::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
        }
    }

    pub fn info(&self) -> FileTypeInfo {
        FileTypeInfo {
            extension: self.extension().to_string(),
            name: self.display_name().to_string(),
            status: self.status(),
            quality: self.quality(),
            mime_type: self.mime_type().to_string(),
        }
    }
}

/// Detect the format of a file from its name.
pub fn detect_file_type(file_name: &str) -> Option<FileFormat> {
    file_name
        .rsplit_once('.')
        .and_then(|(_, ext)| FileFormat::from_extension(ext))
}

/// Whether `size` bytes fits within `max_mb` megabytes.
pub fn validate_file_size(size: u64, max_mb: u64) -> bool {
    size <= max_mb.saturating_mul(1024 * 1024)
}
