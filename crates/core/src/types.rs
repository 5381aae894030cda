//! The conversion result record and the converter contract.

use crate::error::{Error, Result};
use crate::source::SourceFile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Format-specific metadata attached to a result.
pub type Metadata = Map<String, Value>;

/// Outcome of a single conversion call.
///
/// Exactly one of `markdown` and `error` is present. Fields are private so a
/// record cannot be edited after it leaves the converter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    markdown: Option<String>,

    original_name: String,

    converted_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    metadata: Metadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

impl ConversionResult {
    /// A successful conversion.
    pub fn success(
        original_name: impl Into<String>,
        converted_at: DateTime<Utc>,
        markdown: impl Into<String>,
        metadata: Metadata,
    ) -> Self {
        Self {
            success: true,
            markdown: Some(markdown.into()),
            original_name: original_name.into(),
            converted_at,
            metadata,
            error: None,
            warnings: Vec::new(),
        }
    }

    /// A failed conversion.
    pub fn failure(
        original_name: impl Into<String>,
        converted_at: DateTime<Utc>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            markdown: None,
            original_name: original_name.into(),
            converted_at,
            metadata: Metadata::new(),
            error: Some(error.into()),
            warnings: Vec::new(),
        }
    }

    /// Turn a converter's inner outcome into a result record.
    ///
    /// Read failures keep their own message; every other error is prefixed
    /// with the converter's label (e.g. `Excel转换失败`).
    pub fn from_outcome(
        original_name: &str,
        converted_at: DateTime<Utc>,
        failure_prefix: &str,
        outcome: Result<Converted>,
    ) -> Self {
        match outcome {
            Ok(converted) => {
                let mut metadata = converted.metadata;
                if !converted.warnings.is_empty() {
                    metadata.insert(
                        "warnings".to_string(),
                        Value::from(converted.warnings.clone()),
                    );
                }
                Self {
                    warnings: converted.warnings,
                    ..Self::success(original_name, converted_at, converted.markdown, metadata)
                }
            }
            Err(err) => {
                log::warn!("Conversion of '{}' failed: {}", original_name, err);
                let message = match err {
                    Error::SourceRead(_) => err.to_string(),
                    other => format!("{}: {}", failure_prefix, other),
                };
                Self::failure(original_name, converted_at, message)
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The Markdown body; `None` on failure.
    pub fn markdown(&self) -> Option<&str> {
        self.markdown.as_deref()
    }

    /// The failure message; `None` on success.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn converted_at(&self) -> DateTime<Utc> {
        self.converted_at
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Non-fatal anomalies noticed during the conversion.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// What a converter produces before it is wrapped into a result record.
#[derive(Debug, Clone, Default)]
pub struct Converted {
    pub markdown: String,
    pub metadata: Metadata,
    pub warnings: Vec<String>,
}

impl Converted {
    /// Markdown with metadata and no warnings.
    pub fn new(markdown: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            markdown: markdown.into(),
            metadata,
            warnings: Vec::new(),
        }
    }

    /// Attach structural warnings.
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// A format converter.
///
/// Implementations are unit structs: every call is independent and nothing
/// is shared between calls.
pub trait Converter: Send + Sync {
    /// Convert one file. Parse failures are reported inside the result.
    fn convert(&self, file: &dyn SourceFile) -> ConversionResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_has_markdown_and_no_error() {
        let result = ConversionResult::success("a.txt", Utc::now(), "# a", Metadata::new());
        assert!(result.is_success());
        assert_eq!(result.markdown(), Some("# a"));
        assert_eq!(result.error(), None);
    }

    #[test]
    fn test_failure_has_error_and_no_markdown() {
        let result = ConversionResult::failure("a.pdf", Utc::now(), "PDF转换失败: bad");
        assert!(!result.is_success());
        assert_eq!(result.markdown(), None);
        assert_eq!(result.error(), Some("PDF转换失败: bad"));
    }

    #[test]
    fn test_from_outcome_prefixes_parse_errors() {
        let result = ConversionResult::from_outcome(
            "x.rtf",
            Utc::now(),
            "RTF 转换失败",
            Err(Error::Rtf("missing header".to_string())),
        );
        assert_eq!(
            result.error(),
            Some("RTF 转换失败: RTF parsing error: missing header")
        );
    }

    #[test]
    fn test_from_outcome_keeps_read_errors_unprefixed() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let result =
            ConversionResult::from_outcome("x.csv", Utc::now(), "CSV/TSV 转换失败", Err(io.into()));
        assert_eq!(result.error(), Some("文件读取失败: gone"));
    }

    #[test]
    fn test_from_outcome_copies_warnings_into_metadata() {
        let converted = Converted::new("body", Metadata::new())
            .with_warnings(vec!["style ignored".to_string()]);
        let result = ConversionResult::from_outcome("d.docx", Utc::now(), "x", Ok(converted));
        assert_eq!(result.warnings(), ["style ignored".to_string()]);
        assert_eq!(
            result.metadata().get("warnings"),
            Some(&serde_json::json!(["style ignored"]))
        );
    }

    #[test]
    fn test_serializes_camel_case_and_omits_absent_side() {
        let result = ConversionResult::success("a.csv", Utc::now(), "x", Metadata::new());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["originalName"], "a.csv");
        assert!(json.get("convertedAt").is_some());
        assert!(json.get("error").is_none());
    }
}
