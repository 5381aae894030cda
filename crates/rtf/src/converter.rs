use crate::parser::parse_rtf;
use chrono::Utc;
use docmd_core::markdown::{strip_extension, tidy};
use docmd_core::source::decode_text;
use docmd_core::{render, ConversionResult, Converted, Converter, Metadata, Result, SourceFile};
use serde_json::Value;

pub const FAILURE_PREFIX: &str = "RTF 转换失败";

/// Body used when the document yields no content.
pub const EMPTY_NOTICE: &str = "*无法提取RTF内容，文件可能已损坏或格式不支持*";

/// Converter for `.rtf` documents.
pub struct RtfConverter;

impl RtfConverter {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, file: &dyn SourceFile) -> Result<Converted> {
        let bytes = file.read_bytes()?;
        let nodes = parse_rtf(&bytes)?;
        log::debug!("{}: parsed {} RTF blocks", file.name(), nodes.len());

        let body = render(&nodes);
        let body = if body.is_empty() { EMPTY_NOTICE.to_string() } else { body };
        let title = strip_extension(file.name(), &["rtf"]);
        let markdown = tidy(&format!("# {}\n\n{}", title, body));

        let mut metadata = Metadata::new();
        metadata.insert(
            "originalLength".into(),
            Value::from(decode_text(&bytes).chars().count()),
        );
        metadata.insert("markdownLength".into(), Value::from(markdown.chars().count()));

        Ok(Converted::new(markdown, metadata))
    }
}

impl Default for RtfConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for RtfConverter {
    fn convert(&self, file: &dyn SourceFile) -> ConversionResult {
        let converted_at = Utc::now();
        ConversionResult::from_outcome(file.name(), converted_at, FAILURE_PREFIX, self.run(file))
    }
}
