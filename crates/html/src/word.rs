//! Word converter for `.docx` and `.doc` files.

use crate::docx::docx_to_html;
use crate::html::{html_to_nodes, WalkOptions};
use crate::legacy::doc_to_html;
use chrono::Utc;
use docmd_core::markdown::{banner_time, strip_extension, tidy};
use docmd_core::{render, ConversionResult, Converted, Converter, Metadata, Result, SourceFile};
use serde_json::Value;

pub const FAILURE_PREFIX: &str = "Word文档转换失败";

const ZIP_MAGIC: &[u8] = b"PK";

/// Converter for Word documents.
///
/// Packages are recognised by content rather than extension, so a `.doc`
/// file that is really a DOCX package takes the DOCX path.
pub struct WordConverter;

impl WordConverter {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, file: &dyn SourceFile, converted_at: &str) -> Result<Converted> {
        let bytes = file.read_bytes()?;
        let (html, warnings) = if bytes.starts_with(ZIP_MAGIC) || file.extension() != "doc" {
            docx_to_html(&bytes)?
        } else {
            doc_to_html(&bytes)?
        };

        log::debug!("{} produced {} bytes of HTML", file.name(), html.len());

        let title = strip_extension(file.name(), &["doc", "docx"]);
        let body = render(&html_to_nodes(&html, WalkOptions::WORD));
        let markdown = tidy(&format!(
            "# {}\n\n> 📝 Word文档转换 | 转换时间: {}\n\n{}",
            title, converted_at, body
        ));

        let mut metadata = Metadata::new();
        metadata.insert("title".into(), Value::from(title));
        metadata.insert("size".into(), Value::from(file.size()));
        metadata.insert("hasImages".into(), Value::from(html.contains("<img")));
        metadata.insert("hasTables".into(), Value::from(html.contains("<table")));

        Ok(Converted::new(markdown, metadata).with_warnings(warnings))
    }
}

impl Default for WordConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for WordConverter {
    fn convert(&self, file: &dyn SourceFile) -> ConversionResult {
        let converted_at = Utc::now();
        let outcome = self.run(file, &banner_time(converted_at));
        ConversionResult::from_outcome(file.name(), converted_at, FAILURE_PREFIX, outcome)
    }
}
