//! PDF converter.
//!
//! Text runs are collected through a custom [`OutputDev`] that records each
//! run's text together with the vertical position of its first glyph. Lines
//! are rebuilt from vertical deltas and then classified with the plain-text
//! heading/list heuristics.

use chrono::Utc;
use docmd_core::heuristics::{is_list_item, is_text_title};
use docmd_core::markdown::{banner_time, strip_extension, tidy};
use docmd_core::{ConversionResult, Converted, Converter, Error, Metadata, Result, SourceFile};
use pdf_extract::{output_doc, Document, MediaBox, OutputDev, OutputError, Transform};
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use unicode_normalization::UnicodeNormalization;

pub const FAILURE_PREFIX: &str = "PDF转换失败";

/// A vertical move larger than this starts a new line.
pub const LINE_BREAK_THRESHOLD: f64 = 5.0;

/// A piece of text shown by one text operator.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Vertical position of the first glyph, in user space.
    pub y: f64,
}

impl TextRun {
    pub fn new(text: impl Into<String>, y: f64) -> Self {
        Self {
            text: text.into(),
            y,
        }
    }
}

/// Collects text runs page by page.
#[derive(Debug, Default)]
struct RunCollector {
    pages: Vec<Vec<TextRun>>,
    text: String,
    y: Option<f64>,
}

impl RunCollector {
    fn flush(&mut self) {
        let text = std::mem::take(&mut self.text);
        if let (Some(y), Some(page)) = (self.y.take(), self.pages.last_mut()) {
            if !text.is_empty() {
                page.push(TextRun::new(text, y));
            }
        }
    }
}

impl OutputDev for RunCollector {
    fn begin_page(
        &mut self,
        _page_num: u32,
        _media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> std::result::Result<(), OutputError> {
        self.pages.push(Vec::new());
        Ok(())
    }

    fn end_page(&mut self) -> std::result::Result<(), OutputError> {
        self.flush();
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        _width: f64,
        _spacing: f64,
        _font_size: f64,
        char: &str,
    ) -> std::result::Result<(), OutputError> {
        if self.y.is_none() {
            self.y = Some(trm.m32);
        }
        self.text.extend(char.nfkc());
        Ok(())
    }

    fn begin_word(&mut self) -> std::result::Result<(), OutputError> {
        self.flush();
        Ok(())
    }

    fn end_word(&mut self) -> std::result::Result<(), OutputError> {
        self.flush();
        Ok(())
    }

    fn end_line(&mut self) -> std::result::Result<(), OutputError> {
        self.flush();
        Ok(())
    }
}

fn push_line(lines: &mut Vec<String>, line: &str) {
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    if !collapsed.is_empty() {
        lines.push(collapsed);
    }
}

/// Rebuild lines from runs in reading order.
///
/// A new line starts whenever the vertical position moves by more than
/// [`LINE_BREAK_THRESHOLD`] from the previous run. Runs on one line are
/// joined by single spaces and blank lines are dropped.
pub fn group_runs_into_lines(runs: &[TextRun]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut last_y: Option<f64> = None;

    for run in runs {
        if last_y.is_some_and(|prev| (run.y - prev).abs() > LINE_BREAK_THRESHOLD) {
            push_line(&mut lines, &line);
            line.clear();
        }
        line.push_str(&run.text);
        line.push(' ');
        last_y = Some(run.y);
    }
    push_line(&mut lines, &line);

    lines
}

/// Classify one line as heading, list item or body text.
pub fn classify_line(line: &str) -> String {
    if is_text_title(line) {
        format!("### {}", line)
    } else if is_list_item(line) {
        format!("- {}", line)
    } else {
        line.to_string()
    }
}

/// Assemble the document from per-page lines. Pages without text are skipped.
pub fn pages_to_markdown(title: &str, pages: &[Vec<String>], timestamp: &str) -> String {
    let mut md = format!("# {}\n\n", title);
    md.push_str(&format!(
        "> 📄 PDF文档转换 | 共 {} 页 | 转换时间: {}\n\n",
        pages.len(),
        timestamp
    ));

    let sections: Vec<String> = pages
        .iter()
        .filter(|lines| !lines.is_empty())
        .map(|lines| {
            lines
                .iter()
                .map(|l| classify_line(l))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect();
    md.push_str(&sections.join("\n\n---\n\n"));

    tidy(&md)
}

/// Load a PDF from memory and return the runs of each page.
pub fn extract_page_runs(bytes: &[u8]) -> Result<Vec<Vec<TextRun>>> {
    let doc = Document::load_mem(bytes).map_err(|e| Error::Pdf(format!("Failed to load PDF: {}", e)))?;
    let page_count = doc.get_pages().len();

    let mut collector = RunCollector::default();
    let outcome = catch_unwind(AssertUnwindSafe(|| output_doc(&doc, &mut collector)));
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(Error::Pdf(format!("Failed to extract text: {}", e))),
        Err(_) => return Err(Error::Pdf("text extraction aborted on malformed content".to_string())),
    }

    let mut pages = collector.pages;
    pages.resize_with(page_count.max(pages.len()), Vec::new);
    Ok(pages)
}

/// Converter for `.pdf` files.
pub struct PdfConverter;

impl PdfConverter {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, file: &dyn SourceFile, converted_at: &str) -> Result<Converted> {
        let page_runs = extract_page_runs(&file.read_bytes()?)?;
        let pages: Vec<Vec<String>> = page_runs.iter().map(|runs| group_runs_into_lines(runs)).collect();

        log::debug!("Extracted {} pages from {}", pages.len(), file.name());

        let title = strip_extension(file.name(), &["pdf"]);
        let markdown = pages_to_markdown(&title, &pages, converted_at);

        let mut metadata = Metadata::new();
        metadata.insert("title".into(), Value::from(title));
        metadata.insert("pages".into(), Value::from(pages.len()));
        metadata.insert("size".into(), Value::from(file.size()));

        Ok(Converted::new(markdown, metadata))
    }
}

impl Default for PdfConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for PdfConverter {
    fn convert(&self, file: &dyn SourceFile) -> ConversionResult {
        let converted_at = Utc::now();
        let outcome = self.run(file, &banner_time(converted_at));
        ConversionResult::from_outcome(file.name(), converted_at, FAILURE_PREFIX, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmd_core::MemoryFile;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_runs_on_same_baseline_share_a_line() {
        let runs = vec![
            TextRun::new("Hello", 700.0),
            TextRun::new("world", 702.0),
            TextRun::new("Next", 680.0),
        ];
        assert_eq!(group_runs_into_lines(&runs), ["Hello world", "Next"]);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let runs = vec![TextRun::new("a", 100.0), TextRun::new("b", 95.0)];
        assert_eq!(group_runs_into_lines(&runs), ["a b"]);
    }

    #[test]
    fn test_whitespace_collapses_and_blank_lines_drop() {
        let runs = vec![
            TextRun::new("  spaced   out ", 500.0),
            TextRun::new("   ", 400.0),
            TextRun::new("end", 300.0),
        ];
        assert_eq!(group_runs_into_lines(&runs), ["spaced out", "end"]);
    }

    #[test]
    fn test_classify_line() {
        assert_eq!(classify_line("第二章 方法"), "### 第二章 方法");
        let long_item = "- 这是一个很长的列表项，它说明了某个步骤需要注意的细节，并以句号结尾。";
        assert_eq!(classify_line(long_item), format!("- {}", long_item));
        let body = "这是一行正文内容，长度适中，但以句号结尾，所以它不是标题。";
        assert_eq!(classify_line(body), body);
    }

    #[test]
    fn test_pages_separated_by_rules_and_empty_pages_skipped() {
        let body = "正文内容包含句号，因此保持为普通文本。";
        let pages = vec![
            vec!["Intro".to_string(), body.to_string()],
            Vec::new(),
            vec!["Summary".to_string()],
        ];
        let md = pages_to_markdown("report", &pages, "2024/01/01 00:00:00");
        assert_eq!(
            md,
            format!(
                "# report\n\n> 📄 PDF文档转换 | 共 3 页 | 转换时间: 2024/01/01 00:00:00\n\n### Intro\n\n{}\n\n---\n\n### Summary",
                body
            )
        );
    }

    #[test]
    fn test_invalid_pdf_fails_with_prefix() {
        let file = MemoryFile::new("bad.pdf", b"%PDF-garbage".to_vec());
        let result = PdfConverter::new().convert(&file);
        assert!(!result.is_success());
        assert!(result.error().unwrap().starts_with("PDF转换失败: "));
    }
}
