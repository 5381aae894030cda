//! Plain text converter.

use chrono::Utc;
use docmd_core::heuristics::{is_list_item, is_text_title};
use docmd_core::markdown::{strip_extension, tidy};
use docmd_core::{ConversionResult, Converted, Converter, Metadata, Result, SourceFile};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

pub const FAILURE_PREFIX: &str = "文本转换失败";

static PARAGRAPH_BREAK_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

static BULLET_GLYPH_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[·•*-]\s+").unwrap());

/// Split text into trimmed, non-empty paragraphs.
pub fn split_paragraphs(content: &str) -> Vec<String> {
    let content = content.replace("\r\n", "\n").replace('\r', "\n");
    PARAGRAPH_BREAK_REGEX
        .split(&content)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Render one paragraph according to its first line.
fn render_paragraph(paragraph: &str, out: &mut String) {
    let lines: Vec<&str> = paragraph.lines().collect();
    let first = lines[0].trim();

    if is_text_title(first) {
        out.push_str(&format!("## {}\n\n", first));
        if lines.len() > 1 {
            out.push_str(&lines[1..].join("\n"));
            out.push_str("\n\n");
        }
    } else if is_list_item(first) {
        for line in lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
            out.push_str(&format!("- {}\n", BULLET_GLYPH_REGEX.replace(line, "")));
        }
        out.push('\n');
    } else {
        out.push_str(paragraph);
        out.push_str("\n\n");
    }
}

/// Convert plain text to Markdown under a `# title` heading.
pub fn text_to_markdown(content: &str, title: &str) -> String {
    let mut md = format!("# {}\n\n", title);
    for paragraph in split_paragraphs(content) {
        render_paragraph(&paragraph, &mut md);
    }
    tidy(&md)
}

/// Converter for `.txt` files.
pub struct TextConverter;

impl TextConverter {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, file: &dyn SourceFile) -> Result<Converted> {
        let content = file.read_text()?;
        let title = strip_extension(file.name(), &["txt"]);

        let mut metadata = Metadata::new();
        metadata.insert("paragraphs".into(), Value::from(split_paragraphs(&content).len()));
        metadata.insert("characters".into(), Value::from(content.chars().count()));

        Ok(Converted::new(text_to_markdown(&content, &title), metadata))
    }
}

impl Default for TextConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for TextConverter {
    fn convert(&self, file: &dyn SourceFile) -> ConversionResult {
        let converted_at = Utc::now();
        ConversionResult::from_outcome(file.name(), converted_at, FAILURE_PREFIX, self.run(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmd_core::MemoryFile;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_paragraphs() {
        let paragraphs = split_paragraphs("a\r\nb\r\n \r\n\r\nc\n\n\n");
        assert_eq!(paragraphs, ["a\nb", "c"]);
    }

    #[test]
    fn test_title_paragraph_keeps_body_lines() {
        let md = text_to_markdown(
            "第一章 开始\n这是第一行正文内容，它比较长，所以不会被当成标题处理，并以句号结尾。\n第二行。",
            "book",
        );
        assert_eq!(
            md,
            "# book\n\n## 第一章 开始\n\n这是第一行正文内容，它比较长，所以不会被当成标题处理，并以句号结尾。\n第二行。"
        );
    }

    #[test]
    fn test_list_paragraph() {
        let md = text_to_markdown("- 第一项的内容比较长，并且包含句号。\n• 香蕉\n  (3) 橙子", "fruit");
        assert_eq!(md, "# fruit\n\n- 第一项的内容比较长，并且包含句号。\n- 香蕉\n- (3) 橙子");
    }

    #[test]
    fn test_short_bullet_line_reads_as_title() {
        assert_eq!(text_to_markdown("- 苹果", "t"), "# t\n\n## - 苹果");
    }

    #[test]
    fn test_body_paragraph() {
        let body = "这是一段普通的正文，它包含了足够多的文字，因此不会被当作标题，同时也以句号结尾。";
        assert_eq!(text_to_markdown(body, "t"), format!("# t\n\n{}", body));
    }

    #[test]
    fn test_converter_metadata() {
        let file = MemoryFile::new("notes.txt", "Intro\n\nSecond paragraph");
        let result = TextConverter::new().convert(&file);
        assert!(result.is_success());
        assert_eq!(
            result.markdown().unwrap(),
            "# notes\n\n## Intro\n\n## Second paragraph"
        );
        assert_eq!(result.metadata()["paragraphs"], 2);
        assert_eq!(result.metadata()["characters"], 23);
    }
}
