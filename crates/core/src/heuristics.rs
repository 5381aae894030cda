//! Pattern-based structure recovery for formats that carry no explicit
//! headings or lists (plain text, PDF, RTF style names).
//!
//! Each rule is a named pure function so it can be tested on its own. The
//! rules are deliberately loose; the notes on each function list where they
//! misfire.

use regex::Regex;
use std::sync::LazyLock;

/// Lines shorter than this (in characters) without a full stop read as titles.
pub const SHORT_TITLE_MAX_CHARS: usize = 50;

static CHAPTER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^第[一二三四五六七八九十\d]+章").unwrap());

static NUMBERED_PREFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[一二三四五六七八九十\d]+[、．.]").unwrap());

static ALNUM_PREFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\d]+[、．.]").unwrap());

static CHINESE_ENUM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[一二三四五六七八九十]+、").unwrap());

static BULLET_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[·•*-]\s").unwrap());

static NUMBERED_ITEM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.)]\s").unwrap());

static PAREN_ITEM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[（(]\d+[）)]\s").unwrap());

static HEADING_STYLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)heading|title|header|h[1-6]").unwrap());

static DIGIT_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d").unwrap());

/// `第N章` chapter markers.
pub fn is_chapter_marker(line: &str) -> bool {
    CHAPTER_REGEX.is_match(line)
}

/// `1.`, `一、`, `3．` style prefixes.
///
/// Also matches the start of ordinary sentences such as `3. 5 apples`, which
/// then render as headings.
pub fn has_numbered_prefix(line: &str) -> bool {
    NUMBERED_PREFIX_REGEX.is_match(line)
}

/// `A.`, `b、`, `2a.` style prefixes. Catches abbreviations like `e.g.` too.
pub fn has_alnum_prefix(line: &str) -> bool {
    ALNUM_PREFIX_REGEX.is_match(line)
}

/// `一、` … `十、` enumerations.
pub fn is_chinese_enumeration(line: &str) -> bool {
    CHINESE_ENUM_REGEX.is_match(line)
}

/// Short lines with no Chinese full stop.
///
/// This is the loosest rule: any short sentence in a Latin-script document
/// qualifies, so most short English lines become headings.
pub fn is_short_line(line: &str) -> bool {
    line.chars().count() < SHORT_TITLE_MAX_CHARS && !line.contains('。')
}

/// Whether a line reads as a section title.
pub fn is_text_title(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return false;
    }
    is_chapter_marker(line)
        || has_numbered_prefix(line)
        || has_alnum_prefix(line)
        || is_chinese_enumeration(line)
        || is_short_line(line)
}

/// Whether a line reads as a list item (`- x`, `• x`, `1. x`, `(2) x`).
///
/// A numbered item such as `1. x` also satisfies [`has_numbered_prefix`];
/// callers test titles first, so such lines render as titles.
pub fn is_list_item(line: &str) -> bool {
    let line = line.trim();
    BULLET_REGEX.is_match(line) || NUMBERED_ITEM_REGEX.is_match(line) || PAREN_ITEM_REGEX.is_match(line)
}

/// Heading level for a paragraph style name, or `None` for body styles.
///
/// Names matching `heading|title|header|h1..h6` are headings. The level is the
/// first digit in the name; without one, `subtitle` is 2, `title` is 1 and
/// everything else is 2. A style called `Header Row` therefore becomes a
/// level-2 heading.
pub fn heading_level_for_style(style: &str) -> Option<usize> {
    if !HEADING_STYLE_REGEX.is_match(style) {
        return None;
    }

    if let Some(digit) = DIGIT_REGEX.find(style) {
        let level: usize = digit.as_str().parse().unwrap_or(2);
        return Some(level.clamp(1, 6));
    }

    let lower = style.to_lowercase();
    if lower.contains("subtitle") {
        Some(2)
    } else if lower.contains("title") {
        Some(1)
    } else {
        Some(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chapter_marker() {
        assert!(is_chapter_marker("第三章 总结"));
        assert!(is_chapter_marker("第12章"));
        assert!(!is_chapter_marker("本章第三节"));
    }

    #[test]
    fn test_numbered_prefixes() {
        assert!(has_numbered_prefix("1. 引言"));
        assert!(has_numbered_prefix("二、方法"));
        assert!(has_numbered_prefix("3．结论"));
        assert!(!has_numbered_prefix("引言 1."));
    }

    #[test]
    fn test_alnum_prefix() {
        assert!(has_alnum_prefix("A. Background"));
        assert!(has_alnum_prefix("b、说明"));
        assert!(!has_alnum_prefix("(a) item"));
    }

    #[test]
    fn test_chinese_enumeration() {
        assert!(is_chinese_enumeration("四、附录"));
        assert!(!is_chinese_enumeration("4、附录"));
    }

    #[test]
    fn test_short_line_rule() {
        assert!(is_short_line("项目概述"));
        assert!(!is_short_line("这是一句话。"));
        assert!(!is_short_line(&"长".repeat(50)));
        assert!(is_short_line(&"长".repeat(49)));
    }

    #[test]
    fn test_is_text_title() {
        assert!(is_text_title("第一章 开始"));
        assert!(is_text_title("Overview"));
        assert!(!is_text_title(""));
        assert!(!is_text_title(
            "这是一个很长的段落，它包含了很多很多的文字，用来说明某个问题的具体细节，并且以句号结尾。"
        ));
    }

    #[test]
    fn test_is_list_item() {
        assert!(is_list_item("- apples"));
        assert!(is_list_item("• 苹果"));
        assert!(is_list_item("* item"));
        assert!(is_list_item("2) second"));
        assert!(is_list_item("（3） 第三"));
        assert!(is_list_item("(4) fourth"));
        assert!(!is_list_item("-nospace"));
        assert!(!is_list_item("plain text"));
    }

    #[test]
    fn test_heading_level_for_style() {
        assert_eq!(heading_level_for_style("heading 3"), Some(3));
        assert_eq!(heading_level_for_style("Title"), Some(1));
        assert_eq!(heading_level_for_style("Subtitle"), Some(2));
        assert_eq!(heading_level_for_style("Heading"), Some(2));
        assert_eq!(heading_level_for_style("Page Header"), Some(2));
        assert_eq!(heading_level_for_style("h5"), Some(5));
        assert_eq!(heading_level_for_style("Normal"), None);
        assert_eq!(heading_level_for_style("Body Text 2"), None);
    }
}
