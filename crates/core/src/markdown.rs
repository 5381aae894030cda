//! Markdown emission kit shared by every converter.
//!
//! Cell escaping, table building, heading formatting and the `tidy`
//! whitespace pass. All functions are pure and `tidy`/`escape_cell` are
//! idempotent, so converters may apply them to already-processed text.

use chrono::{DateTime, Local, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// Matches an ATX heading line.
static HEADING_LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6} ").unwrap());

/// Runs of line-break characters inside a table cell.
static CELL_BREAK_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\r\n]+").unwrap());

/// Escape a value for use inside a Markdown table cell.
///
/// Line breaks collapse to a single space, unescaped pipes become `\|`, and
/// the value is trimmed. An empty cell becomes a single space so the row
/// keeps its shape.
pub fn escape_cell(value: &str) -> String {
    let flattened = CELL_BREAK_REGEX.replace_all(value, " ");
    let mut out = String::with_capacity(flattened.len());
    let mut prev = None;
    for c in flattened.trim().chars() {
        if c == '|' && prev != Some('\\') {
            out.push('\\');
        }
        out.push(c);
        prev = Some(c);
    }

    if out.is_empty() {
        " ".to_string()
    } else {
        out
    }
}

/// Build one table row, escaping each cell.
pub fn table_row<S: AsRef<str>>(cells: &[S]) -> String {
    let cells: Vec<String> = cells.iter().map(|c| escape_cell(c.as_ref())).collect();
    format!("| {} |", cells.join(" | "))
}

/// The header separator row for a table with `columns` columns.
pub fn separator_row(columns: usize) -> String {
    format!("| {} |", vec!["---"; columns.max(1)].join(" | "))
}

/// Render rows as a table whose first row is the header.
///
/// Rows shorter than the widest row are padded with empty cells. Returns an
/// empty string when there is nothing to render.
pub fn table(rows: &[Vec<String>]) -> String {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return String::new();
    }

    let mut out = String::new();
    for (idx, row) in rows.iter().enumerate() {
        let mut cells = row.clone();
        cells.resize(width, String::new());
        out.push_str(&table_row(&cells));
        out.push('\n');
        if idx == 0 {
            out.push_str(&separator_row(width));
            out.push('\n');
        }
    }
    out
}

/// Format an ATX heading. The level is clamped to 1..=6.
pub fn heading(level: usize, text: &str) -> String {
    format!("{} {}", "#".repeat(level.clamp(1, 6)), text.trim())
}

/// Whether a line is an ATX heading.
pub fn is_heading_line(line: &str) -> bool {
    HEADING_LINE_REGEX.is_match(line)
}

fn is_fence_line(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

/// Normalize whitespace and blank lines.
///
/// - trailing whitespace is trimmed from every line;
/// - headings and fenced code blocks get a blank line on each side;
/// - runs of blank lines outside code fences collapse to one;
/// - leading and trailing blank lines are removed.
///
/// Lines inside a fence are otherwise left alone.
pub fn tidy(markdown: &str) -> String {
    let text = markdown.replace("\r\n", "\n").replace('\r', "\n");
    let mut out: Vec<&str> = Vec::new();
    let mut in_fence = false;

    fn blank(out: &mut Vec<&str>) {
        if out.last().is_some_and(|l| !l.is_empty()) {
            out.push("");
        }
    }

    for raw in text.lines() {
        let line = raw.trim_end();

        if is_fence_line(line) {
            if in_fence {
                out.push(line);
                out.push("");
            } else {
                blank(&mut out);
                out.push(line);
            }
            in_fence = !in_fence;
            continue;
        }

        if in_fence {
            out.push(line);
        } else if line.is_empty() {
            blank(&mut out);
        } else if is_heading_line(line) {
            blank(&mut out);
            out.push(line);
            out.push("");
        } else {
            out.push(line);
        }
    }

    let start = out.iter().position(|l| !l.is_empty()).unwrap_or(out.len());
    let end = out.iter().rposition(|l| !l.is_empty()).map_or(start, |i| i + 1);
    out[start..end].join("\n")
}

/// Remove one of `extensions` (case-insensitive, without the dot) from the
/// end of a file name.
pub fn strip_extension(file_name: &str, extensions: &[&str]) -> String {
    if let Some((stem, ext)) = file_name.rsplit_once('.') {
        if extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
            return stem.to_string();
        }
    }
    file_name.to_string()
}

/// Truncate to at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Local wall-clock time for document banners.
pub fn banner_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y/%m/%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_cell_pipes_and_newlines() {
        assert_eq!(escape_cell("a|b"), "a\\|b");
        assert_eq!(escape_cell("line one\nline two"), "line one line two");
        assert_eq!(escape_cell("a\r\n\r\nb"), "a b");
        assert_eq!(escape_cell("  padded  "), "padded");
    }

    #[test]
    fn test_escape_cell_is_idempotent() {
        for input in ["a|b", "x\n|y", "\\|", "", "||", "plain"] {
            let once = escape_cell(input);
            assert_eq!(escape_cell(&once), once, "input {:?}", input);
        }
    }

    #[test]
    fn test_escape_cell_empty_keeps_shape() {
        assert_eq!(escape_cell(""), " ");
        assert_eq!(escape_cell("   "), " ");
    }

    #[test]
    fn test_table_pads_short_rows() {
        let rows = vec![
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            vec!["1".to_string()],
        ];
        assert_eq!(
            table(&rows),
            "| a | b | c |\n| --- | --- | --- |\n| 1 |   |   |\n"
        );
    }

    #[test]
    fn test_table_empty() {
        assert_eq!(table(&[]), "");
        assert_eq!(table(&[Vec::new()]), "");
    }

    #[test]
    fn test_heading_clamps_level() {
        assert_eq!(heading(0, "x"), "# x");
        assert_eq!(heading(3, " y "), "### y");
        assert_eq!(heading(9, "z"), "###### z");
    }

    #[test]
    fn test_tidy_collapses_blank_lines() {
        assert_eq!(tidy("a\n\n\n\nb  \n"), "a\n\nb");
    }

    #[test]
    fn test_tidy_surrounds_headings() {
        assert_eq!(tidy("text\n## Title\nmore"), "text\n\n## Title\n\nmore");
    }

    #[test]
    fn test_tidy_surrounds_fences_and_keeps_their_body() {
        let input = "before\n```rust\nfn main() {}\n\n\n}\n```\nafter";
        assert_eq!(
            tidy(input),
            "before\n\n```rust\nfn main() {}\n\n\n}\n```\n\nafter"
        );
    }

    #[test]
    fn test_tidy_is_idempotent() {
        let samples = [
            "\n\n# T\nx\n\n\n\n- a\n- b\n```\ncode  \n```\ntail   ",
            "| a | b |\n| --- | --- |\n\n\n## h\n",
            "```\nunterminated\n\n\n",
            "",
        ];
        for sample in samples {
            let once = tidy(sample);
            assert_eq!(tidy(&once), once);
        }
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("Report.XLSX", &["xls", "xlsx"]), "Report");
        assert_eq!(strip_extension("page.html", &["pdf"]), "page.html");
        assert_eq!(strip_extension("noext", &["txt"]), "noext");
    }

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("数据表格", 2), "数据");
        assert_eq!(truncate_chars("ab", 5), "ab");
    }
}
