//! CSV/TSV converter.

use chrono::Utc;
use docmd_core::markdown::{escape_cell, strip_extension, table, tidy};
use docmd_core::{ConversionResult, Converted, Converter, Metadata, Result, SourceFile};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

pub const FAILURE_PREFIX: &str = "CSV/TSV 转换失败";

static NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?([eE][+-]?\d+)?$").unwrap());

/// A typed field of a delimited record.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Bool(bool),
    Null,
    Text(String),
}

impl Token {
    /// Classify a raw field.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Token::Null;
        }
        if NUMBER_REGEX.is_match(raw) {
            if let Ok(n) = raw.parse::<f64>() {
                if n.is_finite() {
                    return Token::Number(n);
                }
            }
        }
        match raw {
            "true" | "TRUE" | "True" => Token::Bool(true),
            "false" | "FALSE" | "False" => Token::Bool(false),
            _ => Token::Text(raw.to_string()),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Token::Null => true,
            Token::Text(t) => t.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Token::Number(n) => write!(f, "{}", n),
            Token::Bool(b) => write!(f, "{}", b),
            Token::Null => Ok(()),
            Token::Text(t) => f.write_str(t),
        }
    }
}

/// Field delimiter for a file extension: tab for `tsv`, comma otherwise.
pub fn delimiter_for(extension: &str) -> u8 {
    if extension.eq_ignore_ascii_case("tsv") {
        b'\t'
    } else {
        b','
    }
}

/// Parse delimited text into typed rows.
///
/// Records that fail to parse are dropped and described in the returned
/// warnings.
pub fn parse_rows(text: &str, delimiter: u8) -> (Vec<Vec<Token>>, Vec<String>) {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    let mut warnings = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        match record {
            Ok(record) => {
                if record.len() == 1 && record[0].trim().is_empty() {
                    continue;
                }
                rows.push(record.iter().map(Token::parse).collect());
            }
            Err(e) => {
                log::warn!("Skipping malformed record {}: {}", idx + 1, e);
                warnings.push(format!("第 {} 条记录解析失败: {}", idx + 1, e));
            }
        }
    }

    (rows, warnings)
}

/// Every row has the same length and there is more than one row.
pub fn is_rectangular(rows: &[Vec<Token>]) -> bool {
    rows.len() > 1 && rows.iter().all(|r| r.len() == rows[0].len())
}

fn render_table(rows: &[Vec<Token>]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|r| r.iter().map(Token::to_string).collect())
        .collect();
    table(&cells)
}

fn render_list(rows: &[Vec<Token>]) -> String {
    let mut out = String::new();

    for (idx, row) in rows.iter().enumerate() {
        if row.len() == 1 {
            out.push_str(&format!("- {}\n", escape_cell(&row[0].to_string())));
            continue;
        }

        out.push_str(&format!("## 行 {}\n\n", idx + 1));
        for (col, cell) in row.iter().enumerate() {
            if !cell.is_blank() {
                out.push_str(&format!(
                    "- **列 {}**: {}\n",
                    col + 1,
                    escape_cell(&cell.to_string())
                ));
            }
        }
        out.push('\n');
    }

    out
}

/// Render parsed rows under a `# title` heading.
pub fn rows_to_markdown(rows: &[Vec<Token>], title: &str) -> String {
    let body = if rows.is_empty() {
        "*空文件*".to_string()
    } else if is_rectangular(rows) {
        render_table(rows)
    } else {
        render_list(rows)
    };

    tidy(&format!("# {}\n\n{}", title, body))
}

/// Converter for `.csv` and `.tsv` files.
pub struct DelimitedConverter;

impl DelimitedConverter {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, file: &dyn SourceFile) -> Result<Converted> {
        let text = file.read_text()?;
        let delimiter = delimiter_for(&file.extension());
        let (rows, warnings) = parse_rows(&text, delimiter);

        log::debug!("Parsed {} rows from {}", rows.len(), file.name());

        let title = strip_extension(file.name(), &["csv", "tsv"]);
        let markdown = rows_to_markdown(&rows, &title);

        let mut metadata = Metadata::new();
        metadata.insert("rows".into(), Value::from(rows.len()));
        metadata.insert(
            "columns".into(),
            Value::from(rows.first().map_or(0, Vec::len)),
        );
        metadata.insert(
            "delimiter".into(),
            Value::from(if delimiter == b'\t' { "Tab" } else { "Comma" }),
        );

        Ok(Converted::new(markdown, metadata).with_warnings(warnings))
    }
}

impl Default for DelimitedConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for DelimitedConverter {
    fn convert(&self, file: &dyn SourceFile) -> ConversionResult {
        let converted_at = Utc::now();
        ConversionResult::from_outcome(file.name(), converted_at, FAILURE_PREFIX, self.run(file))
    }
}
