//! Excel workbook converter (xls/xlsx).

use calamine::{open_workbook_auto_from_rs, Data, DataType, Range, Reader};
use chrono::Utc;
use docmd_core::markdown::{banner_time, escape_cell, strip_extension, table, tidy, truncate_chars};
use docmd_core::{ConversionResult, Converted, Converter, Error, Metadata, Result, SourceFile};
use serde_json::{json, Value};
use std::io::Cursor;

pub const FAILURE_PREFIX: &str = "Excel转换失败";

/// Maximum number of data rows rendered per sheet.
pub const MAX_ROWS_PER_SHEET: usize = 1000;

/// Maximum characters kept per rendered cell.
pub const MAX_CELL_CHARS: usize = 100;

/// Sheets with more data rows than this get a row-count footer.
const STATS_FOOTER_MIN_ROWS: usize = 10;

/// One worksheet reduced to display strings.
///
/// Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetModel {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Display string for a cell value.
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_number(*f),
        Data::String(s) => s.trim().to_string(),
        Data::Bool(b) => if *b { "是" } else { "否" }.to_string(),
        Data::DateTime(_) => cell
            .as_datetime()
            .map(|dt| dt.format("%Y/%-m/%-d").to_string())
            .unwrap_or_else(|| cell.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Error(e) => format!("#错误: {}", e),
    }
}

/// Integers without decimals, everything else to two places with trailing
/// zeros trimmed.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let fixed = format!("{:.2}", value);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Build the sheet model from an occupied range. Returns `None` for an empty
/// range.
///
/// The first row of the range supplies the column names; remaining rows with
/// at least one non-empty cell become data rows.
pub fn sheet_from_range(name: &str, range: &Range<Data>) -> Option<SheetModel> {
    let (start, end) = match (range.start(), range.end()) {
        (Some(start), Some(end)) if !range.is_empty() => (start, end),
        _ => return None,
    };

    let value_at = |row: u32, col: u32| {
        range
            .get_value((row, col))
            .map(cell_to_string)
            .unwrap_or_default()
    };

    let columns = (start.1..=end.1)
        .map(|col| {
            let header = value_at(start.0, col);
            if header.is_empty() {
                format!("列{}", col + 1)
            } else {
                header
            }
        })
        .collect();

    let rows = (start.0 + 1..=end.0)
        .map(|row| (start.1..=end.1).map(|col| value_at(row, col)).collect::<Vec<_>>())
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .collect();

    Some(SheetModel {
        name: name.to_string(),
        columns,
        rows,
    })
}

fn display_cell(value: &str) -> String {
    truncate_chars(&escape_cell(value), MAX_CELL_CHARS)
}

/// Render one sheet's table, truncation notice and statistics footer.
pub fn render_sheet(sheet: &SheetModel) -> String {
    if sheet.rows.is_empty() {
        return "> 此工作表无数据\n".to_string();
    }

    let shown = sheet.rows.len().min(MAX_ROWS_PER_SHEET);
    let mut grid = Vec::with_capacity(shown + 1);
    grid.push(sheet.columns.iter().map(|c| display_cell(c)).collect());
    grid.extend(
        sheet.rows[..shown]
            .iter()
            .map(|row| row.iter().map(|c| display_cell(c)).collect::<Vec<_>>()),
    );

    let mut out = table(&grid);

    if sheet.rows.len() > MAX_ROWS_PER_SHEET {
        out.push_str(&format!(
            "\n> ⚠️ 数据较多，仅显示前 {} 行，完整数据请查看原始Excel文件\n",
            MAX_ROWS_PER_SHEET
        ));
    }

    if sheet.rows.len() > STATS_FOOTER_MIN_ROWS {
        out.push_str(&format!("\n> 📈 数据统计: 共 {} 行数据\n", sheet.rows.len()));
    }

    out
}

/// Assemble the workbook document.
pub fn workbook_to_markdown(title: &str, sheets: &[SheetModel], timestamp: &str) -> String {
    let total_rows: usize = sheets.iter().map(|s| s.rows.len()).sum();
    let mut md = format!("# {}\n\n", title);
    md.push_str(&format!(
        "> 📊 Excel文档转换 | {} 个工作表 | {} 行数据 | 转换时间: {}\n\n",
        sheets.len(),
        total_rows,
        timestamp
    ));

    let multi = sheets.len() > 1;
    if multi {
        md.push_str("## 工作表概览\n\n");
        for sheet in sheets {
            md.push_str(&format!(
                "- **{}**: {} 行 × {} 列\n",
                sheet.name,
                sheet.rows.len(),
                sheet.columns.len()
            ));
        }
        md.push('\n');
    }

    for sheet in sheets {
        if multi {
            md.push_str(&format!("## {}\n\n", sheet.name));
        }
        md.push_str(&render_sheet(sheet));
        md.push('\n');
    }

    tidy(&md)
}

/// Converter for `.xls` and `.xlsx` workbooks.
pub struct SpreadsheetConverter;

impl SpreadsheetConverter {
    pub fn new() -> Self {
        Self
    }

    /// Read every non-empty sheet of a workbook held in memory.
    pub fn read_sheets(&self, bytes: Vec<u8>) -> Result<Vec<SheetModel>> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| Error::Spreadsheet(format!("Failed to open workbook: {}", e)))?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names().to_owned() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| Error::Spreadsheet(format!("Failed to read sheet '{}': {}", name, e)))?;

            match sheet_from_range(&name, &range) {
                Some(sheet) => sheets.push(sheet),
                None => log::debug!("Skipping empty sheet '{}'", name),
            }
        }

        Ok(sheets)
    }

    fn run(&self, file: &dyn SourceFile, converted_at: &str) -> Result<Converted> {
        let sheets = self.read_sheets(file.read_bytes()?)?;
        let title = strip_extension(file.name(), &["xls", "xlsx"]);
        let markdown = workbook_to_markdown(&title, &sheets, converted_at);

        let total_rows: usize = sheets.iter().map(|s| s.rows.len()).sum();
        let total_cells: usize = sheets.iter().map(|s| s.rows.len() * s.columns.len()).sum();
        let sheet_info: Vec<Value> = sheets
            .iter()
            .map(|s| json!({ "name": s.name, "rows": s.rows.len(), "columns": s.columns.len() }))
            .collect();

        let mut metadata = Metadata::new();
        metadata.insert("title".into(), Value::from(title));
        metadata.insert("sheets".into(), Value::from(sheet_info));
        metadata.insert("totalRows".into(), Value::from(total_rows));
        metadata.insert("totalCells".into(), Value::from(total_cells));
        metadata.insert("size".into(), Value::from(file.size()));

        Ok(Converted::new(markdown, metadata))
    }
}

impl Default for SpreadsheetConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for SpreadsheetConverter {
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

    fn sheet(name: &str, columns: &[&str], rows: usize) -> SheetModel {
        SheetModel {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: (0..rows)
                .map(|i| columns.iter().map(|_| i.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(2.345), "2.35");
        assert_eq!(format_number(0.1), "0.1");
        assert_eq!(format_number(-7.0), "-7");
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&Data::Bool(true)), "是");
        assert_eq!(cell_to_string(&Data::Bool(false)), "否");
        assert_eq!(cell_to_string(&Data::Int(12)), "12");
        assert_eq!(cell_to_string(&Data::String("  x ".to_string())), "x");
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert!(cell_to_string(&Data::Error(calamine::CellErrorType::Div0)).starts_with("#错误: "));
    }

    #[test]
    fn test_sheet_from_range_builds_padded_rows() {
        let mut range = Range::new((1, 1), (4, 3));
        range.set_value((1, 1), Data::String("Name".to_string()));
        range.set_value((1, 3), Data::String("Score".to_string()));
        range.set_value((2, 1), Data::String("Ann".to_string()));
        range.set_value((2, 3), Data::Float(9.5));
        range.set_value((4, 2), Data::Bool(true));

        let sheet = sheet_from_range("S", &range).unwrap();
        assert_eq!(sheet.columns, ["Name", "列3", "Score"]);
        assert_eq!(
            sheet.rows,
            vec![
                vec!["Ann".to_string(), String::new(), "9.5".to_string()],
                vec![String::new(), "是".to_string(), String::new()],
            ]
        );
    }

    #[test]
    fn test_sheet_from_empty_range() {
        let range: Range<Data> = Range::empty();
        assert!(sheet_from_range("blank", &range).is_none());
    }

    #[test]
    fn test_render_sheet_without_data() {
        assert_eq!(render_sheet(&sheet("S", &["a"], 0)), "> 此工作表无数据\n");
    }

    #[test]
    fn test_truncates_to_max_rows() {
        let big = sheet("S", &["n"], MAX_ROWS_PER_SHEET + 5);
        let out = render_sheet(&big);
        let data_rows = out.lines().filter(|l| l.starts_with("| ")).count() - 2;
        assert_eq!(data_rows, MAX_ROWS_PER_SHEET);
        assert!(out.contains("仅显示前 1000 行"));
        assert!(out.contains("共 1005 行数据"));
    }

    #[test]
    fn test_no_truncation_notice_at_limit() {
        let out = render_sheet(&sheet("S", &["n"], MAX_ROWS_PER_SHEET));
        assert!(!out.contains("仅显示前"));
    }

    #[test]
    fn test_long_cells_are_truncated() {
        let mut s = sheet("S", &["c"], 1);
        s.rows[0][0] = "x".repeat(150);
        let out = render_sheet(&s);
        assert!(out.contains(&format!("| {} |", "x".repeat(MAX_CELL_CHARS))));
        assert!(!out.contains(&"x".repeat(MAX_CELL_CHARS + 1)));
    }

    #[test]
    fn test_multi_sheet_overview() {
        let sheets = vec![sheet("One", &["a", "b"], 2), sheet("Two", &["c"], 1)];
        let md = workbook_to_markdown("Book", &sheets, "2024/01/01 00:00:00");
        assert_eq!(
            md,
            "# Book\n\n\
             > 📊 Excel文档转换 | 2 个工作表 | 3 行数据 | 转换时间: 2024/01/01 00:00:00\n\n\
             ## 工作表概览\n\n\
             - **One**: 2 行 × 2 列\n\
             - **Two**: 1 行 × 1 列\n\n\
             ## One\n\n\
             | a | b |\n| --- | --- |\n| 0 | 0 |\n| 1 | 1 |\n\n\
             ## Two\n\n\
             | c |\n| --- |\n| 0 |"
        );
    }

    #[test]
    fn test_single_sheet_has_no_overview() {
        let md = workbook_to_markdown("Book", &[sheet("Only", &["a"], 1)], "t");
        assert!(!md.contains("工作表概览"));
        assert!(!md.contains("## Only"));
    }

    #[test]
    fn test_invalid_workbook_fails_with_prefix() {
        let file = MemoryFile::new("broken.xlsx", b"definitely not a workbook".to_vec());
        let result = SpreadsheetConverter::new().convert(&file);
        assert!(!result.is_success());
        assert!(result.error().unwrap().starts_with("Excel转换失败: "));
    }
}
