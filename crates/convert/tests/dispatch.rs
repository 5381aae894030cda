use chrono::{DateTime, Utc};
use docmd::{convert, convert_file, Error, MemoryFile, SourceFile};
use pretty_assertions::assert_eq;
use std::io;

/// A file whose content can never be read.
struct Unreadable;

impl SourceFile for Unreadable {
    fn name(&self) -> &str {
        "locked.txt"
    }

    fn size(&self) -> u64 {
        0
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn read_bytes(&self) -> io::Result<Vec<u8>> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
    }
}

#[test]
fn test_unknown_extension_is_an_error() {
    let file = MemoryFile::new("notes.xyz", "hello");
    match convert_file(&file) {
        Err(Error::UnsupportedFormat(ext)) => assert_eq!(ext, "xyz"),
        other => panic!("expected UnsupportedFormat, got {:?}", other),
    }
}

#[test]
fn test_declared_type_overrides_name() {
    let file = MemoryFile::new("upload.bin", "a,b\n1,2");
    assert!(convert(&file, ".CSV").unwrap().is_success());
    assert!(convert(&file, "bin").is_err());
}

#[test]
fn test_csv_table() {
    let result = convert_file(&MemoryFile::new("data.csv", "a,b\n1,2")).unwrap();
    assert!(result.is_success());
    assert!(result
        .markdown()
        .unwrap()
        .contains("| a | b |\n| --- | --- |\n| 1 | 2 |"));
}

#[test]
fn test_html_heading_and_paragraph() {
    let result = convert_file(&MemoryFile::new("page.html", "<h1>T</h1><p>x</p>")).unwrap();
    assert_eq!(result.markdown(), Some("# T\n\nx"));
}

#[test]
fn test_legacy_ppt_notice() {
    let file = MemoryFile::new("talk.ppt", vec![0u8; 5120]);
    let result = convert_file(&file).unwrap();

    assert!(result.is_success());
    let markdown = result.markdown().unwrap();
    assert!(markdown.contains("talk.ppt"));
    assert!(markdown.contains("5.00 KB"));
    assert_eq!(result.metadata()["warning"], "旧版 PPT 格式支持有限");
}

#[test]
fn test_read_failure_is_reported_in_result() {
    let result = convert_file(&Unreadable).unwrap();
    assert!(!result.is_success());
    assert_eq!(result.error(), Some("文件读取失败: denied"));
    assert_eq!(result.original_name(), "locked.txt");
}

#[test]
fn test_parse_failure_carries_converter_prefix() {
    let result = convert_file(&MemoryFile::new("broken.xlsx", "not a workbook")).unwrap();
    assert!(!result.is_success());
    assert!(result.error().unwrap().starts_with("Excel转换失败: "));
}

#[test]
fn test_result_json_shape() {
    let result = convert_file(&MemoryFile::new("a.txt", "hello")).unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["originalName"], "a.txt");
    assert!(json["markdown"].is_string());
    assert!(json["convertedAt"].is_string());
    assert!(json.get("error").is_none());
}
