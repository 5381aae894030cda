//! Advisory notice for legacy binary `.ppt` files.

use docmd_core::markdown::{banner_time, strip_extension};
use docmd_core::{Converted, Metadata, SourceFile};
use serde_json::Value;

pub const LEGACY_WARNING: &str = "旧版 PPT 格式支持有限";

/// Build the notice for a `.ppt` file. The content is never read.
pub fn legacy_notice(file: &dyn SourceFile) -> Converted {
    let modified = file
        .last_modified()
        .map(banner_time)
        .unwrap_or_else(|| "未知".to_string());

    let markdown = format!(
        "# {title}\n\n\
         > ⚠️ 注意：旧版 PPT 格式（.ppt）的转换支持有限。建议将文件另存为 PPTX 格式以获得更好的转换效果。\n\n\
         **文件信息**:\n\
         - 文件名: {name}\n\
         - 文件大小: {size:.2} KB\n\
         - 最后修改: {modified}\n\n\
         ---\n\n\
         由于 PPT 文件使用专有的二进制格式，无法直接提取内容。请考虑：\n\n\
         1. 在 PowerPoint 中打开文件\n\
         2. 另存为 PPTX 格式\n\
         3. 重新上传 PPTX 文件进行转换",
        title = strip_extension(file.name(), &["ppt"]),
        name = file.name(),
        size = file.size() as f64 / 1024.0,
        modified = modified,
    );

    let mut metadata = Metadata::new();
    metadata.insert("warning".into(), Value::from(LEGACY_WARNING));
    Converted::new(markdown, metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmd_core::MemoryFile;

    #[test]
    fn test_notice_names_file_and_size() {
        let file = MemoryFile::new("slides.ppt", vec![0u8; 2048]);
        let converted = legacy_notice(&file);
        let markdown = &converted.markdown;

        assert!(markdown.starts_with("# slides\n\n> ⚠️ 注意"));
        assert!(markdown.contains("- 文件名: slides.ppt\n"));
        assert!(markdown.contains("- 文件大小: 2.00 KB\n"));
        assert!(markdown.contains("- 最后修改: 未知\n"));
        assert!(markdown.ends_with("3. 重新上传 PPTX 文件进行转换"));
        assert_eq!(converted.metadata["warning"], LEGACY_WARNING);
    }
}
