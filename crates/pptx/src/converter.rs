//! Presentation converter for `.pptx` and `.ppt` files.

use crate::legacy::legacy_notice;
use crate::parser::{notes_path, parse_notes, parse_slide, slide_number, DocumentProperties, Slide};
use chrono::Utc;
use docmd_core::markdown::{strip_extension, tidy};
use docmd_core::{ConversionResult, Converted, Converter, Error, Metadata, Result, SourceFile};
use serde_json::Value;
use std::io::{Cursor, Read, Seek};
use zip::result::ZipError;
use zip::ZipArchive;

pub const FAILURE_PREFIX: &str = "PPT/PPTX 转换失败";

/// Placeholder line for a slide table.
pub const TABLE_PLACEHOLDER: &str = "[表格内容]";

const CORE_PROPERTIES_PART: &str = "docProps/core.xml";
const APP_PROPERTIES_PART: &str = "docProps/app.xml";

/// Converter for PowerPoint files.
pub struct PresentationConverter;

impl PresentationConverter {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, file: &dyn SourceFile) -> Result<Converted> {
        if file.extension() == "ppt" {
            log::debug!("{} is a legacy presentation, returning notice", file.name());
            return Ok(legacy_notice(file));
        }

        let bytes = file.read_bytes()?;
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::Zip(format!("Failed to open ZIP: {}", e)))?;

        let mut warnings = Vec::new();
        let properties = read_properties(&mut archive, &mut warnings);
        let slides = read_slides(&mut archive, &mut warnings)?;
        log::debug!("{}: {} slides", file.name(), slides.len());

        let title = properties
            .title
            .clone()
            .unwrap_or_else(|| strip_extension(file.name(), &["pptx", "ppt"]));
        let markdown = render_presentation(&title, &properties, &slides);

        let mut metadata = Metadata::new();
        metadata.insert("slideCount".into(), Value::from(slides.len()));
        metadata.insert("title".into(), Value::from(title));
        metadata.insert("declaredSlideCount".into(), Value::from(properties.declared_slides));
        metadata.insert("author".into(), Value::from(properties.author));
        metadata.insert("subject".into(), Value::from(properties.subject));

        Ok(Converted::new(markdown, metadata).with_warnings(warnings))
    }
}

impl Default for PresentationConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for PresentationConverter {
    fn convert(&self, file: &dyn SourceFile) -> ConversionResult {
        let converted_at = Utc::now();
        ConversionResult::from_outcome(file.name(), converted_at, FAILURE_PREFIX, self.run(file))
    }
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(path) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(Error::Zip(format!("Failed to open '{}': {}", path, e))),
    };

    let mut content = Vec::new();
    file.read_to_end(&mut content)
        .map_err(|e| Error::Zip(format!("Failed to read '{}': {}", path, e)))?;
    Ok(Some(String::from_utf8_lossy(&content).into_owned()))
}

/// Best-effort property lookup; every gap becomes a warning.
fn read_properties<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    warnings: &mut Vec<String>,
) -> DocumentProperties {
    let mut properties = DocumentProperties::default();

    match read_part(archive, CORE_PROPERTIES_PART).and_then(|xml| match xml {
        Some(xml) => properties.read_core(&xml).map(|_| true),
        None => Ok(false),
    }) {
        Ok(true) => {
            if properties.author.is_none() {
                warnings.push("未找到作者信息".to_string());
            }
            if properties.subject.is_none() {
                warnings.push("未找到主题信息".to_string());
            }
        }
        Ok(false) => warnings.push(format!("缺少文档属性: {}", CORE_PROPERTIES_PART)),
        Err(e) => {
            log::warn!("Ignoring unreadable {}: {}", CORE_PROPERTIES_PART, e);
            warnings.push(format!("无法读取文档属性: {}", e));
        }
    }

    let app = read_part(archive, APP_PROPERTIES_PART)
        .and_then(|xml| xml.map_or(Ok(()), |xml| properties.read_app(&xml)));
    if let Err(e) = app {
        log::warn!("Ignoring unreadable {}: {}", APP_PROPERTIES_PART, e);
    }

    properties
}

fn read_slides<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    warnings: &mut Vec<String>,
) -> Result<Vec<Slide>> {
    let mut parts: Vec<(usize, String)> = archive
        .file_names()
        .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
        .collect();
    parts.sort();

    let mut slides = Vec::with_capacity(parts.len());
    for (number, path) in parts {
        let xml = read_part(archive, &path)?.unwrap_or_default();
        let mut slide = parse_slide(&xml, number)?;

        let notes = notes_path(&path);
        match read_part(archive, &notes).and_then(|xml| xml.map_or(Ok(None), |x| parse_notes(&x))) {
            Ok(text) => slide.notes = text,
            Err(e) => warnings.push(format!("幻灯片 {} 的备注无法读取: {}", number, e)),
        }

        slides.push(slide);
    }

    Ok(slides)
}

/// Render the document header and every slide.
pub fn render_presentation(title: &str, properties: &DocumentProperties, slides: &[Slide]) -> String {
    let mut blocks = vec![format!("# {}", title)];
    if let Some(author) = &properties.author {
        blocks.push(format!("**作者**: {}", author));
    }
    if let Some(subject) = &properties.subject {
        blocks.push(format!("**主题**: {}", subject));
    }
    blocks.push("---".to_string());

    for (idx, slide) in slides.iter().enumerate() {
        if idx > 0 {
            blocks.push("---".to_string());
        }
        blocks.extend(slide_blocks(slide));
    }

    tidy(&blocks.join("\n\n"))
}

fn slide_blocks(slide: &Slide) -> Vec<String> {
    let mut blocks = vec![match &slide.title {
        Some(title) => format!("## 幻灯片 {}: {}", slide.number, title),
        None => format!("## 幻灯片 {}", slide.number),
    }];

    let mut list: Vec<String> = Vec::new();
    for paragraph in &slide.content {
        if paragraph.bulleted {
            list.push(format!("- {}", paragraph.text));
            continue;
        }
        if !list.is_empty() {
            blocks.push(std::mem::take(&mut list).join("\n"));
        }
        blocks.push(paragraph.text.clone());
    }
    if !list.is_empty() {
        blocks.push(list.join("\n"));
    }

    blocks.extend((0..slide.table_count).map(|_| TABLE_PLACEHOLDER.to_string()));

    if let Some(notes) = &slide.notes {
        let quoted: Vec<String> = notes.lines().map(|line| format!("> {}", line)).collect();
        blocks.push(format!("**演讲者备注**:\n{}", quoted.join("\n")));
    }

    blocks
}
