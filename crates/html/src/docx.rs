//! DOCX reader.
//!
//! `word/document.xml` is streamed once and rewritten as simple HTML
//! (headings, paragraphs, lists, tables, links, inline emphasis and images as
//! data URIs), which the Word converter then renders like any web page.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use docmd_core::{Error, Result};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::sync::LazyLock;
use zip::result::ZipError;
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
const RELATIONSHIPS_PART: &str = "word/_rels/document.xml.rels";

static HEADING_STYLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^heading\s*([1-6])$").unwrap());

/// Paragraph styles that carry no structure of their own.
const PLAIN_STYLES: &[&str] = &[
    "normal",
    "list paragraph",
    "listparagraph",
    "body text",
    "bodytext",
    "no spacing",
    "nospacing",
];

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().position(|&b| b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// Value of the attribute whose local name is `key`.
fn attr_value(reader: &Reader<&[u8]>, element: &BytesStart, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .with_checks(false)
        .flatten()
        .find(|attr| local_name(attr.key.as_ref()) == key)
        .and_then(|attr| attr.decode_and_unescape_value(reader).ok())
        .map(|v| v.into_owned())
}

/// Whether a toggle property such as `<w:b/>` or `<w:u w:val="single"/>` is on.
fn toggle_on(reader: &Reader<&[u8]>, element: &BytesStart) -> bool {
    attr_value(reader, element, b"val")
        .map_or(true, |v| !matches!(v.as_str(), "false" | "0" | "off" | "none"))
}

/// Read a part, or `None` if the package has no such entry.
fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<Option<Vec<u8>>> {
    let mut file = match archive.by_name(path) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(Error::Zip(format!("Failed to open '{}': {}", path, e))),
    };

    let mut content = Vec::new();
    file.read_to_end(&mut content)
        .map_err(|e| Error::Zip(format!("Failed to read '{}': {}", path, e)))?;
    Ok(Some(content))
}

fn read_xml_part<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<Option<String>> {
    Ok(read_part(archive, path)?.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
}

/// Map style ids to their display names.
pub fn read_style_names(xml: &str) -> HashMap<String, String> {
    let mut names = HashMap::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut current_id: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"style" => current_id = attr_value(&reader, e, b"styleId"),
                b"name" => {
                    if let (Some(id), Some(name)) = (&current_id, attr_value(&reader, e, b"val")) {
                        names.insert(id.clone(), name);
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) if local_name(e.name().as_ref()) == b"style" => current_id = None,
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("Stopping at malformed styles part: {}", e);
                break;
            }
            _ => {}
        }
    }

    names
}

/// Map relationship ids to their targets.
pub fn read_relationships(xml: &str) -> HashMap<String, String> {
    let mut targets = HashMap::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                if let (Some(id), Some(target)) =
                    (attr_value(&reader, e, b"Id"), attr_value(&reader, e, b"Target"))
                {
                    targets.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("Stopping at malformed relationships part: {}", e);
                break;
            }
            _ => {}
        }
    }

    targets
}

/// Resolve a relationship target against the `word/` directory.
pub fn resolve_target(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut parts = vec!["word"];
    for segment in target.split('/') {
        match segment {
            ".." => {
                parts.pop();
            }
            "" | "." => {}
            s => parts.push(s),
        }
    }
    parts.join("/")
}

/// MIME type for an embedded image part.
pub fn image_mime(path: &str) -> &'static str {
    let ext = path.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("svg") => "image/svg+xml",
        Some("emf") => "image/x-emf",
        Some("wmf") => "image/x-wmf",
        _ => "application/octet-stream",
    }
}

/// Block tag for a paragraph style name, if it is structural.
fn heading_tag(style_name: &str) -> Option<String> {
    let name = style_name.trim().to_lowercase();
    if let Some(caps) = HEADING_STYLE_REGEX.captures(&name) {
        return Some(format!("h{}", &caps[1]));
    }
    match name.as_str() {
        "title" => Some("h1".to_string()),
        "subtitle" => Some("h2".to_string()),
        _ => None,
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct RunFormat {
    bold: bool,
    italic: bool,
    underline: bool,
    strike: bool,
}

impl RunFormat {
    fn wrap(&self, html: &str) -> String {
        let mut out = html.to_string();
        if self.underline {
            out = format!("<u>{}</u>", out);
        }
        if self.strike {
            out = format!("<s>{}</s>", out);
        }
        if self.italic {
            out = format!("<em>{}</em>", out);
        }
        if self.bold {
            out = format!("<strong>{}</strong>", out);
        }
        out
    }
}

#[derive(Debug, Default)]
struct Paragraph {
    style_id: Option<String>,
    numbered: bool,
    html: String,
}

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: Option<String>,
}

impl Table {
    fn flattened(&self) -> String {
        self.rows
            .iter()
            .flatten()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn to_html(&self) -> String {
        let mut html = String::from("<table>");
        for row in &self.rows {
            html.push_str("<tr>");
            for cell in row {
                html.push_str(&format!("<td>{}</td>", cell.trim()));
            }
            html.push_str("</tr>");
        }
        html.push_str("</table>");
        html
    }
}

fn append_to_cell(cell: &mut String, html: &str) {
    if !cell.is_empty() {
        cell.push(' ');
    }
    cell.push_str(html);
}

/// Streaming state while walking `document.xml`.
struct DocumentWriter<'a, R: Read + Seek> {
    archive: &'a mut ZipArchive<R>,
    styles: HashMap<String, String>,
    relationships: HashMap<String, String>,
    out: String,
    warnings: Vec<String>,
    list_open: bool,
    paragraph_depth: usize,
    paragraph: Option<Paragraph>,
    in_paragraph_props: bool,
    in_run_props: bool,
    in_text: bool,
    run: RunFormat,
    run_html: String,
    links: Vec<bool>,
    tables: Vec<Table>,
    image_alt: Option<String>,
}

impl<'a, R: Read + Seek> DocumentWriter<'a, R> {
    fn warn(&mut self, message: String) {
        if !self.warnings.contains(&message) {
            log::warn!("{}", message);
            self.warnings.push(message);
        }
    }

    fn close_list(&mut self) {
        if self.list_open {
            self.out.push_str("</ul>");
            self.list_open = false;
        }
    }

    fn push_inline(&mut self, html: &str) {
        if let Some(paragraph) = self.paragraph.as_mut() {
            paragraph.html.push_str(html);
        }
    }

    fn style_name(&self, style_id: &str) -> String {
        self.styles
            .get(style_id)
            .cloned()
            .unwrap_or_else(|| style_id.to_string())
    }

    fn end_paragraph(&mut self) {
        let Some(paragraph) = self.paragraph.take() else {
            return;
        };
        let body = paragraph.html.trim();
        if body.is_empty() {
            return;
        }

        if let Some(table) = self.tables.last_mut() {
            if let Some(cell) = table.cell.as_mut() {
                append_to_cell(cell, body);
                return;
            }
        }

        let style_name = paragraph.style_id.as_deref().map(|id| self.style_name(id));
        let tag = style_name.as_deref().and_then(heading_tag);

        if let (None, Some(name)) = (&tag, &style_name) {
            if !PLAIN_STYLES.contains(&name.trim().to_lowercase().as_str()) {
                self.warn(format!("未识别的段落样式: {}", name));
            }
        }

        if tag.is_none() && paragraph.numbered {
            if !self.list_open {
                self.out.push_str("<ul>");
                self.list_open = true;
            }
            self.out.push_str(&format!("<li>{}</li>", body));
            return;
        }

        self.close_list();
        let tag = tag.unwrap_or_else(|| "p".to_string());
        self.out.push_str(&format!("<{tag}>{body}</{tag}>"));
    }

    fn end_run(&mut self) {
        let html = std::mem::take(&mut self.run_html);
        if html.is_empty() {
            return;
        }
        let wrapped = if html.trim().is_empty() {
            html
        } else {
            self.run.wrap(&html)
        };
        self.push_inline(&wrapped);
    }

    fn end_table(&mut self) {
        let Some(table) = self.tables.pop() else {
            return;
        };

        match self.tables.last_mut() {
            Some(parent) => {
                let text = table.flattened();
                if !text.is_empty() {
                    if let Some(cell) = parent.cell.as_mut() {
                        append_to_cell(cell, &text);
                    }
                }
            }
            None => {
                if !table.rows.is_empty() {
                    self.out.push_str(&table.to_html());
                }
            }
        }
    }

    fn embed_image(&mut self, rel_id: &str) {
        let Some(target) = self.relationships.get(rel_id).cloned() else {
            self.warn(format!("图片资源缺失: {}", rel_id));
            return;
        };
        let path = resolve_target(&target);

        let bytes = match read_part(&mut *self.archive, &path) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                self.warn(format!("图片资源缺失: {}", path));
                return;
            }
            Err(e) => {
                self.warn(format!("图片读取失败: {}", e));
                return;
            }
        };

        let alt = self.image_alt.clone().unwrap_or_default();
        let html = format!(
            "<img src=\"data:{};base64,{}\" alt=\"{}\">",
            image_mime(&path),
            STANDARD.encode(bytes),
            escape(&alt)
        );
        self.run_html.push_str(&html);
    }

    fn start(&mut self, reader: &Reader<&[u8]>, e: &BytesStart, empty: bool) {
        match local_name(e.name().as_ref()) {
            b"p" if !empty => {
                self.paragraph_depth += 1;
                if self.paragraph_depth == 1 {
                    self.paragraph = Some(Paragraph::default());
                }
            }
            b"pPr" if !empty => self.in_paragraph_props = true,
            b"pStyle" if self.paragraph_depth == 1 => {
                if let Some(p) = self.paragraph.as_mut() {
                    p.style_id = attr_value(reader, e, b"val");
                }
            }
            b"numPr" => {
                if let Some(p) = self.paragraph.as_mut() {
                    p.numbered = true;
                }
            }
            b"r" if !empty => {
                self.run = RunFormat::default();
                self.run_html.clear();
            }
            b"rPr" if !empty => self.in_run_props = true,
            b"b" if self.in_run_props && !self.in_paragraph_props => {
                self.run.bold = toggle_on(reader, e)
            }
            b"i" if self.in_run_props && !self.in_paragraph_props => {
                self.run.italic = toggle_on(reader, e)
            }
            b"u" if self.in_run_props && !self.in_paragraph_props => {
                self.run.underline = toggle_on(reader, e)
            }
            b"strike" | b"dstrike" if self.in_run_props && !self.in_paragraph_props => {
                self.run.strike = toggle_on(reader, e)
            }
            b"t" if !empty => self.in_text = true,
            b"tab" if !self.in_paragraph_props => self.run_html.push(' '),
            b"br" => self.run_html.push_str("<br>"),
            b"hyperlink" if !empty => {
                let href = attr_value(reader, e, b"id")
                    .and_then(|id| self.relationships.get(&id).cloned())
                    .or_else(|| attr_value(reader, e, b"anchor").map(|a| format!("#{}", a)));
                match href {
                    Some(href) => {
                        self.push_inline(&format!("<a href=\"{}\">", escape(&href)));
                        self.links.push(true);
                    }
                    None => self.links.push(false),
                }
            }
            b"docPr" => {
                self.image_alt = attr_value(reader, e, b"descr")
                    .filter(|d| !d.trim().is_empty())
                    .or_else(|| attr_value(reader, e, b"title").filter(|t| !t.trim().is_empty()));
            }
            b"blip" => {
                if let Some(id) = attr_value(reader, e, b"embed") {
                    self.embed_image(&id);
                }
            }
            b"imagedata" => {
                if let Some(id) = attr_value(reader, e, b"id") {
                    self.embed_image(&id);
                }
            }
            b"tbl" if !empty => {
                self.end_paragraph();
                if self.tables.is_empty() {
                    self.close_list();
                }
                self.tables.push(Table::default());
            }
            b"tr" if !empty => {
                if let Some(table) = self.tables.last_mut() {
                    table.row.clear();
                }
            }
            b"tc" if !empty => {
                if let Some(table) = self.tables.last_mut() {
                    table.cell = Some(String::new());
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        match local_name(name) {
            b"p" => {
                if self.paragraph_depth == 1 {
                    self.end_paragraph();
                }
                self.paragraph_depth = self.paragraph_depth.saturating_sub(1);
            }
            b"pPr" => self.in_paragraph_props = false,
            b"rPr" => self.in_run_props = false,
            b"r" => self.end_run(),
            b"t" => self.in_text = false,
            b"hyperlink" => {
                if self.links.pop() == Some(true) {
                    self.push_inline("</a>");
                }
            }
            b"drawing" | b"pict" => self.image_alt = None,
            b"tc" => {
                if let Some(table) = self.tables.last_mut() {
                    let cell = table.cell.take().unwrap_or_default();
                    table.row.push(cell);
                }
            }
            b"tr" => {
                if let Some(table) = self.tables.last_mut() {
                    let row = std::mem::take(&mut table.row);
                    if !row.is_empty() {
                        table.rows.push(row);
                    }
                }
            }
            b"tbl" => self.end_table(),
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_text {
            self.run_html.push_str(&escape(text));
        }
    }

    fn finish(mut self) -> (String, Vec<String>) {
        self.end_paragraph();
        while !self.tables.is_empty() {
            self.end_table();
        }
        self.close_list();
        (self.out, self.warnings)
    }
}

/// Convert a DOCX package to HTML plus conversion warnings.
pub fn docx_to_html(bytes: &[u8]) -> Result<(String, Vec<String>)> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::Zip(format!("Failed to open ZIP: {}", e)))?;

    let document = read_xml_part(&mut archive, DOCUMENT_PART)?
        .ok_or_else(|| Error::Document(format!("缺少 {}", DOCUMENT_PART)))?;
    let styles = read_xml_part(&mut archive, STYLES_PART)?
        .map(|xml| read_style_names(&xml))
        .unwrap_or_default();
    let relationships = read_xml_part(&mut archive, RELATIONSHIPS_PART)?
        .map(|xml| read_relationships(&xml))
        .unwrap_or_default();

    let mut writer = DocumentWriter {
        archive: &mut archive,
        styles,
        relationships,
        out: String::new(),
        warnings: Vec::new(),
        list_open: false,
        paragraph_depth: 0,
        paragraph: None,
        in_paragraph_props: false,
        in_run_props: false,
        in_text: false,
        run: RunFormat::default(),
        run_html: String::new(),
        links: Vec::new(),
        tables: Vec::new(),
        image_alt: None,
    };

    let mut reader = Reader::from_str(&document);
    reader.trim_text(false);

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => writer.start(&reader, e, false),
            Ok(Event::Empty(ref e)) => writer.start(&reader, e, true),
            Ok(Event::End(ref e)) => writer.end(e.name().as_ref()),
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| Error::Xml(format!("Invalid text in document: {}", err)))?;
                writer.text(&text);
            }
            Ok(Event::CData(e)) => writer.text(&String::from_utf8_lossy(&e)),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Xml(format!(
                    "Error at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(writer.finish())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    pub(crate) fn package(parts: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in parts {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    pub(crate) fn document(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"><w:body>{}</w:body></w:document>"#,
            body
        )
    }

    fn convert(body: &str) -> (String, Vec<String>) {
        let xml = document(body);
        docx_to_html(&package(&[(DOCUMENT_PART, xml.as_bytes())])).unwrap()
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"w:p"), b"p");
        assert_eq!(local_name(b"p"), b"p");
    }

    #[test]
    fn test_heading_styles_and_paragraphs() {
        let (html, warnings) = convert(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Intro</w:t></w:r></w:p>
<w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>Top</w:t></w:r></w:p>
<w:p><w:r><w:t xml:space="preserve">Body &amp; more</w:t></w:r></w:p>
<w:p></w:p>"#,
        );
        assert_eq!(html, "<h1>Intro</h1><h1>Top</h1><p>Body &amp; more</p>");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_deep_heading_styles() {
        let (html, warnings) = convert(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading5"/></w:pPr><w:r><w:t>Five</w:t></w:r></w:p>
<w:p><w:pPr><w:pStyle w:val="Heading6"/></w:pPr><w:r><w:t>Six</w:t></w:r></w:p>"#,
        );
        assert_eq!(html, "<h5>Five</h5><h6>Six</h6>");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_style_names_resolve_through_styles_part() {
        let styles = r#"<w:styles xmlns:w="x"><w:style w:styleId="a1"><w:name w:val="heading 2"/></w:style><w:style w:styleId="Fancy"><w:name w:val="Fancy Quote"/></w:style></w:styles>"#;
        let xml = document(
            r#"<w:p><w:pPr><w:pStyle w:val="a1"/></w:pPr><w:r><w:t>Sub</w:t></w:r></w:p>
<w:p><w:pPr><w:pStyle w:val="Fancy"/></w:pPr><w:r><w:t>q</w:t></w:r></w:p>
<w:p><w:pPr><w:pStyle w:val="Fancy"/></w:pPr><w:r><w:t>again</w:t></w:r></w:p>"#,
        );
        let bytes = package(&[(DOCUMENT_PART, xml.as_bytes()), (STYLES_PART, styles.as_bytes())]);
        let (html, warnings) = docx_to_html(&bytes).unwrap();
        assert_eq!(html, "<h2>Sub</h2><p>q</p><p>again</p>");
        assert_eq!(warnings, ["未识别的段落样式: Fancy Quote"]);
    }

    #[test]
    fn test_run_formatting() {
        let (html, _) = convert(
            r#"<w:p><w:pPr><w:rPr><w:b/></w:rPr></w:pPr><w:r><w:t xml:space="preserve">plain </w:t></w:r><w:r><w:rPr><w:b/><w:i/></w:rPr><w:t>both</w:t></w:r><w:r><w:rPr><w:b w:val="0"/><w:u w:val="single"/><w:strike/></w:rPr><w:t>u</w:t></w:r></w:p>"#,
        );
        assert_eq!(
            html,
            "<p>plain <strong><em>both</em></strong><s><u>u</u></s></p>"
        );
    }

    #[test]
    fn test_numbered_paragraphs_group_into_list() {
        let (html, _) = convert(
            r#"<w:p><w:pPr><w:pStyle w:val="ListParagraph"/><w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr></w:pPr><w:r><w:t>a</w:t></w:r></w:p>
<w:p><w:pPr><w:numPr><w:numId w:val="1"/></w:numPr></w:pPr><w:r><w:t>b</w:t></w:r></w:p>
<w:p><w:r><w:t>after</w:t></w:r></w:p>"#,
        );
        assert_eq!(html, "<ul><li>a</li><li>b</li></ul><p>after</p>");
    }

    #[test]
    fn test_tables_and_nested_tables() {
        let (html, _) = convert(
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>A</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>B</w:t></w:r></w:p><w:tbl><w:tr><w:tc><w:p><w:r><w:t>x</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>y</w:t></w:r></w:p></w:tc></w:tr></w:tbl></w:tc></w:tr><w:tr><w:tc><w:p><w:r><w:t>1</w:t></w:r></w:p></w:tc><w:tc><w:p/></w:tc></w:tr></w:tbl>"#,
        );
        assert_eq!(
            html,
            "<table><tr><td>A</td><td>B x y</td></tr><tr><td>1</td><td></td></tr></table>"
        );
    }

    #[test]
    fn test_hyperlinks_resolve_relationships() {
        let rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId5" Type="hyperlink" Target="https://example.com/?a=1&amp;b=2" TargetMode="External"/></Relationships>"#;
        let xml = document(
            r#"<w:p><w:hyperlink r:id="rId5"><w:r><w:t>site</w:t></w:r></w:hyperlink><w:r><w:tab/></w:r><w:hyperlink w:anchor="sec"><w:r><w:t>jump</w:t></w:r></w:hyperlink></w:p>"#,
        );
        let bytes = package(&[(DOCUMENT_PART, xml.as_bytes()), (RELATIONSHIPS_PART, rels.as_bytes())]);
        let (html, _) = docx_to_html(&bytes).unwrap();
        assert_eq!(
            html,
            "<p><a href=\"https://example.com/?a=1&amp;b=2\">site</a> <a href=\"#sec\">jump</a></p>"
        );
    }

    #[test]
    fn test_images_become_data_uris() {
        let rels = r#"<Relationships><Relationship Id="rId1" Target="media/image1.png"/><Relationship Id="rId2" Target="media/gone.png"/></Relationships>"#;
        let xml = document(
            r#"<w:p><w:r><w:drawing><wp:inline><wp:docPr id="1" name="Picture 1" descr="Logo"/><a:graphic><a:graphicData><a:blip r:embed="rId1"/></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>
<w:p><w:r><w:drawing><a:blip r:embed="rId2"/></w:drawing></w:r></w:p>"#,
        );
        let bytes = package(&[
            (DOCUMENT_PART, xml.as_bytes()),
            (RELATIONSHIPS_PART, rels.as_bytes()),
            ("word/media/image1.png", b"PNG".as_slice()),
        ]);
        let (html, warnings) = docx_to_html(&bytes).unwrap();
        assert_eq!(html, "<p><img src=\"data:image/png;base64,UE5H\" alt=\"Logo\"></p>");
        assert_eq!(warnings, ["图片资源缺失: word/media/gone.png"]);
    }

    #[test]
    fn test_missing_document_part() {
        let bytes = package(&[("word/styles.xml", b"<w:styles/>".as_slice())]);
        let err = docx_to_html(&bytes).unwrap_err();
        assert!(matches!(err, Error::Document(_)));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(docx_to_html(b"plain text").unwrap_err(), Error::Zip(_)));
    }

    #[test]
    fn test_resolve_target_and_mime() {
        assert_eq!(resolve_target("media/a.png"), "word/media/a.png");
        assert_eq!(resolve_target("../media/a.png"), "media/a.png");
        assert_eq!(resolve_target("/word/media/b.jpeg"), "word/media/b.jpeg");
        assert_eq!(image_mime("x.JPG"), "image/jpeg");
        assert_eq!(image_mime("x.bin"), "application/octet-stream");
    }
}
