//! Slide, notes and document-property parsing for PPTX parts.

use docmd_core::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static SLIDE_PATH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").unwrap());

/// Placeholder types that hold a slide title.
const TITLE_PLACEHOLDERS: &[&str] = &["title", "ctrTitle"];

/// Placeholder types on notes pages that are not part of the notes text.
const NOTES_CHROME_PLACEHOLDERS: &[&str] = &["sldNum", "sldImg", "hdr", "ftr", "dt"];

/// Number of a slide part such as `ppt/slides/slide3.xml`.
pub fn slide_number(path: &str) -> Option<usize> {
    SLIDE_PATH_REGEX
        .captures(path)
        .and_then(|caps| caps[1].parse().ok())
}

/// Notes part that belongs to a slide part.
pub fn notes_path(slide_path: &str) -> String {
    slide_path.replacen("slides/slide", "notesSlides/notesSlide", 1)
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().position(|&b| b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

fn attr_value(element: &BytesStart, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| local_name(attr.key.as_ref()) == key)
        .and_then(|attr| {
            let decoded = std::str::from_utf8(&attr.value).ok()?;
            quick_xml::escape::unescape(decoded)
                .ok()
                .map(|v| v.into_owned())
        })
}

/// One `a:p` of a text body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextParagraph {
    pub text: String,
    /// The paragraph declares a `buChar` or `buAutoNum` bullet.
    pub bulleted: bool,
}

/// A shape or graphic frame with its paragraphs.
#[derive(Debug, Clone, Default)]
pub struct Shape {
    /// The `type` of the shape's `p:ph` placeholder, if any.
    pub placeholder: Option<String>,
    pub paragraphs: Vec<TextParagraph>,
}

impl Shape {
    pub fn is_title(&self) -> bool {
        self.placeholder
            .as_deref()
            .is_some_and(|t| TITLE_PLACEHOLDERS.contains(&t))
    }
}

/// Text content of a slide or notes part.
#[derive(Debug, Clone, Default)]
pub struct PartText {
    pub shapes: Vec<Shape>,
    pub table_count: usize,
}

/// Walk a slide-like part and collect shape paragraphs in document order.
pub fn read_part_text(xml: &str) -> Result<PartText> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut part = PartText::default();
    let mut shape: Option<Shape> = None;
    let mut paragraph: Option<TextParagraph> = None;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" | b"graphicFrame" => shape = Some(Shape::default()),
                b"ph" => set_placeholder(&mut shape, e),
                b"p" => paragraph = Some(TextParagraph::default()),
                b"buChar" | b"buAutoNum" => mark_bulleted(&mut paragraph),
                b"t" => in_text = paragraph.is_some(),
                b"tbl" => part.table_count += 1,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"ph" => set_placeholder(&mut shape, e),
                b"buChar" | b"buAutoNum" => mark_bulleted(&mut paragraph),
                b"br" => {
                    if let Some(p) = paragraph.as_mut() {
                        p.text.push(' ');
                    }
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if let (true, Some(p)) = (in_text, paragraph.as_mut()) {
                    let text = e
                        .unescape()
                        .map_err(|err| Error::Xml(format!("Invalid slide text: {}", err)))?;
                    p.text.push_str(&text);
                }
            }
            Ok(Event::CData(ref e)) => {
                if let (true, Some(p)) = (in_text, paragraph.as_mut()) {
                    p.text.push_str(&String::from_utf8_lossy(e));
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"t" => in_text = false,
                b"p" => {
                    if let Some(mut p) = paragraph.take() {
                        p.text = p.text.split_whitespace().collect::<Vec<_>>().join(" ");
                        if !p.text.is_empty() {
                            shape.get_or_insert_with(Shape::default).paragraphs.push(p);
                        }
                    }
                }
                b"sp" | b"graphicFrame" => {
                    if let Some(done) = shape.take() {
                        if !done.paragraphs.is_empty() {
                            part.shapes.push(done);
                        }
                    }
                }
                _ => {}
            },
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

    if let Some(rest) = shape {
        if !rest.paragraphs.is_empty() {
            part.shapes.push(rest);
        }
    }
    Ok(part)
}

fn set_placeholder(shape: &mut Option<Shape>, element: &BytesStart) {
    if let Some(shape) = shape.as_mut() {
        shape.placeholder = Some(attr_value(element, b"type").unwrap_or_else(|| "body".to_string()));
    }
}

fn mark_bulleted(paragraph: &mut Option<TextParagraph>) {
    if let Some(p) = paragraph.as_mut() {
        p.bulleted = true;
    }
}

/// Content extracted from one slide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slide {
    pub number: usize,
    pub title: Option<String>,
    /// Non-title paragraphs, in order, without duplicates.
    pub content: Vec<TextParagraph>,
    pub table_count: usize,
    pub notes: Option<String>,
}

/// Parse a slide part.
pub fn parse_slide(xml: &str, number: usize) -> Result<Slide> {
    let part = read_part_text(xml)?;

    let title = part
        .shapes
        .iter()
        .find(|s| s.is_title())
        .map(|s| {
            s.paragraphs
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|t| !t.is_empty());

    let mut content: Vec<TextParagraph> = Vec::new();
    for paragraph in part
        .shapes
        .iter()
        .filter(|s| !s.is_title())
        .flat_map(|s| s.paragraphs.iter())
    {
        if title.as_deref() == Some(paragraph.text.as_str()) {
            continue;
        }
        match content.iter_mut().find(|c| c.text == paragraph.text) {
            Some(existing) => existing.bulleted |= paragraph.bulleted,
            None => content.push(paragraph.clone()),
        }
    }

    Ok(Slide {
        number,
        title,
        content,
        table_count: part.table_count,
        notes: None,
    })
}

/// Parse a notes part into its text lines, `None` when there are none.
pub fn parse_notes(xml: &str) -> Result<Option<String>> {
    let part = read_part_text(xml)?;
    let lines: Vec<&str> = part
        .shapes
        .iter()
        .filter(|s| {
            !s.placeholder
                .as_deref()
                .is_some_and(|t| NOTES_CHROME_PLACEHOLDERS.contains(&t))
        })
        .flat_map(|s| s.paragraphs.iter().map(|p| p.text.as_str()))
        .collect();
    Ok((!lines.is_empty()).then(|| lines.join("\n")))
}

/// Document properties gathered from `docProps/core.xml` and `docProps/app.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentProperties {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub declared_slides: Option<usize>,
}

/// First non-empty text of each element whose local name is in `names`.
pub fn element_texts(xml: &str, names: &[&str]) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut found = HashMap::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(local_name(e.name().as_ref())).into_owned();
                current = names.contains(&name.as_str()).then_some(name);
            }
            Ok(Event::Text(ref e)) => {
                if let Some(name) = current.as_ref() {
                    let text = e
                        .unescape()
                        .map_err(|err| Error::Xml(format!("Invalid property text: {}", err)))?;
                    let text = text.trim();
                    if !text.is_empty() && !found.contains_key(name) {
                        found.insert(name.clone(), text.to_string());
                    }
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(format!("Error parsing properties: {}", e))),
            _ => {}
        }
    }

    Ok(found)
}

impl DocumentProperties {
    /// Merge `title`, `creator` and `subject` from the core properties part.
    pub fn read_core(&mut self, xml: &str) -> Result<()> {
        let mut texts = element_texts(xml, &["title", "creator", "subject"])?;
        self.title = self.title.take().or_else(|| texts.remove("title"));
        self.author = texts.remove("creator");
        self.subject = texts.remove("subject");
        Ok(())
    }

    /// Merge the declared slide count and a fallback title from the
    /// application properties part.
    pub fn read_app(&mut self, xml: &str) -> Result<()> {
        let mut texts = element_texts(xml, &["Slides", "title"])?;
        self.declared_slides = texts.get("Slides").and_then(|n| n.parse().ok());
        if self.title.is_none() {
            self.title = texts.remove("title");
        }
        Ok(())
    }
}
