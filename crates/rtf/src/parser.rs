//! RTF parser that folds the token stream into [`Node`]s.
//!
//! Every `{` pushes a copy of the current group state and every `}` pops it,
//! so formatting, code page and destination never leak between siblings.
//! Text is decoded lazily: raw bytes and `\'hh` escapes accumulate until the
//! next structural token and are then decoded with the group's code page.

use crate::lexer::{tokenize, ControlWord, Token};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use docmd_core::{Error, Node, Result, StyleSet};
use encoding_rs::Encoding;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Alt text for embedded pictures.
pub const PICTURE_ALT: &str = "图片";

static HYPERLINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"HYPERLINK\s+(\\l\s+)?(?:"([^"]*)"|([^\s"]+))"#).unwrap()
});

/// Encoding for a Windows code page number.
pub fn codepage_to_encoding(codepage: i32) -> Option<&'static Encoding> {
    match codepage {
        874 => Some(encoding_rs::WINDOWS_874),
        932 => Some(encoding_rs::SHIFT_JIS),
        936 => Some(encoding_rs::GBK),
        949 => Some(encoding_rs::EUC_KR),
        950 => Some(encoding_rs::BIG5),
        1250 => Some(encoding_rs::WINDOWS_1250),
        1251 => Some(encoding_rs::WINDOWS_1251),
        1252 => Some(encoding_rs::WINDOWS_1252),
        1253 => Some(encoding_rs::WINDOWS_1253),
        1254 => Some(encoding_rs::WINDOWS_1254),
        1255 => Some(encoding_rs::WINDOWS_1255),
        1256 => Some(encoding_rs::WINDOWS_1256),
        1257 => Some(encoding_rs::WINDOWS_1257),
        1258 => Some(encoding_rs::WINDOWS_1258),
        10000 => Some(encoding_rs::MACINTOSH),
        54936 => Some(encoding_rs::GB18030),
        65001 => Some(encoding_rs::UTF_8),
        _ => None,
    }
}

/// Encoding for a font's `\fcharset`; `None` means the document code page.
fn charset_to_encoding(charset: i32) -> Option<&'static Encoding> {
    match charset {
        77 => Some(encoding_rs::MACINTOSH),
        128 => Some(encoding_rs::SHIFT_JIS),
        129 | 130 => Some(encoding_rs::EUC_KR),
        134 => Some(encoding_rs::GBK),
        136 => Some(encoding_rs::BIG5),
        161 => Some(encoding_rs::WINDOWS_1253),
        162 => Some(encoding_rs::WINDOWS_1254),
        163 => Some(encoding_rs::WINDOWS_1258),
        177 => Some(encoding_rs::WINDOWS_1255),
        178 => Some(encoding_rs::WINDOWS_1256),
        186 => Some(encoding_rs::WINDOWS_1257),
        204 => Some(encoding_rs::WINDOWS_1251),
        222 => Some(encoding_rs::WINDOWS_874),
        238 => Some(encoding_rs::WINDOWS_1250),
        _ => None,
    }
}

/// Target of a `HYPERLINK` field instruction.
pub fn hyperlink_target(instruction: &str) -> Option<String> {
    let caps = HYPERLINK_REGEX.captures(instruction)?;
    let target = caps.get(2).or_else(|| caps.get(3))?.as_str().trim();
    if target.is_empty() {
        return None;
    }
    Some(if caps.get(1).is_some() {
        format!("#{}", target)
    } else {
        target.to_string()
    })
}

/// Where text in the current group goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Destination {
    Body,
    FontTable,
    StyleSheet,
    FieldInstruction,
    Picture,
    Skip,
}

/// Formatting and routing inherited by nested groups.
#[derive(Debug, Clone)]
struct GroupState {
    destination: Destination,
    style: StyleSet,
    encoding: &'static Encoding,
    unicode_skip: usize,
    paragraph_style: Option<i32>,
    listed: bool,
    list_level: usize,
    in_table: bool,
}

impl Default for GroupState {
    fn default() -> Self {
        Self {
            destination: Destination::Body,
            style: StyleSet::empty(),
            encoding: encoding_rs::WINDOWS_1252,
            unicode_skip: 1,
            paragraph_style: None,
            listed: false,
            list_level: 0,
            in_table: false,
        }
    }
}

#[derive(Debug, Default)]
struct PictureData {
    mime: Option<&'static str>,
    hex: String,
    binary: Vec<u8>,
}

impl PictureData {
    fn bytes(&self) -> Vec<u8> {
        if !self.binary.is_empty() {
            return self.binary.clone();
        }
        let digits: Vec<u8> = self
            .hex
            .bytes()
            .filter_map(|b| (b as char).to_digit(16).map(|d| d as u8))
            .collect();
        digits.chunks_exact(2).map(|pair| pair[0] << 4 | pair[1]).collect()
    }

    fn to_node(&self) -> Option<Node> {
        let bytes = self.bytes();
        if bytes.is_empty() {
            return None;
        }
        Some(Node::Image {
            alt: PICTURE_ALT.to_string(),
            src: format!(
                "data:{};base64,{}",
                self.mime.unwrap_or("application/octet-stream"),
                STANDARD.encode(bytes)
            ),
            title: None,
        })
    }
}

/// What a group means beyond its state, acted on when it closes.
#[derive(Debug, Default)]
enum GroupKind {
    #[default]
    Plain,
    FontTable,
    StyleSheet,
    StyleEntry {
        number: Option<i32>,
        name: String,
    },
    Field {
        instruction: String,
    },
    FieldResult {
        href: Option<String>,
        start: usize,
    },
    Picture(PictureData),
}

#[derive(Debug, Default)]
struct Group {
    state: GroupState,
    kind: GroupKind,
    /// A `\*` was seen and the next control word decides the destination.
    ignorable: bool,
}

/// Builds the node list from tokens.
struct Parser {
    groups: Vec<Group>,
    nodes: Vec<Node>,
    inline: Vec<Node>,
    /// Inline nodes below this index never absorb new text.
    merge_floor: usize,
    pending: Vec<u8>,
    skip: usize,
    high_surrogate: Option<u16>,
    paragraph_is_list: bool,
    styles: HashMap<i32, String>,
    font_charsets: HashMap<i32, i32>,
    font_entry: i32,
    default_font: Option<i32>,
    document_encoding: &'static Encoding,
    explicit_codepage: bool,
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: String,
}

impl Parser {
    fn new() -> Self {
        Self {
            groups: vec![Group::default()],
            nodes: Vec::new(),
            inline: Vec::new(),
            merge_floor: 0,
            pending: Vec::new(),
            skip: 0,
            high_surrogate: None,
            paragraph_is_list: false,
            styles: HashMap::new(),
            font_charsets: HashMap::new(),
            font_entry: 0,
            default_font: None,
            document_encoding: encoding_rs::WINDOWS_1252,
            explicit_codepage: false,
            rows: Vec::new(),
            row: Vec::new(),
            cell: String::new(),
        }
    }

    fn group(&mut self) -> &mut Group {
        if self.groups.is_empty() {
            self.groups.push(Group::default());
        }
        let last = self.groups.len() - 1;
        &mut self.groups[last]
    }

    fn state(&self) -> GroupState {
        self.groups.last().map(|g| g.state.clone()).unwrap_or_default()
    }

    fn destination(&self) -> Destination {
        self.groups
            .last()
            .map_or(Destination::Body, |g| g.state.destination)
    }

    fn run(mut self, tokens: &[Token<'_>]) -> Vec<Node> {
        for token in tokens {
            match token {
                Token::Text(bytes) => self.text_bytes(bytes),
                Token::Hex(byte) => self.hex_byte(*byte),
                other => {
                    self.flush_pending();
                    self.skip = 0;
                    match other {
                        Token::OpenBrace => self.open_group(),
                        Token::CloseBrace => self.close_group(),
                        Token::Control(word) => self.control(*word),
                        Token::Literal(ch) => self.emit(&ch.to_string()),
                        Token::Binary(payload) => {
                            if let GroupKind::Picture(picture) = &mut self.group().kind {
                                picture.binary.extend_from_slice(payload);
                            }
                        }
                        Token::Text(_) | Token::Hex(_) => {}
                    }
                }
            }
        }

        self.flush_pending();
        self.end_paragraph();
        self.flush_table();
        self.nodes
    }

    fn text_bytes(&mut self, bytes: &[u8]) {
        let skipped = self.skip.min(bytes.len());
        self.skip -= skipped;
        let bytes = &bytes[skipped..];
        if bytes.is_empty() {
            return;
        }

        match self.destination() {
            Destination::Picture => {
                if let GroupKind::Picture(picture) = &mut self.group().kind {
                    picture.hex.push_str(&String::from_utf8_lossy(bytes));
                }
            }
            Destination::Skip | Destination::FontTable => {}
            _ => {
                // Raw non-ASCII bytes that form valid UTF-8 were written by a
                // UTF-8 aware producer and are taken as is.
                match std::str::from_utf8(bytes) {
                    Ok(text) if self.pending.is_empty() && !text.is_ascii() => self.emit(text),
                    _ => self.pending.extend_from_slice(bytes),
                }
            }
        }
    }

    fn hex_byte(&mut self, byte: u8) {
        if self.skip > 0 {
            self.skip -= 1;
            return;
        }
        match self.destination() {
            Destination::Picture => {
                if let GroupKind::Picture(picture) = &mut self.group().kind {
                    picture.binary.push(byte);
                }
            }
            Destination::Skip | Destination::FontTable => {}
            _ => self.pending.push(byte),
        }
    }

    fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let bytes = std::mem::take(&mut self.pending);
        let (text, _, _) = self.state().encoding.decode(&bytes);
        self.emit(&text);
    }

    /// Route decoded text to the current destination.
    fn emit(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.destination() {
            Destination::Body => self.push_text(text),
            Destination::StyleSheet => {
                if let GroupKind::StyleEntry { name, .. } = &mut self.group().kind {
                    name.push_str(text);
                }
            }
            Destination::FieldInstruction => {
                if let Some(instruction) = self.field_instruction() {
                    instruction.push_str(text);
                }
            }
            Destination::FontTable | Destination::Picture | Destination::Skip => {}
        }
    }

    fn field_instruction(&mut self) -> Option<&mut String> {
        self.groups.iter_mut().rev().find_map(|g| match &mut g.kind {
            GroupKind::Field { instruction } => Some(instruction),
            _ => None,
        })
    }

    fn push_text(&mut self, text: &str) {
        let style = self.state().style;
        if self.inline.len() > self.merge_floor {
            if let Some(Node::Text { text: last, style: last_style }) = self.inline.last_mut() {
                if *last_style == style {
                    last.push_str(text);
                    return;
                }
            }
        }
        self.inline.push(Node::styled(text, style));
    }

    fn push_inline(&mut self, node: Node) {
        self.inline.push(node);
    }

    fn open_group(&mut self) {
        let parent_is_stylesheet = matches!(
            self.groups.last().map(|g| &g.kind),
            Some(GroupKind::StyleSheet)
        );
        let state = self.state();
        let kind = if parent_is_stylesheet {
            GroupKind::StyleEntry {
                number: Some(0),
                name: String::new(),
            }
        } else {
            GroupKind::Plain
        };
        self.groups.push(Group {
            state,
            kind,
            ignorable: false,
        });
    }

    fn close_group(&mut self) {
        if self.groups.len() <= 1 {
            log::warn!("Ignoring unbalanced closing brace");
            return;
        }
        let Some(group) = self.groups.pop() else {
            return;
        };

        match group.kind {
            GroupKind::StyleEntry {
                number: Some(number),
                name,
            } => {
                let name = name.trim().trim_end_matches(';').trim().to_string();
                if !name.is_empty() {
                    self.styles.insert(number, name);
                }
            }
            GroupKind::FontTable => {
                let default_encoding = self
                    .default_font
                    .and_then(|f| self.font_charsets.get(&f))
                    .and_then(|&c| charset_to_encoding(c));
                if let (Some(encoding), false) = (default_encoding, self.explicit_codepage) {
                    self.group().state.encoding = encoding;
                }
            }
            GroupKind::Picture(picture) => {
                if let Some(image) = picture.to_node() {
                    self.push_inline(image);
                }
            }
            GroupKind::FieldResult { href, start } => {
                let start = start.min(self.inline.len());
                if let Some(href) = href {
                    let children: Vec<Node> = self.inline.drain(start..).collect();
                    if !children.is_empty() {
                        self.push_inline(Node::Link {
                            href: Some(href),
                            children,
                        });
                    }
                }
                self.merge_floor = self.inline.len();
            }
            _ => {}
        }
    }

    fn control(&mut self, word: ControlWord<'_>) {
        if std::mem::take(&mut self.group().ignorable) {
            let known = matches!(
                word,
                ControlWord::FieldInstruction
                    | ControlWord::ShapePicture
                    | ControlWord::Picture
                    | ControlWord::ListText
                    | ControlWord::OldListText
                    | ControlWord::SkippedDestination
            );
            if !known {
                self.group().state.destination = Destination::Skip;
                return;
            }
        }

        match self.destination() {
            Destination::Skip => {}
            Destination::FontTable => match word {
                ControlWord::Font(n) => self.font_entry = n,
                ControlWord::FontCharset(charset) => {
                    self.font_charsets.insert(self.font_entry, charset);
                }
                _ => {}
            },
            Destination::StyleSheet => match word {
                ControlWord::ParagraphStyle(n) => {
                    if let GroupKind::StyleEntry { number, .. } = &mut self.group().kind {
                        *number = Some(n);
                    }
                }
                ControlWord::CharacterStyle(_) => {
                    if let GroupKind::StyleEntry { number, .. } = &mut self.group().kind {
                        *number = None;
                    }
                }
                ControlWord::IgnorableDestination => self.group().ignorable = true,
                ControlWord::Unicode(code) => self.unicode(code),
                _ => {}
            },
            Destination::Picture => {
                let mime = match word {
                    ControlWord::PngBlip => Some("image/png"),
                    ControlWord::JpegBlip => Some("image/jpeg"),
                    ControlWord::EmfBlip => Some("image/x-emf"),
                    ControlWord::WindowsMetafile => Some("image/x-wmf"),
                    ControlWord::DeviceIndependentBitmap => Some("image/bmp"),
                    ControlWord::MacPict => Some("image/x-pict"),
                    ControlWord::IgnorableDestination => {
                        self.group().ignorable = true;
                        None
                    }
                    _ => None,
                };
                if let (Some(mime), GroupKind::Picture(picture)) = (mime, &mut self.group().kind) {
                    picture.mime = Some(mime);
                }
            }
            Destination::FieldInstruction => match word {
                ControlWord::Unicode(code) => self.unicode(code),
                ControlWord::IgnorableDestination => self.group().ignorable = true,
                ControlWord::Unknown(name, _) => {
                    if let Some(instruction) = self.field_instruction() {
                        instruction.push_str(&format!(" \\{} ", name));
                    }
                }
                _ => {}
            },
            Destination::Body => self.body_control(word),
        }
    }

    fn unicode(&mut self, code: i32) {
        let unit = (if code < 0 { code + 65536 } else { code }) as u32;
        self.skip = self.state().unicode_skip;

        let ch = match (self.high_surrogate.take(), unit) {
            (None, 0xD800..=0xDBFF) => {
                self.high_surrogate = Some(unit as u16);
                return;
            }
            (Some(high), 0xDC00..=0xDFFF) => {
                char::decode_utf16([high, unit as u16]).next().and_then(|r| r.ok())
            }
            (_, unit) => char::from_u32(unit),
        };
        self.emit(&ch.unwrap_or(char::REPLACEMENT_CHARACTER).to_string());
    }

    fn body_control(&mut self, word: ControlWord<'_>) {
        match word {
            ControlWord::AnsiCodePage(codepage) => {
                if let Some(encoding) = codepage_to_encoding(codepage) {
                    self.document_encoding = encoding;
                    self.explicit_codepage = true;
                    self.group().state.encoding = encoding;
                }
            }
            ControlWord::DefaultFont(n) => self.default_font = Some(n),

            ControlWord::FontTable => {
                let group = self.group();
                group.state.destination = Destination::FontTable;
                group.kind = GroupKind::FontTable;
            }
            ControlWord::StyleSheet => {
                let group = self.group();
                group.state.destination = Destination::StyleSheet;
                group.kind = GroupKind::StyleSheet;
            }
            ControlWord::ColorTable
            | ControlWord::Info
            | ControlWord::SkippedDestination
            | ControlWord::NonShapePicture => self.group().state.destination = Destination::Skip,
            ControlWord::ListText | ControlWord::OldListText => {
                self.paragraph_is_list = true;
                self.group().state.destination = Destination::Skip;
            }
            ControlWord::IgnorableDestination => self.group().ignorable = true,
            ControlWord::ShapePicture => {}

            ControlWord::Font(n) => {
                let encoding = self
                    .font_charsets
                    .get(&n)
                    .and_then(|&c| charset_to_encoding(c))
                    .unwrap_or(self.document_encoding);
                self.group().state.encoding = encoding;
            }
            ControlWord::ParagraphStyle(n) => self.group().state.paragraph_style = Some(n),

            ControlWord::Bold(on) => self.group().state.style.set(StyleSet::BOLD, on),
            ControlWord::Italic(on) => self.group().state.style.set(StyleSet::ITALIC, on),
            ControlWord::Underline(on) => self.group().state.style.set(StyleSet::UNDERLINE, on),
            ControlWord::UnderlineNone => self.group().state.style.remove(StyleSet::UNDERLINE),
            ControlWord::Strike(on) => self.group().state.style.set(StyleSet::STRIKETHROUGH, on),
            ControlWord::Plain => self.group().state.style = StyleSet::empty(),

            ControlWord::Par => self.end_paragraph(),
            ControlWord::Pard => {
                let state = &mut self.group().state;
                state.paragraph_style = None;
                state.listed = false;
                state.list_level = 0;
                state.in_table = false;
            }
            ControlWord::Line => self.push_inline(Node::LineBreak),
            ControlWord::Page => {
                self.end_paragraph();
                self.flush_table();
                self.nodes.push(Node::PageBreak);
            }
            ControlWord::Tab => self.emit("\t"),

            ControlWord::ListOverride(n) => self.group().state.listed = n != 0,
            ControlWord::ListLevel(n) => self.group().state.list_level = n.max(0) as usize,

            ControlWord::InTable => self.group().state.in_table = true,
            ControlWord::Cell => self.end_cell(),
            ControlWord::Row => self.end_row(),

            ControlWord::Field => {
                self.group().kind = GroupKind::Field {
                    instruction: String::new(),
                }
            }
            ControlWord::FieldInstruction => {
                self.group().state.destination = Destination::FieldInstruction
            }
            ControlWord::FieldResult => {
                let href = self
                    .groups
                    .iter()
                    .rev()
                    .find_map(|g| match &g.kind {
                        GroupKind::Field { instruction } => Some(instruction.as_str()),
                        _ => None,
                    })
                    .and_then(hyperlink_target);
                let start = self.inline.len();
                self.merge_floor = start;
                self.group().kind = GroupKind::FieldResult { href, start };
            }

            ControlWord::Picture => {
                let group = self.group();
                group.state.destination = Destination::Picture;
                group.kind = GroupKind::Picture(PictureData::default());
            }

            ControlWord::Unicode(code) => self.unicode(code),
            ControlWord::UnicodeSkip(n) => self.group().state.unicode_skip = n.max(0) as usize,

            ControlWord::Bullet => self.emit("•"),
            ControlWord::EmDash => self.emit("—"),
            ControlWord::EnDash => self.emit("–"),
            ControlWord::LeftQuote => self.emit("\u{2018}"),
            ControlWord::RightQuote => self.emit("\u{2019}"),
            ControlWord::LeftDoubleQuote => self.emit("\u{201C}"),
            ControlWord::RightDoubleQuote => self.emit("\u{201D}"),

            _ => {}
        }
    }

    fn take_inline(&mut self) -> Vec<Node> {
        self.merge_floor = 0;
        std::mem::take(&mut self.inline)
    }

    fn end_paragraph(&mut self) {
        let children = self.take_inline();
        let is_list = std::mem::take(&mut self.paragraph_is_list);
        let state = self.state();

        if state.in_table {
            append_cell_text(&mut self.cell, &children);
            return;
        }

        self.flush_table();
        if !has_content(&children) {
            return;
        }

        if state.listed || is_list {
            self.nodes.push(Node::ListItem {
                depth: state.list_level,
                children,
            });
        } else {
            let style = state
                .paragraph_style
                .and_then(|n| self.styles.get(&n).cloned());
            self.nodes.push(Node::Paragraph { style, children });
        }
    }

    fn end_cell(&mut self) {
        let children = self.take_inline();
        self.paragraph_is_list = false;
        append_cell_text(&mut self.cell, &children);
        self.row.push(std::mem::take(&mut self.cell));
    }

    fn end_row(&mut self) {
        let row = std::mem::take(&mut self.row);
        if !row.is_empty() {
            self.rows.push(row);
        }
    }

    fn flush_table(&mut self) {
        self.end_row();
        let rows = std::mem::take(&mut self.rows);
        if !rows.is_empty() {
            self.nodes.push(Node::Table { rows });
        }
    }
}

fn has_content(nodes: &[Node]) -> bool {
    nodes
        .iter()
        .any(|n| matches!(n, Node::Image { .. }) || !n.plain_text().trim().is_empty())
}

fn append_cell_text(cell: &mut String, nodes: &[Node]) {
    let text: String = nodes.iter().map(Node::plain_text).collect();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return;
    }
    if !cell.is_empty() {
        cell.push(' ');
    }
    cell.push_str(&text);
}

/// Parse an RTF document into block nodes.
pub fn parse_rtf(input: &[u8]) -> Result<Vec<Node>> {
    let input = input.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(input);
    let start = input
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(input.len());
    if !input[start..].starts_with(b"{\\rtf") {
        return Err(Error::Rtf("missing {\\rtf header".to_string()));
    }

    let tokens = tokenize(&input[start..])?;
    log::debug!("Tokenized RTF into {} tokens", tokens.len());
    Ok(Parser::new().run(&tokens))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmd_core::render;
    use pretty_assertions::assert_eq;

    fn md(rtf: &str) -> String {
        render(&parse_rtf(rtf.as_bytes()).unwrap())
    }

    #[test]
    fn test_plain_paragraphs() {
        assert_eq!(md(r"{\rtf1\ansi Hello\par World\par}"), "Hello\n\nWorld");
    }

    #[test]
    fn test_header_tables_are_skipped() {
        let rtf = r"{\rtf1\ansi\deff0{\fonttbl{\f0\fswiss Helvetica;}}{\colortbl;\red255\green0\blue0;}{\info{\title Secret}}{\*\generator Writer;}\f0 Body\par}";
        assert_eq!(md(rtf), "Body");
    }

    #[test]
    fn test_inline_styles_are_group_scoped() {
        let rtf = r"{\rtf1 a {\b bold {\i both}} \ul under\ulnone  {\strike gone} plain\par}";
        assert_eq!(md(rtf), "a **bold** ***both*** <u>under</u> ~~gone~~ plain");
    }

    #[test]
    fn test_style_nodes_carry_resolved_sets() {
        let nodes = parse_rtf(br"{\rtf1 x{\b\i y}\par}").unwrap();
        assert_eq!(
            nodes,
            [Node::paragraph(vec![
                Node::text("x"),
                Node::styled("y", StyleSet::BOLD | StyleSet::ITALIC),
            ])]
        );
    }

    #[test]
    fn test_stylesheet_headings() {
        let rtf = r"{\rtf1{\stylesheet{\s0 Normal;}{\s1\sbasedon0 heading 1;}{\s2 Title;}{\*\cs10 Default Paragraph Font;}}
\pard\s1 Chapter\par
\pard\s2 Main\par
\pard\s0 Body text\par}";
        assert_eq!(md(rtf), "# Chapter\n\n# Main\n\nBody text");
    }

    #[test]
    fn test_hex_escapes_use_code_page() {
        let rtf = r"{\rtf1\ansi\ansicpg936 \'c4\'e3\'ba\'c3\par}";
        assert_eq!(md(rtf), "你好");
        assert_eq!(md(r"{\rtf1\ansi caf\'e9\par}"), "café");
    }

    #[test]
    fn test_font_charset_selects_encoding() {
        let rtf = r"{\rtf1\ansi\deff0{\fonttbl{\f0\fcharset0 Arial;}{\f1\fcharset134 SimSun;}}\f1 \'d6\'d0\f0  \'e9\par}";
        assert_eq!(md(rtf), "中 é");
    }

    #[test]
    fn test_unicode_skips_fallback() {
        assert_eq!(md(r"{\rtf1 \u20320?\u22909?\par}"), "你好");
        assert_eq!(md(r"{\rtf1\uc2\u8364\'80\'80!\par}"), "€!");
        assert_eq!(md(r"{\rtf1 \u-10179?\u-8704?\par}"), "😀");
    }

    #[test]
    fn test_lists_tables_and_breaks() {
        let rtf = r"{\rtf1
\pard\ls1\ilvl0{\listtext\'b7\tab}one\par
\pard\ls1\ilvl1{\listtext o\tab}two\par
\pard\intbl A\cell B\cell\row
\pard\intbl 1\cell\row
\pard after\line next\page end\par}";
        assert_eq!(
            md(rtf),
            "- one\n  - two\n\n| A | B |\n| --- | --- |\n| 1 |   |\n\nafter\nnext\n\n---\n\nend"
        );
    }

    #[test]
    fn test_short_rows_pad_to_widest() {
        let rtf = r"{\rtf1
\pard\intbl A\cell B\cell C\cell\row
\pard\intbl 1\cell\row
\pard\intbl x\cell y\cell\row
\pard end\par}";
        assert_eq!(
            md(rtf),
            "| A | B | C |\n| --- | --- | --- |\n| 1 |   |   |\n| x | y |   |\n\nend"
        );
    }

    #[test]
    fn test_hyperlink_field() {
        let rtf = r#"{\rtf1 See {\field{\*\fldinst{HYPERLINK "https://example.com"}}{\fldrslt{\ul site}}} and {\field{\*\fldinst HYPERLINK \l "top"}{\fldrslt back}}.\par}"#;
        assert_eq!(
            md(rtf),
            "See [<u>site</u>](https://example.com) and [back](#top)."
        );
    }

    #[test]
    fn test_non_link_field_keeps_result() {
        let rtf = r"{\rtf1 Page {\field{\*\fldinst PAGE}{\fldrslt 3}}\par}";
        assert_eq!(md(rtf), "Page 3");
    }

    #[test]
    fn test_picture_becomes_data_uri() {
        let rtf = r"{\rtf1 {\*\shppict{\pict\pngblip\picw10\pich10 89504e47
0d0a}}{\nonshppict{\pict\wmetafile8 0102}}\par}";
        assert_eq!(md(rtf), "![图片](data:image/png;base64,iVBORw0K)");
    }

    #[test]
    fn test_unknown_ignorable_destination_is_skipped() {
        assert_eq!(md(r"{\rtf1 {\*\bkmkstart x}kept{\*\bkmkend x}\par}"), "kept");
    }

    #[test]
    fn test_missing_header() {
        assert!(parse_rtf(b"plain text").is_err());
    }

    #[test]
    fn test_hyperlink_target() {
        assert_eq!(hyperlink_target(r#"HYPERLINK "http://a.b""#).as_deref(), Some("http://a.b"));
        assert_eq!(hyperlink_target("HYPERLINK http://c.d ").as_deref(), Some("http://c.d"));
        assert_eq!(hyperlink_target(r#" HYPERLINK  \l  "x""#).as_deref(), Some("#x"));
        assert_eq!(hyperlink_target("PAGE"), None);
    }
}
