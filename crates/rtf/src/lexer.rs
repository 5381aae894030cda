//! RTF tokenizer.
//!
//! Works on raw bytes: text runs are left undecoded so the parser can apply
//! the document's code page, and `\bin` payloads are sliced out verbatim.

use docmd_core::{Error, Result};

/// A control word with its parameter already interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlWord<'a> {
    Rtf,
    AnsiCodePage(i32),
    DefaultFont(i32),

    // Header destinations
    FontTable,
    ColorTable,
    StyleSheet,
    Info,

    // Fonts
    Font(i32),
    FontCharset(i32),

    // Styles
    ParagraphStyle(i32),
    CharacterStyle(i32),

    // Character formatting
    Bold(bool),
    Italic(bool),
    Underline(bool),
    UnderlineNone,
    Strike(bool),
    Plain,

    // Paragraphs and breaks
    Par,
    Pard,
    Line,
    Page,
    Tab,

    // Lists
    ListOverride(i32),
    ListLevel(i32),
    ListText,
    OldListText,

    // Tables
    InTable,
    Cell,
    Row,
    RowDefaults,

    // Fields
    Field,
    FieldInstruction,
    FieldResult,

    // Pictures
    Picture,
    ShapePicture,
    NonShapePicture,
    PngBlip,
    JpegBlip,
    EmfBlip,
    WindowsMetafile,
    DeviceIndependentBitmap,
    MacPict,

    // Unicode
    Unicode(i32),
    UnicodeSkip(i32),

    // Special characters
    Bullet,
    EmDash,
    EnDash,
    LeftQuote,
    RightQuote,
    LeftDoubleQuote,
    RightDoubleQuote,

    /// A destination whose content never reaches the body.
    SkippedDestination,
    /// `\*`: the following destination may be ignored if unknown.
    IgnorableDestination,

    Unknown(&'a str, Option<i32>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    OpenBrace,
    CloseBrace,
    Control(ControlWord<'a>),
    /// Undecoded text bytes; line endings are not included.
    Text(&'a [u8]),
    /// An escaped character (`\\`, `\{`, `\}`, `\~`, `\_`).
    Literal(char),
    /// A `\'hh` byte in the document code page.
    Hex(u8),
    /// A `\binN` payload.
    Binary(&'a [u8]),
}

/// Destinations dropped as a whole.
const SKIPPED_DESTINATIONS: &[&str] = &[
    "header", "headerl", "headerr", "headerf", "footer", "footerl", "footerr", "footerf",
    "footnote", "object", "xe", "tc", "txe", "themedata", "colorschememapping", "datastore",
    "latentstyles", "listtable", "listoverridetable", "revtbl", "rsidtbl", "generator",
    "filetbl", "pgdsctbl", "private",
];

fn match_control_word(word: &str, param: Option<i32>) -> ControlWord<'_> {
    let value = param.unwrap_or(0);
    let on = param.unwrap_or(1) != 0;

    match word {
        "rtf" => ControlWord::Rtf,
        "ansicpg" => ControlWord::AnsiCodePage(value),
        "deff" => ControlWord::DefaultFont(value),

        "fonttbl" => ControlWord::FontTable,
        "colortbl" => ControlWord::ColorTable,
        "stylesheet" => ControlWord::StyleSheet,
        "info" => ControlWord::Info,

        "f" => ControlWord::Font(value),
        "fcharset" => ControlWord::FontCharset(value),

        "s" => ControlWord::ParagraphStyle(value),
        "cs" | "ds" | "ts" => ControlWord::CharacterStyle(value),

        "b" => ControlWord::Bold(on),
        "i" => ControlWord::Italic(on),
        "ul" => ControlWord::Underline(on),
        "ulnone" => ControlWord::UnderlineNone,
        "strike" | "striked" => ControlWord::Strike(on),
        "plain" => ControlWord::Plain,

        "par" => ControlWord::Par,
        "pard" => ControlWord::Pard,
        "line" => ControlWord::Line,
        "page" => ControlWord::Page,
        "tab" => ControlWord::Tab,

        "ls" => ControlWord::ListOverride(value),
        "ilvl" => ControlWord::ListLevel(value),
        "listtext" => ControlWord::ListText,
        "pntext" => ControlWord::OldListText,

        "intbl" => ControlWord::InTable,
        "cell" => ControlWord::Cell,
        "row" => ControlWord::Row,
        "trowd" => ControlWord::RowDefaults,

        "field" => ControlWord::Field,
        "fldinst" => ControlWord::FieldInstruction,
        "fldrslt" => ControlWord::FieldResult,

        "pict" => ControlWord::Picture,
        "shppict" => ControlWord::ShapePicture,
        "nonshppict" => ControlWord::NonShapePicture,
        "pngblip" => ControlWord::PngBlip,
        "jpegblip" => ControlWord::JpegBlip,
        "emfblip" => ControlWord::EmfBlip,
        "wmetafile" => ControlWord::WindowsMetafile,
        "dibitmap" => ControlWord::DeviceIndependentBitmap,
        "macpict" => ControlWord::MacPict,

        "u" => ControlWord::Unicode(value),
        "uc" => ControlWord::UnicodeSkip(value),

        "bullet" => ControlWord::Bullet,
        "emdash" => ControlWord::EmDash,
        "endash" => ControlWord::EnDash,
        "lquote" => ControlWord::LeftQuote,
        "rquote" => ControlWord::RightQuote,
        "ldblquote" => ControlWord::LeftDoubleQuote,
        "rdblquote" => ControlWord::RightDoubleQuote,

        _ if SKIPPED_DESTINATIONS.contains(&word) => ControlWord::SkippedDestination,
        _ => ControlWord::Unknown(word, param),
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|d| d as u8)
}

/// Tokenizer over an RTF byte stream.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Tokenize the entire input.
    pub fn tokenize(mut self) -> Result<Vec<Token<'a>>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn next_token(&mut self) -> Result<Option<Token<'a>>> {
        loop {
            let Some(byte) = self.peek() else {
                return Ok(None);
            };
            match byte {
                b'{' => {
                    self.pos += 1;
                    return Ok(Some(Token::OpenBrace));
                }
                b'}' => {
                    self.pos += 1;
                    return Ok(Some(Token::CloseBrace));
                }
                b'\\' => return self.control().map(Some),
                b'\r' | b'\n' | 0 => self.pos += 1,
                _ => return Ok(Some(self.text())),
            }
        }
    }

    fn text(&mut self) -> Token<'a> {
        let input = self.input;
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if matches!(byte, b'\\' | b'{' | b'}' | b'\r' | b'\n' | 0) {
                break;
            }
            self.pos += 1;
        }
        Token::Text(&input[start..self.pos])
    }

    fn control(&mut self) -> Result<Token<'a>> {
        self.pos += 1;
        let Some(symbol) = self.peek() else {
            return Err(Error::Rtf("unexpected end of input after '\\'".to_string()));
        };

        if !symbol.is_ascii_alphabetic() {
            self.pos += 1;
            return Ok(match symbol {
                b'\\' | b'{' | b'}' => Token::Literal(symbol as char),
                b'~' => Token::Literal('\u{00A0}'),
                b'_' => Token::Literal('\u{2011}'),
                b'\'' => self.hex()?,
                b'*' => Token::Control(ControlWord::IgnorableDestination),
                b'\r' | b'\n' => Token::Control(ControlWord::Par),
                b'\t' => Token::Control(ControlWord::Tab),
                // \- optional hyphen, \| \: formula and index symbols
                _ => Token::Text(&[]),
            });
        }

        let input = self.input;
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        // Control words are ASCII letters, so this cannot fail.
        let word = std::str::from_utf8(&input[start..self.pos]).unwrap_or_default();
        let param = self.parameter();

        if self.peek() == Some(b' ') {
            self.pos += 1;
        }

        if word == "bin" {
            let len = param.unwrap_or(0).max(0) as usize;
            let end = (self.pos + len).min(self.input.len());
            let payload = &input[self.pos..end];
            self.pos = end;
            return Ok(Token::Binary(payload));
        }

        Ok(Token::Control(match_control_word(word, param)))
    }

    fn parameter(&mut self) -> Option<i32> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits_start {
            self.pos = start;
            return None;
        }

        let text = std::str::from_utf8(&self.input[start..self.pos]).unwrap_or("0");
        let value = text.parse::<i64>().unwrap_or(0);
        Some(value.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
    }

    fn hex(&mut self) -> Result<Token<'a>> {
        let digits = self.input.get(self.pos..self.pos + 2);
        let value = digits.and_then(|d| Some(hex_value(d[0])? << 4 | hex_value(d[1])?));
        match value {
            Some(byte) => {
                self.pos += 2;
                Ok(Token::Hex(byte))
            }
            None => Err(Error::Rtf(format!("invalid hex escape at byte {}", self.pos))),
        }
    }
}

/// Tokenize an RTF byte stream.
pub fn tokenize(input: &[u8]) -> Result<Vec<Token<'_>>> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_simple_tokenization() {
        let tokens = tokenize(br"{\rtf1\ansi Hello}").unwrap();
        assert_eq!(
            tokens,
            [
                Token::OpenBrace,
                Token::Control(ControlWord::Rtf),
                Token::Control(ControlWord::Unknown("ansi", None)),
                Token::Text(b"Hello"),
                Token::CloseBrace,
            ]
        );
    }

    #[test]
    fn test_parameters_and_delimiters() {
        let tokens = tokenize(br"\b0\fs-24 x\u8364?").unwrap();
        assert_eq!(
            tokens,
            [
                Token::Control(ControlWord::Bold(false)),
                Token::Control(ControlWord::Unknown("fs", Some(-24))),
                Token::Text(b"x"),
                Token::Control(ControlWord::Unicode(8364)),
                Token::Text(b"?"),
            ]
        );
    }

    #[test]
    fn test_control_symbols() {
        let tokens = tokenize(b"\\{\\}\\\\\\'e9\\~\\*\\\n").unwrap();
        assert_eq!(
            tokens,
            [
                Token::Literal('{'),
                Token::Literal('}'),
                Token::Literal('\\'),
                Token::Hex(0xe9),
                Token::Literal('\u{00A0}'),
                Token::Control(ControlWord::IgnorableDestination),
                Token::Control(ControlWord::Par),
            ]
        );
    }

    #[test]
    fn test_line_endings_split_text() {
        let tokens = tokenize(b"ab\r\ncd").unwrap();
        assert_eq!(tokens, [Token::Text(b"ab"), Token::Text(b"cd")]);
    }

    #[test]
    fn test_binary_payload() {
        let tokens = tokenize(b"\\bin3 {}\\x}").unwrap();
        assert_eq!(tokens, [Token::Binary(b"{}\\"), Token::Text(b"x"), Token::CloseBrace]);
    }

    #[test]
    fn test_skipped_destinations() {
        let tokens = tokenize(br"\header\footnote").unwrap();
        assert_eq!(
            tokens,
            [
                Token::Control(ControlWord::SkippedDestination),
                Token::Control(ControlWord::SkippedDestination),
            ]
        );
    }

    #[test]
    fn test_bad_hex_escape() {
        assert!(tokenize(br"\'zz").is_err());
        assert!(tokenize(br"\'a").is_err());
    }
}
