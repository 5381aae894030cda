//! Legacy Word (`.doc`) text recovery.
//!
//! Only the text of the main document survives: the File Information Block
//! locates the piece table in the table stream, pieces are decoded as UTF-16
//! or Windows-1252, and the result is split into paragraphs.

use docmd_core::{Error, Result};
use quick_xml::escape::escape;
use std::io::{Cursor, Read};

/// Warning attached to every legacy conversion.
pub const PLAIN_TEXT_WARNING: &str = "旧版 Word 文档仅提取纯文本，格式未保留";

const FIB_MAGIC: u16 = 0xA5EC;
const FIB_TABLE1_FLAG: u16 = 0x0200;
/// Index of the fcClx/lcbClx pair in the FibRgFcLcb array.
const CLX_PAIR_INDEX: usize = 33;

#[derive(Debug, Clone, PartialEq)]
pub struct FibInfo {
    pub use_table1: bool,
    pub fc_min: u32,
    pub fc_mac: u32,
    pub fc_clx: u32,
    pub lcb_clx: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextPiece {
    pub cp_start: u32,
    pub cp_end: u32,
    pub file_offset: u32,
    pub unicode: bool,
}

fn read_u16_le(data: &[u8], offset: usize) -> Option<u16> {
    data.get(offset..offset + 2)
        .map(|bytes| u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset + 4)
        .map(|bytes| u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn decode_utf16_le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Parse the File Information Block at the start of the WordDocument stream.
pub fn parse_fib(word_stream: &[u8]) -> Option<FibInfo> {
    if word_stream.len() < 256 || read_u16_le(word_stream, 0)? != FIB_MAGIC {
        return None;
    }

    let flags = read_u16_le(word_stream, 0x0A)?;
    let fc_min = read_u32_le(word_stream, 0x18)?;
    let fc_mac = read_u32_le(word_stream, 0x1C)?;

    let mut pos = 32usize;
    let csw = read_u16_le(word_stream, pos)? as usize;
    pos += 2 + csw * 2;
    let cslw = read_u16_le(word_stream, pos)? as usize;
    pos += 2 + cslw * 4;
    let cb_rg_fc_lcb = read_u16_le(word_stream, pos)? as usize;
    pos += 2;
    if word_stream.len() < pos + cb_rg_fc_lcb * 8 {
        return None;
    }

    let (fc_clx, lcb_clx) = if cb_rg_fc_lcb > CLX_PAIR_INDEX {
        let offset = pos + CLX_PAIR_INDEX * 8;
        (read_u32_le(word_stream, offset)?, read_u32_le(word_stream, offset + 4)?)
    } else {
        (0, 0)
    };

    Some(FibInfo {
        use_table1: flags & FIB_TABLE1_FLAG != 0,
        fc_min,
        fc_mac,
        fc_clx,
        lcb_clx,
    })
}

/// Read the piece table out of the CLX structure.
pub fn parse_text_pieces(table_stream: &[u8], fc_clx: u32, lcb_clx: u32) -> Vec<TextPiece> {
    let start = fc_clx as usize;
    let end = start + lcb_clx as usize;
    if lcb_clx == 0 || end > table_stream.len() {
        return Vec::new();
    }

    let clx = &table_stream[start..end];
    let mut pos = 0usize;

    while pos < clx.len() {
        let clxt = clx[pos];
        pos += 1;
        match clxt {
            // Prc: property modifiers, skipped.
            0x02 => {
                let Some(cb) = read_u16_le(clx, pos) else {
                    break;
                };
                pos += 2 + cb as usize;
            }
            // Pcdt: the piece table.
            0x01 => {
                let Some(lcb) = read_u32_le(clx, pos).map(|v| v as usize) else {
                    break;
                };
                pos += 4;
                if lcb < 16 || pos + lcb > clx.len() {
                    break;
                }
                return pieces_from_plc(&clx[pos..pos + lcb]);
            }
            _ => break,
        }
    }

    Vec::new()
}

fn pieces_from_plc(plc: &[u8]) -> Vec<TextPiece> {
    let count = (plc.len() - 4) / 12;
    let cps: Vec<u32> = (0..=count)
        .filter_map(|i| read_u32_le(plc, i * 4))
        .collect();
    let descriptors = &plc[(count + 1) * 4..];

    (0..count)
        .filter_map(|i| {
            let fc = read_u32_le(descriptors, i * 8 + 2)?;
            let unicode = fc & 0x4000_0000 == 0;
            let file_offset = if unicode { fc } else { (fc & 0x3FFF_FFFF) / 2 };
            Some(TextPiece {
                cp_start: cps[i],
                cp_end: cps[i + 1],
                file_offset,
                unicode,
            })
        })
        .collect()
}

/// Decode each piece from the WordDocument stream and concatenate them.
pub fn decode_pieces(word_stream: &[u8], pieces: &[TextPiece]) -> String {
    let mut out = String::new();

    for piece in pieces.iter().filter(|p| p.cp_end > p.cp_start) {
        let chars = (piece.cp_end - piece.cp_start) as usize;
        let len = if piece.unicode { chars * 2 } else { chars };
        let start = piece.file_offset as usize;
        let Some(slice) = word_stream.get(start..start + len) else {
            continue;
        };

        if piece.unicode {
            out.push_str(&decode_utf16_le(slice));
        } else {
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(slice);
            out.push_str(&text);
        }
    }

    out
}

/// Decode the `fcMin..fcMac` range as UTF-16 when there is no piece table.
pub fn decode_simple_range(word_stream: &[u8], fc_min: u32, fc_mac: u32) -> String {
    let start = fc_min as usize;
    let end = (fc_mac as usize).min(word_stream.len());
    if end <= start || end - start < 4 {
        return String::new();
    }
    decode_utf16_le(&word_stream[start..end])
}

/// Split raw document text into paragraphs.
///
/// Field instructions between `\x13` and `\x14` are dropped while the field
/// result up to `\x15` is kept. `\x0b` becomes a `<br>` marker.
pub fn split_paragraphs(raw: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    // One entry per open field: whether its instruction part is still running.
    let mut fields: Vec<bool> = Vec::new();

    for ch in raw.chars() {
        match ch {
            '\u{13}' => fields.push(true),
            '\u{14}' => {
                if let Some(in_instruction) = fields.last_mut() {
                    *in_instruction = false;
                }
            }
            '\u{15}' => {
                fields.pop();
            }
            _ if fields.iter().any(|&instr| instr) => {}
            '\r' | '\u{07}' | '\u{0c}' | '\n' => {
                paragraphs.push(std::mem::take(&mut current));
            }
            '\u{0b}' => current.push('\u{0b}'),
            '\t' => current.push('\t'),
            c if c.is_control() => {}
            c => current.push(c),
        }
    }
    paragraphs.push(current);

    paragraphs
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.trim_matches('\u{0b}').trim().is_empty())
        .collect()
}

/// Wrap paragraphs as escaped `<p>` elements.
pub fn paragraphs_to_html(paragraphs: &[String]) -> String {
    paragraphs
        .iter()
        .map(|p| {
            let lines: Vec<String> = p.split('\u{0b}').map(|l| escape(l.trim()).into_owned()).collect();
            format!("<p>{}</p>", lines.join("<br>"))
        })
        .collect()
}

fn read_stream<F: Read + std::io::Seek>(
    compound: &mut cfb::CompoundFile<F>,
    path: &str,
) -> Option<Vec<u8>> {
    let mut stream = compound.open_stream(path).ok()?;
    let mut data = Vec::new();
    stream.read_to_end(&mut data).ok()?;
    Some(data)
}

/// Recover the text of a legacy Word document as HTML paragraphs.
pub fn doc_to_html(bytes: &[u8]) -> Result<(String, Vec<String>)> {
    let mut compound = cfb::CompoundFile::open(Cursor::new(bytes))
        .map_err(|e| Error::Cfb(format!("Failed to open compound file: {}", e)))?;

    let word_stream = read_stream(&mut compound, "/WordDocument")
        .ok_or_else(|| Error::Cfb("WordDocument stream not found".to_string()))?;
    let fib = parse_fib(&word_stream)
        .ok_or_else(|| Error::Document("无效的 Word 文件信息块".to_string()))?;

    let table_name = if fib.use_table1 { "/1Table" } else { "/0Table" };
    let mut raw = String::new();
    if let Some(table_stream) = read_stream(&mut compound, table_name) {
        let pieces = parse_text_pieces(&table_stream, fib.fc_clx, fib.lcb_clx);
        log::debug!("Found {} text pieces in {}", pieces.len(), table_name);
        raw = decode_pieces(&word_stream, &pieces);
    }
    if raw.is_empty() {
        raw = decode_simple_range(&word_stream, fib.fc_min, fib.fc_mac);
    }

    let html = paragraphs_to_html(&split_paragraphs(&raw));
    Ok((html, vec![PLAIN_TEXT_WARNING.to_string()]))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    /// A minimal FIB with one piece table entry pointing at UTF-16 text.
    pub(crate) fn word_streams(text: &str) -> (Vec<u8>, Vec<u8>) {
        let mut word = vec![0u8; 1024];
        word[0..2].copy_from_slice(&FIB_MAGIC.to_le_bytes());
        word[0x0A..0x0C].copy_from_slice(&FIB_TABLE1_FLAG.to_le_bytes());

        // csw = 0, cslw = 0, cbRgFcLcb = 34
        let mut pos = 32;
        word[pos..pos + 2].copy_from_slice(&0u16.to_le_bytes());
        pos += 2;
        word[pos..pos + 2].copy_from_slice(&0u16.to_le_bytes());
        pos += 2;
        word[pos..pos + 2].copy_from_slice(&34u16.to_le_bytes());
        pos += 2;

        let units: Vec<u16> = text.encode_utf16().collect();
        let text_offset = 512u32;
        for (i, unit) in units.iter().enumerate() {
            let at = text_offset as usize + i * 2;
            word[at..at + 2].copy_from_slice(&unit.to_le_bytes());
        }

        let mut plc = Vec::new();
        plc.extend_from_slice(&0u32.to_le_bytes());
        plc.extend_from_slice(&(units.len() as u32).to_le_bytes());
        plc.extend_from_slice(&0u16.to_le_bytes());
        plc.extend_from_slice(&text_offset.to_le_bytes());
        plc.extend_from_slice(&0u16.to_le_bytes());

        let mut table = vec![0x01u8];
        table.extend_from_slice(&(plc.len() as u32).to_le_bytes());
        table.extend_from_slice(&plc);

        let clx_pair = pos + CLX_PAIR_INDEX * 8;
        word[clx_pair..clx_pair + 4].copy_from_slice(&0u32.to_le_bytes());
        word[clx_pair + 4..clx_pair + 8].copy_from_slice(&(table.len() as u32).to_le_bytes());

        (word, table)
    }

    pub(crate) fn compound_doc(text: &str) -> Vec<u8> {
        let (word, table) = word_streams(text);
        let mut compound = cfb::CompoundFile::create(Cursor::new(Vec::new())).unwrap();
        compound
            .create_stream("/WordDocument")
            .unwrap()
            .write_all(&word)
            .unwrap();
        compound.create_stream("/1Table").unwrap().write_all(&table).unwrap();
        compound.flush().unwrap();
        compound.into_inner().into_inner()
    }

    #[test]
    fn test_parse_fib() {
        let (word, table) = word_streams("hi");
        let fib = parse_fib(&word).unwrap();
        assert!(fib.use_table1);
        assert_eq!(fib.fc_clx, 0);
        assert_eq!(fib.lcb_clx, table.len() as u32);
        assert!(parse_fib(&[0u8; 16]).is_none());
    }

    #[test]
    fn test_pieces_decode_text() {
        let (word, table) = word_streams("Hello\rWorld");
        let fib = parse_fib(&word).unwrap();
        let pieces = parse_text_pieces(&table, fib.fc_clx, fib.lcb_clx);
        assert_eq!(
            pieces,
            [TextPiece {
                cp_start: 0,
                cp_end: 11,
                file_offset: 512,
                unicode: true,
            }]
        );
        assert_eq!(decode_pieces(&word, &pieces), "Hello\rWorld");
    }

    #[test]
    fn test_compressed_piece_uses_windows_1252() {
        let word = b"\x93quoted\x94".to_vec();
        let pieces = [TextPiece {
            cp_start: 0,
            cp_end: 8,
            file_offset: 0,
            unicode: false,
        }];
        assert_eq!(decode_pieces(&word, &pieces), "\u{201c}quoted\u{201d}");
    }

    #[test]
    fn test_split_paragraphs_handles_fields_and_controls() {
        let raw = "Title\r\u{13} HYPERLINK \"x\" \u{14}link\u{15} text\u{07}cell\u{0b}next\r\r\u{01}\u{0c}end";
        assert_eq!(
            split_paragraphs(raw),
            ["Title", "link text", "cell\u{0b}next", "end"]
        );
    }

    #[test]
    fn test_paragraph_html_escapes_and_breaks() {
        let html = paragraphs_to_html(&["a < b".to_string(), "x\u{0b}y".to_string()]);
        assert_eq!(html, "<p>a &lt; b</p><p>x<br>y</p>");
    }

    #[test]
    fn test_doc_to_html() {
        let (html, warnings) = doc_to_html(&compound_doc("First\rSecond & more\r")).unwrap();
        assert_eq!(html, "<p>First</p><p>Second &amp; more</p>");
        assert_eq!(warnings, [PLAIN_TEXT_WARNING]);
    }

    #[test]
    fn test_not_a_compound_file() {
        assert!(matches!(doc_to_html(b"not ole").unwrap_err(), Error::Cfb(_)));
    }
}
