//! Character encoding detection and conversion.
//!
//! Handles the two source encodings the document model recognizes: UTF-8 and
//! windows-1252. Input bytes are converted to the internal representation
//! (Rust `String`, always UTF-8) before tokenization; serialization can
//! convert back out.

use crate::error::{Error, Result};

/// Source encoding of document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringEncoding {
    Utf8,
    Windows1252,
}

impl StringEncoding {
    /// Parses an encoding name from an XML declaration, case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(StringEncoding::Utf8),
            "windows-1252" | "cp1252" => Some(StringEncoding::Windows1252),
            _ => None,
        }
    }
}

/// Decode raw bytes with the given encoding into the internal representation.
pub fn decode(input: &[u8], encoding: StringEncoding) -> Result<String> {
    match encoding {
        StringEncoding::Utf8 => {
            // Skip UTF-8 BOM if present
            let input = input.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(input);
            std::str::from_utf8(input)
                .map(|s| s.to_string())
                .map_err(|e| Error::Encoding(format!("invalid UTF-8: {e}")))
        }
        StringEncoding::Windows1252 => decode_windows_1252(input),
    }
}

/// Encode internal text back into raw bytes with the given encoding.
pub fn encode(input: &str, encoding: StringEncoding) -> Result<Vec<u8>> {
    match encoding {
        StringEncoding::Utf8 => Ok(input.as_bytes().to_vec()),
        StringEncoding::Windows1252 => encode_windows_1252(input),
    }
}

/// Extract the encoding named in the XML declaration, if any.
///
/// Scans the leading `<?xml ... ?>` for an `encoding="..."` pseudo-attribute.
/// The declaration is ASCII-compatible in both recognized encodings, so the
/// scan runs over raw bytes before any conversion. A declared encoding the
/// model does not recognize is an error.
pub fn declared_encoding(input: &[u8]) -> Result<Option<StringEncoding>> {
    let input = input.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(input);
    if !input.starts_with(b"<?xml") {
        return Ok(None);
    }
    let end = match input.windows(2).position(|w| w == b"?>") {
        Some(pos) => pos,
        None => return Ok(None),
    };
    let decl = &input[..end];

    let key_pos = match decl.windows(8).position(|w| w == b"encoding") {
        Some(pos) => pos,
        None => return Ok(None),
    };
    let rest = &decl[key_pos + 8..];

    // encoding <ws>* = <ws>* ["']label["']
    let mut pos = 0;
    while pos < rest.len() && rest[pos].is_ascii_whitespace() {
        pos += 1;
    }
    if pos >= rest.len() || rest[pos] != b'=' {
        return Ok(None);
    }
    pos += 1;
    while pos < rest.len() && rest[pos].is_ascii_whitespace() {
        pos += 1;
    }
    if pos >= rest.len() || (rest[pos] != b'"' && rest[pos] != b'\'') {
        return Ok(None);
    }
    let quote = rest[pos];
    pos += 1;
    let label_start = pos;
    while pos < rest.len() && rest[pos] != quote {
        pos += 1;
    }
    let label = String::from_utf8_lossy(&rest[label_start..pos]);

    match StringEncoding::from_label(&label) {
        Some(encoding) => Ok(Some(encoding)),
        None => Err(Error::Encoding(format!("unrecognized encoding \"{label}\""))),
    }
}

/// Convert windows-1252 bytes to the internal representation.
fn decode_windows_1252(input: &[u8]) -> Result<String> {
    let mut result = String::with_capacity(input.len());
    for (pos, &b) in input.iter().enumerate() {
        match windows_1252_to_char(b) {
            Some(c) => result.push(c),
            None => {
                return Err(Error::Encoding(format!(
                    "byte 0x{b:02X} at offset {pos} is not defined in windows-1252"
                )));
            }
        }
    }
    Ok(result)
}

/// Convert internal text to windows-1252 bytes.
fn encode_windows_1252(input: &str) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(input.len());
    for c in input.chars() {
        match char_to_windows_1252(c) {
            Some(b) => result.push(b),
            None => {
                return Err(Error::Encoding(format!(
                    "U+{:04X} is not representable in windows-1252",
                    c as u32
                )));
            }
        }
    }
    Ok(result)
}

/// Map one windows-1252 byte to its Unicode character.
///
/// Bytes outside 0x80..=0x9F coincide with Latin-1; inside that range
/// windows-1252 substitutes printable characters, with five positions left
/// undefined.
fn windows_1252_to_char(b: u8) -> Option<char> {
    match b {
        0x80..=0x9F => WINDOWS_1252_C1[(b - 0x80) as usize],
        _ => Some(b as char),
    }
}

/// Reverse mapping of `windows_1252_to_char`.
fn char_to_windows_1252(c: char) -> Option<u8> {
    let cp = c as u32;
    if cp < 0x80 || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    WINDOWS_1252_C1
        .iter()
        .position(|&entry| entry == Some(c))
        .map(|idx| 0x80 + idx as u8)
}

/// The 0x80..=0x9F block of windows-1252. `None` marks undefined bytes.
const WINDOWS_1252_C1: [Option<char>; 32] = [
    Some('\u{20AC}'), // 0x80 euro sign
    None,             // 0x81
    Some('\u{201A}'), // 0x82
    Some('\u{0192}'), // 0x83
    Some('\u{201E}'), // 0x84
    Some('\u{2026}'), // 0x85
    Some('\u{2020}'), // 0x86
    Some('\u{2021}'), // 0x87
    Some('\u{02C6}'), // 0x88
    Some('\u{2030}'), // 0x89
    Some('\u{0160}'), // 0x8A
    Some('\u{2039}'), // 0x8B
    Some('\u{0152}'), // 0x8C
    None,             // 0x8D
    Some('\u{017D}'), // 0x8E
    None,             // 0x8F
    None,             // 0x90
    Some('\u{2018}'), // 0x91
    Some('\u{2019}'), // 0x92
    Some('\u{201C}'), // 0x93
    Some('\u{201D}'), // 0x94
    Some('\u{2022}'), // 0x95
    Some('\u{2013}'), // 0x96
    Some('\u{2014}'), // 0x97
    Some('\u{02DC}'), // 0x98
    Some('\u{2122}'), // 0x99
    Some('\u{0161}'), // 0x9A
    Some('\u{203A}'), // 0x9B
    Some('\u{0153}'), // 0x9C
    None,             // 0x9D
    Some('\u{017E}'), // 0x9E
    Some('\u{0178}'), // 0x9F
];
