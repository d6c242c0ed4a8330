//! Streaming parse front end.
//!
//! `MinidomParser` reads a byte stream to completion, settles the source
//! encoding, tokenizes through the SAX boundary, and hands events to a
//! [`MinidomBuilder`]. Parsing is synchronous: one call, one finished
//! document or one fatal error with nothing half-built left behind.

pub mod builder;

pub use builder::{BuilderState, MinidomBuilder};

use std::io::Read;

use crate::dom::Document;
use crate::encoding::{self, StringEncoding};
use crate::error::{Error, Result};
use crate::sax::SaxDriver;
use crate::trace_parse;

/// SAX-backed DOM parser.
pub struct MinidomParser {
    builder: MinidomBuilder,
}

impl MinidomParser {
    /// Creates a parser with default policies: surrounding whitespace is
    /// trimmed from character data and the source encoding is recorded on
    /// built elements.
    pub fn new() -> Self {
        MinidomParser {
            builder: MinidomBuilder::new(),
        }
    }

    /// Parses the stream to its end. Any previously built document is
    /// discarded; steal it first to keep it.
    pub fn parse<R: Read>(&mut self, mut input: R) -> Result<()> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;
        self.parse_bytes(&bytes, None)
    }

    /// Parses at most `size` bytes from the stream. `parse` is the
    /// read-until-end case.
    pub fn parse_sized<R: Read>(&mut self, input: R, size: usize) -> Result<()> {
        let mut bytes = Vec::new();
        input.take(size as u64).read_to_end(&mut bytes)?;
        self.parse_bytes(&bytes, None)
    }

    /// Parses with a caller-forced source encoding; no declaration sniffing
    /// or fallback.
    pub fn parse_with_encoding<R: Read>(
        &mut self,
        mut input: R,
        encoding: StringEncoding,
    ) -> Result<()> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;
        self.parse_bytes(&bytes, Some(encoding))
    }

    /// Parses already-decoded XML text.
    pub fn parse_str(&mut self, xml: &str) -> Result<()> {
        if xml.is_empty() {
            return Err(Error::malformed("no stream available", 0));
        }
        self.run(xml, StringEncoding::Utf8)
    }

    fn parse_bytes(&mut self, bytes: &[u8], forced: Option<StringEncoding>) -> Result<()> {
        if bytes.is_empty() {
            return Err(Error::malformed("no stream available", 0));
        }
        let (text, source) = resolve_encoding(bytes, forced)?;
        trace_parse!("decoded {} bytes as {:?}", bytes.len(), source);
        self.run(&text, source)
    }

    fn run(&mut self, text: &str, source: StringEncoding) -> Result<()> {
        self.builder.clear();
        self.builder.set_source_encoding(source);
        match SaxDriver::new(text).run(&mut self.builder) {
            Ok(()) => Ok(()),
            Err(e) => {
                // Never leave a half-built document reachable
                self.builder.clear();
                Err(e)
            }
        }
    }

    /// The built document.
    pub fn document(&self) -> &Document {
        self.builder.document()
    }

    /// Transfers the built document out; the parser keeps an empty one.
    pub fn steal_document(&mut self) -> Document {
        self.builder.steal_document()
    }

    /// Hands the parser a document to hold in place of whatever it has
    /// built. A later `parse` discards it like any other built document.
    pub fn set_document(&mut self, document: Document) {
        self.builder.set_document(document);
    }

    /// Discards any built document and resets the parser to idle.
    pub fn clear(&mut self) {
        self.builder.clear();
    }

    /// See [`MinidomBuilder::preserve_character_data`].
    pub fn preserve_character_data(&mut self, preserve: bool) {
        self.builder.preserve_character_data(preserve);
    }

    /// See [`MinidomBuilder::store_encoding`].
    pub fn store_encoding(&mut self, flag: bool) {
        self.builder.store_encoding(flag);
    }
}

impl Default for MinidomParser {
    fn default() -> Self {
        MinidomParser::new()
    }
}

/// Settle the source encoding: forced beats declared; with neither, try
/// UTF-8 and fall back to windows-1252 on an invalid byte sequence.
fn resolve_encoding(
    bytes: &[u8],
    forced: Option<StringEncoding>,
) -> Result<(String, StringEncoding)> {
    if let Some(enc) = forced {
        return Ok((encoding::decode(bytes, enc)?, enc));
    }
    if let Some(declared) = encoding::declared_encoding(bytes)? {
        return Ok((encoding::decode(bytes, declared)?, declared));
    }
    match encoding::decode(bytes, StringEncoding::Utf8) {
        Ok(text) => Ok((text, StringEncoding::Utf8)),
        Err(_) => {
            let text = encoding::decode(bytes, StringEncoding::Windows1252)?;
            Ok((text, StringEncoding::Windows1252))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qname::Uri;

    #[test]
    fn test_parse_simple_document() {
        let mut parser = MinidomParser::new();
        parser.parse("<root><child>hi</child></root>".as_bytes()).unwrap();

        let root = parser.document().get_root_element().unwrap();
        assert_eq!(root.borrow().local_name(), "root");
        let child = root.borrow().get_element_by_tag_name("child", false).unwrap();
        assert_eq!(child.borrow().character_data(), "hi");
    }

    #[test]
    fn test_parse_namespaces_end_to_end() {
        let mut parser = MinidomParser::new();
        parser.store_encoding(true);
        parser
            .parse(r#"<root xmlns:x="urn:x"><x:child>hi</x:child></root>"#.as_bytes())
            .unwrap();

        let root = parser.document().get_root_element().unwrap();
        let child = root
            .borrow()
            .get_element_by_tag_name_ns(&Uri::new("urn:x"), "child", true)
            .unwrap();
        assert_eq!(child.borrow().character_data(), "hi");
        assert_eq!(child.borrow().encoding(), Some(StringEncoding::Utf8));
    }

    #[test]
    fn test_parse_attributes() {
        let mut parser = MinidomParser::new();
        parser
            .parse(r#"<values int="314" double="3.14" string="abc"/>"#.as_bytes())
            .unwrap();

        let root = parser.document().get_root_element().unwrap();
        assert_eq!(root.borrow().attributes().get("int"), Some("314"));
        assert_eq!(root.borrow().attributes().get("double"), Some("3.14"));
        assert_eq!(root.borrow().attributes().get("string"), Some("abc"));
    }

    #[test]
    fn test_empty_input_fails() {
        let mut parser = MinidomParser::new();
        let err = parser.parse(&b""[..]).unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { .. }));
    }

    #[test]
    fn test_mismatched_tags_fail() {
        let mut parser = MinidomParser::new();
        let err = parser.parse(&b"<a><b></a>"[..]).unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { .. }));
        // No partial tree is reachable afterwards
        assert!(parser.document().root().is_none());
    }

    #[test]
    fn test_truncated_input_fails() {
        let mut parser = MinidomParser::new();
        let err = parser.parse(&b"<a><b>"[..]).unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { .. }));
    }

    #[test]
    fn test_parse_sized_truncation_fails() {
        let mut parser = MinidomParser::new();
        // Only the first 6 bytes of a complete document
        let err = parser.parse_sized(&b"<a><b/></a>"[..], 6).unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { .. }));
    }

    #[test]
    fn test_declared_windows_1252() {
        let mut bytes =
            br#"<?xml version="1.0" encoding="windows-1252"?><r>caf"#.to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"</r>");

        let mut parser = MinidomParser::new();
        parser.parse(&bytes[..]).unwrap();
        let root = parser.document().get_root_element().unwrap();
        assert_eq!(root.borrow().character_data(), "caf\u{e9}");
    }

    #[test]
    fn test_undeclared_windows_1252_fallback() {
        // 0xE9 alone is invalid UTF-8, so the parser retries as 1252
        let mut bytes = b"<r>caf".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"</r>");

        let mut parser = MinidomParser::new();
        parser.store_encoding(true);
        parser.parse(&bytes[..]).unwrap();
        let root = parser.document().get_root_element().unwrap();
        assert_eq!(root.borrow().character_data(), "caf\u{e9}");
        assert_eq!(
            root.borrow().encoding(),
            Some(StringEncoding::Windows1252)
        );
    }

    #[test]
    fn test_forced_encoding_no_fallback() {
        let mut bytes = b"<r>caf".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"</r>");

        let mut parser = MinidomParser::new();
        let err = parser
            .parse_with_encoding(&bytes[..], StringEncoding::Utf8)
            .unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn test_reparse_replaces_document() {
        let mut parser = MinidomParser::new();
        parser.parse_str("<first/>").unwrap();
        parser.parse_str("<second/>").unwrap();

        let root = parser.document().get_root_element().unwrap();
        assert_eq!(root.borrow().local_name(), "second");
    }

    #[test]
    fn test_set_document() {
        let mut giver = MinidomParser::new();
        giver.parse_str("<root>moved</root>").unwrap();

        let mut taker = MinidomParser::new();
        taker.set_document(giver.steal_document());
        let root = taker.document().get_root_element().unwrap();
        assert_eq!(root.borrow().character_data(), "moved");
    }

    #[test]
    fn test_steal_document_survives_clear() {
        let mut parser = MinidomParser::new();
        parser.parse_str("<root>kept</root>").unwrap();

        let doc = parser.steal_document();
        parser.clear();

        let root = doc.get_root_element().unwrap();
        assert_eq!(root.borrow().character_data(), "kept");
    }

    #[test]
    fn test_escaped_text_round_trips() {
        let mut parser = MinidomParser::new();
        parser
            .parse_str("<e>&lt;a &amp; b&gt;</e>")
            .unwrap();
        let root = parser.document().get_root_element().unwrap();
        assert_eq!(root.borrow().character_data(), "<a & b>");
    }
}
