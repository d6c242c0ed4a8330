//! SAX event boundary.
//!
//! The document builder consumes parse notifications through the
//! [`ContentHandler`] trait rather than talking to a tokenizer directly.
//! [`SaxDriver`] adapts quick-xml's pull events onto that trait, splitting
//! `xmlns`/`xmlns:*` attributes out into prefix-mapping events the way SAX2
//! reports them, and stamping events with byte positions for error context.

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};

/// Callbacks for SAX-style parse notifications.
///
/// Prefix mappings for an element are reported before its `start_element`
/// and unwound after its `end_element`, scoped to the element's lifetime.
pub trait ContentHandler {
    /// Called once before the first event.
    fn start_document(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once after the last event, at end of input.
    fn end_document(&mut self, position: u64) -> Result<()> {
        let _ = position;
        Ok(())
    }

    /// Start of an element. `name` is the raw tag name (`prefix:local`);
    /// `attributes` are `(name, value)` pairs with entities decoded and
    /// `xmlns` declarations already removed.
    fn start_element(
        &mut self,
        name: &str,
        attributes: Vec<(String, String)>,
        position: u64,
    ) -> Result<()>;

    /// End of an element, carrying the raw tag name for match checking.
    fn end_element(&mut self, name: &str, position: u64) -> Result<()>;

    /// A run of character data, entities decoded. Consecutive runs may
    /// arrive as separate events.
    fn characters(&mut self, text: &str) -> Result<()>;

    /// A prefix-to-URI binding entering scope. The empty prefix is the
    /// default namespace.
    fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) -> Result<()>;

    /// A prefix binding leaving scope.
    fn end_prefix_mapping(&mut self, prefix: &str) -> Result<()>;
}

/// Drives a [`ContentHandler`] with events tokenized from decoded XML text.
pub struct SaxDriver<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> SaxDriver<'a> {
    /// Creates a driver over already-decoded XML text.
    pub fn new(text: &'a str) -> Self {
        let mut reader = Reader::from_str(text);
        // Whitespace policy belongs to the handler, not the tokenizer
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;
        SaxDriver { reader }
    }

    /// Tokenizes the input to completion, forwarding every event. Returns
    /// on end of input or the first fatal error.
    pub fn run<H: ContentHandler>(&mut self, handler: &mut H) -> Result<()> {
        handler.start_document()?;

        let mut buf = Vec::new();
        // Prefixes declared by each currently-open element
        let mut mapping_stack: Vec<Vec<String>> = Vec::new();

        loop {
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => self.element(e, handler, &mut mapping_stack, false)?,
                Ok(Event::Empty(ref e)) => self.element(e, handler, &mut mapping_stack, true)?,
                Ok(Event::End(ref e)) => {
                    let name = self.decode(e.name().as_ref())?;
                    handler.end_element(&name, self.position())?;
                    if let Some(prefixes) = mapping_stack.pop() {
                        for prefix in prefixes.iter().rev() {
                            handler.end_prefix_mapping(prefix)?;
                        }
                    }
                }
                Ok(Event::Text(ref e)) => {
                    let raw = self.decode(e.as_ref())?;
                    let text = unescape(&raw)
                        .map_err(|e| Error::malformed(e.to_string(), self.position()))?;
                    handler.characters(&text)?;
                }
                Ok(Event::CData(ref e)) => {
                    let text = self.decode(e.as_ref())?;
                    handler.characters(&text)?;
                }
                Ok(Event::GeneralRef(ref e)) => {
                    let name = self.decode(e.as_ref())?;
                    let resolved = resolve_entity(&name)
                        .ok_or_else(|| {
                            Error::malformed(
                                format!("unknown entity reference \"&{name};\""),
                                self.position(),
                            )
                        })?;
                    handler.characters(&resolved)?;
                }
                // The lite model carries no comments, PIs, or DOCTYPE; the
                // declaration's encoding was consumed before tokenization.
                Ok(Event::Comment(_))
                | Ok(Event::PI(_))
                | Ok(Event::Decl(_))
                | Ok(Event::DocType(_)) => {}
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::malformed(
                        format!("XML parse error: {e}"),
                        self.position(),
                    ));
                }
            }
            buf.clear();
        }

        handler.end_document(self.position())
    }

    fn element<H: ContentHandler>(
        &mut self,
        e: &BytesStart<'_>,
        handler: &mut H,
        mapping_stack: &mut Vec<Vec<String>>,
        is_empty: bool,
    ) -> Result<()> {
        let name = self.decode(e.name().as_ref())?;

        let mut attributes: Vec<(String, String)> = Vec::new();
        let mut mappings: Vec<(String, String)> = Vec::new();
        for attr in e.attributes() {
            let attr =
                attr.map_err(|e| Error::malformed(format!("bad attribute: {e}"), self.position()))?;
            let key = self.decode(attr.key.as_ref())?;
            let value = attr
                .unescape_value()
                .map_err(|e| Error::malformed(e.to_string(), self.position()))?
                .into_owned();

            if key == "xmlns" {
                mappings.push((String::new(), value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                mappings.push((prefix.to_string(), value));
            } else {
                attributes.push((key, value));
            }
        }

        for (prefix, uri) in &mappings {
            handler.start_prefix_mapping(prefix, uri)?;
        }
        handler.start_element(&name, attributes, self.position())?;

        if is_empty {
            handler.end_element(&name, self.position())?;
            for (prefix, _) in mappings.iter().rev() {
                handler.end_prefix_mapping(prefix)?;
            }
        } else {
            mapping_stack.push(mappings.into_iter().map(|(prefix, _)| prefix).collect());
        }
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String> {
        self.reader
            .decoder()
            .decode(bytes)
            .map(|s| s.into_owned())
            .map_err(|e| Error::malformed(e.to_string(), self.position()))
    }

    fn position(&self) -> u64 {
        self.reader.buffer_position() as u64
    }
}

/// Resolve an entity reference name (without `&` and `;`) to its text.
///
/// Handles the five built-in entities and numeric character references;
/// anything else would need DTD processing, which the model excludes.
fn resolve_entity(name: &str) -> Option<String> {
    if let Some(numeric) = name.strip_prefix('#') {
        let codepoint = if let Some(hex) = numeric
            .strip_prefix('x')
            .or_else(|| numeric.strip_prefix('X'))
        {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            numeric.parse::<u32>().ok()?
        };
        return char::from_u32(codepoint).map(|c| c.to_string());
    }
    match name {
        "lt" => Some("<".to_string()),
        "gt" => Some(">".to_string()),
        "amp" => Some("&".to_string()),
        "quot" => Some("\"".to_string()),
        "apos" => Some("'".to_string()),
        _ => None,
    }
}
