//! Event-driven document construction.
//!
//! `MinidomBuilder` consumes SAX events and grows a `Document` tree, tracking
//! namespace scopes and enforcing well-formedness: one root, matched tags,
//! no content outside the root, every prefix resolvable.

use std::rc::Rc;

use crate::dom::attributes::AttributeNode;
use crate::dom::{Document, Element, ElementRef};
use crate::encoding::StringEncoding;
use crate::error::{Error, Result};
use crate::namespace::NamespaceStack;
use crate::qname::{QName, Uri};
use crate::sax::ContentHandler;

/// Construction progress. `Complete` means the root element has closed;
/// `clear` returns the builder to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    Idle,
    InProgress,
    Complete,
}

/// Builds a `Document` incrementally from SAX events.
///
/// After a fatal error the builder's contents are undefined; call
/// [`MinidomBuilder::clear`] before reuse. `MinidomParser` does this
/// automatically, so no half-built document is ever reachable through it.
pub struct MinidomBuilder {
    document: Document,
    stack: Vec<ElementRef>,
    namespaces: NamespaceStack,
    /// Mappings reported before the element they belong to has started.
    pending_mappings: Vec<(String, Uri)>,
    /// Character runs accumulated since the last structural event.
    pending_text: String,
    state: BuilderState,
    preserve_character_data: bool,
    store_encoding: bool,
    source_encoding: StringEncoding,
}

impl MinidomBuilder {
    /// Creates an idle builder.
    pub fn new() -> Self {
        MinidomBuilder {
            document: Document::new(),
            stack: Vec::new(),
            namespaces: NamespaceStack::new(),
            pending_mappings: Vec::new(),
            pending_text: String::new(),
            state: BuilderState::Idle,
            preserve_character_data: false,
            store_encoding: true,
            source_encoding: StringEncoding::Utf8,
        }
    }

    /// Current construction state.
    pub fn state(&self) -> BuilderState {
        self.state
    }

    /// Discards everything and returns to `Idle`.
    pub fn clear(&mut self) {
        self.document = Document::new();
        self.stack.clear();
        self.namespaces.clear();
        self.pending_mappings.clear();
        self.pending_text.clear();
        self.state = BuilderState::Idle;
    }

    /// `true` keeps character data verbatim; `false` (the default) trims
    /// surrounding whitespace from each text run and drops runs that are
    /// whitespace only.
    pub fn preserve_character_data(&mut self, preserve: bool) {
        self.preserve_character_data = preserve;
    }

    /// When `true` (the default), the source encoding is recorded on every
    /// built element; `false` drops the provenance.
    pub fn store_encoding(&mut self, flag: bool) {
        self.store_encoding = flag;
    }

    /// The source encoding subsequent events were decoded from.
    pub fn set_source_encoding(&mut self, encoding: StringEncoding) {
        self.source_encoding = encoding;
    }

    /// The document built so far.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Transfers the built document out, leaving the builder with an empty
    /// one. The stolen tree is no longer touched by this builder.
    pub fn steal_document(&mut self) -> Document {
        std::mem::replace(&mut self.document, Document::new())
    }

    /// Replaces the held document with one supplied by the caller,
    /// discarding any in-progress build. A document that already has a root
    /// counts as complete; an empty one leaves the builder idle.
    pub fn set_document(&mut self, document: Document) {
        self.stack.clear();
        self.namespaces.clear();
        self.pending_mappings.clear();
        self.pending_text.clear();
        self.state = if document.root().is_some() {
            BuilderState::Complete
        } else {
            BuilderState::Idle
        };
        self.document = document;
    }

    /// Applies the accumulated text to the open element, or checks that
    /// text outside the root is whitespace only.
    fn flush_text(&mut self, position: u64) -> Result<()> {
        if self.pending_text.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.pending_text);

        match self.stack.last() {
            Some(top) => {
                let payload = if self.preserve_character_data {
                    text.as_str()
                } else {
                    text.trim()
                };
                if !payload.is_empty() {
                    let mut element = top.borrow_mut();
                    element.append_character_data(payload);
                    if self.store_encoding {
                        element.record_encoding(self.source_encoding);
                    }
                }
                Ok(())
            }
            None => {
                if text.trim().is_empty() {
                    Ok(())
                } else {
                    Err(Error::malformed(
                        "text content outside the root element",
                        position,
                    ))
                }
            }
        }
    }

    /// Resolves a raw tag name against the active namespace scopes.
    fn resolve_name(&self, raw: &str, is_attribute: bool, position: u64) -> Result<QName> {
        let mut qname = QName::from_tag(raw);
        if !qname.prefix().is_empty() {
            match self.namespaces.resolve(qname.prefix()) {
                Some(uri) => qname.set_uri(uri.clone()),
                None => {
                    return Err(Error::malformed(
                        format!("unbound namespace prefix \"{}\"", qname.prefix()),
                        position,
                    ));
                }
            }
        } else if !is_attribute {
            // Unprefixed element names take the default namespace;
            // unprefixed attributes never do.
            if let Some(uri) = self.namespaces.resolve_default() {
                qname.set_uri(uri.clone());
            }
        }
        Ok(qname)
    }
}

impl Default for MinidomBuilder {
    fn default() -> Self {
        MinidomBuilder::new()
    }
}

impl ContentHandler for MinidomBuilder {
    fn start_document(&mut self) -> Result<()> {
        if self.state == BuilderState::Complete {
            return Err(Error::InvalidOperation(
                "builder already holds a document; call clear() first".to_string(),
            ));
        }
        Ok(())
    }

    fn start_element(
        &mut self,
        name: &str,
        attributes: Vec<(String, String)>,
        position: u64,
    ) -> Result<()> {
        if self.state == BuilderState::Complete {
            return Err(Error::malformed(
                format!("content after document root: <{name}>"),
                position,
            ));
        }
        self.state = BuilderState::InProgress;
        self.flush_text(position)?;

        self.namespaces.push_scope();
        let mappings = std::mem::take(&mut self.pending_mappings);
        for (prefix, uri) in &mappings {
            self.namespaces.declare(prefix, uri.clone());
        }

        let qname = self.resolve_name(name, false, position)?;
        let mut element = Element::new(qname);
        for (raw_name, value) in attributes {
            let attr_qname = self.resolve_name(&raw_name, true, position)?;
            element
                .attributes_mut()
                .add(AttributeNode::new(attr_qname, value));
        }
        for (prefix, uri) in mappings {
            element.set_namespace_prefix(prefix, uri);
        }
        if self.store_encoding {
            element.record_encoding(self.source_encoding);
        }

        let element = element.into_ref();
        match self.stack.last() {
            Some(top) => {
                Element::add_child(top, Rc::clone(&element));
            }
            None => {
                if self.document.root().is_some() {
                    return Err(Error::malformed(
                        format!("multiple root elements: <{name}>"),
                        position,
                    ));
                }
                self.document.set_root_element(Rc::clone(&element), true);
            }
        }
        self.stack.push(element);
        Ok(())
    }

    fn end_element(&mut self, name: &str, position: u64) -> Result<()> {
        self.flush_text(position)?;

        let top = self.stack.pop().ok_or_else(|| {
            Error::malformed(
                format!("end tag </{name}> without matching start tag"),
                position,
            )
        })?;
        let open_tag = top.borrow().qname().tag();
        if open_tag != name {
            return Err(Error::malformed(
                format!("tag mismatch: <{open_tag}> closed with </{name}>"),
                position,
            ));
        }

        self.namespaces.pop_scope();
        if self.stack.is_empty() {
            self.state = BuilderState::Complete;
        }
        Ok(())
    }

    fn characters(&mut self, text: &str) -> Result<()> {
        self.pending_text.push_str(text);
        Ok(())
    }

    fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) -> Result<()> {
        self.pending_mappings
            .push((prefix.to_string(), Uri::new(uri)));
        Ok(())
    }

    fn end_prefix_mapping(&mut self, _prefix: &str) -> Result<()> {
        // Scope exit already unwound the binding in end_element
        Ok(())
    }

    fn end_document(&mut self, position: u64) -> Result<()> {
        self.flush_text(position)?;
        match self.state {
            BuilderState::Complete => Ok(()),
            BuilderState::Idle => Err(Error::malformed("document has no content", position)),
            BuilderState::InProgress => {
                let open = self
                    .stack
                    .last()
                    .map(|e| e.borrow().qname().tag())
                    .unwrap_or_default();
                Err(Error::malformed(
                    format!("unexpected end of document: <{open}> is still open"),
                    position,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(builder: &mut MinidomBuilder, name: &str) -> Result<()> {
        builder.start_element(name, Vec::new(), 0)
    }

    #[test]
    fn test_state_machine() {
        let mut builder = MinidomBuilder::new();
        assert_eq!(builder.state(), BuilderState::Idle);

        start(&mut builder, "root").unwrap();
        assert_eq!(builder.state(), BuilderState::InProgress);

        builder.end_element("root", 0).unwrap();
        assert_eq!(builder.state(), BuilderState::Complete);
        builder.end_document(0).unwrap();

        builder.clear();
        assert_eq!(builder.state(), BuilderState::Idle);
        assert!(builder.document().root().is_none());
    }

    #[test]
    fn test_builds_nested_tree() {
        let mut builder = MinidomBuilder::new();
        start(&mut builder, "root").unwrap();
        start(&mut builder, "child").unwrap();
        builder.characters("hi").unwrap();
        builder.end_element("child", 0).unwrap();
        builder.end_element("root", 0).unwrap();
        builder.end_document(0).unwrap();

        let root = builder.document().get_root_element().unwrap();
        let child = root.borrow().get_element_by_tag_name("child", false).unwrap();
        assert_eq!(child.borrow().character_data(), "hi");
    }

    #[test]
    fn test_tag_mismatch_is_fatal() {
        let mut builder = MinidomBuilder::new();
        start(&mut builder, "a").unwrap();
        start(&mut builder, "b").unwrap();
        let err = builder.end_element("a", 7).unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { .. }));
    }

    #[test]
    fn test_end_without_start_is_fatal() {
        let mut builder = MinidomBuilder::new();
        start(&mut builder, "a").unwrap();
        builder.end_element("a", 0).unwrap();
        let err = builder.end_element("a", 0).unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { .. }));
    }

    #[test]
    fn test_multiple_roots_rejected() {
        let mut builder = MinidomBuilder::new();
        start(&mut builder, "a").unwrap();
        builder.end_element("a", 0).unwrap();
        let err = start(&mut builder, "b").unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { .. }));
    }

    #[test]
    fn test_text_outside_root_rejected() {
        let mut builder = MinidomBuilder::new();
        builder.characters("stray").unwrap();
        let err = start(&mut builder, "root").unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { .. }));
    }

    #[test]
    fn test_whitespace_outside_root_ignored() {
        let mut builder = MinidomBuilder::new();
        builder.characters("\n  ").unwrap();
        start(&mut builder, "root").unwrap();
        builder.end_element("root", 0).unwrap();
        builder.characters("\n").unwrap();
        builder.end_document(0).unwrap();
    }

    #[test]
    fn test_truncated_document_rejected() {
        let mut builder = MinidomBuilder::new();
        start(&mut builder, "a").unwrap();
        start(&mut builder, "b").unwrap();
        builder.end_element("b", 0).unwrap();
        let err = builder.end_document(9).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedDocument { position: 9, .. }
        ));
    }

    #[test]
    fn test_prefix_resolution() {
        let mut builder = MinidomBuilder::new();
        builder.start_prefix_mapping("x", "urn:x").unwrap();
        start(&mut builder, "root").unwrap();
        builder.start_element("x:child", Vec::new(), 0).unwrap();
        builder.end_element("x:child", 0).unwrap();
        builder.end_element("root", 0).unwrap();

        let root = builder.document().get_root_element().unwrap();
        let child = root
            .borrow()
            .get_element_by_tag_name_ns(&Uri::new("urn:x"), "child", false)
            .unwrap();
        assert_eq!(child.borrow().prefix(), "x");
    }

    #[test]
    fn test_unbound_prefix_is_fatal() {
        let mut builder = MinidomBuilder::new();
        let err = builder.start_element("nope:root", Vec::new(), 3).unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { .. }));
    }

    #[test]
    fn test_default_namespace_applies_to_elements_only() {
        let mut builder = MinidomBuilder::new();
        builder.start_prefix_mapping("", "urn:d").unwrap();
        builder
            .start_element("root", vec![("id".to_string(), "1".to_string())], 0)
            .unwrap();
        builder.end_element("root", 0).unwrap();

        let root = builder.document().get_root_element().unwrap();
        assert_eq!(root.borrow().uri().as_str(), "urn:d");
        // The unprefixed attribute stays in no namespace
        assert_eq!(
            root.borrow().attributes().get_ns(&Uri::empty(), "id"),
            Some("1")
        );
    }

    #[test]
    fn test_prefix_scope_ends_with_element() {
        let mut builder = MinidomBuilder::new();
        start(&mut builder, "root").unwrap();
        builder.start_prefix_mapping("x", "urn:x").unwrap();
        builder.start_element("x:inner", Vec::new(), 0).unwrap();
        builder.end_element("x:inner", 0).unwrap();
        builder.end_prefix_mapping("x").unwrap();

        // The binding is gone once the declaring element closed
        let err = builder.start_element("x:late", Vec::new(), 0).unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { .. }));
    }

    #[test]
    fn test_character_data_trim_policy() {
        let mut builder = MinidomBuilder::new();
        start(&mut builder, "root").unwrap();
        builder.characters("  hi  ").unwrap();
        builder.end_element("root", 0).unwrap();
        let root = builder.document().get_root_element().unwrap();
        assert_eq!(root.borrow().character_data(), "hi");

        let mut builder = MinidomBuilder::new();
        builder.preserve_character_data(true);
        start(&mut builder, "root").unwrap();
        builder.characters("  hi  ").unwrap();
        builder.end_element("root", 0).unwrap();
        let root = builder.document().get_root_element().unwrap();
        assert_eq!(root.borrow().character_data(), "  hi  ");
    }

    #[test]
    fn test_consecutive_text_events_concatenate() {
        let mut builder = MinidomBuilder::new();
        start(&mut builder, "root").unwrap();
        builder.characters("a ").unwrap();
        builder.characters("&").unwrap();
        builder.characters(" b").unwrap();
        builder.end_element("root", 0).unwrap();

        let root = builder.document().get_root_element().unwrap();
        assert_eq!(root.borrow().character_data(), "a & b");
    }

    #[test]
    fn test_store_encoding_recorded() {
        let mut builder = MinidomBuilder::new();
        builder.store_encoding(true);
        builder.set_source_encoding(StringEncoding::Windows1252);
        start(&mut builder, "root").unwrap();
        builder.end_element("root", 0).unwrap();

        let root = builder.document().get_root_element().unwrap();
        assert_eq!(
            root.borrow().encoding(),
            Some(StringEncoding::Windows1252)
        );
    }

    #[test]
    fn test_set_document_replaces_build() {
        let mut builder = MinidomBuilder::new();
        start(&mut builder, "discarded").unwrap();

        let replacement = Document::with_root(Element::create("supplied"));
        builder.set_document(replacement);
        assert_eq!(builder.state(), BuilderState::Complete);
        let root = builder.document().get_root_element().unwrap();
        assert_eq!(root.borrow().local_name(), "supplied");

        builder.set_document(Document::new());
        assert_eq!(builder.state(), BuilderState::Idle);
    }

    #[test]
    fn test_steal_document() {
        let mut builder = MinidomBuilder::new();
        start(&mut builder, "root").unwrap();
        builder.end_element("root", 0).unwrap();

        let stolen = builder.steal_document();
        assert!(stolen.root().is_some());
        assert!(builder.document().root().is_none());
    }
}
