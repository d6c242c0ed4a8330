//! XML serialization.
//!
//! Walks an element tree and emits XML text to a writer, either compactly or
//! indented. Output is deterministic: attribute and namespace-declaration
//! order is insertion order, so the same tree and mode always produce
//! byte-identical output.

use std::io::{self, Write};

use crate::dom::element::Element;
use crate::entities::escape_attribute;
use crate::error::{Error, Result};

/// Indent unit pretty printing uses when callers have no preference.
pub const DEFAULT_INDENT: &str = "    ";

/// Output shaping options.
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Insert newlines and indentation.
    pub pretty: bool,
    /// Indent unit per nesting depth (pretty mode only).
    pub indent: String,
}

impl SerializeOptions {
    /// Compact output: no whitespace beyond the character data.
    pub fn compact() -> Self {
        SerializeOptions {
            pretty: false,
            indent: String::new(),
        }
    }

    /// Pretty output with the given indent unit.
    pub fn pretty(indent: &str) -> Self {
        SerializeOptions {
            pretty: true,
            indent: indent.to_string(),
        }
    }

    /// Pretty output with [`DEFAULT_INDENT`].
    pub fn pretty_default() -> Self {
        SerializeOptions::pretty(DEFAULT_INDENT)
    }
}

impl Default for SerializeOptions {
    fn default() -> Self {
        SerializeOptions::compact()
    }
}

/// Writes element trees as XML text.
pub struct Serializer<W: Write> {
    writer: W,
    options: SerializeOptions,
}

impl<W: Write> Serializer<W> {
    /// Creates a compact serializer.
    pub fn new(writer: W) -> Self {
        Serializer {
            writer,
            options: SerializeOptions::compact(),
        }
    }

    /// Creates a serializer with the given options.
    pub fn with_options(writer: W, options: SerializeOptions) -> Self {
        Serializer { writer, options }
    }

    /// Serializes an element and its subtree.
    pub fn serialize(&mut self, element: &Element) -> io::Result<()> {
        self.write_element(element, 0)?;
        self.writer.flush()
    }

    fn write_element(&mut self, element: &Element, depth: usize) -> io::Result<()> {
        let tag = element.qname().tag();

        if self.options.pretty {
            self.write_indent(depth)?;
        }
        write!(self.writer, "<{tag}")?;
        for attr in element.attributes() {
            write!(
                self.writer,
                " {}=\"{}\"",
                attr.qname().tag(),
                escape_attribute(attr.value())
            )?;
        }
        for (prefix, uri) in element.prefix_mappings() {
            if prefix.is_empty() {
                write!(self.writer, " xmlns=\"{}\"", escape_attribute(uri.as_str()))?;
            } else {
                write!(
                    self.writer,
                    " xmlns:{prefix}=\"{}\"",
                    escape_attribute(uri.as_str())
                )?;
            }
        }

        let text = element.escaped_character_data();
        let children = element.children();

        if children.is_empty() && text.is_empty() {
            write!(self.writer, "/>")?;
            return self.finish_line();
        }
        write!(self.writer, ">")?;

        if children.is_empty() {
            // A single text run stays inline with its tags
            write!(self.writer, "{text}</{tag}>")?;
            return self.finish_line();
        }

        if self.options.pretty {
            writeln!(self.writer)?;
            if !text.is_empty() {
                self.write_indent(depth + 1)?;
                writeln!(self.writer, "{text}")?;
            }
            for child in children {
                self.write_element(&child.borrow(), depth + 1)?;
            }
            self.write_indent(depth)?;
            write!(self.writer, "</{tag}>")?;
            self.finish_line()
        } else {
            write!(self.writer, "{text}")?;
            for child in children {
                self.write_element(&child.borrow(), depth)?;
            }
            write!(self.writer, "</{tag}>")
        }
    }

    fn write_indent(&mut self, depth: usize) -> io::Result<()> {
        for _ in 0..depth {
            self.writer.write_all(self.options.indent.as_bytes())?;
        }
        Ok(())
    }

    fn finish_line(&mut self) -> io::Result<()> {
        if self.options.pretty {
            writeln!(self.writer)?;
        }
        Ok(())
    }
}

/// Serializes an element compactly into a string.
pub fn to_string(element: &Element) -> Result<String> {
    let mut buf = Vec::new();
    Serializer::new(&mut buf).serialize(element)?;
    String::from_utf8(buf).map_err(|e| Error::Encoding(e.to_string()))
}

/// Serializes an element into an indented string.
pub fn to_string_pretty(element: &Element, indent: &str) -> Result<String> {
    let mut buf = Vec::new();
    Serializer::with_options(&mut buf, SerializeOptions::pretty(indent)).serialize(element)?;
    String::from_utf8(buf).map_err(|e| Error::Encoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::element::ElementRef;
    use crate::qname::QName;

    fn sample_tree() -> ElementRef {
        let documents = Element::create("documents");
        let html = Element::add_child(&documents, Element::create("html"));
        let title = Element::add_child(&html, Element::create("title"));
        title.borrow_mut().set_character_data("Title");
        let body = Element::add_child(&html, Element::create("body"));
        let p = Element::add_child(&body, Element::create("p"));
        p.borrow_mut().set_character_data("paragraph");
        Element::add_child(&body, Element::create("br"));
        documents
    }

    #[test]
    fn test_compact_text_element() {
        let e = Element::create("abc");
        e.borrow_mut().set_character_data("abc");
        assert_eq!(to_string(&e.borrow()).unwrap(), "<abc>abc</abc>");
    }

    #[test]
    fn test_compact_self_closing() {
        let documents = Element::create("documents");
        Element::add_child(&documents, Element::create("html"));
        assert_eq!(
            to_string(&documents.borrow()).unwrap(),
            "<documents><html/></documents>"
        );
    }

    #[test]
    fn test_compact_nested() {
        let tree = sample_tree();
        assert_eq!(
            to_string(&tree.borrow()).unwrap(),
            "<documents><html><title>Title</title><body><p>paragraph</p><br/></body></html></documents>"
        );
    }

    #[test]
    fn test_pretty_nested() {
        let tree = sample_tree();
        let expected = "\
<documents>
    <html>
        <title>Title</title>
        <body>
            <p>paragraph</p>
            <br/>
        </body>
    </html>
</documents>
";
        assert_eq!(to_string_pretty(&tree.borrow(), "    ").unwrap(), expected);
    }

    #[test]
    fn test_pretty_default_indent() {
        let root = Element::create("a");
        Element::add_child(&root, Element::create("b"));
        let mut buf = Vec::new();
        Serializer::with_options(&mut buf, SerializeOptions::pretty_default())
            .serialize(&root.borrow())
            .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "<a>\n    <b/>\n</a>\n");
    }

    #[test]
    fn test_pretty_custom_indent() {
        let root = Element::create("a");
        Element::add_child(&root, Element::create("b"));
        assert_eq!(
            to_string_pretty(&root.borrow(), "  ").unwrap(),
            "<a>\n  <b/>\n</a>\n"
        );
    }

    #[test]
    fn test_pretty_mixed_text_and_children() {
        let root = Element::create("a");
        root.borrow_mut().set_character_data("text");
        Element::add_child(&root, Element::create("b"));
        assert_eq!(
            to_string_pretty(&root.borrow(), "  ").unwrap(),
            "<a>\n  text\n  <b/>\n</a>\n"
        );
    }

    #[test]
    fn test_escaping_in_text_and_attributes() {
        let e = Element::create("e");
        e.borrow_mut().set_character_data("<a & b>");
        *e.borrow_mut().attribute("q") = "say \"hi\"".to_string();
        assert_eq!(
            to_string(&e.borrow()).unwrap(),
            "<e q=\"say &quot;hi&quot;\">&lt;a &amp; b&gt;</e>"
        );
    }

    #[test]
    fn test_raw_character_data_passthrough() {
        let e = Element::create("e");
        e.borrow_mut().set_raw_character_data("&lt;kept&gt;");
        assert_eq!(to_string(&e.borrow()).unwrap(), "<e>&lt;kept&gt;</e>");
    }

    #[test]
    fn test_attribute_order_is_insertion_order() {
        let e = Element::create("e");
        *e.borrow_mut().attribute("zeta") = "1".to_string();
        *e.borrow_mut().attribute("alpha") = "2".to_string();
        assert_eq!(
            to_string(&e.borrow()).unwrap(),
            "<e zeta=\"1\" alpha=\"2\"/>"
        );
    }

    #[test]
    fn test_xmlns_declarations() {
        let root = Element::create("root");
        root.borrow_mut().set_namespace_prefix("x", "urn:x");
        let mut child_name = QName::with_uri("urn:x", "c");
        child_name.set_prefix("x");
        Element::add_child(&root, Element::new(child_name).into_ref());

        assert_eq!(
            to_string(&root.borrow()).unwrap(),
            "<root xmlns:x=\"urn:x\"><x:c/></root>"
        );
    }

    #[test]
    fn test_default_namespace_declaration() {
        let root = Element::create("root");
        root.borrow_mut().set_namespace_prefix("", "urn:d");
        assert_eq!(
            to_string(&root.borrow()).unwrap(),
            "<root xmlns=\"urn:d\"/>"
        );
    }

    #[test]
    fn test_deterministic_output() {
        let tree = sample_tree();
        let first = to_string(&tree.borrow()).unwrap();
        let second = to_string(&tree.borrow()).unwrap();
        assert_eq!(first, second);
    }
}
