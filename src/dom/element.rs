//! Element tree nodes.
//!
//! Elements are handled through `ElementRef` (`Rc<RefCell<Element>>`): the
//! parent's child vector holds the canonical strong handle on each child and
//! parents are reachable only through non-owning weak back-references, so
//! dropping a subtree's last strong handle releases the whole subtree while
//! parent pointers never keep anything alive.
//!
//! Trees are single-threaded by construction (`Rc` handles are neither `Send`
//! nor `Sync`); share between readers or hand the tree to one mutator at a
//! time.

use std::cell::RefCell;
use std::fmt::Display;
use std::io::Write;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use crate::dom::attributes::Attributes;
use crate::encoding::StringEncoding;
use crate::entities::escape_text;
use crate::error::{Error, Result};
use crate::qname::{QName, Uri};
use crate::serialize::{SerializeOptions, Serializer};

/// A reference-counted handle to an element.
pub type ElementRef = Rc<RefCell<Element>>;

/// A node in the document tree: qualified name, ordered attributes, one run
/// of character data, and owned child elements.
///
/// Mixed content is collapsed: text interleaved between child elements is
/// concatenated into the single `character_data` string and its position
/// relative to the children is not preserved.
#[derive(Debug, Default)]
pub struct Element {
    qname: QName,
    attributes: Attributes,
    character_data: String,
    /// Pre-escaped payload; the serializer passes it through unchanged.
    raw_character_data: bool,
    /// Source encoding of the character data, when the parser was asked to
    /// retain it. Provenance only; the in-memory text is always UTF-8.
    encoding: Option<StringEncoding>,
    /// xmlns declarations to emit when serializing this element.
    prefix_mappings: Vec<(String, Uri)>,
    children: Vec<ElementRef>,
    parent: Weak<RefCell<Element>>,
}

impl Element {
    /// Creates a detached element with the given qualified name.
    pub fn new(qname: QName) -> Self {
        Element {
            qname,
            ..Element::default()
        }
    }

    /// Creates a detached element handle with a plain local name.
    pub fn create(local_name: impl Into<String>) -> ElementRef {
        Element::new(QName::new(local_name)).into_ref()
    }

    /// Wraps this element into a shared handle.
    pub fn into_ref(self) -> ElementRef {
        Rc::new(RefCell::new(self))
    }

    /// Appends `child` as the last child of `parent` and wires the weak
    /// parent pointer. The child must be detached; use `Document::insert`
    /// for the checked entry point.
    pub fn add_child(parent: &ElementRef, child: ElementRef) -> ElementRef {
        child.borrow_mut().parent = Rc::downgrade(parent);
        parent.borrow_mut().children.push(Rc::clone(&child));
        child
    }

    // ------------------------------------------------------------------
    // Name
    // ------------------------------------------------------------------

    /// Returns the qualified name.
    pub fn qname(&self) -> &QName {
        &self.qname
    }

    /// Replaces the qualified name. Child and parent relationships are
    /// unaffected.
    pub fn set_qname(&mut self, qname: QName) {
        self.qname = qname;
    }

    /// Returns the local name.
    pub fn local_name(&self) -> &str {
        self.qname.local_name()
    }

    /// Sets the local name, keeping URI and prefix.
    pub fn set_local_name(&mut self, local_name: impl Into<String>) {
        self.qname.set_local_name(local_name);
    }

    /// Returns the namespace URI.
    pub fn uri(&self) -> &Uri {
        self.qname.uri()
    }

    /// Sets the namespace URI, keeping local name and prefix.
    pub fn set_uri(&mut self, uri: impl Into<Uri>) {
        self.qname.set_uri(uri);
    }

    /// Returns the display prefix.
    pub fn prefix(&self) -> &str {
        self.qname.prefix()
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Returns the attribute map.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Returns the attribute map for mutation.
    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    /// Mutable reference to the attribute value for `local_name`, creating
    /// an empty entry when absent.
    pub fn attribute(&mut self, local_name: &str) -> &mut String {
        self.attributes.value_mut(&QName::new(local_name))
    }

    /// Namespace-qualified variant of [`Element::attribute`].
    pub fn attribute_ns(&mut self, uri: impl Into<Uri>, local_name: &str) -> &mut String {
        self.attributes
            .value_mut(&QName::with_uri(uri, local_name))
    }

    // ------------------------------------------------------------------
    // Namespace declarations
    // ------------------------------------------------------------------

    /// Registers or updates a prefix-to-URI binding scoped to this element.
    /// Serialization emits one `xmlns` declaration per registered binding.
    /// The empty prefix declares the default namespace.
    pub fn set_namespace_prefix(&mut self, prefix: impl Into<String>, uri: impl Into<Uri>) {
        let prefix = prefix.into();
        let uri = uri.into();
        match self.prefix_mappings.iter_mut().find(|(p, _)| *p == prefix) {
            Some((_, existing)) => *existing = uri,
            None => self.prefix_mappings.push((prefix, uri)),
        }
    }

    /// Updates the URI bound to `prefix`, registering the binding when new.
    pub fn set_namespace_uri(&mut self, prefix: &str, uri: impl Into<Uri>) {
        self.set_namespace_prefix(prefix, uri);
    }

    /// The `xmlns` declarations registered on this element, in declaration
    /// order.
    pub fn prefix_mappings(&self) -> &[(String, Uri)] {
        &self.prefix_mappings
    }

    // ------------------------------------------------------------------
    // Character data
    // ------------------------------------------------------------------

    /// Returns the character data.
    pub fn character_data(&self) -> &str {
        &self.character_data
    }

    /// Replaces the character data. Resets the raw flag and the recorded
    /// source encoding.
    pub fn set_character_data(&mut self, text: impl Into<String>) {
        self.character_data = text.into();
        self.raw_character_data = false;
        self.encoding = None;
    }

    /// Replaces the character data and records its source encoding.
    pub fn set_character_data_with_encoding(
        &mut self,
        text: impl Into<String>,
        encoding: StringEncoding,
    ) {
        self.character_data = text.into();
        self.raw_character_data = false;
        self.encoding = Some(encoding);
    }

    /// Replaces the character data with a pre-escaped payload that the
    /// serializer must pass through unchanged.
    pub fn set_raw_character_data(&mut self, text: impl Into<String>) {
        self.character_data = text.into();
        self.raw_character_data = true;
        self.encoding = None;
    }

    /// Whether the character data is a pre-escaped payload.
    pub fn is_raw_character_data(&self) -> bool {
        self.raw_character_data
    }

    /// Appends to the character data, keeping the raw flag as-is.
    pub fn append_character_data(&mut self, text: &str) {
        self.character_data.push_str(text);
    }

    /// The recorded source encoding, if the parser retained one.
    pub fn encoding(&self) -> Option<StringEncoding> {
        self.encoding
    }

    pub(crate) fn record_encoding(&mut self, encoding: StringEncoding) {
        self.encoding = Some(encoding);
    }

    /// Converts the character data to a typed value.
    pub fn value<T>(&self) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let text = self.character_data.trim();
        if text.is_empty() {
            return Err(Error::InvalidOperation(format!(
                "element <{}> has no character data to convert",
                self.qname.tag()
            )));
        }
        text.parse::<T>().map_err(|e| {
            Error::InvalidOperation(format!("cannot convert \"{text}\": {e}"))
        })
    }

    /// Formats a typed value into the character data.
    pub fn set_value<T: Display>(&mut self, value: T) {
        self.set_character_data(value.to_string());
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Child elements, in insertion order.
    pub fn children(&self) -> &[ElementRef] {
        &self.children
    }

    /// Mutable view of the child vector. Callers reordering or removing
    /// children are responsible for the parent back-references.
    pub fn children_mut(&mut self) -> &mut Vec<ElementRef> {
        &mut self.children
    }

    /// Removes every child, releasing each subtree whose handle was held
    /// only by this element.
    pub fn clear_children(&mut self) {
        self.children.clear();
    }

    /// The parent element, if attached and still alive.
    pub fn parent(&self) -> Option<ElementRef> {
        self.parent.upgrade()
    }

    /// Sets the parent back-reference. This does NOT detach the element
    /// from its old parent's child list nor attach it to the new parent's;
    /// `Document::insert` owns that dual bookkeeping.
    pub fn set_parent(&mut self, parent: &ElementRef) {
        self.parent = Rc::downgrade(parent);
    }

    /// Clears the parent back-reference.
    pub fn detach_parent(&mut self) {
        self.parent = Weak::new();
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------
    //
    // One Option-returning core per shape; the throwing variants wrap it.

    /// First child element with the given local name, in document order.
    /// `recurse` extends the search depth-first through the subtree.
    pub fn find_element_by_tag_name(&self, local_name: &str, recurse: bool) -> Option<ElementRef> {
        self.find_first(&|e| e.qname.matches_local(local_name), recurse)
    }

    /// Like [`Element::find_element_by_tag_name`] but fails with `NotFound`
    /// when no match exists.
    pub fn get_element_by_tag_name(&self, local_name: &str, recurse: bool) -> Result<ElementRef> {
        self.find_element_by_tag_name(local_name, recurse)
            .ok_or_else(|| Error::NotFound(format!("element <{local_name}>")))
    }

    /// First child element matching `(uri, local_name)`, in document order.
    pub fn find_element_by_tag_name_ns(
        &self,
        uri: &Uri,
        local_name: &str,
        recurse: bool,
    ) -> Option<ElementRef> {
        self.find_first(&|e| e.qname.matches(uri, local_name), recurse)
    }

    /// Like [`Element::find_element_by_tag_name_ns`] but fails with
    /// `NotFound` when no match exists.
    pub fn get_element_by_tag_name_ns(
        &self,
        uri: &Uri,
        local_name: &str,
        recurse: bool,
    ) -> Result<ElementRef> {
        self.find_element_by_tag_name_ns(uri, local_name, recurse)
            .ok_or_else(|| Error::NotFound(format!("element <{local_name}> in namespace \"{uri}\"")))
    }

    /// Every child element with the given local name, in document order.
    pub fn get_elements_by_tag_name(&self, local_name: &str, recurse: bool) -> Vec<ElementRef> {
        let mut out = Vec::new();
        self.collect(&|e| e.qname.matches_local(local_name), recurse, false, &mut out);
        out
    }

    /// Every child element matching `(uri, local_name)`, in document order.
    pub fn get_elements_by_tag_name_ns(
        &self,
        uri: &Uri,
        local_name: &str,
        recurse: bool,
    ) -> Vec<ElementRef> {
        let mut out = Vec::new();
        self.collect(&|e| e.qname.matches(uri, local_name), recurse, false, &mut out);
        out
    }

    /// Whether a direct child with the given local name exists.
    pub fn has_element(&self, local_name: &str) -> bool {
        self.find_element_by_tag_name(local_name, false).is_some()
    }

    /// Whether a direct child matching `(uri, local_name)` exists.
    pub fn has_element_ns(&self, uri: &Uri, local_name: &str) -> bool {
        self.find_element_by_tag_name_ns(uri, local_name, false)
            .is_some()
    }

    fn find_first(&self, pred: &dyn Fn(&Element) -> bool, recurse: bool) -> Option<ElementRef> {
        let mut out = Vec::new();
        self.collect(pred, recurse, true, &mut out);
        out.pop()
    }

    /// Pre-order walk over children: each child is tested before its own
    /// subtree, siblings in insertion order.
    fn collect(
        &self,
        pred: &dyn Fn(&Element) -> bool,
        recurse: bool,
        first_only: bool,
        out: &mut Vec<ElementRef>,
    ) {
        for child in &self.children {
            if pred(&child.borrow()) {
                out.push(Rc::clone(child));
                if first_only {
                    return;
                }
            }
            if recurse {
                child.borrow().collect(pred, recurse, first_only, out);
                if first_only && !out.is_empty() {
                    return;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Cloning
    // ------------------------------------------------------------------

    /// Deep copy of this element and its subtree, with independent
    /// ownership and a detached parent.
    pub fn deep_clone(&self) -> ElementRef {
        let copy = self.shallow_copy().into_ref();
        for child in &self.children {
            let child_copy = child.borrow().deep_clone();
            child_copy.borrow_mut().parent = Rc::downgrade(&copy);
            copy.borrow_mut().children.push(child_copy);
        }
        copy
    }

    /// Deep-copies `source`'s name, attributes, character data, namespace
    /// declarations, and subtree into `target`, replacing its previous
    /// content. `target`'s own parent link is untouched.
    pub fn clone_from_element(target: &ElementRef, source: &Element) {
        {
            let mut dst = target.borrow_mut();
            dst.qname = source.qname.clone();
            dst.attributes = source.attributes.clone();
            dst.character_data = source.character_data.clone();
            dst.raw_character_data = source.raw_character_data;
            dst.encoding = source.encoding;
            dst.prefix_mappings = source.prefix_mappings.clone();
            dst.children.clear();
        }
        for child in &source.children {
            let child_copy = child.borrow().deep_clone();
            child_copy.borrow_mut().parent = Rc::downgrade(target);
            target.borrow_mut().children.push(child_copy);
        }
    }

    fn shallow_copy(&self) -> Element {
        Element {
            qname: self.qname.clone(),
            attributes: self.attributes.clone(),
            character_data: self.character_data.clone(),
            raw_character_data: self.raw_character_data,
            encoding: self.encoding,
            prefix_mappings: self.prefix_mappings.clone(),
            children: Vec::new(),
            parent: Weak::new(),
        }
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Serializes this element and its subtree compactly, with no
    /// whitespace beyond the character data.
    pub fn print<W: Write>(&self, writer: W) -> Result<()> {
        let mut serializer = Serializer::new(writer);
        serializer.serialize(self)?;
        Ok(())
    }

    /// Serializes with newlines and per-depth indentation.
    pub fn pretty_print<W: Write>(&self, writer: W, indent: &str) -> Result<()> {
        let mut serializer = Serializer::with_options(writer, SerializeOptions::pretty(indent));
        serializer.serialize(self)?;
        Ok(())
    }

    /// The character data as it will appear in serialized output.
    pub(crate) fn escaped_character_data(&self) -> String {
        if self.raw_character_data {
            self.character_data.clone()
        } else {
            escape_text(&self.character_data).into_owned()
        }
    }
}
