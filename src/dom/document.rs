//! Document: owner of a single root element tree.

use std::rc::Rc;

use crate::dom::element::{Element, ElementRef};
use crate::error::{Error, Result};
use crate::qname::QName;

/// Owns exactly one root element (once assigned) and provides creation,
/// mutation, and removal helpers that keep the parent/child invariant: every
/// element appears in its parent's child list exactly when its parent
/// back-reference names that parent.
#[derive(Debug, Default)]
pub struct Document {
    root: Option<ElementRef>,
    /// Whether this document's handle is the canonical owner of the root.
    /// With shared handles the subtree is only released once every handle is
    /// gone; the flag records intent for `destroy`.
    owned: bool,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Document {
            root: None,
            owned: true,
        }
    }

    /// Creates a document owning the given root.
    pub fn with_root(root: ElementRef) -> Self {
        Document {
            root: Some(root),
            owned: true,
        }
    }

    /// Constructs a detached element. Ownership passes to whoever inserts
    /// it into a tree (or sets it as root).
    pub fn create_element(&self, qname: QName, character_data: impl Into<String>) -> ElementRef {
        let mut element = Element::new(qname);
        let text: String = character_data.into();
        if !text.is_empty() {
            element.set_character_data(text);
        }
        element.into_ref()
    }

    /// Namespace-qualified variant of [`Document::create_element`].
    pub fn create_element_ns(
        &self,
        uri: impl Into<crate::qname::Uri>,
        local_name: &str,
        character_data: impl Into<String>,
    ) -> ElementRef {
        self.create_element(QName::with_uri(uri, local_name), character_data)
    }

    /// Appends `element` as the last child of `under` and sets its parent
    /// back-reference.
    ///
    /// Policy: the caller is trusted that `under` belongs to this
    /// document's tree; membership is not validated. Inserting an element
    /// that already has a parent is rejected to keep the tree a tree.
    pub fn insert(&self, element: ElementRef, under: &ElementRef) -> Result<()> {
        if Rc::ptr_eq(&element, under) {
            return Err(Error::InvalidOperation(
                "cannot insert an element under itself".to_string(),
            ));
        }
        if element.borrow().parent().is_some() {
            return Err(Error::InvalidOperation(
                "element already has a parent; remove it first".to_string(),
            ));
        }
        Element::add_child(under, element);
        Ok(())
    }

    /// Detaches `to_delete` from its parent and releases the tree's handle
    /// on it; the subtree is destroyed once no caller handle remains.
    /// Fails with `NotFound` when the element has no parent in this tree.
    pub fn remove(&mut self, to_delete: &ElementRef) -> Result<()> {
        let parent = to_delete.borrow().parent();
        match parent {
            Some(parent) => self.remove_from(to_delete, &parent),
            None => {
                // A parentless element may be the root itself.
                if let Some(root) = &self.root {
                    if Rc::ptr_eq(root, to_delete) {
                        self.root = None;
                        return Ok(());
                    }
                }
                Err(Error::NotFound(format!(
                    "element <{}> has no parent to remove it from",
                    to_delete.borrow().qname().tag()
                )))
            }
        }
    }

    /// Detaches `to_delete` from `from` specifically. Fails with `NotFound`
    /// when it is not a child of that parent.
    pub fn remove_from(&mut self, to_delete: &ElementRef, from: &ElementRef) -> Result<()> {
        let idx = from
            .borrow()
            .children()
            .iter()
            .position(|c| Rc::ptr_eq(c, to_delete));
        match idx {
            Some(idx) => {
                from.borrow_mut().children_mut().remove(idx);
                to_delete.borrow_mut().detach_parent();
                Ok(())
            }
            None => Err(Error::NotFound(format!(
                "element <{}> is not a child of <{}>",
                to_delete.borrow().qname().tag(),
                from.borrow().qname().tag()
            ))),
        }
    }

    /// Sets the root element. `own = false` records that this document's
    /// handle is not the canonical one; `destroy` still only ever drops the
    /// document's own handle.
    pub fn set_root_element(&mut self, element: ElementRef, own: bool) {
        self.root = Some(element);
        self.owned = own;
    }

    /// The root element, if any.
    pub fn root(&self) -> Option<&ElementRef> {
        self.root.as_ref()
    }

    /// The root element, failing with `InvalidOperation` on an empty
    /// document.
    pub fn get_root_element(&self) -> Result<ElementRef> {
        self.root
            .clone()
            .ok_or_else(|| Error::InvalidOperation("document has no root element".to_string()))
    }

    /// Transfers the root handle out, leaving the document empty. A later
    /// `destroy` will not touch the stolen subtree.
    pub fn steal_root_element(&mut self) -> Option<ElementRef> {
        self.root.take()
    }

    /// Whether this document considers itself the owner of its root.
    pub fn owns_root(&self) -> bool {
        self.owned
    }

    /// Releases the document's handle on the root subtree. Idempotent; a
    /// stolen or externally shared subtree survives.
    pub fn destroy(&mut self) {
        self.root = None;
        self.owned = true;
    }
}

impl Clone for Document {
    /// Deep copy of the entire tree, independently owned.
    fn clone(&self) -> Self {
        Document {
            root: self.root.as_ref().map(|r| r.borrow().deep_clone()),
            owned: true,
        }
    }
}
