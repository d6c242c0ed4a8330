//! Namespace scope tracking during document construction.
//!
//! Stack-based resolver mapping prefixes to URIs. Bindings are tagged with
//! the element depth that declared them and dropped when that scope exits.
//! Only the builder uses this; resolved URIs are what persist on elements.

use crate::qname::Uri;

/// Well-known namespace URIs.
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

/// Namespace binding (prefix -> URI). The empty prefix is the default
/// namespace.
#[derive(Debug, Clone)]
struct NsBinding {
    prefix: String,
    uri: Uri,
    depth: u16,
}

/// Stack-based namespace resolver.
#[derive(Debug)]
pub struct NamespaceStack {
    /// Stack of namespace bindings
    bindings: Vec<NsBinding>,
    /// Current element depth
    depth: u16,
}

impl NamespaceStack {
    /// Create a resolver with the pre-declared xml and xmlns prefixes.
    pub fn new() -> Self {
        let mut stack = NamespaceStack {
            bindings: Vec::with_capacity(16),
            depth: 0,
        };
        stack.bindings.push(NsBinding {
            prefix: "xml".to_string(),
            uri: Uri::new(ns::XML),
            depth: 0,
        });
        stack.bindings.push(NsBinding {
            prefix: "xmlns".to_string(),
            uri: Uri::new(ns::XMLNS),
            depth: 0,
        });
        stack
    }

    /// Enter a new element scope.
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave an element scope, removing any bindings declared in it.
    pub fn pop_scope(&mut self) {
        while let Some(binding) = self.bindings.last() {
            if binding.depth < self.depth {
                break;
            }
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Declare a binding for the current scope. Redeclaring xml or xmlns is
    /// ignored.
    pub fn declare(&mut self, prefix: &str, uri: Uri) {
        if prefix == "xml" || prefix == "xmlns" {
            return;
        }
        self.bindings.push(NsBinding {
            prefix: prefix.to_string(),
            uri,
            depth: self.depth,
        });
    }

    /// Resolve a prefix to its URI, innermost binding first.
    pub fn resolve(&self, prefix: &str) -> Option<&Uri> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix == prefix)
            .map(|b| &b.uri)
    }

    /// Resolve the default namespace (the empty prefix).
    pub fn resolve_default(&self) -> Option<&Uri> {
        self.resolve("")
    }

    /// Drop every binding and reset the depth.
    pub fn clear(&mut self) {
        *self = NamespaceStack::new();
    }
}

impl Default for NamespaceStack {
    fn default() -> Self {
        NamespaceStack::new()
    }
}
