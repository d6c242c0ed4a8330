//! Qualified names.
//!
//! A qualified name is a local name plus an optional namespace URI and a
//! display prefix. Matching for namespace-qualified lookups is always by
//! `(uri, local_name)`; the prefix is a serialization hint only.

use std::fmt;

/// A namespace URI. The empty URI means "no namespace".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Uri(String);

impl Uri {
    /// Creates a URI from a string.
    pub fn new(uri: impl Into<String>) -> Self {
        Uri(uri.into())
    }

    /// The empty URI (no namespace).
    pub fn empty() -> Self {
        Uri(String::new())
    }

    /// Returns the URI as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the empty (no namespace) URI.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Uri {
    fn from(s: &str) -> Self {
        Uri(s.to_string())
    }
}

impl From<String> for Uri {
    fn from(s: String) -> Self {
        Uri(s)
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A qualified XML name: local name, namespace URI, and display prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QName {
    local_name: String,
    uri: Uri,
    prefix: String,
}

impl QName {
    /// Creates a name with no namespace.
    pub fn new(local_name: impl Into<String>) -> Self {
        QName {
            local_name: local_name.into(),
            uri: Uri::empty(),
            prefix: String::new(),
        }
    }

    /// Creates a namespace-qualified name.
    pub fn with_uri(uri: impl Into<Uri>, local_name: impl Into<String>) -> Self {
        QName {
            local_name: local_name.into(),
            uri: uri.into(),
            prefix: String::new(),
        }
    }

    /// Parses a raw tag name, splitting a `prefix:local` form at the colon.
    /// The URI is left empty; resolution happens against a namespace scope.
    pub fn from_tag(tag: &str) -> Self {
        let (prefix, local) = split_name(tag);
        QName {
            local_name: local.to_string(),
            uri: Uri::empty(),
            prefix: prefix.unwrap_or("").to_string(),
        }
    }

    /// Returns the local name.
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Sets the local name. Does not affect the URI or prefix.
    pub fn set_local_name(&mut self, local_name: impl Into<String>) {
        self.local_name = local_name.into();
    }

    /// Returns the namespace URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Sets the namespace URI.
    pub fn set_uri(&mut self, uri: impl Into<Uri>) {
        self.uri = uri.into();
    }

    /// Returns the display prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Sets the display prefix.
    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
    }

    /// Associates a namespace URI and display prefix in one step.
    pub fn associate(&mut self, uri: impl Into<Uri>, prefix: impl Into<String>) {
        self.uri = uri.into();
        self.prefix = prefix.into();
    }

    /// The serialized form: `prefix:local`, or just `local` with no prefix.
    pub fn tag(&self) -> String {
        if self.prefix.is_empty() {
            self.local_name.clone()
        } else {
            format!("{}:{}", self.prefix, self.local_name)
        }
    }

    /// Namespace-qualified match: equal `(uri, local_name)`. The empty URI
    /// matches names with no namespace.
    pub fn matches(&self, uri: &Uri, local_name: &str) -> bool {
        self.uri == *uri && self.local_name == local_name
    }

    /// Local-name-only match, regardless of namespace.
    pub fn matches_local(&self, local_name: &str) -> bool {
        self.local_name == local_name
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            f.write_str(&self.local_name)
        } else {
            write!(f, "{}:{}", self.prefix, self.local_name)
        }
    }
}

/// Split a name into prefix and local name at the colon.
fn split_name(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}
