//! xml-lite - Lightweight in-memory XML DOM with streaming construction
//!
//! A small document model built for speed and simplicity rather than full
//! DOM coverage:
//! - `Element`/`Document` tree with namespace-qualified lookup and explicit
//!   parent/child ownership management
//! - `MinidomParser`: SAX-style streaming construction from a byte stream,
//!   with windows-1252/UTF-8 source encoding resolution
//! - Compact and pretty serialization back to bytes, with correct escaping
//!
//! The tokenizer is an external collaborator consumed through the
//! [`sax::ContentHandler`] boundary; [`sax::SaxDriver`] adapts quick-xml.
//!
//! Trees are handled through `Rc`-based [`ElementRef`] handles and are
//! single-threaded by construction: share a tree between readers, or hand it
//! to one mutator at a time.

// Trace-level instrumentation, compiled out unless the `tracing` feature is
// enabled.
#[cfg(feature = "tracing")]
macro_rules! trace_parse {
    ($($arg:tt)*) => { tracing::trace!($($arg)*) };
}
#[cfg(not(feature = "tracing"))]
macro_rules! trace_parse {
    ($($arg:tt)*) => {{}};
}
pub(crate) use trace_parse;

pub mod dom;
pub mod encoding;
pub mod entities;
pub mod error;
pub mod parser;
pub mod qname;
pub mod sax;
pub mod serialize;

mod namespace;

// Re-export commonly used types
pub use dom::{AttributeNode, Attributes, Document, Element, ElementRef};
pub use encoding::StringEncoding;
pub use error::{Error, Result};
pub use parser::{BuilderState, MinidomBuilder, MinidomParser};
pub use qname::{QName, Uri};
pub use serialize::{SerializeOptions, Serializer};
