//! In-memory document model.
//!
//! An `Element` tree with namespace-qualified lookup, an ordered attribute
//! map, and a `Document` that owns the root and keeps the parent/child
//! invariant through insert and remove.

pub mod attributes;
pub mod document;
pub mod element;

pub use attributes::{AttributeNode, Attributes};
pub use document::Document;
pub use element::{Element, ElementRef};
