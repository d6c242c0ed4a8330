//! XML entity escaping for serialization.
//!
//! Escapes `< > & " '` to their entity references. Decoding on the way in is
//! the tokenizer's job; this module only covers output.
//!
//! Uses Cow for zero-copy when nothing needs escaping.

use memchr::{memchr2, memchr3};
use std::borrow::Cow;

/// Escape character data for XML output.
///
/// Returns Borrowed if no escaping is needed (zero-copy).
#[inline]
pub fn escape_text(input: &str) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    // Fast path: scan for the escapable bytes using SIMD
    if memchr3(b'<', b'>', b'&', bytes).is_none() && memchr2(b'"', b'\'', bytes).is_none() {
        return Cow::Borrowed(input);
    }

    // Slow path: rebuild with entity references
    let mut result = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}

/// Escape text for use in XML attribute values.
#[inline]
pub fn escape_attribute(input: &str) -> Cow<'_, str> {
    escape_text(input)
}
