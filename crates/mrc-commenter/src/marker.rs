//! Hidden slot markers embedded in comment bodies.
//!
//! A marker is an HTML comment carrying the slot name as a JSON string
//! literal. Escaping keeps the slot inside its quotes, and every non-ASCII
//! character is written as a `\uXXXX` escape so markers are plain ASCII and
//! match those written by other implementations of the same format.

use std::fmt;
use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};

/// Marker template; `{}` is replaced by the JSON-quoted slot name.
pub const COMMENT_IDENTIFIER: &str = "<!-- gitlab-mr-commenter id={} -->";

/// Slot used when the caller does not name one.
pub const DEFAULT_COMMENT_ID: &str = "gitlab-mr-commenter";

/// Name of a managed comment within one merge request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommentSlot(String);

impl CommentSlot {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CommentSlot {
    fn default() -> Self {
        Self::new(DEFAULT_COMMENT_ID)
    }
}

impl From<&str> for CommentSlot {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for CommentSlot {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for CommentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rendered marker of a [`CommentSlot`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Marker(String);

impl Marker {
    #[must_use]
    pub fn for_slot(slot: &CommentSlot) -> Self {
        Self(encode(slot.as_str()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `body` carries this marker.
    #[must_use]
    pub fn is_in(&self, body: &str) -> bool {
        contains(body, &self.0)
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Render the marker for a slot name.
///
/// ```
/// assert_eq!(
///     mrc_commenter::encode("plan"),
///     r#"<!-- gitlab-mr-commenter id="plan" -->"#
/// );
/// ```
#[must_use]
pub fn encode(slot: &str) -> String {
    COMMENT_IDENTIFIER.replacen("{}", &quote(slot), 1)
}

/// Whether `body` contains `marker` as an exact substring.
#[must_use]
pub fn contains(body: &str, marker: &str) -> bool {
    body.contains(marker)
}

/// Comment body: the content, a blank line, then the marker.
#[must_use]
pub fn render_body(content: &str, marker: &Marker) -> String {
    format!("{content}\n\n{marker}")
}

/// Quote a string as an ASCII-only JSON string literal.
fn quote(value: &str) -> String {
    let mut out = Vec::with_capacity(value.len() + 2);
    let written = value.serialize(&mut Serializer::with_formatter(&mut out, AsciiFormatter));
    written.map_or_else(
        |_| String::new(),
        |()| String::from_utf8_lossy(&out).into_owned(),
    )
}

/// JSON formatter that escapes DEL and every non-ASCII character.
///
/// Characters outside the BMP become UTF-16 surrogate pairs.
struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if fragment.bytes().all(|b| b.is_ascii() && b != 0x7f) {
            return writer.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        let mut bytes = [0u8; 4];
        for ch in fragment.chars() {
            if ch.is_ascii() && ch != '\x7f' {
                writer.write_all(ch.encode_utf8(&mut bytes).as_bytes())?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}
