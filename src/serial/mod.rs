//! XML serialization.
//!
//! Writes a node and its subtree back to text. Layout is entirely up to the
//! caller: the serializer adds no indentation of its own and instead asks
//! the optional [`SaveOptions::whitespace`] callback what to inject around
//! each tag. Long lines are broken at separator spaces once the column
//! passes [`SaveOptions::wrap_margin`].

pub mod xml;

use std::borrow::Cow;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

use crate::error::Error;
use crate::tree::{Document, NodeId};

use xml::XmlWriter;

/// Where the whitespace callback is being asked to inject text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WhitespacePosition {
    /// Before the start tag (or before the whole markup node).
    BeforeOpen,
    /// After the start tag. For childless elements and markup nodes this is
    /// also the last call, standing in for `AfterClose`.
    AfterOpen,
    /// Before the end tag of an element with children.
    BeforeClose,
    /// After the end tag of an element with children.
    AfterClose,
}

/// Signature of a whitespace callback.
pub type WhitespaceFn =
    dyn Fn(&Document, NodeId, WhitespacePosition) -> Option<Cow<'static, str>> + Send + Sync;

/// Default column at which separators turn into line breaks.
pub const DEFAULT_WRAP_MARGIN: usize = 72;

/// Options controlling serialization output.
///
/// # Examples
///
/// ```
/// use std::borrow::Cow;
/// use sprigxml::serial::{save_string, SaveOptions, WhitespacePosition};
/// use sprigxml::Document;
///
/// let mut doc = Document::new();
/// let list = doc.new_element(Some(doc.root()), "list").unwrap();
/// doc.new_element(Some(list), "item").unwrap();
///
/// let opts = SaveOptions::default().whitespace(|doc, node, pos| {
///     match (doc.element_name(node), pos) {
///         (Some("item"), WhitespacePosition::BeforeOpen) => Some(Cow::Borrowed("\n  ")),
///         (Some("list"), WhitespacePosition::BeforeClose) => Some(Cow::Borrowed("\n")),
///         _ => None,
///     }
/// });
/// let out = save_string(&doc, list, &opts).unwrap();
/// assert_eq!(out, "<list>\n  <item/>\n</list>");
/// ```
#[derive(Clone)]
pub struct SaveOptions {
    /// Column past which separator spaces become newlines (default: 72).
    /// Zero disables wrapping.
    pub wrap_margin: usize,
    /// Optional callback supplying text to inject around tags.
    pub whitespace: Option<Arc<WhitespaceFn>>,
}

impl fmt::Debug for SaveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveOptions")
            .field("wrap_margin", &self.wrap_margin)
            .field("whitespace", &self.whitespace.as_ref().map(|_| "..."))
            .finish()
    }
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            wrap_margin: DEFAULT_WRAP_MARGIN,
            whitespace: None,
        }
    }
}

impl SaveOptions {
    /// Sets the wrap margin; zero disables wrapping.
    #[must_use]
    pub fn wrap_margin(mut self, margin: usize) -> Self {
        self.wrap_margin = margin;
        self
    }

    /// Sets the whitespace callback.
    #[must_use]
    pub fn whitespace(
        mut self,
        callback: impl Fn(&Document, NodeId, WhitespacePosition) -> Option<Cow<'static, str>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.whitespace = Some(Arc::new(callback));
        self
    }
}

/// Serializes `node` and its subtree to a string.
///
/// Passing the document root writes the XML declaration (when the document
/// has one) followed by every top-level node.
///
/// # Errors
///
/// Returns [`Error::StaleNode`] if `node` no longer exists.
pub fn save_string(doc: &Document, node: NodeId, options: &SaveOptions) -> Result<String, Error> {
    let mut writer = XmlWriter::new(doc, options);
    writer.write_subtree(node)?;
    Ok(writer.finish())
}

/// Serializes `node` to a byte stream.
///
/// # Errors
///
/// Returns [`Error::StaleNode`] for a deleted node and [`Error::Io`] if
/// writing fails.
pub fn save_to_writer(
    doc: &Document,
    node: NodeId,
    mut writer: impl Write,
    options: &SaveOptions,
) -> Result<(), Error> {
    let text = save_string(doc, node, options)?;
    writer.write_all(text.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Serializes `node` into `buffer`, writing as much as fits.
///
/// Returns the full length of the serialization, which exceeds
/// `buffer.len()` when the output was truncated. Callers can use it to size
/// a second attempt.
///
/// # Errors
///
/// Returns [`Error::StaleNode`] if `node` no longer exists.
pub fn save_to_buffer(
    doc: &Document,
    node: NodeId,
    buffer: &mut [u8],
    options: &SaveOptions,
) -> Result<usize, Error> {
    let text = save_string(doc, node, options)?;
    let bytes = text.as_bytes();
    let n = bytes.len().min(buffer.len());
    buffer[..n].copy_from_slice(&bytes[..n]);
    Ok(bytes.len())
}

/// Serializes `node` to an open file descriptor. The descriptor stays open.
///
/// # Errors
///
/// Returns [`Error::StaleNode`] for a deleted node and [`Error::Io`] if
/// writing fails.
#[cfg(unix)]
pub fn save_to_fd(
    doc: &Document,
    node: NodeId,
    fd: std::os::fd::BorrowedFd<'_>,
    options: &SaveOptions,
) -> Result<(), Error> {
    let file = std::fs::File::from(fd.try_clone_to_owned()?);
    save_to_writer(doc, node, file, options)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> (Document, NodeId) {
        let mut doc = Document::new();
        let a = doc.new_element(Some(doc.root()), "a").unwrap();
        doc.new_text(Some(a), false, "hello").unwrap();
        doc.new_text(Some(a), true, "world").unwrap();
        (doc, a)
    }

    #[test]
    fn test_default_options() {
        let opts = SaveOptions::default();
        assert_eq!(opts.wrap_margin, 72);
        assert!(opts.whitespace.is_none());
        assert_eq!(
            format!("{opts:?}"),
            "SaveOptions { wrap_margin: 72, whitespace: None }"
        );
    }

    #[test]
    fn test_save_to_buffer_reports_full_length() {
        let (doc, a) = sample();
        let mut small = [0_u8; 4];
        let n = save_to_buffer(&doc, a, &mut small, &SaveOptions::default()).unwrap();
        assert_eq!(n, "<a>hello world</a>".len());
        assert_eq!(&small, b"<a>h");

        let mut big = [0_u8; 64];
        let n = save_to_buffer(&doc, a, &mut big, &SaveOptions::default()).unwrap();
        assert_eq!(&big[..n], b"<a>hello world</a>");
    }

    #[test]
    fn test_save_to_writer() {
        let (doc, a) = sample();
        let mut out = Vec::new();
        save_to_writer(&doc, a, &mut out, &SaveOptions::default()).unwrap();
        assert_eq!(out, b"<a>hello world</a>");
    }

    #[test]
    fn test_stale_node_is_an_error() {
        let (mut doc, a) = sample();
        doc.delete(a);
        assert!(matches!(
            save_string(&doc, a, &SaveOptions::default()),
            Err(Error::StaleNode)
        ));
    }
}
