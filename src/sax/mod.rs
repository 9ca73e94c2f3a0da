//! Streaming (SAX) loading with retention.
//!
//! The SAX loaders run the same grammar as the DOM loaders but report each
//! unit to a [`SaxHandler`] the moment it is complete. After the handler
//! returns, the loader releases the node once. Nodes the handler did not
//! [`retain`](SaxContext::retain) are deleted right away, so memory stays
//! bounded by the open ancestors plus whatever the handler chose to keep.
//!
//! Open elements are never released before their `ElementClose` event, and
//! releasing a node deletes its whole subtree.
//!
//! # Examples
//!
//! Count the events while keeping only `<keep>` elements:
//!
//! ```
//! use std::collections::HashMap;
//! use std::ops::ControlFlow;
//! use sprigxml::parser::ParseOptions;
//! use sprigxml::sax::{self, SaxEvent};
//!
//! let mut counts: HashMap<SaxEvent, usize> = HashMap::new();
//! let mut handler = sax::from_fn(|cx, node, event| {
//!     *counts.entry(event).or_default() += 1;
//!     if event == SaxEvent::ElementOpen && cx.document().element_name(node) == Some("keep") {
//!         cx.retain(node);
//!     }
//!     ControlFlow::Continue(())
//! });
//!
//! let doc = sax::parse_sax_str(
//!     "<doc><skip>a</skip><keep>b</keep></doc>",
//!     &ParseOptions::default(),
//!     &mut handler,
//! )
//! .unwrap();
//!
//! // <doc> was released at its close, taking <keep> with it.
//! assert!(doc.is_none());
//! assert_eq!(counts[&SaxEvent::ElementOpen], 3);
//! assert_eq!(counts[&SaxEvent::Data], 2);
//! ```

use std::fmt;
use std::io::Read;
use std::ops::ControlFlow;

use tracing::trace;

use crate::error::{Error, ParseError};
use crate::parser::xml::load_into;
use crate::parser::{decode, read_all, ParseOptions};
use crate::tree::{Document, NodeId};

/// The kind of unit a SAX event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SaxEvent {
    /// A CDATA section was read.
    CData,
    /// A comment was read.
    Comment,
    /// A character-data node (word, number or opaque run) was read.
    Data,
    /// A processing instruction was read.
    Declaration,
    /// A `<!...>` markup declaration was read.
    Directive,
    /// An element's end tag (or the end of a self-closing tag) was read.
    ElementClose,
    /// An element's start tag was read; its content follows.
    ElementOpen,
}

impl fmt::Display for SaxEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CData => "cdata",
            Self::Comment => "comment",
            Self::Data => "data",
            Self::Declaration => "declaration",
            Self::Directive => "directive",
            Self::ElementClose => "element-close",
            Self::ElementOpen => "element-open",
        };
        f.write_str(name)
    }
}

/// What a handler may do with the document during a SAX callback.
///
/// Read access is unrestricted. The only mutation offered is
/// [`retain`](Self::retain), which keeps a node alive past the loader's
/// release.
pub struct SaxContext<'a> {
    doc: &'a mut Document,
}

impl<'a> SaxContext<'a> {
    pub(crate) fn new(doc: &'a mut Document) -> Self {
        Self { doc }
    }

    /// Returns the document being built.
    #[must_use]
    pub fn document(&self) -> &Document {
        self.doc
    }

    /// Increments the reference count of `node` so it survives the
    /// loader's release. Returns the new count.
    pub fn retain(&mut self, node: NodeId) -> Option<u32> {
        let count = self.doc.retain(node);
        trace!(?node, ?count, "handler retained node");
        count
    }

    /// Returns the current reference count of `node`.
    #[must_use]
    pub fn ref_count(&self, node: NodeId) -> Option<u32> {
        self.doc.ref_count(node)
    }
}

/// Receives SAX events.
///
/// Returning [`ControlFlow::Break`] stops the load immediately; this is not
/// an error. Closures with the same signature implement this trait; use
/// [`from_fn`] to get their argument types inferred.
pub trait SaxHandler {
    /// Called once per completed unit with the node that represents it.
    fn event(&mut self, cx: &mut SaxContext<'_>, node: NodeId, event: SaxEvent) -> ControlFlow<()>;
}

impl<F> SaxHandler for F
where
    F: FnMut(&mut SaxContext<'_>, NodeId, SaxEvent) -> ControlFlow<()>,
{
    fn event(&mut self, cx: &mut SaxContext<'_>, node: NodeId, event: SaxEvent) -> ControlFlow<()> {
        self(cx, node, event)
    }
}

/// Returns `f` as a [`SaxHandler`], pinning down the closure's argument types.
pub fn from_fn<F>(f: F) -> F
where
    F: FnMut(&mut SaxContext<'_>, NodeId, SaxEvent) -> ControlFlow<()>,
{
    f
}

/// Parses a string in SAX mode into a fresh document.
///
/// Returns `Some(document)` when at least one top-level node was retained
/// and is still alive, `None` otherwise.
///
/// # Errors
///
/// Returns `ParseError` on malformed input.
pub fn parse_sax_str(
    input: &str,
    options: &ParseOptions,
    handler: &mut dyn SaxHandler,
) -> Result<Option<Document>, ParseError> {
    let mut doc = Document::new();
    let root = doc.root();
    load_into(&mut doc, root, input, options, Some(handler))?;
    Ok(doc.first_child(root).is_some().then_some(doc))
}

/// Like [`parse_sax_str`] for raw bytes with encoding detection.
///
/// # Errors
///
/// Returns `ParseError` on undecodable or malformed input.
pub fn parse_sax_bytes(
    input: &[u8],
    options: &ParseOptions,
    handler: &mut dyn SaxHandler,
) -> Result<Option<Document>, ParseError> {
    parse_sax_str(&decode(input)?, options, handler)
}

/// Like [`parse_sax_str`], reading the input from a stream.
///
/// # Errors
///
/// Returns [`Error::Io`] or [`Error::Parse`].
pub fn parse_sax_reader(
    reader: impl Read,
    options: &ParseOptions,
    handler: &mut dyn SaxHandler,
) -> Result<Option<Document>, Error> {
    Ok(parse_sax_bytes(&read_all(reader)?, options, handler)?)
}

/// Like [`parse_sax_str`], reading from a file descriptor.
///
/// # Errors
///
/// Returns [`Error::Io`] or [`Error::Parse`].
#[cfg(unix)]
pub fn parse_sax_fd(
    fd: std::os::fd::BorrowedFd<'_>,
    options: &ParseOptions,
    handler: &mut dyn SaxHandler,
) -> Result<Option<Document>, Error> {
    let file = std::fs::File::from(fd.try_clone_to_owned()?);
    parse_sax_reader(file, options, handler)
}

impl Document {
    /// Parses a string in SAX mode under `parent`.
    ///
    /// Returns the first top-level node created by the call if it is still
    /// alive, i.e. if the handler retained it.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` on malformed input; every node the call created
    /// is deleted, retained or not.
    pub fn load_sax_str(
        &mut self,
        parent: NodeId,
        input: &str,
        options: &ParseOptions,
        handler: &mut dyn SaxHandler,
    ) -> Result<Option<NodeId>, ParseError> {
        load_into(self, parent, input, options, Some(handler))
    }

    /// Like [`load_sax_str`](Self::load_sax_str) for raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` on undecodable or malformed input.
    pub fn load_sax_bytes(
        &mut self,
        parent: NodeId,
        input: &[u8],
        options: &ParseOptions,
        handler: &mut dyn SaxHandler,
    ) -> Result<Option<NodeId>, ParseError> {
        self.load_sax_str(parent, &decode(input)?, options, handler)
    }

    /// Like [`load_sax_str`](Self::load_sax_str), reading from a stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] or [`Error::Parse`].
    pub fn load_sax_reader(
        &mut self,
        parent: NodeId,
        reader: impl Read,
        options: &ParseOptions,
        handler: &mut dyn SaxHandler,
    ) -> Result<Option<NodeId>, Error> {
        Ok(self.load_sax_bytes(parent, &read_all(reader)?, options, handler)?)
    }

    /// Like [`load_sax_str`](Self::load_sax_str), reading from a file
    /// descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] or [`Error::Parse`].
    #[cfg(unix)]
    pub fn load_sax_fd(
        &mut self,
        parent: NodeId,
        fd: std::os::fd::BorrowedFd<'_>,
        options: &ParseOptions,
        handler: &mut dyn SaxHandler,
    ) -> Result<Option<NodeId>, Error> {
        let file = std::fs::File::from(fd.try_clone_to_owned()?);
        self.load_sax_reader(parent, file, options, handler)
    }
}
