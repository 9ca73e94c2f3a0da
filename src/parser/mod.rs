//! XML parser.
//!
//! A hand-rolled recursive descent parser. It builds nodes straight into a
//! [`Document`] arena, either into a fresh document ([`Document::parse_str`]
//! and friends) or under an existing node ([`Document::load_str`] and
//! friends). How character data becomes leaves is decided per element by
//! the [`Classifier`] in [`ParseOptions`].
//!
//! A failed load never leaves partial output behind: every node it created
//! is deleted before the [`ParseError`] is returned.

mod classify;
mod entities;
pub(crate) mod input;
pub(crate) mod xml;

pub use classify::{ClassifyFn, Classifier, LeafKind};

use std::io::Read;
use std::sync::Arc;

use crate::encoding::decode_to_utf8;
use crate::error::{Error, ParseError};
use crate::tree::{Document, NodeId};

use input::DEFAULT_MAX_DEPTH;

/// A callback for named entities the parser does not know.
///
/// Receives the entity name (without `&` and `;`) and returns its
/// replacement text, or `None` to reject the reference.
pub type EntityResolver = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Options controlling how input is parsed.
///
/// Use the builder pattern to configure options:
///
/// ```
/// use sprigxml::parser::{Classifier, ParseOptions};
///
/// let opts = ParseOptions::default()
///     .classifier(Classifier::Opaque)
///     .max_depth(64);
/// ```
#[derive(Clone)]
pub struct ParseOptions {
    /// Decides the leaf kind for character data under each element
    /// (default: [`Classifier::Text`]).
    pub classifier: Classifier,
    /// Maximum element nesting depth (default: 256).
    pub max_depth: u32,
    /// Optional resolver for named entities beyond the built-in tables.
    pub entity_resolver: Option<EntityResolver>,
}

impl std::fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseOptions")
            .field("classifier", &self.classifier)
            .field("max_depth", &self.max_depth)
            .field(
                "entity_resolver",
                &self.entity_resolver.as_ref().map(|_| "..."),
            )
            .finish()
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            classifier: Classifier::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            entity_resolver: None,
        }
    }
}

impl ParseOptions {
    /// Sets the leaf classifier.
    #[must_use]
    pub fn classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Sets the maximum element nesting depth.
    #[must_use]
    pub fn max_depth(mut self, max: u32) -> Self {
        self.max_depth = max;
        self
    }

    /// Sets the resolver for unknown named entities.
    #[must_use]
    pub fn entity_resolver(
        mut self,
        resolver: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.entity_resolver = Some(Arc::new(resolver));
        self
    }
}

/// Decodes bytes to UTF-8, reporting failures as a location-less parse error.
pub(crate) fn decode(bytes: &[u8]) -> Result<String, ParseError> {
    decode_to_utf8(bytes).map_err(|e| ParseError::without_location(e.to_string()))
}

/// Reads a whole stream into memory.
pub(crate) fn read_all(mut reader: impl Read) -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(bytes)
}

impl Document {
    /// Parses an XML string into a new document.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the input is malformed.
    ///
    /// # Examples
    ///
    /// ```
    /// use sprigxml::Document;
    /// use sprigxml::parser::ParseOptions;
    ///
    /// let doc = Document::parse_str("<root><child/></root>", &ParseOptions::default()).unwrap();
    /// let root = doc.root_element().unwrap();
    /// assert_eq!(doc.element_name(root), Some("root"));
    /// ```
    pub fn parse_str(input: &str, options: &ParseOptions) -> Result<Self, ParseError> {
        let mut doc = Self::new();
        let root = doc.root();
        xml::load_into(&mut doc, root, input, options, None)?;
        Ok(doc)
    }

    /// Parses raw bytes into a new document, detecting the encoding from
    /// the BOM and XML declaration.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the bytes cannot be decoded or the XML is
    /// malformed.
    pub fn parse_bytes(input: &[u8], options: &ParseOptions) -> Result<Self, ParseError> {
        Self::parse_str(&decode(input)?, options)
    }

    /// Reads a stream to the end and parses it into a new document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if reading fails and [`Error::Parse`] if the
    /// content is malformed.
    pub fn parse_reader(reader: impl Read, options: &ParseOptions) -> Result<Self, Error> {
        Ok(Self::parse_bytes(&read_all(reader)?, options)?)
    }

    /// Reads an open file descriptor to the end and parses it into a new
    /// document. The descriptor stays open.
    ///
    /// # Errors
    ///
    /// Same as [`parse_reader`](Self::parse_reader).
    #[cfg(unix)]
    pub fn parse_fd(
        fd: std::os::fd::BorrowedFd<'_>,
        options: &ParseOptions,
    ) -> Result<Self, Error> {
        let file = std::fs::File::from(fd.try_clone_to_owned()?);
        Self::parse_reader(file, options)
    }

    /// Parses an XML string and appends the resulting nodes under `parent`.
    /// Returns `parent`.
    ///
    /// When `parent` is an element, top-level character data is typed with
    /// the classifier's answer for `parent`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the input is malformed or `parent` cannot
    /// hold children. `parent` is left exactly as it was.
    pub fn load_str(
        &mut self,
        parent: NodeId,
        input: &str,
        options: &ParseOptions,
    ) -> Result<NodeId, ParseError> {
        xml::load_into(self, parent, input, options, None)?;
        Ok(parent)
    }

    /// Like [`load_str`](Self::load_str) for raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` on undecodable or malformed input.
    pub fn load_bytes(
        &mut self,
        parent: NodeId,
        input: &[u8],
        options: &ParseOptions,
    ) -> Result<NodeId, ParseError> {
        self.load_str(parent, &decode(input)?, options)
    }

    /// Like [`load_str`](Self::load_str), reading the input from a stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] or [`Error::Parse`].
    pub fn load_reader(
        &mut self,
        parent: NodeId,
        reader: impl Read,
        options: &ParseOptions,
    ) -> Result<NodeId, Error> {
        Ok(self.load_bytes(parent, &read_all(reader)?, options)?)
    }

    /// Like [`load_str`](Self::load_str), reading from a file descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] or [`Error::Parse`].
    #[cfg(unix)]
    pub fn load_fd(
        &mut self,
        parent: NodeId,
        fd: std::os::fd::BorrowedFd<'_>,
        options: &ParseOptions,
    ) -> Result<NodeId, Error> {
        let file = std::fs::File::from(fd.try_clone_to_owned()?);
        self.load_reader(parent, file, options)
    }
}
