//! Node type definitions.
//!
//! The `NodeKind` enum carries the payload of every node variant. Navigation
//! links (parent, children, siblings) and the reference count live in
//! `NodeData`, not here.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::Attribute;

/// The kind of a node and its associated data.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The document root container. There is exactly one per `Document`.
    Document,

    /// An element, e.g. `<group type="integer">`.
    Element {
        /// The element name, including any `prefix:` verbatim.
        name: String,
        /// Attributes in first-seen order; names are unique.
        attributes: Vec<Attribute>,
    },

    /// A whitespace-delimited integer leaf.
    Integer(i64),

    /// A whitespace-delimited real-number leaf.
    Real(f64),

    /// Raw character data kept as a single string, whitespace included.
    Opaque(String),

    /// A whitespace-delimited word.
    Text {
        /// Whether whitespace preceded the word in the source.
        whitespace: bool,
        /// The word itself (entities already decoded).
        content: String,
    },

    /// A CDATA section body (without `<![CDATA[` and `]]>`).
    CData(String),

    /// A comment body (without `<!--` and `-->`).
    Comment(String),

    /// A processing instruction body, e.g. `xml-stylesheet href="a.css"`
    /// for `<?xml-stylesheet href="a.css"?>`.
    Declaration(String),

    /// A markup declaration body, e.g. `DOCTYPE html` for `<!DOCTYPE html>`.
    Directive(String),

    /// Application data attached to the tree. The parser never creates these.
    Custom(Arc<dyn CustomData>),
}

impl NodeKind {
    /// Returns the fieldless discriminant of this kind.
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Document => NodeType::Document,
            Self::Element { .. } => NodeType::Element,
            Self::Integer(_) => NodeType::Integer,
            Self::Real(_) => NodeType::Real,
            Self::Opaque(_) => NodeType::Opaque,
            Self::Text { .. } => NodeType::Text,
            Self::CData(_) => NodeType::CData,
            Self::Comment(_) => NodeType::Comment,
            Self::Declaration(_) => NodeType::Declaration,
            Self::Directive(_) => NodeType::Directive,
            Self::Custom(_) => NodeType::Custom,
        }
    }

    /// Returns `true` for kinds that may own a child chain.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Document | Self::Element { .. })
    }
}

/// The type of a node, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// The document root.
    Document,
    /// An element.
    Element,
    /// An integer leaf.
    Integer,
    /// A real-number leaf.
    Real,
    /// An opaque string leaf.
    Opaque,
    /// A text word leaf.
    Text,
    /// A CDATA section.
    CData,
    /// A comment.
    Comment,
    /// A processing instruction.
    Declaration,
    /// A `<!...>` markup declaration.
    Directive,
    /// Application data.
    Custom,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Document => "document",
            Self::Element => "element",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Opaque => "opaque",
            Self::Text => "text",
            Self::CData => "CDATA",
            Self::Comment => "comment",
            Self::Declaration => "declaration",
            Self::Directive => "directive",
            Self::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Application payload stored in a [`NodeKind::Custom`] node.
///
/// The serializer writes [`to_xml_text`](CustomData::to_xml_text) as escaped
/// character data. Use [`as_any`](CustomData::as_any) to downcast back to
/// the concrete type.
///
/// # Examples
///
/// ```
/// use std::any::Any;
/// use sprigxml::tree::CustomData;
///
/// #[derive(Debug)]
/// struct Point(i32, i32);
///
/// impl CustomData for Point {
///     fn to_xml_text(&self) -> String {
///         format!("{},{}", self.0, self.1)
///     }
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
/// ```
pub trait CustomData: fmt::Debug + Send + Sync + Any {
    /// Returns the character data written for this node.
    fn to_xml_text(&self) -> String;

    /// Returns `self` as `&dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}
