//! Error types for parsing, tree mutation and serialization.
//!
//! Malformed input surfaces as a [`ParseError`] carrying the source location
//! of the failure. Everything else (I/O, misuse of node handles, type
//! mismatches on setters) is folded into the crate-wide [`Error`] enum.
//!
//! Accessors never return errors: reading an integer from a text node, or
//! from a handle whose node has been deleted, simply yields `None`.

use std::fmt;

use crate::tree::NodeType;

/// Source location within an XML document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in characters, not bytes).
    pub column: u32,
    /// 0-based byte offset from the start of the input.
    pub byte_offset: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The error returned when a load call meets malformed input.
///
/// A failed load never hands back a partial tree: every node created by the
/// call has been deleted by the time this error reaches the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error at {location}: {message}")]
pub struct ParseError {
    /// Human-readable description of the problem.
    pub message: String,
    /// Where in the source the error was detected.
    pub location: SourceLocation,
}

impl ParseError {
    /// Creates a `ParseError` with no meaningful location (e.g. for input
    /// that could not be decoded before parsing started).
    pub(crate) fn without_location(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: SourceLocation::default(),
        }
    }
}

/// The crate-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input was not well-formed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Reading input or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested parent does not exist or cannot hold children.
    #[error("parent node is missing or cannot have children")]
    InvalidParent,

    /// The reference node is not a child of the given parent.
    #[error("reference node is not a child of the parent")]
    NotAChild,

    /// The node handle refers to a node that has been deleted.
    #[error("node has been deleted")]
    StaleNode,

    /// An element-only operation was applied to another kind of node.
    #[error("node is not an element")]
    NotAnElement,

    /// A typed setter was applied to a node of a different type.
    #[error("expected {expected} node, found {found}")]
    TypeMismatch {
        /// The node type the operation needs.
        expected: NodeType,
        /// The node type actually present.
        found: NodeType,
    },
}
