//! Leaf typing: how character data under an element becomes nodes.
//!
//! Before reading the content of an element the parser asks the configured
//! [`Classifier`] which [`LeafKind`] to produce. The answer holds until a
//! child element closes, at which point the parent is classified again.

use std::fmt;
use std::sync::Arc;

use crate::tree::{Document, NodeId};

/// The node kind produced for character data under an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafKind {
    /// Discard character data.
    Ignore,
    /// One `Integer` node per whitespace-separated token.
    Integer,
    /// One `Real` node per whitespace-separated token.
    Real,
    /// One `Opaque` node per run of character data, whitespace included.
    Opaque,
    /// One `Text` node per whitespace-separated word.
    Text,
}

/// Signature of a caller-supplied classifier.
pub type ClassifyFn = dyn Fn(&Document, NodeId) -> LeafKind + Send + Sync;

/// Decides the [`LeafKind`] for each element.
///
/// # Examples
///
/// ```
/// use sprigxml::parser::{Classifier, LeafKind};
///
/// // Pick the kind from a `type` attribute, defaulting to text.
/// let classifier = Classifier::custom(|doc, node| match doc.attribute(node, "type") {
///     Some("integer") => LeafKind::Integer,
///     Some("real") => LeafKind::Real,
///     Some("opaque") => LeafKind::Opaque,
///     _ => LeafKind::Text,
/// });
/// # let _ = classifier;
/// ```
#[derive(Clone, Default)]
pub enum Classifier {
    /// Every element gets [`LeafKind::Text`]; no conversion.
    #[default]
    Text,
    /// Every element gets [`LeafKind::Integer`].
    Integer,
    /// Every element gets [`LeafKind::Real`].
    Real,
    /// Every element gets [`LeafKind::Opaque`].
    Opaque,
    /// Character data is dropped everywhere.
    Ignore,
    /// A caller function decides per element.
    Custom(Arc<ClassifyFn>),
}

impl Classifier {
    /// Wraps a closure as a [`Classifier::Custom`].
    pub fn custom(f: impl Fn(&Document, NodeId) -> LeafKind + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    /// Returns the leaf kind for the content of `node`.
    #[must_use]
    pub fn classify(&self, doc: &Document, node: NodeId) -> LeafKind {
        match self {
            Self::Text => LeafKind::Text,
            Self::Integer => LeafKind::Integer,
            Self::Real => LeafKind::Real,
            Self::Opaque => LeafKind::Opaque,
            Self::Ignore => LeafKind::Ignore,
            Self::Custom(f) => f(doc, node),
        }
    }
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("Text"),
            Self::Integer => f.write_str("Integer"),
            Self::Real => f.write_str("Real"),
            Self::Opaque => f.write_str("Opaque"),
            Self::Ignore => f.write_str("Ignore"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
