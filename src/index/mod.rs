//! Sorted element indexes.
//!
//! A [`NodeIndex`] is a snapshot of the elements below a node, optionally
//! restricted to one element name and/or to elements carrying a given
//! attribute. Entries are sorted by element name and then attribute value
//! (plain byte order, stable for equal keys), so lookups by name use a
//! binary search. A cursor supports enumerating all matches with repeated
//! [`find`](NodeIndex::find) calls.
//!
//! The index holds [`NodeId`]s only. Entries whose nodes were deleted after
//! the index was built resolve to `None` in the document.

use tracing::trace;

use crate::search::{find_element, Descend};
use crate::tree::{Document, NodeId, NodeType};

/// One index entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Element name at build time.
    pub name: String,
    /// Value of the index's attribute, when the index has one.
    pub value: Option<String>,
    /// The element.
    pub node: NodeId,
}

/// A sorted snapshot of elements with a lookup cursor.
///
/// # Examples
///
/// ```
/// use sprigxml::index::NodeIndex;
/// use sprigxml::parser::ParseOptions;
/// use sprigxml::Document;
///
/// let doc = Document::parse_str(
///     "<db><row id='b'/><row id='a'/><row id='b'/></db>",
///     &ParseOptions::default(),
/// ).unwrap();
/// let db = doc.root_element().unwrap();
///
/// let mut index = NodeIndex::new(&doc, db, Some("row"), Some("id"));
/// assert_eq!(index.len(), 3);
///
/// let first = index.find(Some("row"), Some("b")).unwrap();
/// let second = index.find(Some("row"), Some("b")).unwrap();
/// assert_ne!(first, second);
/// assert_eq!(index.find(Some("row"), Some("b")), None);
/// ```
#[derive(Debug, Clone)]
pub struct NodeIndex {
    attr: Option<String>,
    entries: Vec<IndexEntry>,
    cursor: usize,
}

impl NodeIndex {
    /// Builds an index of the elements below `top`.
    ///
    /// Without filters, `top` itself is included when it is an element.
    /// With `attr`, only elements carrying that attribute are collected.
    #[must_use]
    pub fn new(doc: &Document, top: NodeId, element: Option<&str>, attr: Option<&str>) -> Self {
        let mut entries = Vec::new();
        let mut push = |node: NodeId| {
            entries.push(IndexEntry {
                name: doc.element_name(node).unwrap_or_default().to_string(),
                value: attr
                    .and_then(|a| doc.attribute(node, a))
                    .map(str::to_string),
                node,
            });
        };

        if element.is_none() && attr.is_none() && doc.node_type(top) == Some(NodeType::Element) {
            push(top);
        }
        let mut current = top;
        while let Some(node) = find_element(doc, current, top, element, attr, None, Descend::All) {
            push(node);
            current = node;
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.value.cmp(&b.value)));
        trace!(entries = entries.len(), ?element, ?attr, "built node index");

        Self {
            attr: attr.map(str::to_string),
            entries,
            cursor: 0,
        }
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the index has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the attribute the index was built with.
    #[must_use]
    pub fn attr(&self) -> Option<&str> {
        self.attr.as_deref()
    }

    /// Returns the sorted entries.
    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Rewinds the cursor and returns the first entry's node.
    pub fn reset(&mut self) -> Option<NodeId> {
        self.cursor = 0;
        self.entries.first().map(|e| e.node)
    }

    /// Finds the next entry matching `element` and/or `value`.
    ///
    /// The first call after a [`reset`](Self::reset) locates the first
    /// match; each later call returns the following match. Returns `None`
    /// once the matches are exhausted, and always when `value` is given to
    /// an index built without an attribute. With neither filter this is the
    /// same as [`Iterator::next`].
    pub fn find(&mut self, element: Option<&str>, value: Option<&str>) -> Option<NodeId> {
        if value.is_some() && self.attr.is_none() {
            return None;
        }
        if element.is_none() && value.is_none() {
            return self.next();
        }

        let start = if self.cursor == 0 {
            self.first_candidate(element, value)
        } else {
            self.cursor
        };

        // entries sharing a name are contiguous, so with a name the scan
        // can stop at the first miss
        let found = self.entries[start.min(self.entries.len())..]
            .iter()
            .enumerate()
            .take_while(|(_, e)| element.map_or(true, |name| e.name == name))
            .find(|(_, e)| entry_matches(e, element, value))
            .map(|(offset, e)| (start + offset, e.node));

        match found {
            Some((position, node)) if element.is_none() || position == start => {
                self.cursor = position + 1;
                Some(node)
            }
            _ => {
                self.cursor = self.entries.len();
                None
            }
        }
    }

    /// Returns where the first match could be. Binary search when a name
    /// is given, otherwise the start.
    fn first_candidate(&self, element: Option<&str>, value: Option<&str>) -> usize {
        match (element, value) {
            (Some(name), Some(value)) => self.entries.partition_point(|e| {
                (e.name.as_str(), e.value.as_deref().unwrap_or_default()) < (name, value)
            }),
            (Some(name), None) => self.entries.partition_point(|e| e.name.as_str() < name),
            (None, _) => 0,
        }
    }
}

impl Iterator for NodeIndex {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let entry = self.entries.get(self.cursor)?;
        self.cursor += 1;
        Some(entry.node)
    }
}

fn entry_matches(entry: &IndexEntry, element: Option<&str>, value: Option<&str>) -> bool {
    element.map_or(true, |name| entry.name == name)
        && value.map_or(true, |v| entry.value.as_deref() == Some(v))
}
