//! Tree walking and simple element queries.
//!
//! [`walk_next`] and [`walk_prev`] step through a subtree in document order.
//! [`find_element`] filters such a walk by element name and attribute, and
//! [`find_path`] resolves `/`-separated element paths with a `*` wildcard.
//!
//! Every function is bounded by a `top` node and never returns a node
//! outside of `top`'s subtree.

use crate::tree::{Document, NodeId, NodeKind, NodeType};

/// How far a walk or search may descend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Descend {
    /// Stay on the current level.
    None,
    /// Descend into the starting node's children on the first step only.
    First,
    /// Descend into every subtree.
    All,
}

/// Returns the node after `node` in document order, staying within `top`.
///
/// With [`Descend::None`] the node's own children are skipped.
#[must_use]
pub fn walk_next(doc: &Document, node: NodeId, top: NodeId, descend: Descend) -> Option<NodeId> {
    if descend != Descend::None {
        if let Some(child) = doc.first_child(node) {
            return Some(child);
        }
    }
    if node == top {
        return None;
    }
    if let Some(next) = doc.next_sibling(node) {
        return Some(next);
    }

    let mut current = doc.parent(node)?;
    if current == top {
        return None;
    }
    loop {
        if let Some(next) = doc.next_sibling(current) {
            return Some(next);
        }
        current = doc.parent(current).filter(|&p| p != top)?;
    }
}

/// Returns the node before `node` in document order, staying within `top`.
///
/// Unless `descend` is [`Descend::None`], stepping back onto a previous
/// sibling with children lands on that sibling's deepest last descendant.
#[must_use]
pub fn walk_prev(doc: &Document, node: NodeId, top: NodeId, descend: Descend) -> Option<NodeId> {
    if node == top || !doc.contains(node) {
        return None;
    }
    if let Some(prev) = doc.prev_sibling(node) {
        if descend == Descend::None {
            return Some(prev);
        }
        let mut last = prev;
        while let Some(child) = doc.last_child(last) {
            last = child;
        }
        return Some(last);
    }
    doc.parent(node).filter(|&p| p != top)
}

/// Finds the first element after `node` that satisfies every given filter.
///
/// - `name` matches the element name.
/// - `attr` alone requires the attribute to be present; with `value` its
///   value must also match. `value` without `attr` is ignored.
///
/// With [`Descend::All`] the whole subtree of `top` is searched in document
/// order. [`Descend::None`] moves through following siblings only, and
/// [`Descend::First`] starts with `node`'s first child and then moves
/// through its siblings.
///
/// # Examples
///
/// ```
/// use sprigxml::parser::ParseOptions;
/// use sprigxml::search::{find_element, Descend};
/// use sprigxml::Document;
///
/// let doc = Document::parse_str(
///     "<menu><item id='a'/><sub><item id='b'/></sub><item id='c'/></menu>",
///     &ParseOptions::default(),
/// ).unwrap();
/// let menu = doc.root_element().unwrap();
///
/// let b = find_element(&doc, menu, menu, Some("item"), Some("id"), Some("b"), Descend::All);
/// assert_eq!(b.and_then(|n| doc.attribute(n, "id")), Some("b"));
///
/// // Without descending, <sub>'s child is skipped.
/// let first = doc.first_child(menu).unwrap();
/// let next = find_element(&doc, first, menu, Some("item"), None, None, Descend::None);
/// assert_eq!(next.and_then(|n| doc.attribute(n, "id")), Some("c"));
/// ```
#[must_use]
pub fn find_element(
    doc: &Document,
    node: NodeId,
    top: NodeId,
    name: Option<&str>,
    attr: Option<&str>,
    value: Option<&str>,
    descend: Descend,
) -> Option<NodeId> {
    let mut current = match descend {
        Descend::All => walk_next(doc, node, top, Descend::All),
        Descend::First => doc
            .first_child(node)
            .or_else(|| next_sibling_within(doc, node, top)),
        Descend::None => next_sibling_within(doc, node, top),
    };

    while let Some(id) = current {
        if element_matches(doc, id, name, attr, value) {
            return Some(id);
        }
        current = match descend {
            Descend::All => walk_next(doc, id, top, Descend::All),
            Descend::First | Descend::None => next_sibling_within(doc, id, top),
        };
    }
    None
}

/// Resolves a `/`-separated element path below `top`.
///
/// Each literal segment matches a child element by name. A `*/` prefix lets
/// the following segment match at any depth, and a lone `*` segment matches
/// any child element. When the final element's first child is not an
/// element (typically its value), that child is returned; otherwise the
/// element itself.
///
/// Returns `None` for an empty or malformed path, or if nothing matches.
///
/// # Examples
///
/// ```
/// use sprigxml::parser::{Classifier, ParseOptions};
/// use sprigxml::search::find_path;
/// use sprigxml::Document;
///
/// let opts = ParseOptions::default().classifier(Classifier::Integer);
/// let doc = Document::parse_str("<cfg><net><port>8080</port></net></cfg>", &opts).unwrap();
/// let cfg = doc.root_element().unwrap();
///
/// let port = find_path(&doc, cfg, "net/port").unwrap();
/// assert_eq!(doc.integer(port), Some(8080));
/// assert_eq!(find_path(&doc, cfg, "*/port"), Some(port));
/// ```
#[must_use]
pub fn find_path(doc: &Document, top: NodeId, path: &str) -> Option<NodeId> {
    if path.is_empty() || !doc.contains(top) {
        return None;
    }

    let mut node = top;
    let mut rest = path;
    while !rest.is_empty() {
        let (descend, segment_start) = match rest.strip_prefix("*/") {
            Some(after) => (Descend::All, after),
            None => (Descend::First, rest),
        };
        let (segment, remainder) = segment_start
            .split_once('/')
            .unwrap_or((segment_start, ""));
        if segment.is_empty() {
            return None;
        }
        let name = (segment != "*").then_some(segment);
        node = find_element(doc, node, node, name, None, None, descend)?;
        rest = remainder;
    }

    match doc.first_child(node) {
        Some(child) if doc.node_type(child) != Some(NodeType::Element) => Some(child),
        _ => Some(node),
    }
}

fn next_sibling_within(doc: &Document, node: NodeId, top: NodeId) -> Option<NodeId> {
    if node == top {
        None
    } else {
        doc.next_sibling(node)
    }
}

fn element_matches(
    doc: &Document,
    id: NodeId,
    name: Option<&str>,
    attr: Option<&str>,
    value: Option<&str>,
) -> bool {
    let Some(NodeKind::Element {
        name: element_name,
        attributes,
    }) = doc.get(id).map(|n| &n.kind)
    else {
        return false;
    };
    if name.is_some_and(|n| n != element_name.as_str()) {
        return false;
    }
    match attr {
        None => true,
        Some(attr) => attributes
            .iter()
            .find(|a| a.name == attr)
            .is_some_and(|a| value.map_or(true, |v| v == a.value)),
    }
}
