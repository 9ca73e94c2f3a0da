//! Arena-based XML document tree.
//!
//! All nodes live in a slot vector owned by the [`Document`] and are referred
//! to by [`NodeId`], a small copyable handle made of a slot index and a
//! generation counter. Deleting a node frees its slot for reuse and bumps the
//! generation, so a handle kept past its node's lifetime resolves to `None`
//! instead of aliasing whatever node is stored in the slot next.
//!
//! # Ownership
//!
//! A parent owns its child chain; `parent`, `prev_sibling` and `next_sibling`
//! are navigation links only. Nodes created without a parent are unparented
//! roots owned by the document until they are deleted or attached somewhere.
//! Dropping the `Document` frees everything at once.
//!
//! Each node also carries a reference count (starting at 1) used by the
//! streaming parser to decide which completed nodes the caller wants to keep.
//! See [`Document::retain`] and [`Document::release`].

mod node;

pub use node::{CustomData, NodeKind, NodeType};

use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::Error;

/// A handle to a node in a [`Document`].
///
/// Handles are cheap to copy and never keep a node alive. Once the node is
/// deleted every accessor given this handle returns `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: NonZeroU32,
    generation: u32,
}

impl NodeId {
    /// Creates a `NodeId` from a slot index and generation.
    ///
    /// # Panics
    ///
    /// Panics if `index` is 0 or does not fit in a `u32`.
    #[allow(clippy::expect_used)]
    fn new(index: usize, generation: u32) -> Self {
        let raw = u32::try_from(index).expect("node arena exceeds u32 slots");
        Self {
            index: NonZeroU32::new(raw).expect("NodeId index must be non-zero"),
            generation,
        }
    }

    fn as_index(self) -> usize {
        self.index.get() as usize
    }
}

/// Storage for a single live node.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// What kind of node this is and its payload.
    pub kind: NodeKind,
    /// Parent node; `None` for the document root and unparented nodes.
    pub parent: Option<NodeId>,
    /// First child node.
    pub first_child: Option<NodeId>,
    /// Last child node (for O(1) append).
    pub last_child: Option<NodeId>,
    /// Next sibling.
    pub next_sibling: Option<NodeId>,
    /// Previous sibling.
    pub prev_sibling: Option<NodeId>,
    /// Reference count; 1 at creation.
    pub ref_count: u32,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            prev_sibling: None,
            ref_count: 1,
        }
    }
}

/// An attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The attribute name.
    pub name: String,
    /// The attribute value with entity references decoded.
    pub value: String,
}

/// Where [`Document::add`] places a node relative to its reference child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    /// Before the reference, or first when there is none.
    Before,
    /// After the reference, or last when there is none.
    After,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

/// An XML document: a node arena plus the root container.
///
/// Navigation goes through `&Document`, mutation through `&mut Document`.
///
/// # Examples
///
/// ```
/// use sprigxml::Document;
///
/// let mut doc = Document::new_xml("1.0");
/// let group = doc.new_element(Some(doc.root()), "group").unwrap();
/// doc.set_attribute(group, "type", "integer").unwrap();
/// doc.new_integer(Some(group), 42).unwrap();
///
/// assert_eq!(doc.element_name(group), Some("group"));
/// assert_eq!(doc.integer(group), Some(42));
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    /// The slot arena. Index 0 is a permanent placeholder (`NonZeroU32`).
    slots: Vec<Slot>,
    /// Indices of freed slots available for reuse.
    free: Vec<usize>,
    /// Number of live nodes, including the root.
    live: usize,
    /// The document root container.
    root: NodeId,
    /// XML version from (or for) the XML declaration. When set, the
    /// serializer writes `<?xml version="..."?>` before the root's children.
    pub version: Option<String>,
    /// Encoding named in the XML declaration. Loaded text is already
    /// decoded, so the serializer declares `utf-8` for any other label.
    pub encoding: Option<String>,
    /// Standalone flag from the XML declaration.
    pub standalone: Option<bool>,
}

impl Document {
    /// Creates an empty document with no XML declaration.
    #[must_use]
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(64);
        slots.push(Slot {
            generation: 0,
            data: None,
        });
        slots.push(Slot {
            generation: 0,
            data: Some(NodeData::new(NodeKind::Document)),
        });
        Self {
            slots,
            free: Vec::new(),
            live: 1,
            root: NodeId::new(1, 0),
            version: None,
            encoding: None,
            standalone: None,
        }
    }

    /// Creates an empty document that serializes with an
    /// `<?xml version="..." encoding="utf-8"?>` declaration.
    #[must_use]
    pub fn new_xml(version: &str) -> Self {
        let mut doc = Self::new();
        doc.version = Some(version.to_string());
        doc.encoding = Some("utf-8".to_string());
        doc
    }

    /// Returns the document root container.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the first element among the root's children.
    #[must_use]
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.root)
            .find(|&id| self.node_type(id) == Some(NodeType::Element))
    }

    /// Returns the data of a live node, or `None` for a deleted handle.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        let slot = self.slots.get(id.as_index())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.data.as_ref()
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        let slot = self.slots.get_mut(id.as_index())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.data.as_mut()
    }

    /// Returns the data of a node reached through tree links.
    ///
    /// # Panics
    ///
    /// Panics if the node is not live, which would mean the link structure
    /// is corrupt.
    #[allow(clippy::expect_used)]
    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.get_mut(id).expect("linked node must be live")
    }

    /// Returns `true` if `id` refers to a live node of this document.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Returns the number of live nodes, including the root.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.live
    }

    /// Returns the type of a node.
    #[must_use]
    pub fn node_type(&self, id: NodeId) -> Option<NodeType> {
        self.get(id).map(|n| n.kind.node_type())
    }

    // --- Navigation ---

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    /// Returns the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.first_child
    }

    /// Returns the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.last_child
    }

    /// Returns the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.next_sibling
    }

    /// Returns the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.prev_sibling
    }

    /// Returns an iterator over the children of a node.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.first_child(id),
        }
    }

    /// Returns an iterator over a node and its ancestors (walking up to the root).
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.get(id).map(|_| id),
        }
    }

    /// Returns an iterator over all descendants of a node (depth-first).
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            root: id,
            next: self.first_child(id),
        }
    }

    // --- Construction ---

    /// Allocates an unparented node and returns its handle.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.data = Some(NodeData::new(kind));
            return NodeId::new(index, slot.generation);
        }
        let index = self.slots.len();
        self.slots.push(Slot {
            generation: 0,
            data: Some(NodeData::new(kind)),
        });
        NodeId::new(index, 0)
    }

    /// Allocates a node and appends it to `parent` when one is given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParent`] if `parent` is deleted or cannot hold
    /// children. No node is allocated in that case.
    pub fn create_child(
        &mut self,
        parent: Option<NodeId>,
        kind: NodeKind,
    ) -> Result<NodeId, Error> {
        if let Some(parent) = parent {
            if !self.is_container(parent) {
                return Err(Error::InvalidParent);
            }
        }
        let id = self.create_node(kind);
        if let Some(parent) = parent {
            self.link_last(parent, id);
        }
        Ok(id)
    }

    /// Creates an element named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParent`] if `parent` cannot hold children.
    pub fn new_element(&mut self, parent: Option<NodeId>, name: &str) -> Result<NodeId, Error> {
        self.create_child(
            parent,
            NodeKind::Element {
                name: name.to_string(),
                attributes: Vec::new(),
            },
        )
    }

    /// Creates an integer leaf.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParent`] if `parent` cannot hold children.
    pub fn new_integer(&mut self, parent: Option<NodeId>, value: i64) -> Result<NodeId, Error> {
        self.create_child(parent, NodeKind::Integer(value))
    }

    /// Creates a real-number leaf.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParent`] if `parent` cannot hold children.
    pub fn new_real(&mut self, parent: Option<NodeId>, value: f64) -> Result<NodeId, Error> {
        self.create_child(parent, NodeKind::Real(value))
    }

    /// Creates an opaque string leaf.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParent`] if `parent` cannot hold children.
    pub fn new_opaque(&mut self, parent: Option<NodeId>, value: &str) -> Result<NodeId, Error> {
        self.create_child(parent, NodeKind::Opaque(value.to_string()))
    }

    /// Creates a text word leaf. `whitespace` records whether the word is
    /// preceded by whitespace when serialized.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParent`] if `parent` cannot hold children.
    pub fn new_text(
        &mut self,
        parent: Option<NodeId>,
        whitespace: bool,
        content: &str,
    ) -> Result<NodeId, Error> {
        self.create_child(
            parent,
            NodeKind::Text {
                whitespace,
                content: content.to_string(),
            },
        )
    }

    /// Creates a CDATA section.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParent`] if `parent` cannot hold children.
    pub fn new_cdata(&mut self, parent: Option<NodeId>, content: &str) -> Result<NodeId, Error> {
        self.create_child(parent, NodeKind::CData(content.to_string()))
    }

    /// Creates a comment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParent`] if `parent` cannot hold children.
    pub fn new_comment(&mut self, parent: Option<NodeId>, content: &str) -> Result<NodeId, Error> {
        self.create_child(parent, NodeKind::Comment(content.to_string()))
    }

    /// Creates a processing-instruction node (`<?content?>`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParent`] if `parent` cannot hold children.
    pub fn new_declaration(
        &mut self,
        parent: Option<NodeId>,
        content: &str,
    ) -> Result<NodeId, Error> {
        self.create_child(parent, NodeKind::Declaration(content.to_string()))
    }

    /// Creates a markup declaration node (`<!content>`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParent`] if `parent` cannot hold children.
    pub fn new_directive(
        &mut self,
        parent: Option<NodeId>,
        content: &str,
    ) -> Result<NodeId, Error> {
        self.create_child(parent, NodeKind::Directive(content.to_string()))
    }

    /// Creates a node holding application data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParent`] if `parent` cannot hold children.
    pub fn new_custom(
        &mut self,
        parent: Option<NodeId>,
        data: Arc<dyn CustomData>,
    ) -> Result<NodeId, Error> {
        self.create_child(parent, NodeKind::Custom(data))
    }

    // --- Attributes ---

    /// Returns the attributes of an element; empty for other nodes.
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match self.get(id).map(|n| &n.kind) {
            Some(NodeKind::Element { attributes, .. }) => attributes,
            _ => &[],
        }
    }

    /// Returns the value of the attribute `name` on an element.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Returns the number of attributes on an element.
    #[must_use]
    pub fn attribute_count(&self, id: NodeId) -> usize {
        self.attributes(id).len()
    }

    /// Returns the `(name, value)` of the attribute at `index`.
    #[must_use]
    pub fn attribute_by_index(&self, id: NodeId, index: usize) -> Option<(&str, &str)> {
        self.attributes(id)
            .get(index)
            .map(|a| (a.name.as_str(), a.value.as_str()))
    }

    /// Sets an attribute on an element. An existing attribute keeps its
    /// position and takes the new value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] for a deleted handle and
    /// [`Error::NotAnElement`] for non-element nodes.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), Error> {
        let data = self.get_mut(id).ok_or(Error::StaleNode)?;
        let NodeKind::Element { attributes, .. } = &mut data.kind else {
            return Err(Error::NotAnElement);
        };
        if let Some(attr) = attributes.iter_mut().find(|a| a.name == name) {
            value.clone_into(&mut attr.value);
        } else {
            attributes.push(Attribute {
                name: name.to_string(),
                value: value.to_string(),
            });
        }
        Ok(())
    }

    /// Removes an attribute, returning its value if it was present.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        let NodeKind::Element { attributes, .. } = &mut self.get_mut(id)?.kind else {
            return None;
        };
        let pos = attributes.iter().position(|a| a.name == name)?;
        Some(attributes.remove(pos).value)
    }

    // --- Typed values ---

    /// Finds the node holding a value of type `ty`: the node itself, or the
    /// first child of an element when that child has the requested type.
    fn value_node(&self, id: NodeId, ty: NodeType) -> Option<&NodeKind> {
        let data = self.get(id)?;
        if data.kind.node_type() == ty {
            return Some(&data.kind);
        }
        if let NodeKind::Element { .. } = data.kind {
            let child = self.get(data.first_child?)?;
            if child.kind.node_type() == ty {
                return Some(&child.kind);
            }
        }
        None
    }

    fn value_node_mut(&mut self, id: NodeId, ty: NodeType) -> Result<&mut NodeKind, Error> {
        let data = self.get(id).ok_or(Error::StaleNode)?;
        let found = data.kind.node_type();
        let target = if found == ty {
            id
        } else {
            match data.first_child {
                Some(child) if found == NodeType::Element && self.node_type(child) == Some(ty) => {
                    child
                }
                _ => {
                    return Err(Error::TypeMismatch {
                        expected: ty,
                        found,
                    })
                }
            }
        };
        Ok(&mut self.node_mut(target).kind)
    }

    /// Returns the name of an element.
    #[must_use]
    pub fn element_name(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the value of an integer node (or of an element's first child).
    #[must_use]
    pub fn integer(&self, id: NodeId) -> Option<i64> {
        match self.value_node(id, NodeType::Integer)? {
            NodeKind::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value of a real node (or of an element's first child).
    #[must_use]
    pub fn real(&self, id: NodeId) -> Option<f64> {
        match self.value_node(id, NodeType::Real)? {
            NodeKind::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value of an opaque node (or of an element's first child).
    #[must_use]
    pub fn opaque(&self, id: NodeId) -> Option<&str> {
        match self.value_node(id, NodeType::Opaque)? {
            NodeKind::Opaque(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the word of a text node (or of an element's first child).
    #[must_use]
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.value_node(id, NodeType::Text)? {
            NodeKind::Text { content, .. } => Some(content),
            _ => None,
        }
    }

    /// Returns the leading-whitespace flag of a text node.
    #[must_use]
    pub fn text_whitespace(&self, id: NodeId) -> Option<bool> {
        match self.value_node(id, NodeType::Text)? {
            NodeKind::Text { whitespace, .. } => Some(*whitespace),
            _ => None,
        }
    }

    /// Returns the body of a CDATA node (or of an element's first child).
    #[must_use]
    pub fn cdata(&self, id: NodeId) -> Option<&str> {
        match self.value_node(id, NodeType::CData)? {
            NodeKind::CData(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the body of a comment node.
    #[must_use]
    pub fn comment(&self, id: NodeId) -> Option<&str> {
        match self.value_node(id, NodeType::Comment)? {
            NodeKind::Comment(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the body of a processing-instruction node.
    #[must_use]
    pub fn declaration(&self, id: NodeId) -> Option<&str> {
        match self.value_node(id, NodeType::Declaration)? {
            NodeKind::Declaration(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the body of a markup declaration node.
    #[must_use]
    pub fn directive(&self, id: NodeId) -> Option<&str> {
        match self.value_node(id, NodeType::Directive)? {
            NodeKind::Directive(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the payload of a custom node.
    #[must_use]
    pub fn custom(&self, id: NodeId) -> Option<&dyn CustomData> {
        match self.value_node(id, NodeType::Custom)? {
            NodeKind::Custom(v) => Some(v.as_ref()),
            _ => None,
        }
    }

    /// Renames an element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] or [`Error::NotAnElement`].
    pub fn set_element_name(&mut self, id: NodeId, new_name: &str) -> Result<(), Error> {
        match &mut self.get_mut(id).ok_or(Error::StaleNode)?.kind {
            NodeKind::Element { name, .. } => {
                new_name.clone_into(name);
                Ok(())
            }
            _ => Err(Error::NotAnElement),
        }
    }

    /// Replaces the value of an integer node (or of an element's first child).
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] or [`Error::TypeMismatch`].
    pub fn set_integer(&mut self, id: NodeId, value: i64) -> Result<(), Error> {
        if let NodeKind::Integer(v) = self.value_node_mut(id, NodeType::Integer)? {
            *v = value;
        }
        Ok(())
    }

    /// Replaces the value of a real node (or of an element's first child).
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] or [`Error::TypeMismatch`].
    pub fn set_real(&mut self, id: NodeId, value: f64) -> Result<(), Error> {
        if let NodeKind::Real(v) = self.value_node_mut(id, NodeType::Real)? {
            *v = value;
        }
        Ok(())
    }

    /// Replaces the value of an opaque node (or of an element's first child).
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] or [`Error::TypeMismatch`].
    pub fn set_opaque(&mut self, id: NodeId, value: &str) -> Result<(), Error> {
        if let NodeKind::Opaque(v) = self.value_node_mut(id, NodeType::Opaque)? {
            value.clone_into(v);
        }
        Ok(())
    }

    /// Replaces the word and whitespace flag of a text node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] or [`Error::TypeMismatch`].
    pub fn set_text(&mut self, id: NodeId, whitespace: bool, value: &str) -> Result<(), Error> {
        if let NodeKind::Text {
            whitespace: ws,
            content,
        } = self.value_node_mut(id, NodeType::Text)?
        {
            *ws = whitespace;
            value.clone_into(content);
        }
        Ok(())
    }

    /// Replaces the body of a CDATA node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] or [`Error::TypeMismatch`].
    pub fn set_cdata(&mut self, id: NodeId, value: &str) -> Result<(), Error> {
        if let NodeKind::CData(v) = self.value_node_mut(id, NodeType::CData)? {
            value.clone_into(v);
        }
        Ok(())
    }

    /// Replaces the body of a comment node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] or [`Error::TypeMismatch`].
    pub fn set_comment(&mut self, id: NodeId, value: &str) -> Result<(), Error> {
        if let NodeKind::Comment(v) = self.value_node_mut(id, NodeType::Comment)? {
            value.clone_into(v);
        }
        Ok(())
    }

    /// Replaces the body of a processing-instruction node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] or [`Error::TypeMismatch`].
    pub fn set_declaration(&mut self, id: NodeId, value: &str) -> Result<(), Error> {
        if let NodeKind::Declaration(v) = self.value_node_mut(id, NodeType::Declaration)? {
            value.clone_into(v);
        }
        Ok(())
    }

    /// Replaces the body of a markup declaration node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] or [`Error::TypeMismatch`].
    pub fn set_directive(&mut self, id: NodeId, value: &str) -> Result<(), Error> {
        if let NodeKind::Directive(v) = self.value_node_mut(id, NodeType::Directive)? {
            value.clone_into(v);
        }
        Ok(())
    }

    /// Replaces the payload of a custom node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] or [`Error::TypeMismatch`].
    pub fn set_custom(&mut self, id: NodeId, data: Arc<dyn CustomData>) -> Result<(), Error> {
        if let NodeKind::Custom(v) = self.value_node_mut(id, NodeType::Custom)? {
            *v = data;
        }
        Ok(())
    }

    // --- Mutation ---

    fn is_container(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.kind.is_container())
    }

    /// Validates that `child` may be attached under `parent`.
    fn check_attach(&self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        if !self.contains(child) || child == self.root {
            return Err(Error::StaleNode);
        }
        if !self.is_container(parent) || self.ancestors(parent).any(|a| a == child) {
            return Err(Error::InvalidParent);
        }
        Ok(())
    }

    /// Appends `child` to the end of `parent`'s child list, detaching it from
    /// its current position first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] if `child` is deleted (or is the document
    /// root) and [`Error::InvalidParent`] if `parent` cannot hold children or
    /// lies inside `child`'s subtree.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        self.check_attach(parent, child)?;
        self.remove(child);
        self.link_last(parent, child);
        Ok(())
    }

    /// Inserts `child` as the first child of `parent`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`append_child`](Self::append_child).
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        self.check_attach(parent, child)?;
        self.remove(child);
        match self.first_child(parent) {
            Some(first) => self.link_before(first, child),
            None => self.link_last(parent, child),
        }
        Ok(())
    }

    /// Inserts `new_child` immediately before `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAChild`] if `reference` has no parent, otherwise
    /// the conditions of [`append_child`](Self::append_child).
    pub fn insert_before(&mut self, reference: NodeId, new_child: NodeId) -> Result<(), Error> {
        let parent = self.parent(reference).ok_or(Error::NotAChild)?;
        self.check_attach(parent, new_child)?;
        if reference != new_child {
            self.remove(new_child);
            self.link_before(reference, new_child);
        }
        Ok(())
    }

    /// Inserts `new_child` immediately after `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAChild`] if `reference` has no parent, otherwise
    /// the conditions of [`append_child`](Self::append_child).
    pub fn insert_after(&mut self, reference: NodeId, new_child: NodeId) -> Result<(), Error> {
        let parent = self.parent(reference).ok_or(Error::NotAChild)?;
        self.check_attach(parent, new_child)?;
        if reference != new_child {
            self.remove(new_child);
            self.link_after(reference, new_child);
        }
        Ok(())
    }

    /// Attaches `node` under `parent` relative to `reference`.
    ///
    /// With a reference child, `node` goes immediately before or after it.
    /// Without one, `Before` inserts at the start of the child chain and
    /// `After` at the end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAChild`] if `reference` is not a child of
    /// `parent`, otherwise the conditions of
    /// [`append_child`](Self::append_child).
    pub fn add(
        &mut self,
        parent: NodeId,
        position: InsertPosition,
        reference: Option<NodeId>,
        node: NodeId,
    ) -> Result<(), Error> {
        match (position, reference) {
            (InsertPosition::Before, None) => self.prepend_child(parent, node),
            (InsertPosition::After, None) => self.append_child(parent, node),
            (position, Some(reference)) => {
                if self.parent(reference) != Some(parent) {
                    return Err(Error::NotAChild);
                }
                match position {
                    InsertPosition::Before => self.insert_before(reference, node),
                    InsertPosition::After => self.insert_after(reference, node),
                }
            }
        }
    }

    fn link_last(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(child).parent = Some(parent);

        if let Some(last) = self.node_mut(parent).last_child {
            self.node_mut(last).next_sibling = Some(child);
            self.node_mut(child).prev_sibling = Some(last);
            self.node_mut(parent).last_child = Some(child);
        } else {
            let p = self.node_mut(parent);
            p.first_child = Some(child);
            p.last_child = Some(child);
        }
    }

    fn link_before(&mut self, reference: NodeId, child: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.node_mut(child).parent = Some(parent);

        if let Some(prev) = self.node_mut(reference).prev_sibling {
            self.node_mut(prev).next_sibling = Some(child);
            self.node_mut(child).prev_sibling = Some(prev);
        } else {
            self.node_mut(parent).first_child = Some(child);
        }

        self.node_mut(child).next_sibling = Some(reference);
        self.node_mut(reference).prev_sibling = Some(child);
    }

    fn link_after(&mut self, reference: NodeId, child: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.node_mut(child).parent = Some(parent);

        if let Some(next) = self.node_mut(reference).next_sibling {
            self.node_mut(next).prev_sibling = Some(child);
            self.node_mut(child).next_sibling = Some(next);
        } else {
            self.node_mut(parent).last_child = Some(child);
        }

        self.node_mut(child).prev_sibling = Some(reference);
        self.node_mut(reference).next_sibling = Some(child);
    }

    /// Detaches a node from its parent without freeing it. The node becomes
    /// an unparented root.
    pub fn remove(&mut self, id: NodeId) {
        let Some(data) = self.get(id) else {
            return;
        };
        let Some(parent) = data.parent else {
            return;
        };
        let prev = data.prev_sibling;
        let next = data.next_sibling;

        match prev {
            Some(p) => self.node_mut(p).next_sibling = next,
            None => self.node_mut(parent).first_child = next,
        }

        match next {
            Some(n) => self.node_mut(n).prev_sibling = prev,
            None => self.node_mut(parent).last_child = prev,
        }

        let node = self.node_mut(id);
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    /// Deletes a node and its whole subtree, repairing the sibling chain it
    /// leaves behind. Reference counts are not consulted.
    ///
    /// Deleting the document root deletes all of its children; the root
    /// itself stays. Deleting an already-deleted handle does nothing.
    pub fn delete(&mut self, id: NodeId) {
        if !self.contains(id) {
            return;
        }
        if id == self.root {
            while let Some(child) = self.first_child(id) {
                self.delete(child);
            }
            return;
        }
        self.remove(id);
        self.free_subtree(id);
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let index = current.as_index();
            let Some(data) = self.slots[index].data.take() else {
                continue;
            };
            let mut child = data.first_child;
            while let Some(c) = child {
                stack.push(c);
                child = self.next_sibling(c);
            }
            let slot = &mut self.slots[index];
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(index);
            self.live -= 1;
        }
    }

    // --- Reference counting ---

    /// Returns the reference count of a node.
    #[must_use]
    pub fn ref_count(&self, id: NodeId) -> Option<u32> {
        self.get(id).map(|n| n.ref_count)
    }

    /// Increments the reference count of a node and returns the new count.
    pub fn retain(&mut self, id: NodeId) -> Option<u32> {
        let data = self.get_mut(id)?;
        data.ref_count += 1;
        Some(data.ref_count)
    }

    /// Decrements the reference count of a node and returns the new count.
    /// At zero the node and its subtree are deleted. The root's count never
    /// drops below 1.
    pub fn release(&mut self, id: NodeId) -> Option<u32> {
        let floor = u32::from(id == self.root);
        let data = self.get_mut(id)?;
        data.ref_count = data.ref_count.saturating_sub(1).max(floor);
        let count = data.ref_count;
        if count == 0 {
            self.delete(id);
        }
        Some(count)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

// --- Iterators ---

/// Iterator over the children of a node.
pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.next_sibling(current);
        Some(current)
    }
}

/// Iterator over a node and its ancestors.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

/// Depth-first iterator over all descendants of a node.
pub struct Descendants<'a> {
    doc: &'a Document,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        if let Some(child) = self.doc.first_child(current) {
            self.next = Some(child);
            return Some(current);
        }

        if let Some(sibling) = self.doc.next_sibling(current) {
            self.next = Some(sibling);
            return Some(current);
        }

        let mut ancestor = self.doc.parent(current);
        while let Some(anc) = ancestor {
            if anc == self.root {
                break;
            }
            if let Some(sibling) = self.doc.next_sibling(anc) {
                self.next = Some(sibling);
                return Some(current);
            }
            ancestor = self.doc.parent(anc);
        }

        self.next = None;
        Some(current)
    }
}
