//! Core recursive descent parser.
//!
//! One grammar serves both load modes. In DOM mode nodes are simply appended
//! under the target parent. With a SAX handler attached every completed unit
//! is reported as it finishes and then released once, so only nodes the
//! handler retained (and still-open ancestors) stay in the tree.

use std::ops::ControlFlow;

use tracing::{debug, trace};

use crate::error::ParseError;
use crate::sax::{SaxContext, SaxEvent, SaxHandler};
use crate::tree::{Attribute, Document, NodeId, NodeKind};

use super::classify::LeafKind;
use super::input::{
    is_whitespace, parse_cdata_content, parse_comment_content, parse_declaration_content,
    parse_directive_content, parse_xml_decl, ParserInput,
};
use super::ParseOptions;

/// Why parsing stopped early.
pub(crate) enum Halt {
    /// The input is malformed.
    Error(ParseError),
    /// The SAX handler asked to stop.
    Stopped,
}

impl From<ParseError> for Halt {
    fn from(err: ParseError) -> Self {
        Self::Error(err)
    }
}

/// Parses `text` and appends the result under `parent`.
///
/// Returns the first top-level node created by this call if it is still
/// alive. On malformed input every node the call created is deleted and the
/// document's XML declaration fields are restored before the error returns.
pub(crate) fn load_into(
    doc: &mut Document,
    parent: NodeId,
    text: &str,
    options: &ParseOptions,
    handler: Option<&mut dyn SaxHandler>,
) -> Result<Option<NodeId>, ParseError> {
    if !doc.get(parent).is_some_and(|n| n.kind.is_container()) {
        return Err(ParseError::without_location(
            "load target is missing or cannot hold children",
        ));
    }
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    let saved_decl = (
        doc.version.clone(),
        doc.encoding.clone(),
        doc.standalone,
    );

    let mut parser = XmlParser::new(text, &mut *doc, parent, options, handler);
    let outcome = parser.parse_content(parent);
    let created = std::mem::take(&mut parser.created);

    match outcome {
        Ok(()) => Ok(created.first().copied().filter(|&id| doc.contains(id))),
        Err(Halt::Stopped) => {
            trace!(nodes = created.len(), "SAX handler stopped the parse");
            Ok(created.first().copied().filter(|&id| doc.contains(id)))
        }
        Err(Halt::Error(err)) => {
            debug!(error = %err, nodes = created.len(), "load failed, discarding partial nodes");
            for id in created {
                doc.delete(id);
            }
            (doc.version, doc.encoding, doc.standalone) = saved_decl;
            Err(err)
        }
    }
}

/// The parser state for one load call.
pub(crate) struct XmlParser<'a, 'h> {
    /// Low-level input state.
    input: ParserInput<'a>,
    /// The document receiving the nodes.
    doc: &'a mut Document,
    /// The node the load appends to.
    target: NodeId,
    /// Parser options.
    options: &'a ParseOptions,
    /// Event handler in SAX mode.
    handler: Option<&'a mut (dyn SaxHandler + 'h)>,
    /// Nodes created directly under `target`, in order.
    created: Vec<NodeId>,
    /// Whether an `<?xml ...?>` declaration may still appear.
    decl_allowed: bool,
}

impl<'a, 'h> XmlParser<'a, 'h> {
    pub fn new(
        text: &'a str,
        doc: &'a mut Document,
        target: NodeId,
        options: &'a ParseOptions,
        handler: Option<&'a mut (dyn SaxHandler + 'h)>,
    ) -> Self {
        Self {
            input: ParserInput::new(text).with_options(options),
            decl_allowed: target == doc.root() && doc.first_child(target).is_none(),
            doc,
            target,
            options,
            handler,
            created: Vec::new(),
        }
    }

    // --- Node bookkeeping ---

    fn create(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId, Halt> {
        let id = self
            .doc
            .create_child(Some(parent), kind)
            .map_err(|e| self.input.fatal(e.to_string()))?;
        if parent == self.target {
            self.created.push(id);
        }
        if parent == self.doc.root() {
            self.decl_allowed = false;
        }
        Ok(id)
    }

    /// Reports an event to the SAX handler, if any.
    fn emit(&mut self, node: NodeId, event: SaxEvent) -> Result<(), Halt> {
        let Some(handler) = self.handler.as_deref_mut() else {
            return Ok(());
        };
        let mut cx = SaxContext::new(&mut *self.doc);
        match handler.event(&mut cx, node, event) {
            ControlFlow::Continue(()) => Ok(()),
            ControlFlow::Break(()) => Err(Halt::Stopped),
        }
    }

    /// Drops the parser's hold on a completed node in SAX mode.
    fn release(&mut self, node: NodeId) {
        if self.handler.is_some() {
            let remaining = self.doc.release(node);
            trace!(?node, ?remaining, "released completed node");
        }
    }

    /// Reports a completed leaf-like node and releases it.
    fn complete(&mut self, node: NodeId, event: SaxEvent) -> Result<(), Halt> {
        let outcome = self.emit(node, event);
        self.release(node);
        outcome
    }

    fn classify(&self, parent: NodeId) -> LeafKind {
        self.options.classifier.classify(&*self.doc, parent)
    }

    // --- Content ---

    /// Parses a sequence of nodes under `parent` until its end tag (or the
    /// end of input when `parent` is the load target).
    fn parse_content(&mut self, parent: NodeId) -> Result<(), Halt> {
        let top_level = parent == self.target;
        let in_root = parent == self.doc.root();
        let mut kind = if in_root {
            LeafKind::Ignore
        } else {
            self.classify(parent)
        };

        loop {
            if self.input.at_end() {
                if top_level {
                    return Ok(());
                }
                return Err(self
                    .input
                    .fatal("unexpected end of input in element content")
                    .into());
            }

            if self.input.looking_at(b"</") {
                if top_level {
                    return Err(self.input.fatal("close tag without matching open tag").into());
                }
                return Ok(());
            }

            if self.input.looking_at(b"<![CDATA[") {
                let content = parse_cdata_content(&mut self.input)?;
                let id = self.create(parent, NodeKind::CData(content))?;
                self.complete(id, SaxEvent::CData)?;
            } else if self.input.looking_at(b"<!--") {
                let content = parse_comment_content(&mut self.input)?;
                let id = self.create(parent, NodeKind::Comment(content))?;
                self.complete(id, SaxEvent::Comment)?;
            } else if in_root && self.looking_at_xml_decl() {
                if !self.decl_allowed {
                    return Err(self
                        .input
                        .fatal("XML declaration allowed only at the start of the document")
                        .into());
                }
                self.decl_allowed = false;
                let decl = parse_xml_decl(&mut self.input)?;
                self.doc.version = Some(decl.version);
                self.doc.encoding = decl.encoding;
                self.doc.standalone = decl.standalone;
            } else if self.input.looking_at(b"<?") {
                let content = parse_declaration_content(&mut self.input)?;
                let id = self.create(parent, NodeKind::Declaration(content))?;
                self.complete(id, SaxEvent::Declaration)?;
            } else if self.input.looking_at(b"<!") {
                let content = parse_directive_content(&mut self.input)?;
                let id = self.create(parent, NodeKind::Directive(content))?;
                self.complete(id, SaxEvent::Directive)?;
            } else if self.input.peek() == Some(b'<') {
                self.parse_element(parent)?;
                if !in_root {
                    kind = self.classify(parent);
                }
            } else if in_root {
                self.input.skip_whitespace();
                if !self.input.at_end() && self.input.peek() != Some(b'<') {
                    return Err(self
                        .input
                        .fatal("character data outside of an element")
                        .into());
                }
            } else if kind == LeafKind::Opaque {
                self.parse_opaque(parent)?;
            } else {
                self.parse_tokens(parent, kind)?;
            }
        }
    }

    fn looking_at_xml_decl(&self) -> bool {
        self.input.looking_at(b"<?xml") && self.input.byte_at(5).is_some_and(is_whitespace)
    }

    // --- Elements ---

    fn parse_element(&mut self, parent: NodeId) -> Result<(), Halt> {
        self.input.enter_element()?;
        self.input.expect(b"<")?;
        let name = self.input.parse_name()?;
        let mut attributes: Vec<Attribute> = Vec::new();

        loop {
            let had_ws = self.input.skip_whitespace();
            if self.input.peek() == Some(b'>') || self.input.looking_at(b"/>") {
                break;
            }
            if self.input.at_end() {
                return Err(self.input.fatal("unexpected end of input in start tag").into());
            }
            if !had_ws {
                return Err(self
                    .input
                    .fatal("whitespace required between attributes")
                    .into());
            }
            let attr = self.parse_attribute()?;
            if attributes.iter().any(|a| a.name == attr.name) {
                return Err(self
                    .input
                    .fatal(format!("duplicate attribute: '{}'", attr.name))
                    .into());
            }
            attributes.push(attr);
        }

        let self_closing = self.input.looking_at(b"/>");
        self.input.skip(if self_closing { 2 } else { 1 });

        let id = self.create(
            parent,
            NodeKind::Element {
                name: name.clone(),
                attributes,
            },
        )?;

        let outcome = self.emit(id, SaxEvent::ElementOpen).and_then(|()| {
            if !self_closing {
                self.parse_content(id)?;
                self.parse_end_tag(&name)?;
            }
            self.input.leave_element();
            self.emit(id, SaxEvent::ElementClose)
        });

        match outcome {
            Err(Halt::Error(err)) => Err(Halt::Error(err)),
            other => {
                self.release(id);
                other
            }
        }
    }

    fn parse_end_tag(&mut self, expected: &str) -> Result<(), ParseError> {
        self.input.expect(b"</")?;
        let name = self.input.parse_name()?;
        if name != expected {
            return Err(self.input.fatal(format!(
                "mismatched close tag: expected </{expected}>, found </{name}>"
            )));
        }
        self.input.skip_whitespace();
        self.input.expect(b">")
    }

    fn parse_attribute(&mut self) -> Result<Attribute, ParseError> {
        let name = self.input.parse_name()?;
        self.input.skip_whitespace();
        if !self.input.eat(b"=") {
            return Err(self
                .input
                .fatal(format!("missing '=' after attribute '{name}'")));
        }
        self.input.skip_whitespace();
        let value = self.input.parse_attribute_value()?;
        Ok(Attribute { name, value })
    }

    // --- Character data ---

    /// Reads one run of character data as a single opaque node.
    fn parse_opaque(&mut self, parent: NodeId) -> Result<(), Halt> {
        let mut run = String::new();
        let mut blank = true;
        while let Some(b) = self.input.peek() {
            match b {
                b'<' => break,
                b'&' => {
                    run.push_str(&self.input.parse_reference()?);
                    blank = false;
                }
                _ => {
                    let ch = self.input.next_char()?;
                    blank &= ch.is_ascii_whitespace();
                    run.push(ch);
                }
            }
        }
        if blank {
            return Ok(());
        }
        let id = self.create(parent, NodeKind::Opaque(run))?;
        self.complete(id, SaxEvent::Data)
    }

    /// Reads one run of character data, splitting it into whitespace
    /// separated tokens of the given kind.
    fn parse_tokens(&mut self, parent: NodeId, kind: LeafKind) -> Result<(), Halt> {
        let mut token = String::new();
        let mut whitespace = false;
        while let Some(b) = self.input.peek() {
            match b {
                b'<' => break,
                b'&' => token.push_str(&self.input.parse_reference()?),
                _ if is_whitespace(b) => {
                    self.input.skip(1);
                    if !token.is_empty() {
                        self.leaf(parent, kind, whitespace, std::mem::take(&mut token))?;
                    }
                    whitespace = true;
                }
                _ => token.push(self.input.next_char()?),
            }
        }

        if !token.is_empty() {
            self.leaf(parent, kind, whitespace, token)?;
        } else if whitespace && kind == LeafKind::Text && self.input.peek() == Some(b'<') {
            self.leaf(parent, kind, true, String::new())?;
        }
        Ok(())
    }

    fn leaf(
        &mut self,
        parent: NodeId,
        kind: LeafKind,
        whitespace: bool,
        token: String,
    ) -> Result<(), Halt> {
        let node = match kind {
            LeafKind::Ignore => return Ok(()),
            LeafKind::Integer => match token.parse::<i64>() {
                Ok(v) => NodeKind::Integer(v),
                Err(_) => NodeKind::Text {
                    whitespace,
                    content: token,
                },
            },
            LeafKind::Real => match token.parse::<f64>() {
                Ok(v) => NodeKind::Real(v),
                Err(_) => NodeKind::Text {
                    whitespace,
                    content: token,
                },
            },
            LeafKind::Opaque => NodeKind::Opaque(token),
            LeafKind::Text => NodeKind::Text {
                whitespace,
                content: token,
            },
        };
        let id = self.create(parent, node)?;
        self.complete(id, SaxEvent::Data)
    }
}
