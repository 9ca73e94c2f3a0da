//! XML writer.
//!
//! Walks a subtree and writes its text form, tracking the output column so
//! that separator spaces can turn into line breaks at the wrap margin.

use crate::encoding::is_utf8_label;
use crate::error::Error;
use crate::tree::{Document, NodeId, NodeKind};

use super::{SaveOptions, WhitespacePosition};

/// Accumulates the serialized form of one subtree.
pub(crate) struct XmlWriter<'a> {
    doc: &'a Document,
    options: &'a SaveOptions,
    out: String,
    /// Current output column, with tabs expanded to multiples of 8.
    col: usize,
}

impl<'a> XmlWriter<'a> {
    pub fn new(doc: &'a Document, options: &'a SaveOptions) -> Self {
        Self {
            doc,
            options,
            out: String::new(),
            col: 0,
        }
    }

    pub fn finish(self) -> String {
        self.out
    }

    /// Writes `node` and everything below it. The document root writes the
    /// XML declaration, if any, and then its children.
    pub fn write_subtree(&mut self, node: NodeId) -> Result<(), Error> {
        let doc = self.doc;
        let data = doc.get(node).ok_or(Error::StaleNode)?;
        if matches!(data.kind, NodeKind::Document) {
            self.write_xml_declaration();
            for child in doc.children(node) {
                self.write_node(child);
            }
        } else {
            self.write_node(node);
        }
        Ok(())
    }

    fn write_xml_declaration(&mut self) {
        let doc = self.doc;
        let Some(version) = doc.version.as_deref() else {
            return;
        };
        self.put("<?xml version=\"");
        self.put(version);
        self.put("\"");
        if let Some(encoding) = doc.encoding.as_deref() {
            // the output is always UTF-8
            let label = if is_utf8_label(encoding) { encoding } else { "utf-8" };
            self.put(" encoding=\"");
            self.put(label);
            self.put("\"");
        }
        if let Some(standalone) = doc.standalone {
            self.put(if standalone {
                " standalone=\"yes\""
            } else {
                " standalone=\"no\""
            });
        }
        self.put("?>\n");
    }

    fn write_node(&mut self, id: NodeId) {
        let doc = self.doc;
        let Some(data) = doc.get(id) else {
            return;
        };
        match &data.kind {
            NodeKind::Document => {
                for child in doc.children(id) {
                    self.write_node(child);
                }
            }
            NodeKind::Element { name, attributes } => {
                self.whitespace(id, WhitespacePosition::BeforeOpen);
                self.put("<");
                self.put(name);
                for attr in attributes {
                    let width = attr.name.len() + attr.value.len() + 3;
                    if self.options.wrap_margin > 0 && self.col + width > self.options.wrap_margin
                    {
                        self.put("\n");
                    } else {
                        self.put(" ");
                    }
                    self.put(&attr.name);
                    self.put("=\"");
                    self.put_escaped(&attr.value, true);
                    self.put("\"");
                }

                if data.first_child.is_some() {
                    self.put(">");
                    self.whitespace(id, WhitespacePosition::AfterOpen);
                    for child in doc.children(id) {
                        self.write_node(child);
                    }
                    self.whitespace(id, WhitespacePosition::BeforeClose);
                    self.put("</");
                    self.put(name);
                    self.put(">");
                    self.whitespace(id, WhitespacePosition::AfterClose);
                } else {
                    self.put("/>");
                    self.whitespace(id, WhitespacePosition::AfterOpen);
                }
            }
            NodeKind::Integer(value) => {
                if data.prev_sibling.is_some() {
                    self.separator();
                }
                self.put(&value.to_string());
            }
            NodeKind::Real(value) => {
                if data.prev_sibling.is_some() {
                    self.separator();
                }
                self.put(&value.to_string());
            }
            NodeKind::Opaque(value) => self.put_escaped(value, false),
            NodeKind::Text {
                whitespace,
                content,
            } => {
                if *whitespace && self.col > 0 {
                    self.separator();
                }
                self.put_escaped(content, false);
            }
            NodeKind::CData(content) => self.write_markup(id, "<![CDATA[", content, "]]>"),
            NodeKind::Comment(content) => self.write_markup(id, "<!--", content, "-->"),
            NodeKind::Declaration(content) => self.write_markup(id, "<?", content, "?>"),
            NodeKind::Directive(content) => self.write_markup(id, "<!", content, ">"),
            NodeKind::Custom(custom) => self.put_escaped(&custom.to_xml_text(), false),
        }
    }

    /// Writes a bracketed markup node with its whitespace hooks.
    fn write_markup(&mut self, id: NodeId, open: &str, content: &str, close: &str) {
        self.whitespace(id, WhitespacePosition::BeforeOpen);
        self.put(open);
        self.put(content);
        self.put(close);
        self.whitespace(id, WhitespacePosition::AfterOpen);
    }

    /// Writes whatever the whitespace callback returns for this position.
    fn whitespace(&mut self, id: NodeId, position: WhitespacePosition) {
        let options = self.options;
        let Some(callback) = options.whitespace.as_deref() else {
            return;
        };
        if let Some(text) = callback(self.doc, id, position) {
            self.put(&text);
        }
    }

    /// Writes a space, or a newline once the column is past the margin.
    fn separator(&mut self) {
        let margin = self.options.wrap_margin;
        if margin > 0 && self.col > margin {
            self.put("\n");
        } else {
            self.put(" ");
        }
    }

    fn put(&mut self, s: &str) {
        for ch in s.chars() {
            self.advance_col(ch);
        }
        self.out.push_str(s);
    }

    /// Writes character data, escaping `&`, `<`, `>` and, in attribute
    /// values, `"`.
    fn put_escaped(&mut self, s: &str, attribute: bool) {
        for ch in s.chars() {
            match ch {
                '&' => self.put("&amp;"),
                '<' => self.put("&lt;"),
                '>' => self.put("&gt;"),
                '"' if attribute => self.put("&quot;"),
                _ => {
                    self.advance_col(ch);
                    self.out.push(ch);
                }
            }
        }
    }

    fn advance_col(&mut self, ch: char) {
        self.col = match ch {
            '\n' => 0,
            '\t' => (self.col / 8 + 1) * 8,
            _ => self.col + 1,
        };
    }
}
