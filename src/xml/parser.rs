//! Build an [`XmlTree`] from text using quick-xml's pull parser.

use super::{Element, NodeId, NodeKind, XmlTree};
use crate::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::path::Path;

fn element_from_start(start: &BytesStart<'_>) -> Result<Element> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::InvalidAttr)?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(Element { name, attributes })
}

/// Accumulates nodes while the parser walks the input.
struct TreeBuilder {
    tree: XmlTree,
    root: Option<NodeId>,
    stack: Vec<NodeId>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            tree: XmlTree {
                nodes: Vec::new(),
                root: NodeId(0),
                prolog: Vec::new(),
            },
            root: None,
            stack: Vec::new(),
        }
    }

    fn attach(&mut self, kind: NodeKind) -> Result<NodeId> {
        let is_element = matches!(kind, NodeKind::Element(_));
        let id = self.tree.push_node(kind);
        match self.stack.last() {
            Some(parent) => self.tree.append_child(*parent, id),
            None if is_element => {
                if self.root.is_some() {
                    return Err(Error::MalformedXml(
                        "document has more than one root element".to_string(),
                    ));
                }
                self.root = Some(id);
            }
            None => self.tree.prolog.push(id),
        }
        Ok(id)
    }

    fn finish(mut self) -> Result<XmlTree> {
        if !self.stack.is_empty() {
            return Err(Error::MalformedXml(
                "unclosed element at end of input".to_string(),
            ));
        }
        self.tree.root = self
            .root
            .ok_or_else(|| Error::MalformedXml("document has no root element".to_string()))?;
        Ok(self.tree)
    }
}

impl XmlTree {
    /// Parse a document from a string.
    pub fn parse(input: &str) -> Result<Self> {
        let mut reader = Reader::from_str(input);
        reader.trim_text(false);
        let mut builder = TreeBuilder::new();

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    let id = builder.attach(NodeKind::Element(element_from_start(&start)?))?;
                    builder.stack.push(id);
                }
                Event::Empty(start) => {
                    builder.attach(NodeKind::Element(element_from_start(&start)?))?;
                }
                Event::End(_) => {
                    if builder.stack.pop().is_none() {
                        return Err(Error::MalformedXml("unexpected closing tag".to_string()));
                    }
                }
                Event::Text(text) => {
                    let text = text.unescape()?.into_owned();
                    // Whitespace between prolog items and the root carries no content
                    if builder.stack.is_empty() {
                        if !text.trim().is_empty() {
                            return Err(Error::MalformedXml(
                                "text outside of the root element".to_string(),
                            ));
                        }
                        continue;
                    }
                    builder.attach(NodeKind::Text(text))?;
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    builder.attach(NodeKind::CData(text))?;
                }
                Event::Comment(comment) => {
                    let text = String::from_utf8_lossy(&comment).into_owned();
                    builder.attach(NodeKind::Comment(text))?;
                }
                Event::PI(instruction) => {
                    let text = String::from_utf8_lossy(&instruction).into_owned();
                    builder.attach(NodeKind::ProcessingInstruction(text))?;
                }
                Event::DocType(doctype) => {
                    let text = String::from_utf8_lossy(&doctype).into_owned();
                    builder.attach(NodeKind::Doctype(text))?;
                }
                // The declaration is regenerated when writing
                Event::Decl(_) => {}
                Event::Eof => break,
            }
        }

        builder.finish()
    }

    /// Read and parse a document from disk.
    pub fn read(path: &Path) -> Result<Self> {
        let input = std::fs::read_to_string(path)?;
        Self::parse(&input)
    }
}
