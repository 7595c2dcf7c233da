//! Serialize an [`XmlTree`] back to text.
//!
//! Text nodes are written exactly as parsed, so untouched parts of a document
//! round-trip unchanged. Elements whose children are all elements (typically
//! ones created programmatically) are indented two spaces per level, relative
//! to the indentation the element itself sits at.

use super::{NodeId, NodeKind, XmlTree};
use crate::Result;
use quick_xml::escape::{escape, partial_escape};
use std::io::Write;
use std::path::Path;

const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const INDENT: &str = "  ";

impl XmlTree {
    /// Serialize the document, including an XML declaration.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        out.push_str(DECLARATION);
        out.push('\n');
        for node in self.prolog() {
            self.write_node(*node, "", &mut out);
            out.push('\n');
        }
        self.write_node(self.root(), "", &mut out);
        out.push('\n');
        out
    }

    /// Serialize a single subtree without a declaration.
    pub fn node_to_string(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, "", &mut out);
        out
    }

    /// Write the document to `path` atomically.
    ///
    /// The content goes to a temporary file in the same directory which is
    /// then renamed over the destination.
    pub fn write(&self, path: &Path) -> Result<()> {
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir()?,
        };
        std::fs::create_dir_all(&directory)?;
        let mut file = tempfile::NamedTempFile::new_in(&directory)?;
        file.write_all(self.to_xml_string().as_bytes())?;
        file.flush()?;
        file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn write_node(&self, id: NodeId, indent: &str, out: &mut String) {
        match self.kind(id) {
            NodeKind::Text(text) => out.push_str(&partial_escape(text.as_str())),
            NodeKind::CData(text) => {
                out.push_str("<![CDATA[");
                out.push_str(text);
                out.push_str("]]>");
            }
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::ProcessingInstruction(text) => {
                out.push_str("<?");
                out.push_str(text);
                out.push_str("?>");
            }
            NodeKind::Doctype(text) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(text.trim());
                out.push('>');
            }
            NodeKind::Element(element) => {
                out.push('<');
                out.push_str(&element.name);
                for (key, value) in &element.attributes {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(&escape(value.as_str()));
                    out.push('"');
                }

                let children = self.children(id);
                if children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');

                let element_only = children
                    .iter()
                    .all(|child| !matches!(self.kind(*child), NodeKind::Text(_) | NodeKind::CData(_)));

                if element_only {
                    let child_indent = format!("{}{}", indent, INDENT);
                    for child in children {
                        out.push('\n');
                        out.push_str(&child_indent);
                        self.write_node(*child, &child_indent, out);
                    }
                    out.push('\n');
                    out.push_str(indent);
                } else {
                    let mut child_indent = format!("{}{}", indent, INDENT);
                    for child in children {
                        if let NodeKind::Text(text) = self.kind(*child) {
                            if let Some(index) = text.rfind('\n') {
                                let tail = &text[index + 1..];
                                if tail.trim().is_empty() {
                                    child_indent = tail.to_string();
                                }
                            }
                        }
                        self.write_node(*child, &child_indent, out);
                    }
                }

                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            }
        }
    }
}
