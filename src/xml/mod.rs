//! XML access layer.
//!
//! An arena-backed DOM built for TEI documents. Nodes are addressed by
//! [`NodeId`] and never move once created; detaching a node only unlinks it
//! from its parent. Element lookups match on the *local* name so that documents
//! declaring the TEI default namespace behave the same as bare ones.
//!
//! - [`parser`] builds an [`XmlTree`] from text with quick-xml's pull parser
//! - [`writer`] serializes it back, preserving untouched text verbatim

pub mod parser;
pub mod writer;

/// Attribute holding an element's document-unique identifier.
pub const XML_ID: &str = "xml:id";

/// Attribute holding an element's language code.
pub const XML_LANG: &str = "xml:lang";

/// Elements whose content never contributes to extracted text.
const EXCLUDED_FROM_TEXT: [&str; 3] = ["note", "pc", "witDetail"];

/// Handle to a node inside an [`XmlTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// An element's name and attributes (in document order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
}

/// The different kinds of node kept in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    Doctype(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A parsed XML document.
#[derive(Debug, Clone)]
pub struct XmlTree {
    nodes: Vec<Node>,
    root: NodeId,
    /// Comments, processing instructions and doctype preceding the root element
    prolog: Vec<NodeId>,
}

/// Strip any namespace prefix from a qualified name.
pub fn local_name(name: &str) -> &str {
    match name.rfind(':') {
        Some(index) => &name[index + 1..],
        None => name,
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl XmlTree {
    /// Create a tree holding a single empty root element.
    pub fn new(root_name: &str) -> Self {
        let root = Node {
            kind: NodeKind::Element(Element {
                name: root_name.to_string(),
                attributes: Vec::new(),
            }),
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            prolog: Vec::new(),
        }
    }

    /// The document element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn prolog(&self) -> &[NodeId] {
        &self.prolog
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// The qualified name of an element node.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element.name.as_str()),
            _ => None,
        }
    }

    /// Check whether `id` is an element whose local name is `name`.
    pub fn is_element(&self, id: NodeId, name: &str) -> bool {
        self.name(id).map(local_name) == Some(name)
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        match &self.nodes[id.0].kind {
            NodeKind::Element(element) => &element.attributes,
            _ => &[],
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element(element) = &mut self.nodes[id.0].kind {
            match element.attributes.iter_mut().find(|(key, _)| key == name) {
                Some((_, existing)) => *existing = value.to_string(),
                None => element
                    .attributes
                    .push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        if let NodeKind::Element(element) = &mut self.nodes[id.0].kind {
            let index = element.attributes.iter().position(|(key, _)| key == name)?;
            return Some(element.attributes.remove(index).1);
        }
        None
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Direct element children with the given local name.
    pub fn children_named(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.is_element(*child, name))
            .collect()
    }

    /// All descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            result.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        result
    }

    /// Descendant elements with the given local name, in document order.
    pub fn find_descendants(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|node| self.is_element(*node, name))
            .collect()
    }

    /// The first descendant element with the given local name.
    pub fn find_descendant(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.find_descendants(id, name).into_iter().next()
    }

    /// Descendant elements named `name` whose `attribute` equals `value`.
    pub fn find_descendants_with(
        &self,
        id: NodeId,
        name: &str,
        attribute: &str,
        value: &str,
    ) -> Vec<NodeId> {
        self.find_descendants(id, name)
            .into_iter()
            .filter(|node| self.attribute(*node, attribute) == Some(value))
            .collect()
    }

    /// The first descendant element named `name` whose `attribute` equals `value`.
    pub fn find_descendant_with(
        &self,
        id: NodeId,
        name: &str,
        attribute: &str,
        value: &str,
    ) -> Option<NodeId> {
        self.find_descendants_with(id, name, attribute, value)
            .into_iter()
            .next()
    }

    /// The nearest ancestor element with the given local name.
    pub fn find_ancestor(&self, id: NodeId, name: &str) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if self.is_element(node, name) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Whether the node is still reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element with the given attributes.
    pub fn create_element(&mut self, name: &str, attributes: &[(&str, &str)]) -> NodeId {
        self.push_node(NodeKind::Element(Element {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Text(text.to_string()))
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.nodes[child.0].parent.take() {
            self.nodes[parent.0].children.retain(|node| *node != child);
        }
    }

    /// Append `child` as the last child of `parent`, exactly as given.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `child` at `index` among the children of `parent`.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    /// Insert `child` directly after `sibling`.
    pub fn insert_after(&mut self, sibling: NodeId, child: NodeId) {
        let Some(parent) = self.parent(sibling) else {
            return;
        };
        let index = self
            .child_index(parent, sibling)
            .map(|index| index + 1)
            .unwrap_or(usize::MAX);
        self.insert_child(parent, index, child);
    }

    pub fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|node| *node == child)
    }

    fn whitespace_text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) if text.trim().is_empty() => Some(text.as_str()),
            _ => None,
        }
    }

    /// Append an element as the last child of `parent`, following the
    /// indentation already present between the parent's children.
    pub fn append_element(&mut self, parent: NodeId, child: NodeId) {
        let children = self.children(parent).to_vec();
        let closing = children
            .last()
            .and_then(|last| self.whitespace_text(*last).map(|text| (*last, text.to_string())));

        let Some((closing_node, closing_text)) = closing else {
            self.append_child(parent, child);
            return;
        };

        // Indentation used before the last element child, if there is one
        let item_indent = children
            .iter()
            .rposition(|node| self.name(*node).is_some())
            .and_then(|index| index.checked_sub(1))
            .and_then(|index| self.whitespace_text(children[index]))
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}  ", closing_text));

        let index = self.child_index(parent, closing_node).unwrap_or(children.len());
        let indent = self.create_text(&item_indent);
        self.insert_child(parent, index, indent);
        self.insert_child(parent, index + 1, child);
    }

    /// Insert an element directly after `sibling`, repeating the indentation
    /// that precedes the sibling.
    pub fn insert_element_after(&mut self, sibling: NodeId, child: NodeId) {
        let Some(parent) = self.parent(sibling) else {
            return;
        };
        let indent = self
            .child_index(parent, sibling)
            .and_then(|index| index.checked_sub(1))
            .and_then(|index| self.whitespace_text(self.children(parent)[index]))
            .map(str::to_string);

        self.insert_after(sibling, child);
        if let Some(indent) = indent {
            let copy = self.create_text(&indent);
            self.insert_after(sibling, copy);
        }
    }

    /// Insert an element as the first child of `parent`, repeating the
    /// indentation that precedes the current first child.
    pub fn prepend_element(&mut self, parent: NodeId, child: NodeId) {
        let leading = self
            .children(parent)
            .first()
            .and_then(|first| self.whitespace_text(*first).map(str::to_string));

        match leading {
            Some(indent) if self.children(parent).len() > 1 => {
                self.insert_child(parent, 1, child);
                let copy = self.create_text(&indent);
                self.insert_child(parent, 2, copy);
            }
            _ => self.insert_child(parent, 0, child),
        }
    }

    /// Create a detached copy of a node and its whole subtree.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let copy = self.push_node(self.nodes[id.0].kind.clone());
        for child in self.children(id).to_vec() {
            let child_copy = self.deep_copy(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Detach a node (and its subtree) from the document.
    ///
    /// Whitespace directly preceding the node is removed with it so that
    /// repeated removals do not accumulate blank lines.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            if let Some(index) = self.child_index(parent, id) {
                if index > 0 {
                    let previous = self.children(parent)[index - 1];
                    if self.whitespace_text(previous).is_some() {
                        self.detach(previous);
                    }
                }
            }
        }
        self.detach(id);
    }

    /// Concatenated text of the direct text children of `id`.
    pub fn text(&self, id: NodeId) -> String {
        self.children(id)
            .iter()
            .filter_map(|child| match &self.nodes[child.0].kind {
                NodeKind::Text(text) | NodeKind::CData(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace all children of `id` with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        for child in self.children(id).to_vec() {
            self.detach(child);
        }
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node);
        }
    }

    /// Extract the readable text of an element.
    ///
    /// Text of descendants is joined with single spaces. `note`, `pc` and
    /// `witDetail` contribute nothing and a nested `app` contributes its lemma
    /// (or its first reading when there is no lemma).
    pub fn extract_text(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        self.collect_text(id, None, &mut parts);
        normalize_whitespace(&parts.join(" "))
    }

    /// Text of `block` with the apparatus `app` rendered as `⸂replacement⸃`.
    pub fn text_in_context(&self, block: NodeId, app: NodeId, replacement: &str) -> String {
        let mut parts = Vec::new();
        self.collect_text(block, Some((app, replacement)), &mut parts);
        normalize_whitespace(&parts.join(" "))
    }

    fn collect_text(&self, id: NodeId, substitute: Option<(NodeId, &str)>, parts: &mut Vec<String>) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) | NodeKind::CData(text) => parts.push(text.clone()),
            NodeKind::Element(element) => {
                if let Some((target, replacement)) = substitute {
                    if target == id {
                        parts.push(format!("⸂{}⸃", replacement));
                        return;
                    }
                }
                let name = local_name(&element.name);
                if EXCLUDED_FROM_TEXT.contains(&name) {
                    return;
                }
                if name == "app" {
                    let chosen = self
                        .find_descendant(id, "lem")
                        .or_else(|| self.find_descendant(id, "rdg"));
                    if let Some(chosen) = chosen {
                        self.collect_text(chosen, substitute, parts);
                    }
                    return;
                }
                for child in self.children(id) {
                    self.collect_text(*child, substitute, parts);
                }
            }
            _ => {}
        }
    }

    /// The `xml:lang` of the first `<text>` element, or "".
    pub fn language_code(&self) -> String {
        let text = if self.is_element(self.root, "text") {
            Some(self.root)
        } else {
            self.find_descendant(self.root, "text")
        };
        text.and_then(|node| self.attribute(node, XML_LANG))
            .unwrap_or_default()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(xml: &str) -> XmlTree {
        XmlTree::parse(xml).unwrap()
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name("tei:app"), "app");
        assert_eq!(local_name("app"), "app");
        assert_eq!(local_name("xml:id"), "id");
    }

    #[test]
    fn test_extract_text_simple_node() {
        let t = tree("<text>Hello</text>");
        assert_eq!(t.extract_text(t.root()), "Hello");
    }

    #[test]
    fn test_extract_text_with_children() {
        let t = tree("<text>Hello<child>World</child></text>");
        assert_eq!(t.extract_text(t.root()), "Hello World");
    }

    #[test]
    fn test_extract_text_keeps_tail_of_excluded() {
        let t = tree("<rdg>Hello<note>ignored</note>Tail</rdg>");
        assert_eq!(t.extract_text(t.root()), "Hello Tail");
    }

    #[test]
    fn test_extract_text_with_excluded_tags() {
        for tag in ["pc", "witDetail", "note"] {
            let t = tree(&format!("<{tag}>Should be ignored</{tag}>"));
            assert_eq!(t.extract_text(t.root()), "");
        }
    }

    #[test]
    fn test_extract_text_app_with_lem() {
        let t = tree("<app><rdg>Reading</rdg><lem>Lemma text</lem></app>");
        assert_eq!(t.extract_text(t.root()), "Lemma text");
    }

    #[test]
    fn test_extract_text_app_with_rdg() {
        let t = tree("<app><rdg>Reading text</rdg><rdg>Other</rdg></app>");
        assert_eq!(t.extract_text(t.root()), "Reading text");
    }

    #[test]
    fn test_extract_text_app_no_lem_or_rdg() {
        let t = tree("<app/>");
        assert_eq!(t.extract_text(t.root()), "");
    }

    #[test]
    fn test_extract_text_nested_app() {
        let t = tree("<rdg>one <app><lem>two</lem><rdg>deux</rdg></app> three</rdg>");
        assert_eq!(t.extract_text(t.root()), "one two three");
    }

    #[test]
    fn test_text_in_context() {
        let t = tree("<ab>In the <app><rdg>beginning</rdg><rdg>start</rdg></app> was</ab>");
        let app = t.find_descendant(t.root(), "app").unwrap();
        assert_eq!(t.text_in_context(t.root(), app, "start"), "In the ⸂start⸃ was");
    }

    #[test]
    fn test_find_descendants_namespaced() {
        let t = tree(
            r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><text><app n="1"/><tei:app xmlns:tei="x" n="2"/></text></TEI>"#,
        );
        let apps = t.find_descendants(t.root(), "app");
        assert_eq!(apps.len(), 2);
        assert_eq!(t.attribute(apps[1], "n"), Some("2"));
    }

    #[test]
    fn test_find_descendant_with_attribute() {
        let t = tree(r#"<app><listRelation/><listRelation type="transcriptional"/></app>"#);
        let found = t
            .find_descendant_with(t.root(), "listRelation", "type", "transcriptional")
            .unwrap();
        assert_eq!(t.child_index(t.root(), found), Some(1));
    }

    #[test]
    fn test_find_ancestor() {
        let t = tree("<TEI><text><ab n='B1'><app><rdg/></app></ab></text></TEI>");
        let rdg = t.find_descendant(t.root(), "rdg").unwrap();
        let ab = t.find_ancestor(rdg, "ab").unwrap();
        assert_eq!(t.attribute(ab, "n"), Some("B1"));
        assert!(t.find_ancestor(rdg, "body").is_none());
    }

    #[test]
    fn test_set_and_remove_attribute_keeps_order() {
        let mut t = tree(r#"<relation active="1" passive="2"/>"#);
        let root = t.root();
        t.set_attribute(root, "active", "3");
        t.set_attribute(root, "ana", "#x");
        let names: Vec<&str> = t.attributes(root).iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["active", "passive", "ana"]);
        assert_eq!(t.remove_attribute(root, "passive"), Some("2".to_string()));
        assert_eq!(t.remove_attribute(root, "passive"), None);
    }

    #[test]
    fn test_remove_detaches_subtree() {
        let mut t = tree("<a>\n  <b><c/></b>\n</a>");
        let b = t.find_descendant(t.root(), "b").unwrap();
        let c = t.find_descendant(b, "c").unwrap();
        t.remove(b);
        assert!(t.find_descendant(t.root(), "c").is_none());
        assert!(!t.is_attached(c));
        assert_eq!(t.to_xml_string(), "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<a>\n</a>\n");
    }

    #[test]
    fn test_append_element_follows_indentation() {
        let mut t = tree("<list>\n    <item/>\n  </list>");
        let root = t.root();
        let item = t.create_element("item", &[("n", "2")]);
        t.append_element(root, item);
        assert!(t
            .to_xml_string()
            .contains("<list>\n    <item/>\n    <item n=\"2\"/>\n  </list>"));
    }

    #[test]
    fn test_prepend_element_follows_indentation() {
        let mut t = tree("<text>\n  <body/>\n</text>");
        let root = t.root();
        let group = t.create_element("interpGrp", &[("type", "transcriptional")]);
        t.prepend_element(root, group);
        assert!(t.to_xml_string().contains(
            "<text>\n  <interpGrp type=\"transcriptional\"/>\n  <body/>\n</text>"
        ));
    }

    #[test]
    fn test_insert_element_after_follows_indentation() {
        let mut t = tree("<app>\n    <listRelation/>\n  </app>");
        let sibling = t.find_descendant(t.root(), "listRelation").unwrap();
        let list = t.create_element("listRelation", &[("type", "transcriptional")]);
        t.insert_element_after(sibling, list);
        assert!(t.to_xml_string().contains(
            "<app>\n    <listRelation/>\n    <listRelation type=\"transcriptional\"/>\n  </app>"
        ));
    }

    #[test]
    fn test_prepend_element_without_whitespace() {
        let mut t = tree("<text><body/></text>");
        let root = t.root();
        let group = t.create_element("interpGrp", &[]);
        t.prepend_element(root, group);
        assert_eq!(t.child_index(root, group), Some(0));
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let mut t = tree(r#"<list><relation ana="a"><desc>why</desc></relation></list>"#);
        let relation = t.find_descendant(t.root(), "relation").unwrap();
        let copy = t.deep_copy(relation);
        assert!(!t.is_attached(copy));

        t.set_attribute(copy, "ana", "b");
        let desc = t.find_descendant(copy, "desc").unwrap();
        t.set_text(desc, "because");
        assert_eq!(t.attribute(relation, "ana"), Some("a"));
        assert_eq!(t.extract_text(relation), "why");
        assert_eq!(t.extract_text(copy), "because");
    }

    #[test]
    fn test_set_text_replaces_children() {
        let mut t = tree("<desc>old <hi>text</hi></desc>");
        let root = t.root();
        t.set_text(root, "new");
        assert_eq!(t.text(root), "new");
        assert!(t.children(root).len() == 1);
    }

    #[test]
    fn test_language_code() {
        let t = tree(r#"<TEI><text xml:lang="ar"/></TEI>"#);
        assert_eq!(t.language_code(), "ar");

        let t = tree("<TEI><text/></TEI>");
        assert_eq!(t.language_code(), "");

        let t = tree("<root/>");
        assert_eq!(t.language_code(), "");
    }
}
