//! Readings and reading identifier resolution.

use super::{ApparatusId, OMISSION, ReadingId};
use crate::xml::{NodeId, XML_ID, XmlTree};
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};

/// One candidate text at a variation unit, backed by an `<rdg>` element.
#[derive(Debug, Clone, Serialize)]
pub struct Reading {
    pub(crate) id: ReadingId,
    #[serde(skip)]
    pub(crate) apparatus: ApparatusId,
    #[serde(skip)]
    pub(crate) node: NodeId,

    /// `xml:id`, else `n`, else an assigned integer
    pub identifier: String,

    /// Extracted display text; empty for an omission
    pub text: String,

    /// Witness sigla from the `wit` attribute
    pub witnesses: Vec<String>,
}

impl Reading {
    pub fn id(&self) -> ReadingId {
        self.id
    }

    pub fn apparatus(&self) -> ApparatusId {
        self.apparatus
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Whether this reading has no text at all.
    pub fn is_omission(&self) -> bool {
        self.text.is_empty()
    }

    /// The text to show for this reading, with omissions made visible.
    pub fn display_text(&self) -> &str {
        if self.is_omission() {
            OMISSION
        } else {
            &self.text
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_text())
    }
}

impl PartialEq for Reading {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Reading {}

impl Hash for Reading {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// The identifier a reading already carries: `xml:id`, else `n`.
pub fn existing_identifier(tree: &XmlTree, reading: NodeId) -> Option<String> {
    [XML_ID, "n"]
        .iter()
        .filter_map(|attribute| tree.attribute(reading, attribute))
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Resolve a reading's identifier, assigning one when it has none.
///
/// The assigned identifier is the smallest integer from 1 upwards that no
/// `<rdg>` in the enclosing apparatus uses as its `n`. It is written into the
/// reading's `n` attribute so it persists.
pub fn resolve_identifier(tree: &mut XmlTree, reading: NodeId) -> String {
    if let Some(identifier) = existing_identifier(tree, reading) {
        return identifier;
    }

    let scope = tree
        .find_ancestor(reading, "app")
        .or_else(|| tree.parent(reading))
        .unwrap_or(reading);
    let taken: Vec<String> = tree
        .find_descendants(scope, "rdg")
        .into_iter()
        .filter_map(|rdg| tree.attribute(rdg, "n").map(str::to_string))
        .collect();

    let mut candidate = 1usize;
    while taken.iter().any(|n| *n == candidate.to_string()) {
        candidate += 1;
    }
    let identifier = candidate.to_string();
    tree.set_attribute(reading, "n", &identifier);
    identifier
}

/// Witness sigla listed in a reading's `wit` attribute.
pub fn witnesses(tree: &XmlTree, reading: NodeId) -> Vec<String> {
    tree.attribute(reading, "wit")
        .map(|wit| wit.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}
