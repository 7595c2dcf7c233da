//! Relation types declared by `<interp>` elements.

use super::{PairId, RelationTypeId, TRANSCRIPTIONAL, strip_hash};
use crate::xml::{NodeId, XML_ID, XmlTree};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use tracing::warn;

/// A named category of textual change.
///
/// Two relation types are equal only when they share a name, a backing
/// `<interp>` element and a description, so duplicate declarations of one
/// name stay distinct.
#[derive(Debug, Clone, Serialize)]
pub struct RelationType {
    #[serde(skip)]
    pub(crate) id: RelationTypeId,
    pub name: String,
    #[serde(skip)]
    pub(crate) node: NodeId,
    pub description: String,
    #[serde(skip)]
    pub(crate) inverse: Option<RelationTypeId>,

    /// Pairs currently classified with this type
    #[serde(skip)]
    pub(crate) pairs: BTreeSet<PairId>,
}

impl RelationType {
    pub fn id(&self) -> RelationTypeId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn inverse(&self) -> Option<RelationTypeId> {
        self.inverse
    }

    pub fn pairs(&self) -> &BTreeSet<PairId> {
        &self.pairs
    }

    /// `name: description`, or just the name when undescribed.
    pub fn str_with_description(&self) -> String {
        if self.description.is_empty() {
            self.name.clone()
        } else {
            format!("{}: {}", self.name, self.description)
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl PartialEq for RelationType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.node == other.node && self.description == other.description
    }
}

impl Eq for RelationType {}

impl Hash for RelationType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.node.hash(state);
        self.description.hash(state);
    }
}

/// The document's `<interpGrp type="transcriptional">`, if declared.
pub fn interp_group(tree: &XmlTree) -> Option<NodeId> {
    tree.find_descendant_with(tree.root(), "interpGrp", "type", TRANSCRIPTIONAL)
}

/// Read the relation types declared in the document.
///
/// Inverses are linked through `corresp`. A category claimed as the
/// reciprocal of two different categories is rejected.
pub fn read_relation_types(tree: &XmlTree) -> Result<Vec<RelationType>> {
    let Some(group) = interp_group(tree) else {
        warn!("No interpGrp of type='{}' found in document", TRANSCRIPTIONAL);
        return Ok(Vec::new());
    };

    let mut types: Vec<RelationType> = Vec::new();
    for interp in tree.children_named(group, "interp") {
        let name = tree.attribute(interp, XML_ID).unwrap_or_default();
        if name.is_empty() {
            warn!("Skipping interp without an xml:id");
            continue;
        }
        types.push(RelationType {
            id: RelationTypeId(types.len()),
            name: name.to_string(),
            node: interp,
            description: tree.extract_text(interp),
            inverse: None,
            pairs: BTreeSet::new(),
        });
    }

    let by_name: HashMap<String, RelationTypeId> = types
        .iter()
        .map(|relation_type| (relation_type.name.clone(), relation_type.id))
        .collect();

    for index in 0..types.len() {
        let corresp = tree.attribute(types[index].node, "corresp").unwrap_or_default();
        let Some(&target) = by_name.get(strip_hash(corresp.trim())) else {
            continue;
        };
        link_inverse(&mut types, RelationTypeId(index), target)?;
    }

    Ok(types)
}

fn link_inverse(
    types: &mut [RelationType],
    category: RelationTypeId,
    inverse: RelationTypeId,
) -> Result<()> {
    let conflict = |owner: RelationTypeId, existing: RelationTypeId, claimed: RelationTypeId| {
        Error::InconsistentInverse {
            category: types[owner.0].name.clone(),
            existing: types[existing.0].name.clone(),
            claimed: types[claimed.0].name.clone(),
        }
    };

    match types[category.0].inverse {
        Some(existing) if existing != inverse => return Err(conflict(category, existing, inverse)),
        _ => {}
    }
    match types[inverse.0].inverse {
        Some(existing) if existing != category => return Err(conflict(inverse, existing, category)),
        _ => {}
    }

    types[category.0].inverse = Some(inverse);
    types[inverse.0].inverse = Some(category);
    Ok(())
}
