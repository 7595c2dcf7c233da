//! Apparatus construction: readings and the complete ordered pair set.

use super::reading::{resolve_identifier, witnesses};
use super::{
    ApparatusId, Document, Pair, PairId, Reading, ReadingId, RelationTypeId, TRANSCRIPTIONAL,
    references, strip_hash,
};
use crate::xml::NodeId;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// One `<app>` variation unit.
#[derive(Debug, Clone, Serialize)]
pub struct Apparatus {
    pub(crate) id: ApparatusId,
    #[serde(skip)]
    pub(crate) node: NodeId,
    pub(crate) readings: Vec<ReadingId>,

    /// Every ordered (active, passive) combination with active != passive
    pub(crate) pairs: Vec<PairId>,

    /// One direction per unordered reading combination
    pub(crate) non_redundant_pairs: Vec<PairId>,

    /// Document-unique name used when the element has neither `xml:id` nor `n`
    #[serde(skip)]
    pub(crate) generated_name: String,
}

impl Apparatus {
    pub fn id(&self) -> ApparatusId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn readings(&self) -> &[ReadingId] {
        &self.readings
    }

    pub fn pairs(&self) -> &[PairId] {
        &self.pairs
    }

    pub fn non_redundant_pairs(&self) -> &[PairId] {
        &self.non_redundant_pairs
    }
}

/// Category names listed in an `ana` attribute, without the leading `#`.
pub(crate) fn ana_names(ana: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for token in ana.split_whitespace() {
        let name = strip_hash(token);
        if !name.is_empty() && !names.iter().any(|existing| existing == name) {
            names.push(name.to_string());
        }
    }
    names
}

impl Document {
    /// `<relation>` elements inside transcriptional `<listRelation>`s of an apparatus.
    pub(crate) fn collect_relations(&self, app: NodeId) -> Vec<NodeId> {
        let mut relations = Vec::new();
        for list in self
            .tree
            .find_descendants_with(app, "listRelation", "type", TRANSCRIPTIONAL)
        {
            for relation in self.tree.find_descendants(list, "relation") {
                if !relations.contains(&relation) {
                    relations.push(relation);
                }
            }
        }
        relations
    }

    /// Whether a relation element's `active`/`passive` name these readings.
    pub(crate) fn relation_matches(&self, relation: NodeId, active: &str, passive: &str) -> bool {
        let tree = &self.tree;
        references(tree.attribute(relation, "active").unwrap_or_default(), active)
            && references(tree.attribute(relation, "passive").unwrap_or_default(), passive)
    }

    /// Build the apparatus for an `<app>` element and register its readings,
    /// pairs and their classifications.
    pub(crate) fn build_apparatus(&mut self, node: NodeId) -> ApparatusId {
        let app_id = ApparatusId(self.apparatuses.len());

        let mut readings = Vec::new();
        for rdg in self.tree.find_descendants(node, "rdg") {
            let identifier = resolve_identifier(&mut self.tree, rdg);
            let reading = Reading {
                id: ReadingId(self.readings.len()),
                apparatus: app_id,
                node: rdg,
                identifier,
                text: self.tree.extract_text(rdg),
                witnesses: witnesses(&self.tree, rdg),
            };
            readings.push(reading.id);
            self.readings.push(reading);
        }

        let relations = self.collect_relations(node);
        self.warn_unknown_references(&relations, &readings);

        let mut pairs = Vec::new();
        let mut non_redundant_pairs = Vec::new();
        let mut visited_actives: Vec<ReadingId> = Vec::new();
        let mut by_readings: HashMap<(ReadingId, ReadingId), PairId> = HashMap::new();

        for &active in &readings {
            for &passive in &readings {
                if active == passive {
                    continue;
                }
                let active_identifier = self.readings[active.0].identifier.clone();
                let passive_identifier = self.readings[passive.0].identifier.clone();

                let mut names: Vec<String> = Vec::new();
                for &relation in &relations {
                    if !self.relation_matches(relation, &active_identifier, &passive_identifier) {
                        continue;
                    }
                    let ana = self.tree.attribute(relation, "ana").unwrap_or_default();
                    for name in ana_names(ana) {
                        if !names.contains(&name) {
                            names.push(name);
                        }
                    }
                }

                let types: BTreeSet<RelationTypeId> = names
                    .iter()
                    .map(|name| self.ensure_relation_type(name))
                    .collect();

                let pair = Pair {
                    id: PairId(self.pairs.len()),
                    apparatus: app_id,
                    active,
                    passive,
                    inverse: PairId(usize::MAX),
                    types,
                };
                by_readings.insert((active, passive), pair.id);
                pairs.push(pair.id);
                if !visited_actives.contains(&passive) {
                    non_redundant_pairs.push(pair.id);
                }
                self.pairs.push(pair);
            }
            visited_actives.push(active);
        }

        for &pair_id in &pairs {
            let pair = &self.pairs[pair_id.0];
            let inverse = by_readings
                .get(&(pair.passive, pair.active))
                .copied()
                .unwrap_or_else(|| {
                    panic!("pair {} has no inverse in its apparatus", pair_id)
                });
            self.pairs[pair_id.0].inverse = inverse;
        }

        assert_eq!(
            pairs.len(),
            2 * non_redundant_pairs.len(),
            "every unordered reading combination must yield exactly two pairs"
        );

        for &pair_id in &pairs {
            for type_id in self.pairs[pair_id.0].types.clone() {
                self.relation_types[type_id.0].pairs.insert(pair_id);
            }
        }

        self.apparatuses.push(Apparatus {
            id: app_id,
            node,
            readings,
            pairs,
            non_redundant_pairs,
            generated_name: String::new(),
        });
        app_id
    }

    fn warn_unknown_references(&self, relations: &[NodeId], readings: &[ReadingId]) {
        for &relation in relations {
            for attribute in ["active", "passive"] {
                let value = self.tree.attribute(relation, attribute).unwrap_or_default();
                for token in value.split_whitespace() {
                    let known = readings
                        .iter()
                        .any(|reading| self.readings[reading.0].identifier == strip_hash(token));
                    if !known {
                        warn!(
                            "{} reading '{}' not found in apparatus. Skipping relation.",
                            attribute, token
                        );
                    }
                }
            }
        }
    }
}
