//! Ordered reading pairs and the classification mutation API.
//!
//! Every mutation updates the in-memory sets (`Pair::types` and the
//! `RelationType::pairs` back-reference) and the backing `<relation>`
//! elements in the same call. All relation elements naming a pair are
//! considered, since hand-edited documents often carry several.

use super::apparatus::ana_names;
use super::{
    ARROW, ApparatusId, Document, PairId, RDGAI_RESPONSIBLE, ReadingId, RelationTypeId,
    TRANSCRIPTIONAL, strip_hash,
};
use crate::xml::NodeId;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

/// An ordered (active, passive) reading combination within one apparatus.
#[derive(Debug, Clone, Serialize)]
pub struct Pair {
    pub(crate) id: PairId,
    pub(crate) apparatus: ApparatusId,
    pub(crate) active: ReadingId,
    pub(crate) passive: ReadingId,
    pub(crate) inverse: PairId,
    pub(crate) types: BTreeSet<RelationTypeId>,
}

impl Pair {
    pub fn id(&self) -> PairId {
        self.id
    }

    pub fn apparatus(&self) -> ApparatusId {
        self.apparatus
    }

    pub fn active(&self) -> ReadingId {
        self.active
    }

    pub fn passive(&self) -> ReadingId {
        self.passive
    }

    pub fn types(&self) -> &BTreeSet<RelationTypeId> {
        &self.types
    }

    pub fn is_classified(&self) -> bool {
        !self.types.is_empty()
    }
}

impl PartialEq for Pair {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Pair {}

impl Document {
    fn pair_identifiers(&self, pair: PairId) -> (String, String) {
        let pair = &self.pairs[pair.0];
        (
            self.readings[pair.active.0].identifier.clone(),
            self.readings[pair.passive.0].identifier.clone(),
        )
    }

    /// Every relation element whose `active`/`passive` name this pair.
    pub fn relation_elements(&self, pair: PairId) -> Vec<NodeId> {
        let app = self.apparatuses[self.pairs[pair.0].apparatus.0].node;
        let (active, passive) = self.pair_identifiers(pair);
        self.collect_relations(app)
            .into_iter()
            .filter(|relation| self.relation_matches(*relation, &active, &passive))
            .collect()
    }

    /// The relation element for this pair that lists `relation_type`, if any.
    pub fn element_for_type(&self, pair: PairId, relation_type: RelationTypeId) -> Option<NodeId> {
        let name = &self.relation_types[relation_type.0].name;
        self.relation_elements(pair).into_iter().find(|relation| {
            ana_names(self.tree.attribute(*relation, "ana").unwrap_or_default()).contains(name)
        })
    }

    /// The pair in the same apparatus with active and passive swapped.
    pub fn get_inverse(&self, pair: PairId) -> PairId {
        let inverse = self.pairs[pair.0].inverse;
        assert!(
            inverse.0 < self.pairs.len(),
            "pair {} has no inverse in its apparatus",
            pair
        );
        inverse
    }

    /// The apparatus' transcriptional `<listRelation>`, created on demand.
    ///
    /// A new list goes after an existing `<listRelation>` when there is one,
    /// otherwise inside a new `<note>` at the end of the apparatus.
    fn list_relation(&mut self, app: NodeId) -> NodeId {
        if let Some(list) = self
            .tree
            .find_descendant_with(app, "listRelation", "type", TRANSCRIPTIONAL)
        {
            return list;
        }

        let list = self
            .tree
            .create_element("listRelation", &[("type", TRANSCRIPTIONAL)]);
        match self.tree.find_descendant(app, "listRelation") {
            Some(sibling) => self.tree.insert_element_after(sibling, list),
            None => {
                let note = self.tree.create_element("note", &[]);
                self.tree.append_child(note, list);
                self.tree.append_element(app, note);
            }
        }
        list
    }

    fn create_relation(&mut self, pair: PairId, ana: Option<&str>) -> NodeId {
        let app = self.apparatuses[self.pairs[pair.0].apparatus.0].node;
        let (active, passive) = self.pair_identifiers(pair);
        let list = self.list_relation(app);

        let mut attributes = vec![("active", active.as_str()), ("passive", passive.as_str())];
        if let Some(ana) = ana {
            attributes.push(("ana", ana));
        }
        let relation = self.tree.create_element("relation", &attributes);
        self.tree.append_element(list, relation);
        relation
    }

    fn set_desc(&mut self, relation: NodeId, text: &str) {
        let desc = match self.tree.find_descendant(relation, "desc") {
            Some(desc) => desc,
            None => {
                let desc = self.tree.create_element("desc", &[]);
                self.tree.append_element(relation, desc);
                desc
            }
        };
        self.tree.set_text(desc, text);
    }

    fn reference_tokens(&self, relation: NodeId, attribute: &str) -> Vec<String> {
        self.tree
            .attribute(relation, attribute)
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    /// Give a pair its own relation element when `relation` also names other
    /// reading combinations through multi-token `active`/`passive` lists.
    ///
    /// The pair is taken out of the shared element, which keeps covering the
    /// remaining combinations, and a copy (categories, `resp`, `<desc>`)
    /// naming only this pair is inserted after it. Returns the element that
    /// belongs to the pair alone.
    fn isolate_relation(&mut self, pair: PairId, relation: NodeId) -> NodeId {
        let (active, passive) = self.pair_identifiers(pair);
        if !self.relation_matches(relation, &active, &passive) {
            return relation;
        }
        let actives = self.reference_tokens(relation, "active");
        let passives = self.reference_tokens(relation, "passive");
        if actives.len() <= 1 && passives.len() <= 1 {
            return relation;
        }

        let (own_actives, other_actives): (Vec<String>, Vec<String>) = actives
            .into_iter()
            .partition(|token| strip_hash(token) == active);
        let (own_passives, other_passives): (Vec<String>, Vec<String>) = passives
            .into_iter()
            .partition(|token| strip_hash(token) == passive);
        let own_active = own_actives.into_iter().next().unwrap_or(active);
        let own_passive = own_passives.into_iter().next().unwrap_or(passive);

        if other_actives.is_empty() && other_passives.is_empty() {
            self.tree.set_attribute(relation, "active", &own_active);
            self.tree.set_attribute(relation, "passive", &own_passive);
            return relation;
        }

        let dedicated = self.tree.deep_copy(relation);
        self.tree.set_attribute(dedicated, "active", &own_active);
        self.tree.set_attribute(dedicated, "passive", &own_passive);
        self.tree.insert_element_after(relation, dedicated);

        match (other_actives.is_empty(), other_passives.is_empty()) {
            (true, _) => {
                self.tree.set_attribute(relation, "passive", &other_passives.join(" "));
            }
            (false, true) => {
                self.tree.set_attribute(relation, "active", &other_actives.join(" "));
            }
            (false, false) => {
                let rest = self.tree.deep_copy(relation);
                self.tree.set_attribute(rest, "active", &own_active);
                self.tree.set_attribute(rest, "passive", &other_passives.join(" "));
                self.tree.insert_element_after(relation, rest);
                self.tree.set_attribute(relation, "active", &other_actives.join(" "));
            }
        }

        debug!("Split shared relation for {}", self.pair_label(pair));
        dedicated
    }

    fn isolate_relations(&mut self, pair: PairId) {
        for relation in self.relation_elements(pair) {
            self.isolate_relation(pair, relation);
        }
    }

    /// Classify a pair with a relation type.
    ///
    /// Reuses a relation element that already lists the type, else the first
    /// element for the pair, else creates one. Adding a type twice leaves a
    /// single token in `ana`. A non-empty description replaces the text of
    /// the element's `<desc>`. Elements shared with other reading
    /// combinations are split first. Returns the relation element.
    pub fn add_type(
        &mut self,
        pair: PairId,
        relation_type: RelationTypeId,
        responsible: Option<&str>,
        description: &str,
    ) -> NodeId {
        self.pairs[pair.0].types.insert(relation_type);
        self.relation_types[relation_type.0].pairs.insert(pair);
        self.isolate_relations(pair);

        let token = format!("#{}", self.relation_types[relation_type.0].name);
        let relation = match self.element_for_type(pair, relation_type) {
            Some(relation) => relation,
            None => match self.relation_elements(pair).first().copied() {
                Some(relation) => {
                    let ana = self.tree.attribute(relation, "ana").unwrap_or_default().trim();
                    let ana = if ana.is_empty() {
                        token.clone()
                    } else {
                        format!("{} {}", ana, token)
                    };
                    self.tree.set_attribute(relation, "ana", &ana);
                    relation
                }
                None => self.create_relation(pair, Some(&token)),
            },
        };

        if let Some(responsible) = responsible {
            self.tree.set_attribute(relation, "resp", responsible);
        }
        let description = description.trim();
        if !description.is_empty() {
            self.set_desc(relation, description);
        }

        debug!("Added {} to {}", token, self.pair_label(pair));
        self.touch();
        relation
    }

    /// Classify a pair and its inverse.
    ///
    /// The inverse pair receives the declared inverse category (or the same
    /// category when none is declared) with `inverse_description`, which
    /// defaults to a cross reference to this pair.
    pub fn add_type_with_inverse(
        &mut self,
        pair: PairId,
        relation_type: RelationTypeId,
        responsible: Option<&str>,
        description: &str,
        inverse_description: Option<&str>,
    ) -> NodeId {
        let relation = self.add_type(pair, relation_type, responsible, description);

        let inverse_pair = self.get_inverse(pair);
        let inverse_type = self.relation_types[relation_type.0]
            .inverse
            .unwrap_or(relation_type);
        let default_description = format!("c.f. {}", self.pair_display(pair));
        self.add_type(
            inverse_pair,
            inverse_type,
            responsible,
            inverse_description.unwrap_or(&default_description),
        );
        relation
    }

    /// Remove a relation type from a pair. Absent types are a no-op.
    ///
    /// The type's token is stripped from every matching relation element and
    /// elements left without any category are deleted.
    pub fn remove_type(&mut self, pair: PairId, relation_type: RelationTypeId) {
        self.pairs[pair.0].types.remove(&relation_type);
        self.relation_types[relation_type.0].pairs.remove(&pair);

        let name = self.relation_types[relation_type.0].name.clone();
        for relation in self.relation_elements(pair) {
            let ana = self.tree.attribute(relation, "ana").unwrap_or_default();
            if !ana_names(ana).contains(&name) {
                continue;
            }
            let ana = ana.to_string();
            let relation = self.isolate_relation(pair, relation);
            let remaining = ana
                .split_whitespace()
                .filter(|token| strip_hash(token) != name)
                .collect::<Vec<_>>()
                .join(" ");
            if remaining.is_empty() {
                self.tree.remove(relation);
            } else {
                self.tree.set_attribute(relation, "ana", &remaining);
            }
        }

        debug!("Removed #{} from {}", name, self.pair_label(pair));
        self.touch();
    }

    /// Remove a relation type from a pair and its inverse category from the
    /// inverse pair.
    pub fn remove_type_with_inverse(&mut self, pair: PairId, relation_type: RelationTypeId) {
        self.remove_type(pair, relation_type);
        let inverse_pair = self.get_inverse(pair);
        let inverse_type = self.relation_types[relation_type.0]
            .inverse
            .unwrap_or(relation_type);
        self.remove_type(inverse_pair, inverse_type);
    }

    pub fn remove_all_types(&mut self, pair: PairId) {
        let types: Vec<RelationTypeId> = self.pairs[pair.0].types.iter().copied().collect();
        for relation_type in types {
            self.remove_type_with_inverse(pair, relation_type);
        }
    }

    /// Set the justification of a pair.
    ///
    /// Writes into `relation` when given, else into the first relation
    /// element for the pair, creating a bare one if needed. Empty text is a
    /// no-op and returns `None`.
    pub fn add_description(
        &mut self,
        pair: PairId,
        text: &str,
        relation: Option<NodeId>,
    ) -> Option<NodeId> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let relation = match relation.or_else(|| self.relation_elements(pair).first().copied()) {
            Some(relation) => self.isolate_relation(pair, relation),
            None => self.create_relation(pair, None),
        };
        self.set_desc(relation, text);
        self.touch();
        Some(relation)
    }

    /// Remove every `<desc>` from the pair's relation elements.
    ///
    /// Elements that carried nothing but the description are deleted.
    pub fn remove_description(&mut self, pair: PairId) {
        for relation in self.relation_elements(pair) {
            if self.tree.find_descendant(relation, "desc").is_none() {
                continue;
            }
            let relation = self.isolate_relation(pair, relation);
            for desc in self.tree.find_descendants(relation, "desc") {
                self.tree.remove(desc);
            }
            let bare = ana_names(self.tree.attribute(relation, "ana").unwrap_or_default())
                .is_empty()
                && !self
                    .tree
                    .children(relation)
                    .iter()
                    .any(|child| self.tree.name(*child).is_some());
            if bare {
                self.tree.remove(relation);
            }
        }
        self.touch();
    }

    /// Text of the first `<desc>` under the pair's relation elements.
    pub fn pair_description(&self, pair: PairId) -> String {
        self.relation_elements(pair)
            .into_iter()
            .find_map(|relation| self.tree.find_descendant(relation, "desc"))
            .map(|desc| self.tree.extract_text(desc))
            .unwrap_or_default()
    }

    /// Distinct `resp` values on the pair's relation elements.
    pub fn responsible(&self, pair: PairId) -> Vec<String> {
        let mut responsible: Vec<String> = Vec::new();
        for relation in self.relation_elements(pair) {
            if let Some(resp) = self.tree.attribute(relation, "resp") {
                if !responsible.iter().any(|existing| existing == resp) {
                    responsible.push(resp.to_string());
                }
            }
        }
        responsible
    }

    /// Whether the automated classifier produced any of this pair's relations.
    pub fn rdgai_responsible(&self, pair: PairId) -> bool {
        self.relation_elements(pair)
            .into_iter()
            .any(|relation| self.tree.attribute(relation, "resp") == Some(RDGAI_RESPONSIBLE))
    }

    /// `active ➞ passive` with omissions made visible.
    pub fn pair_display(&self, pair: PairId) -> String {
        let pair = &self.pairs[pair.0];
        format!(
            "{} {} {}",
            self.readings[pair.active.0].display_text(),
            ARROW,
            self.readings[pair.passive.0].display_text()
        )
    }
}
