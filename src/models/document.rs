//! The document: XML tree plus the apparatus object graph built from it.

use super::apparatus::ana_names;
use super::relation_type::{interp_group, read_relation_types};
use super::{
    Apparatus, ApparatusId, Pair, PairId, Reading, ReadingId, RelationType, RelationTypeId,
    TRANSCRIPTIONAL,
};
use crate::Result;
use crate::xml::{XML_ID, XmlTree};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A TEI document and every entity derived from it.
///
/// The document owns all apparatuses, readings, pairs and relation types.
/// They are addressed by id and stay valid for the lifetime of the document.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) path: Option<PathBuf>,
    pub(crate) tree: XmlTree,
    pub(crate) apparatuses: Vec<Apparatus>,
    pub(crate) readings: Vec<Reading>,
    pub(crate) pairs: Vec<Pair>,
    pub(crate) relation_types: Vec<RelationType>,

    /// Category name to the relation type that answers to it
    pub(crate) registry: HashMap<String, RelationTypeId>,

    /// Incremented by every mutation
    pub(crate) revision: u64,
}

/// What `Document::clean` changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    /// Relations whose `ana` was rewritten
    pub normalized: usize,
    /// Relations that absorbed duplicates
    pub merged: usize,
    /// Duplicate relations deleted
    pub removed: usize,
}

impl Document {
    /// Load and parse a document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let tree = XmlTree::read(path)?;
        let mut document = Self::from_tree(tree)?;
        document.path = Some(path.to_path_buf());
        debug!(
            "Loaded {} with {} apparatuses",
            path.display(),
            document.apparatuses.len()
        );
        Ok(document)
    }

    /// Parse a document from a string.
    pub fn parse(xml: &str) -> Result<Self> {
        Self::from_tree(XmlTree::parse(xml)?)
    }

    fn from_tree(tree: XmlTree) -> Result<Self> {
        let relation_types = read_relation_types(&tree)?;
        let registry = relation_types
            .iter()
            .map(|relation_type| (relation_type.name.clone(), relation_type.id))
            .collect();

        let mut document = Self {
            path: None,
            tree,
            apparatuses: Vec::new(),
            readings: Vec::new(),
            pairs: Vec::new(),
            relation_types,
            registry,
            revision: 0,
        };

        for app in document.tree.find_descendants(document.tree.root(), "app") {
            document.build_apparatus(app);
        }
        document.assign_generated_names();
        document.revision = 0;
        Ok(document)
    }

    /// The file this document was loaded from.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn tree(&self) -> &XmlTree {
        &self.tree
    }

    /// Write the document to `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        self.tree.write(path)?;
        info!("Wrote {}", path.display());
        Ok(())
    }

    pub fn to_xml_string(&self) -> String {
        self.tree.to_xml_string()
    }

    /// Language code of the document's text, or "".
    pub fn language(&self) -> String {
        self.tree.language_code()
    }

    /// Counter bumped by every mutation, for invalidating derived caches.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn touch(&mut self) {
        self.revision += 1;
    }

    // === Accessors ===

    pub fn apparatuses(&self) -> &[Apparatus] {
        &self.apparatuses
    }

    pub fn apparatus(&self, id: ApparatusId) -> &Apparatus {
        &self.apparatuses[id.0]
    }

    pub fn reading(&self, id: ReadingId) -> &Reading {
        &self.readings[id.0]
    }

    /// Readings of an apparatus in document order.
    pub fn readings(&self, app: ApparatusId) -> impl Iterator<Item = &Reading> + '_ {
        self.apparatuses[app.0]
            .readings
            .iter()
            .map(move |id| &self.readings[id.0])
    }

    pub fn pair(&self, id: PairId) -> &Pair {
        &self.pairs[id.0]
    }

    /// Every ordered pair of an apparatus.
    pub fn pairs(&self, app: ApparatusId) -> impl Iterator<Item = &Pair> + '_ {
        self.apparatuses[app.0]
            .pairs
            .iter()
            .map(move |id| &self.pairs[id.0])
    }

    /// One pair per unordered reading combination of an apparatus.
    pub fn non_redundant_pairs(&self, app: ApparatusId) -> impl Iterator<Item = &Pair> + '_ {
        self.apparatuses[app.0]
            .non_redundant_pairs
            .iter()
            .map(move |id| &self.pairs[id.0])
    }

    /// Every pair in the document, apparatus by apparatus.
    pub fn all_pairs(&self) -> impl Iterator<Item = &Pair> + '_ {
        self.pairs_in_order(true)
    }

    fn pairs_in_order(&self, redundant: bool) -> impl Iterator<Item = &Pair> + '_ {
        self.apparatuses
            .iter()
            .flat_map(move |app| {
                if redundant {
                    app.pairs.iter()
                } else {
                    app.non_redundant_pairs.iter()
                }
            })
            .map(move |id| &self.pairs[id.0])
    }

    /// Pairs with at least one relation type.
    ///
    /// With `redundant` every ordered pair is considered, otherwise only the
    /// non-redundant direction of each combination.
    pub fn get_classified_pairs(&self, redundant: bool) -> impl Iterator<Item = &Pair> + '_ {
        self.pairs_in_order(redundant)
            .filter(|pair| pair.is_classified())
    }

    /// Pairs without any relation type.
    pub fn get_unclassified_pairs(&self, redundant: bool) -> impl Iterator<Item = &Pair> + '_ {
        self.pairs_in_order(redundant)
            .filter(|pair| !pair.is_classified())
    }

    /// Find a pair by the identifiers of its readings.
    pub fn pair_by_identifiers(
        &self,
        app: ApparatusId,
        active: &str,
        passive: &str,
    ) -> Option<PairId> {
        self.pairs(app)
            .find(|pair| {
                self.readings[pair.active.0].identifier == active
                    && self.readings[pair.passive.0].identifier == passive
            })
            .map(|pair| pair.id)
    }

    // === Relation types ===

    pub fn relation_type(&self, id: RelationTypeId) -> &RelationType {
        &self.relation_types[id.0]
    }

    /// Registered relation types in declaration order.
    ///
    /// When a name is declared twice only the later declaration is listed.
    pub fn relation_types(&self) -> impl Iterator<Item = &RelationType> + '_ {
        self.relation_types
            .iter()
            .filter(|relation_type| self.registry.get(&relation_type.name) == Some(&relation_type.id))
    }

    pub fn relation_type_by_name(&self, name: &str) -> Option<&RelationType> {
        self.registry.get(name).map(|id| &self.relation_types[id.0])
    }

    /// Look up a relation type by name, declaring it if it is unknown.
    ///
    /// A missing `<interpGrp type="transcriptional">` is created as the first
    /// child of `<text>`. An existing `<interp>` with the name is reused,
    /// otherwise one is added with an empty description.
    pub fn ensure_relation_type(&mut self, name: &str) -> RelationTypeId {
        if let Some(&id) = self.registry.get(name) {
            return id;
        }

        let group = match interp_group(&self.tree) {
            Some(group) => group,
            None => {
                let root = self.tree.root();
                let parent = if self.tree.is_element(root, "text") {
                    root
                } else {
                    self.tree.find_descendant(root, "text").unwrap_or(root)
                };
                let group = self
                    .tree
                    .create_element("interpGrp", &[("type", TRANSCRIPTIONAL)]);
                self.tree.prepend_element(parent, group);
                group
            }
        };

        let existing = self
            .tree
            .children_named(group, "interp")
            .into_iter()
            .find(|interp| self.tree.attribute(*interp, XML_ID) == Some(name));
        let interp = match existing {
            Some(interp) => interp,
            None => {
                let interp = self.tree.create_element("interp", &[(XML_ID, name)]);
                self.tree.append_element(group, interp);
                interp
            }
        };

        let id = RelationTypeId(self.relation_types.len());
        self.relation_types.push(RelationType {
            id,
            name: name.to_string(),
            node: interp,
            description: self.tree.extract_text(interp),
            inverse: None,
            pairs: BTreeSet::new(),
        });
        self.registry.insert(name.to_string(), id);
        info!("Registered relation type '{}'", name);
        self.touch();
        id
    }

    // === Names and labels ===

    fn explicit_name(&self, app: ApparatusId) -> Option<&str> {
        let node = self.apparatuses[app.0].node;
        [XML_ID, "n"]
            .iter()
            .filter_map(|attribute| self.tree.attribute(node, attribute))
            .find(|value| !value.is_empty())
    }

    /// Display name of an apparatus: `xml:id`, else `n`, else a name derived
    /// from its position in the enclosing `<ab>`.
    pub fn apparatus_name(&self, app: ApparatusId) -> String {
        self.explicit_name(app)
            .map(str::to_string)
            .unwrap_or_else(|| self.apparatuses[app.0].generated_name.clone())
    }

    /// Name every apparatus without `xml:id` or `n` after its enclosing
    /// `<ab>` (its `n`, `xml:id` or document position) and its position
    /// inside it. Names taken by another apparatus get a `_2`, `_3`, ...
    /// suffix so that every generated name is unique in the document.
    fn assign_generated_names(&mut self) {
        let blocks = self.tree.find_descendants(self.tree.root(), "ab");
        let mut taken: HashSet<String> = (0..self.apparatuses.len())
            .filter_map(|index| self.explicit_name(ApparatusId(index)).map(str::to_string))
            .collect();

        for index in 0..self.apparatuses.len() {
            let app = ApparatusId(index);
            if self.explicit_name(app).is_some() {
                continue;
            }
            let node = self.apparatuses[index].node;
            let base = match self.tree.find_ancestor(node, "ab") {
                Some(ab) => {
                    let block = ["n", XML_ID]
                        .iter()
                        .filter_map(|attribute| self.tree.attribute(ab, attribute))
                        .find(|value| !value.is_empty())
                        .map(str::to_string)
                        .unwrap_or_else(|| {
                            let position = blocks.iter().position(|block| *block == ab);
                            format!("ab{}", position.unwrap_or(0) + 1)
                        });
                    let position = self
                        .tree
                        .find_descendants(ab, "app")
                        .iter()
                        .position(|candidate| *candidate == node)
                        .unwrap_or(0);
                    format!("{}-{}", block, position + 1)
                }
                None => format!("app-{}", index + 1),
            };

            let mut name = base.clone();
            let mut suffix = 2;
            while taken.contains(&name) {
                name = format!("{}_{}", base, suffix);
                suffix += 1;
            }
            taken.insert(name.clone());
            self.apparatuses[index].generated_name = name;
        }
    }

    /// Write the generated name onto an apparatus that has neither `xml:id`
    /// nor `n`, so its name survives edits elsewhere in the document.
    pub fn ensure_stable_id(&mut self, app: ApparatusId) -> String {
        let node = self.apparatuses[app.0].node;
        let has_name = self.explicit_name(app).is_some();
        let name = self.apparatus_name(app);
        if !has_name {
            self.tree.set_attribute(node, XML_ID, &name);
            debug!("Assigned xml:id '{}' to apparatus", name);
            self.touch();
        }
        name
    }

    pub fn ensure_stable_ids(&mut self) {
        for index in 0..self.apparatuses.len() {
            self.ensure_stable_id(ApparatusId(index));
        }
    }

    pub fn apparatus_by_name(&self, name: &str) -> Option<ApparatusId> {
        self.apparatuses
            .iter()
            .map(|app| app.id)
            .find(|app| self.apparatus_name(*app) == name)
    }

    /// `apparatus name: active ➞ passive`
    pub fn pair_label(&self, pair: PairId) -> String {
        format!(
            "{}: {}",
            self.apparatus_name(self.pairs[pair.0].apparatus),
            self.pair_display(pair)
        )
    }

    /// Text of the block around an apparatus with the apparatus replaced by
    /// `⸂replacement⸃`. Empty when the apparatus is not inside an `<ab>`.
    pub fn apparatus_context(&self, app: ApparatusId, replacement: &str) -> String {
        let node = self.apparatuses[app.0].node;
        match self.tree.find_ancestor(node, "ab") {
            Some(ab) => self.tree.text_in_context(ab, node, replacement),
            None => String::new(),
        }
    }

    // === Cleanup ===

    /// Repair hand-edited relation lists.
    ///
    /// Every category token in `ana` gets a leading `#`. Relations within one
    /// `<listRelation>` that share `active` and `passive` are merged into the
    /// first of them with the sorted union of their categories.
    pub fn clean(&mut self) -> CleanReport {
        let mut report = CleanReport::default();

        for list in self.tree.find_descendants(self.tree.root(), "listRelation") {
            let relations = self.tree.find_descendants(list, "relation");

            for &relation in &relations {
                let Some(ana) = self.tree.attribute(relation, "ana") else {
                    continue;
                };
                let normalized = hashed(ana_names(ana));
                if normalized != ana {
                    self.tree.set_attribute(relation, "ana", &normalized);
                    report.normalized += 1;
                }
            }

            let mut groups: Vec<((String, String), Vec<_>)> = Vec::new();
            for &relation in &relations {
                let key = (
                    self.tree.attribute(relation, "active").unwrap_or_default().to_string(),
                    self.tree.attribute(relation, "passive").unwrap_or_default().to_string(),
                );
                match groups.iter_mut().find(|(existing, _)| *existing == key) {
                    Some((_, members)) => members.push(relation),
                    None => groups.push((key, vec![relation])),
                }
            }

            for (_, members) in groups {
                let Some((&first, rest)) = members.split_first() else {
                    continue;
                };
                if rest.is_empty() {
                    continue;
                }

                let names: BTreeSet<String> = members
                    .iter()
                    .flat_map(|relation| {
                        ana_names(self.tree.attribute(*relation, "ana").unwrap_or_default())
                    })
                    .collect();
                let union = hashed(names.into_iter().collect());
                if !union.is_empty() {
                    self.tree.set_attribute(first, "ana", &union);
                }

                for &duplicate in rest {
                    if self.tree.find_descendant(first, "desc").is_none() {
                        if let Some(desc) = self.tree.find_descendant(duplicate, "desc") {
                            self.tree.append_element(first, desc);
                        }
                    }
                    self.tree.remove(duplicate);
                    report.removed += 1;
                }
                report.merged += 1;
            }
        }

        if report != CleanReport::default() {
            info!(
                "Cleaned relations: {} normalized, {} merged, {} removed",
                report.normalized, report.merged, report.removed
            );
            self.touch();
        }
        report
    }
}

fn hashed(names: Vec<String>) -> String {
    names
        .iter()
        .map(|name| format!("#{}", name))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MINIMAL, minimal_doc};

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("minimal.xml");
        std::fs::write(&path, MINIMAL).unwrap();

        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.path(), Some(path.as_path()));
        assert_eq!(doc.apparatuses().len(), 1);
        assert_eq!(doc.language(), "ar");
        assert_eq!(doc.revision(), 0);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Document::load(Path::new("/nonexistent/doc.xml"));
        assert!(matches!(result, Err(crate::Error::Io(_))));
    }

    #[test]
    fn test_relation_types_in_order() {
        let doc = minimal_doc();
        let names: Vec<&str> = doc.relation_types().map(|ty| ty.name.as_str()).collect();
        assert_eq!(names, vec!["category1", "category2", "category3"]);
        assert_eq!(
            doc.relation_type_by_name("category2").unwrap().description,
            "Description 2"
        );
    }

    #[test]
    fn test_classified_and_unclassified_pairs() {
        let mut doc = minimal_doc();
        assert_eq!(doc.get_unclassified_pairs(true).count(), 6);
        assert_eq!(doc.get_unclassified_pairs(false).count(), 3);
        assert_eq!(doc.get_classified_pairs(true).count(), 0);

        let pair = doc.all_pairs().next().unwrap().id();
        let category1 = doc.relation_type_by_name("category1").unwrap().id();
        doc.add_type(pair, category1, None, "");

        let classified: Vec<PairId> = doc.get_classified_pairs(true).map(|p| p.id()).collect();
        assert_eq!(classified, vec![pair]);
        assert_eq!(doc.get_unclassified_pairs(true).count(), 5);
    }

    #[test]
    fn test_revision_tracks_mutations() {
        let mut doc = minimal_doc();
        let pair = doc.all_pairs().next().unwrap().id();
        let category1 = doc.relation_type_by_name("category1").unwrap().id();
        doc.add_type(pair, category1, None, "");
        assert!(doc.revision() > 0);
    }

    #[test]
    fn test_ensure_relation_type_reuses_registered() {
        let mut doc = minimal_doc();
        let existing = doc.relation_type_by_name("category1").unwrap().id();
        assert_eq!(doc.ensure_relation_type("category1"), existing);
        assert_eq!(doc.revision(), 0);

        let created = doc.ensure_relation_type("category4");
        assert_eq!(doc.relation_types().count(), 4);
        assert_eq!(doc.relation_type(created).description, "");
        assert!(doc.to_xml_string().contains(
            "      <interp xml:id=\"category3\">Description 3</interp>\n      <interp xml:id=\"category4\"/>\n    </interpGrp>"
        ));
    }

    #[test]
    fn test_ensure_relation_type_without_group() {
        let mut doc = Document::parse("<TEI><text><body/></text></TEI>").unwrap();
        assert_eq!(doc.relation_types().count(), 0);
        let id = doc.ensure_relation_type("orth");
        assert_eq!(doc.relation_type(id).name, "orth");

        let reloaded = Document::parse(&doc.to_xml_string()).unwrap();
        assert!(reloaded.relation_type_by_name("orth").is_some());
    }

    #[test]
    fn test_duplicate_declaration_later_wins() {
        let doc = Document::parse(
            r#"<TEI><text><interpGrp type="transcriptional">
                <interp xml:id="dup">First</interp>
                <interp xml:id="dup">Second</interp>
            </interpGrp></text></TEI>"#,
        )
        .unwrap();
        assert_eq!(doc.relation_types().count(), 1);
        assert_eq!(doc.relation_type_by_name("dup").unwrap().description, "Second");
    }

    #[test]
    fn test_apparatus_name_fallbacks() {
        let mut doc = Document::parse(
            r#"<TEI><text><body>
                <ab n="B1"><app xml:id="X"><rdg/></app><app n="7"><rdg/></app><app><rdg/></app></ab>
                <app><rdg/></app>
            </body></text></TEI>"#,
        )
        .unwrap();
        let names: Vec<String> = (0..4).map(|i| doc.apparatus_name(ApparatusId(i))).collect();
        assert_eq!(names, vec!["X", "7", "B1-3", "app-4"]);
        assert_eq!(doc.revision(), 0);

        doc.ensure_stable_ids();
        let node = doc.apparatus(ApparatusId(2)).node();
        assert_eq!(doc.tree().attribute(node, XML_ID), Some("B1-3"));
        let node = doc.apparatus(ApparatusId(1)).node();
        assert_eq!(doc.tree().attribute(node, XML_ID), None);
        assert_eq!(doc.apparatus_by_name("app-4"), Some(ApparatusId(3)));
    }

    #[test]
    fn test_generated_names_unique_across_unnamed_blocks() {
        let mut doc = Document::parse(
            r#"<TEI><text><body>
                <ab><app><rdg/></app></ab>
                <ab><app><rdg/></app><app><rdg/></app></ab>
            </body></text></TEI>"#,
        )
        .unwrap();
        let names: Vec<String> = (0..3).map(|i| doc.apparatus_name(ApparatusId(i))).collect();
        assert_eq!(names, vec!["ab1-1", "ab2-1", "ab2-2"]);
        assert_eq!(doc.apparatus_by_name("ab2-1"), Some(ApparatusId(1)));

        doc.ensure_stable_ids();
        let ids: Vec<Option<&str>> = doc
            .apparatuses()
            .iter()
            .map(|app| doc.tree().attribute(app.node(), XML_ID))
            .collect();
        assert_eq!(ids, vec![Some("ab1-1"), Some("ab2-1"), Some("ab2-2")]);
    }

    #[test]
    fn test_generated_name_avoids_taken_names() {
        let doc = Document::parse(
            r#"<TEI><text><body>
                <ab n="B1"><app><rdg/></app></ab>
                <ab n="B1"><app><rdg/></app></ab>
                <app xml:id="B1-1_2"><rdg/></app>
            </body></text></TEI>"#,
        )
        .unwrap();
        let names: Vec<String> = (0..3).map(|i| doc.apparatus_name(ApparatusId(i))).collect();
        assert_eq!(names, vec!["B1-1", "B1-1_3", "B1-1_2"]);
        for (index, name) in names.iter().enumerate() {
            assert_eq!(doc.apparatus_by_name(name), Some(ApparatusId(index)));
        }
    }

    #[test]
    fn test_pair_label_and_context() {
        let doc = minimal_doc();
        let pair = doc.all_pairs().next().unwrap();
        assert_eq!(doc.pair_label(pair.id()), "B1K1V1U2: Reading 1 ➞ Reading 2");
        assert_eq!(
            doc.apparatus_context(pair.apparatus(), "Reading 2"),
            "In the beginning ⸂Reading 2⸃ was the word"
        );
    }

    #[test]
    fn test_pair_by_identifiers() {
        let doc = minimal_doc();
        let app = doc.apparatuses()[0].id();
        let pair = doc.pair_by_identifiers(app, "3", "1").unwrap();
        assert_eq!(doc.pair_display(pair), "Reading 3 ➞ Reading 1");
        assert!(doc.pair_by_identifiers(app, "3", "9").is_none());
    }

    #[test]
    fn test_clean_merges_duplicates() {
        let mut doc = Document::parse(
            r##"<TEI><text>
                <interpGrp type="transcriptional">
                    <interp xml:id="category1"/><interp xml:id="category2"/><interp xml:id="category3"/>
                </interpGrp>
                <app>
                    <rdg n="1">x</rdg><rdg n="2">y</rdg>
                    <note><listRelation type="transcriptional">
                        <relation active="1" passive="2" ana="category1"/>
                        <relation active="1" passive="2" ana="category2 #category3"/>
                        <relation active="2" passive="1" ana="#category1"/>
                    </listRelation></note>
                </app>
            </text></TEI>"##,
        )
        .unwrap();

        let report = doc.clean();

        assert_eq!(
            report,
            CleanReport {
                normalized: 2,
                merged: 1,
                removed: 1
            }
        );
        let tree = doc.tree();
        let relations: Vec<String> = tree
            .find_descendants(tree.root(), "relation")
            .into_iter()
            .map(|relation| tree.node_to_string(relation))
            .collect();
        assert_eq!(
            relations,
            vec![
                "<relation active=\"1\" passive=\"2\" ana=\"#category1 #category2 #category3\"/>",
                "<relation active=\"2\" passive=\"1\" ana=\"#category1\"/>"
            ]
        );
    }

    #[test]
    fn test_clean_on_tidy_document_changes_nothing() {
        let mut doc = minimal_doc();
        let before = doc.to_xml_string();
        assert_eq!(doc.clean(), CleanReport::default());
        assert_eq!(doc.to_xml_string(), before);
        assert_eq!(doc.revision(), 0);
    }
}
