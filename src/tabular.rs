//! CSV export and import of pair classifications.
//!
//! One row per pair: apparatus name, reading identifiers, reading texts,
//! description and one column per category. Files exported here can be
//! edited in a spreadsheet and imported back.

use crate::models::{Document, PairId, RelationTypeId};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::io::{Read, Write};
use tracing::{debug, info, warn};

pub const APP_ID: &str = "App ID";
pub const ACTIVE_ID: &str = "Active Reading ID";
pub const PASSIVE_ID: &str = "Passive Reading ID";
pub const ACTIVE_TEXT: &str = "Active Reading Text";
pub const PASSIVE_TEXT: &str = "Passive Reading Text";
pub const DESCRIPTION: &str = "Description";
pub const RELATION_TYPES: &str = "Relation Type(s)";

/// Prefix shared by every category column header.
const RELATION_TYPE_PREFIX: &str = "Relation Type";

/// Counts from an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub rows: usize,
    pub added: usize,
    pub removed: usize,
    pub descriptions_changed: usize,
    pub skipped: usize,
}

fn type_header(index: usize) -> String {
    if index == 0 {
        RELATION_TYPES.to_string()
    } else {
        format!("{} {}", RELATION_TYPE_PREFIX, index + 1)
    }
}

/// Write one row per pair. Non-redundant pairs only unless `all_pairs`.
///
/// Apparatuses without a stable name get one first so that the App ID
/// column finds them again on import. Returns the number of rows written.
pub fn export_pairs<W: Write>(doc: &mut Document, writer: W, all_pairs: bool) -> Result<usize> {
    doc.ensure_stable_ids();

    let pairs: Vec<PairId> = doc
        .apparatuses()
        .iter()
        .flat_map(|app| {
            if all_pairs {
                app.pairs().to_vec()
            } else {
                app.non_redundant_pairs().to_vec()
            }
        })
        .collect();
    let type_columns = pairs
        .iter()
        .map(|pair| doc.pair(*pair).types().len())
        .max()
        .unwrap_or(0)
        .max(1);

    let mut csv = csv::Writer::from_writer(writer);
    let mut header = vec![
        APP_ID.to_string(),
        ACTIVE_ID.to_string(),
        PASSIVE_ID.to_string(),
        ACTIVE_TEXT.to_string(),
        PASSIVE_TEXT.to_string(),
        DESCRIPTION.to_string(),
    ];
    header.extend((0..type_columns).map(type_header));
    csv.write_record(&header)?;

    for &pair in &pairs {
        let active = doc.reading(doc.pair(pair).active());
        let passive = doc.reading(doc.pair(pair).passive());
        let mut row = vec![
            doc.apparatus_name(doc.pair(pair).apparatus()),
            active.identifier.clone(),
            passive.identifier.clone(),
            active.text.clone(),
            passive.text.clone(),
            doc.pair_description(pair),
        ];
        let names: Vec<String> = doc
            .pair(pair)
            .types()
            .iter()
            .map(|relation_type| doc.relation_type(*relation_type).name.clone())
            .collect();
        row.extend((0..type_columns).map(|index| names.get(index).cloned().unwrap_or_default()));
        csv.write_record(&row)?;
    }
    csv.flush()?;

    info!("Exported {} pairs", pairs.len());
    Ok(pairs.len())
}

/// Write the category list: name, description and declared inverse.
pub fn export_categories<W: Write>(doc: &Document, writer: W) -> Result<usize> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["Category", "Description", "Inverse"])?;
    let mut count = 0;
    for relation_type in doc.relation_types() {
        let inverse = relation_type
            .inverse()
            .map(|inverse| doc.relation_type(inverse).name.clone())
            .unwrap_or_default();
        csv.write_record([
            relation_type.name.as_str(),
            relation_type.description.as_str(),
            inverse.as_str(),
        ])?;
        count += 1;
    }
    csv.flush()?;
    Ok(count)
}

/// Column positions located by header name.
struct Columns {
    app: usize,
    active: usize,
    passive: usize,
    description: Option<usize>,
    types: Vec<usize>,
}

impl Columns {
    fn locate(header: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| header.iter().position(|column| column.trim() == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| Error::InvalidInput(format!("Missing column '{}'", name)))
        };
        Ok(Self {
            app: require(APP_ID)?,
            active: require(ACTIVE_ID)?,
            passive: require(PASSIVE_ID)?,
            description: find(DESCRIPTION),
            types: header
                .iter()
                .enumerate()
                .filter(|(_, column)| column.trim().starts_with(RELATION_TYPE_PREFIX))
                .map(|(index, _)| index)
                .collect(),
        })
    }
}

fn field(record: &csv::StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or_default().trim()
}

/// Apply the classifications in a CSV file to a document.
///
/// Each row is matched by App ID and reading identifiers; rows that match
/// nothing are logged and skipped. Categories listed in the row are added
/// (registering unknown names), categories the pair has but the row lacks
/// are removed, and the description is replaced or cleared when it
/// differs. Added categories carry `responsible`. When the file has no row
/// for a pair's inverse, changes to the pair are mirrored onto it.
pub fn import_pairs<R: Read>(
    doc: &mut Document,
    reader: R,
    responsible: &str,
) -> Result<ImportReport> {
    let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns = Columns::locate(csv.headers()?)?;
    let records = csv.records().collect::<std::result::Result<Vec<_>, _>>()?;

    let mut report = ImportReport::default();
    let mut rows: Vec<(PairId, &csv::StringRecord)> = Vec::new();
    for record in &records {
        report.rows += 1;
        let app_name = field(record, columns.app);
        let Some(app) = doc.apparatus_by_name(app_name) else {
            warn!("Unknown apparatus '{}' in row {}", app_name, report.rows);
            report.skipped += 1;
            continue;
        };
        let (active, passive) = (field(record, columns.active), field(record, columns.passive));
        let Some(pair) = doc.pair_by_identifiers(app, active, passive) else {
            warn!("No pair {} → {} in apparatus '{}'", active, passive, app_name);
            report.skipped += 1;
            continue;
        };
        rows.push((pair, record));
    }

    let listed: HashSet<PairId> = rows.iter().map(|(pair, _)| *pair).collect();
    for (pair, record) in rows {
        let mirror = !listed.contains(&doc.get_inverse(pair));
        import_row(doc, pair, record, &columns, responsible, mirror, &mut report);
    }

    info!(
        "Imported {} rows: {} added, {} removed, {} descriptions changed",
        report.rows, report.added, report.removed, report.descriptions_changed
    );
    Ok(report)
}

fn import_row(
    doc: &mut Document,
    pair: PairId,
    record: &csv::StringRecord,
    columns: &Columns,
    responsible: &str,
    mirror: bool,
    report: &mut ImportReport,
) {
    let wanted: BTreeSet<RelationTypeId> = columns
        .types
        .iter()
        .map(|index| field(record, *index))
        .filter(|name| !name.is_empty())
        .map(|name| doc.ensure_relation_type(name.trim_start_matches('#')))
        .collect();
    let current = doc.pair(pair).types().clone();

    for &relation_type in current.difference(&wanted) {
        if mirror {
            doc.remove_type_with_inverse(pair, relation_type);
        } else {
            doc.remove_type(pair, relation_type);
        }
        report.removed += 1;
    }
    for &relation_type in wanted.difference(&current) {
        if mirror {
            doc.add_type_with_inverse(pair, relation_type, Some(responsible), "", None);
        } else {
            doc.add_type(pair, relation_type, Some(responsible), "");
        }
        report.added += 1;
    }

    if let Some(index) = columns.description {
        let description = field(record, index);
        if description != doc.pair_description(pair) {
            if description.is_empty() {
                doc.remove_description(pair);
            } else {
                doc.add_description(pair, description, None);
            }
            debug!("Updated description of {}", doc.pair_label(pair));
            report.descriptions_changed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::minimal_doc;

    fn export_to_string(doc: &mut Document, all_pairs: bool) -> String {
        let mut buffer = Vec::new();
        export_pairs(doc, &mut buffer, all_pairs).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    // === Export ===

    #[test]
    fn test_export_non_redundant_pairs() {
        let mut doc = minimal_doc();
        let pairs: Vec<PairId> = doc.get_unclassified_pairs(false).map(|pair| pair.id()).collect();
        let category2 = doc.relation_type_by_name("category2").unwrap().id();
        doc.add_type(pairs[1], category2, Some("#editor"), "Because");

        let text = export_to_string(&mut doc, false);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "App ID,Active Reading ID,Passive Reading ID,Active Reading Text,Passive Reading Text,Description,Relation Type(s)"
        );
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "B1K1V1U2,1,2,Reading 1,Reading 2,,");
        assert_eq!(lines[2], "B1K1V1U2,1,3,Reading 1,Reading 3,Because,category2");
    }

    #[test]
    fn test_export_all_pairs_and_extra_type_columns() {
        let mut doc = minimal_doc();
        let pair = doc.all_pairs().next().unwrap().id();
        let category1 = doc.relation_type_by_name("category1").unwrap().id();
        let category3 = doc.relation_type_by_name("category3").unwrap().id();
        doc.add_type(pair, category1, None, "");
        doc.add_type(pair, category3, None, "");

        let text = export_to_string(&mut doc, true);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].ends_with("Relation Type(s),Relation Type 2"));
        assert_eq!(lines.len(), 7);
        assert!(lines[1].ends_with("category1,category3"));
        assert!(lines[2].ends_with(",,"));
    }

    #[test]
    fn test_export_assigns_stable_ids() {
        let mut doc = Document::parse(
            r#"<TEI><text><body><ab n="B1"><app><rdg n="1">a</rdg><rdg n="2">b</rdg></app></ab></body></text></TEI>"#,
        )
        .unwrap();
        let text = export_to_string(&mut doc, false);
        assert!(text.lines().nth(1).unwrap().starts_with("B1-1,1,2,a,b"));
        assert!(doc.to_xml_string().contains(r#"<app xml:id="B1-1">"#));
    }

    #[test]
    fn test_export_categories() {
        let doc = minimal_doc();
        let mut buffer = Vec::new();
        assert_eq!(export_categories(&doc, &mut buffer).unwrap(), 3);
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Category,Description,Inverse");
        assert_eq!(lines[2], "category2,Description 2,");
    }

    // === Import ===

    #[test]
    fn test_import_targets_unnamed_apparatus_in_second_block() {
        let mut doc = Document::parse(
            r#"<TEI><text><body>
                <ab><app><rdg n="1">a</rdg><rdg n="2">b</rdg></app></ab>
                <ab><app><rdg n="1">p</rdg><rdg n="2">q</rdg></app></ab>
            </body></text></TEI>"#,
        )
        .unwrap();
        let mut exported = Vec::new();
        export_pairs(&mut doc, &mut exported, false).unwrap();
        let exported = String::from_utf8(exported).unwrap();
        assert!(exported.contains("ab1-1,1,2,a,b,,"));
        assert!(exported.contains("ab2-1,1,2,p,q,,"));

        let csv = "App ID,Active Reading ID,Passive Reading ID,Relation Type(s)\n\
                   ab2-1,1,2,orth\n";
        let report = import_pairs(&mut doc, csv.as_bytes(), "#import").unwrap();
        assert_eq!(report.added, 1);

        let classified = |index: usize| {
            doc.apparatuses()[index]
                .pairs()
                .iter()
                .filter(|pair| doc.pair(**pair).is_classified())
                .count()
        };
        assert_eq!(classified(0), 0);
        assert_eq!(classified(1), 2);
    }

    #[test]
    fn test_import_adds_and_tags() {
        let mut doc = minimal_doc();
        let csv = "App ID,Active Reading ID,Passive Reading ID,Active Reading Text,Passive Reading Text,Relation Type(s)\n\
                   B1K1V1U2,1,2,Reading 1,Reading 2,\n\
                   B1K1V1U2,1,3,Reading 1,Reading 3,category3\n\
                   B1K1V1U2,2,3,Reading 2,Reading 3,category2\n";
        let report = import_pairs(&mut doc, csv.as_bytes(), "#import").unwrap();

        assert_eq!(report.rows, 3);
        assert_eq!(report.added, 2);
        assert_eq!(report.skipped, 0);
        let xml = doc.to_xml_string();
        assert!(xml.contains(r##"<relation active="1" passive="3" ana="#category3" resp="#import"/>"##));
        assert!(xml.contains(r##"<relation active="2" passive="3" ana="#category2" resp="#import"/>"##));
        assert!(xml.contains(r##"<relation active="3" passive="1" ana="#category3" resp="#import">"##));
    }

    #[test]
    fn test_import_removes_and_updates_description() {
        let mut doc = minimal_doc();
        let app = doc.apparatuses()[0].id();
        let pair = doc.pair_by_identifiers(app, "1", "2").unwrap();
        let category1 = doc.relation_type_by_name("category1").unwrap().id();
        doc.add_type_with_inverse(pair, category1, Some("#editor"), "Old", None);

        let csv = "App ID,Active Reading ID,Passive Reading ID,Description,Relation Type(s),Relation Type 2\n\
                   B1K1V1U2,1,2,New,category2,NewCategory\n";
        let report = import_pairs(&mut doc, csv.as_bytes(), "#import").unwrap();

        assert_eq!(report.removed, 1);
        assert_eq!(report.added, 2);
        assert_eq!(report.descriptions_changed, 1);
        assert_eq!(doc.pair_description(pair), "New");
        let names: Vec<&str> = doc
            .pair(pair)
            .types()
            .iter()
            .map(|relation_type| doc.relation_type(*relation_type).name.as_str())
            .collect();
        assert_eq!(names, vec!["category2", "NewCategory"]);
        assert!(doc.relation_type_by_name("NewCategory").is_some());

        let inverse = doc.get_inverse(pair);
        assert!(!doc.pair(inverse).types().contains(&category1));
    }

    #[test]
    fn test_import_clears_description() {
        let mut doc = minimal_doc();
        let app = doc.apparatuses()[0].id();
        let pair = doc.pair_by_identifiers(app, "1", "2").unwrap();
        let category1 = doc.relation_type_by_name("category1").unwrap().id();
        doc.add_type(pair, category1, None, "Remove me");

        let csv = "App ID,Active Reading ID,Passive Reading ID,Description,Relation Type(s)\n\
                   B1K1V1U2,1,2,,category1\n";
        let report = import_pairs(&mut doc, csv.as_bytes(), "#import").unwrap();
        assert_eq!(report.descriptions_changed, 1);
        assert_eq!(report.added, 0);
        assert_eq!(doc.pair_description(pair), "");
    }

    #[test]
    fn test_import_skips_unknown_rows() {
        let mut doc = minimal_doc();
        let csv = "App ID,Active Reading ID,Passive Reading ID,Relation Type(s)\n\
                   Nowhere,1,2,category1\n\
                   B1K1V1U2,1,9,category1\n";
        let report = import_pairs(&mut doc, csv.as_bytes(), "#import").unwrap();
        assert_eq!(report.rows, 2);
        assert_eq!(report.skipped, 2);
        assert_eq!(doc.get_classified_pairs(true).count(), 0);
    }

    #[test]
    fn test_import_requires_identifier_columns() {
        let mut doc = minimal_doc();
        let result = import_pairs(&mut doc, "App ID,Relation Type(s)\n".as_bytes(), "#import");
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_export_then_import_is_stable() {
        let mut doc = minimal_doc();
        let pair = doc.all_pairs().next().unwrap().id();
        let category1 = doc.relation_type_by_name("category1").unwrap().id();
        doc.add_type_with_inverse(pair, category1, Some("#editor"), "Kept", None);
        let before = doc.to_xml_string();

        let text = export_to_string(&mut doc, true);
        let report = import_pairs(&mut doc, text.as_bytes(), "#import").unwrap();
        assert_eq!(report.added + report.removed + report.descriptions_changed, 0);
        assert_eq!(doc.to_xml_string(), before);
    }
}
