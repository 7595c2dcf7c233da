//! Key-addressed editing of a document.
//!
//! An editing front end refers to pairs and categories by opaque string
//! keys. Keys are assigned in a fixed order (categories by name, then every
//! pair by its label in document order) so the same document always yields
//! the same keys. Every successful edit is written to the output file
//! straight away; a failed edit writes nothing.

use crate::models::{Document, Mapper, PairId, RelationTypeId};
use crate::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Something a key can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditTarget {
    Pair(PairId),
    RelationType(RelationTypeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Remove,
}

/// Outcome of one edit, as reported to the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditResponse {
    pub success: bool,
    pub message: String,
}

impl EditResponse {
    fn from_result(result: Result<String>) -> Self {
        match result {
            Ok(message) => Self {
                success: true,
                message,
            },
            Err(e) => {
                warn!("Edit failed: {}", e);
                Self {
                    success: false,
                    message: e.to_string(),
                }
            }
        }
    }
}

pub struct EditSession {
    doc: Document,
    mapper: Mapper<EditTarget>,
    output: PathBuf,
    responsible: Option<String>,
}

impl EditSession {
    pub fn new(doc: Document, output: &Path) -> Self {
        let mut mapper = Mapper::new();
        for relation_type in doc.relation_types() {
            mapper.key(EditTarget::RelationType(relation_type.id()), &relation_type.name);
        }
        for pair in doc.all_pairs() {
            mapper.key(EditTarget::Pair(pair.id()), &doc.pair_label(pair.id()));
        }
        Self {
            doc,
            mapper,
            output: output.to_path_buf(),
            responsible: None,
        }
    }

    /// Provenance written into `resp` of added relations.
    pub fn with_responsible(mut self, responsible: Option<String>) -> Self {
        self.responsible = responsible;
        self
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.mapper.keys()
    }

    pub fn target(&self, key: &str) -> Option<EditTarget> {
        self.mapper.obj(key)
    }

    fn pair(&self, key: &str) -> Result<PairId> {
        match self.mapper.obj(key) {
            Some(EditTarget::Pair(pair)) => Ok(pair),
            Some(EditTarget::RelationType(_)) => Err(Error::InvalidInput(format!(
                "'{}' is a category, not a pair",
                key
            ))),
            None => Err(Error::NotFound(format!("No pair with key '{}'", key))),
        }
    }

    fn relation_type(&self, key: &str) -> Result<RelationTypeId> {
        match self.mapper.obj(key) {
            Some(EditTarget::RelationType(relation_type)) => Ok(relation_type),
            Some(EditTarget::Pair(_)) => Err(Error::InvalidInput(format!(
                "'{}' is a pair, not a category",
                key
            ))),
            None => Err(Error::NotFound(format!("No category with key '{}'", key))),
        }
    }

    /// Add or remove a category on one pair.
    pub fn set_relation_type(
        &mut self,
        pair_key: &str,
        type_key: &str,
        operation: Operation,
    ) -> EditResponse {
        let result = self.apply_relation_type(pair_key, type_key, operation);
        EditResponse::from_result(result)
    }

    fn apply_relation_type(
        &mut self,
        pair_key: &str,
        type_key: &str,
        operation: Operation,
    ) -> Result<String> {
        let pair = self.pair(pair_key)?;
        let relation_type = self.relation_type(type_key)?;
        let name = self.doc.relation_type(relation_type).name.clone();
        match operation {
            Operation::Add => {
                self.doc
                    .add_type(pair, relation_type, self.responsible.as_deref(), "");
            }
            Operation::Remove => self.doc.remove_type(pair, relation_type),
        }
        self.doc.write(&self.output)?;

        let verb = match operation {
            Operation::Add => "Added",
            Operation::Remove => "Removed",
        };
        info!("{} {} on {}", verb, name, pair_key);
        Ok(format!("{} {} on {}", verb, name, pair_key))
    }

    /// Set the description of one pair. `None` or blank text clears it.
    pub fn set_description(&mut self, pair_key: &str, text: Option<&str>) -> EditResponse {
        let result = self.apply_description(pair_key, text);
        EditResponse::from_result(result)
    }

    fn apply_description(&mut self, pair_key: &str, text: Option<&str>) -> Result<String> {
        let pair = self.pair(pair_key)?;
        let text = text.map(str::trim).unwrap_or_default();
        let message = if text.is_empty() {
            self.doc.remove_description(pair);
            format!("Cleared description of {}", pair_key)
        } else {
            self.doc.add_description(pair, text, None);
            format!("Updated description of {}", pair_key)
        };
        self.doc.write(&self.output)?;
        info!("{}", message);
        Ok(message)
    }
}
